use cgmath::InnerSpace;
use crate::box_::FBox;
use crate::math::FVector;

/// Bounding spheres are padded by this factor so points on the surface test inside.
const SPHERE_RADIUS_SLACK: f32 = 1.001;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FSphere {
    pub origin: FVector,
    pub radius: f32
}

impl Default for FSphere {
    fn default() -> Self {
        Self::new()
    }
}

impl FSphere {

    pub fn new() -> FSphere {
        FSphere {
            origin: FVector::new(0.0, 0.0, 0.0),
            radius: 0.0
        }
    }

    pub fn new_from_origin_and_radius(origin: &FVector, radius: f32) -> FSphere {
        FSphere {
            origin: *origin,
            radius
        }
    }

    /// Compute a bounding sphere from an array of points.
    pub fn new_from_points(points: &[FVector]) -> FSphere {
        let box_ = FBox::new_from_points(points);
        let origin = box_.center();
        let max_distance_squared = points.iter()
            .map(|point| (point - origin).magnitude2())
            .fold(0.0f32, f32::max);
        FSphere::new_from_origin_and_radius(&origin, max_distance_squared.sqrt() * SPHERE_RADIUS_SLACK)
    }
}

impl From<&FBox> for FSphere {
    /// The sphere circumscribing the box.
    fn from(box_: &FBox) -> Self {
        if !box_.is_valid {
            return FSphere::new();
        }
        FSphere::new_from_origin_and_radius(&box_.center(), box_.extent().magnitude() * SPHERE_RADIUS_SLACK)
    }
}
