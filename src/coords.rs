use cgmath::InnerSpace;

use crate::math::FVector;

/// A set of axes to project vectors onto.  Brushes are only ever scaled about
/// their pivot, so the origin is always zero and the axes are diagonal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FCoords {
    pub x_axis: FVector,
    pub y_axis: FVector,
    pub z_axis: FVector,
}

impl Default for FCoords {
    fn default() -> Self {
        Self::new_from_scale(&FVector::new(1.0, 1.0, 1.0))
    }
}

impl FCoords {
    pub fn new_from_scale(scale: &FVector) -> FCoords {
        FCoords {
            x_axis: FVector::new(scale.x, 0.0, 0.0),
            y_axis: FVector::new(0.0, scale.y, 0.0),
            z_axis: FVector::new(0.0, 0.0, scale.z),
        }
    }

    /// Project a vector onto the axes.
    pub fn transform_vector(&self, v: &FVector) -> FVector {
        FVector::new(v.dot(self.x_axis), v.dot(self.y_axis), v.dot(self.z_axis))
    }

    pub fn transpose(&self) -> FCoords {
        FCoords {
            x_axis: FVector::new(self.x_axis.x, self.y_axis.x, self.z_axis.x),
            y_axis: FVector::new(self.x_axis.y, self.y_axis.y, self.z_axis.y),
            z_axis: FVector::new(self.x_axis.z, self.y_axis.z, self.z_axis.z),
        }
    }
}

/// The pair of transforms a brush applies: points go through `covariant`,
/// normals and texture axes through `contravariant`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FModelCoords {
    pub covariant: FCoords,
    pub contravariant: FCoords,
}

impl FModelCoords {
    /// Normals are scaled by the reciprocal and must be renormalized afterwards.
    pub fn new_from_scale(scale: &FVector) -> FModelCoords {
        FModelCoords {
            covariant: FCoords::new_from_scale(scale),
            contravariant: FCoords::new_from_scale(&FVector::new(1.0 / scale.x, 1.0 / scale.y, 1.0 / scale.z)),
        }
    }

    pub fn inverse(&self) -> FModelCoords {
        FModelCoords {
            covariant: self.contravariant.transpose(),
            contravariant: self.covariant.transpose(),
        }
    }
}
