use cgmath::{Vector3, InnerSpace};

pub type FVector = Vector3<f32>;

/// Maximum size of the world.
pub const WORLD_MAX: f32 = 524288.0;
/// Half the maximum size of the world.
pub const HALF_WORLD_MAX: f32 = 262144.0;

/// A plane in `x*X + y*Y + z*Z = w` form, with `(x, y, z)` the unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FPlane {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for FPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl FPlane {
    pub fn new() -> FPlane {
        FPlane { x: 0.0, y: 0.0, z: 0.0, w: 0.0 }
    }

    pub fn new_from_normal_and_w(normal: &FVector, w: f32) -> FPlane {
        FPlane { x: normal.x, y: normal.y, z: normal.z, w }
    }

    pub fn new_from_origin_and_normal(origin: &FVector, normal: &FVector) -> FPlane {
        FPlane::new_from_normal_and_w(normal, normal.dot(*origin))
    }

    pub fn normal(&self) -> FVector {
        FVector::new(self.x, self.y, self.z)
    }

    /// A point lying on the plane.
    pub fn base(&self) -> FVector {
        self.normal() * self.w
    }

    pub fn plane_dot(&self, p: FVector) -> f32 {
        (self.x * p.x) + (self.y * p.y) + (self.z * p.z) - self.w
    }
}

// Floating point constants.

/// Lengths of normalized vectors (These are half their maximum values
/// to assure that dot products with normalized vectors don't overflow).
pub const FLOAT_NORMAL_THRESH: f32 = 0.0001;

// Magic numbers for numerical precision.

/// Two points are same if within this distance
pub const THRESH_POINTS_ARE_SAME: f32 = 0.002;
/// Two points are near if within this distance and can be combined if imprecise math is ok
pub const THRESH_POINTS_ARE_NEAR: f32 = 0.015;
/// Two normal points are same if within this distance
/// Making this too large results in incorrect CSG classification and disaster
pub const THRESH_NORMALS_ARE_SAME: f32 = 0.00002;
/// Two vectors are near if within this distance and can be combined if imprecise math is ok
/// Making this too large results in lighting problems due to inaccurate texture coordinates
pub const THRESH_VECTORS_ARE_NEAR: f32 = 0.0004;
/// Vertices closer than this to a splitting plane count as lying on it.
/// Keep it well below the smallest brush feature the builder must keep apart.
pub const THRESH_SPLIT_POLY_WITH_PLANE: f32 = 0.01;
/// A plane exactly splits a polygon
pub const THRESH_SPLIT_POLY_PRECISELY: f32 = 0.001;
/// Squared length of a polygon's summed edge cross products (twice its
/// area) below which it has no usable normal.
pub const THRESH_ZERO_NORM_SQUARED: f32 = 1.0e-10;

pub const SMALL_NUMBER: f32 = 1.0e-8;

pub fn points_are_same(p: &FVector, q: &FVector) -> bool {
    for i in 0..3 {
        let temp = (p[i] - q[i]).abs();
        if temp >= THRESH_POINTS_ARE_SAME {
            return false
        }
    }
    true
}


// Compare two points and see if they're the same, using a threshold.
// Uses fast distance approximation.
pub fn points_are_near(point1: &FVector, point2: &FVector, distance: f32) -> bool {
    if (point1.x - point2.x).abs() >= distance {
        return false;
    }
    if (point1.y - point2.y).abs() >= distance {
        return false;
    }
    if (point1.z - point2.z).abs() >= distance {
        return false;
    }
    true
}


/// Calculate the signed distance (in the direction of the normal) between a point and a plane.
pub fn point_plane_distance(point: &FVector, plane_base: &FVector, plane_normal: &FVector) -> f32 {
    (point - plane_base).dot(*plane_normal)
}

/// Find the intersection of an infinite line (defined by two points) and
/// a plane.  Assumes that the line and plane do indeed intersect; you must
/// make sure they're not parallel before calling.
pub fn line_plane_intersection(point1: &FVector, point2: &FVector, plane_base: &FVector, plane_normal: &FVector) -> FVector {
    point1
        + ((point2 - point1) *
            ((plane_base - point1).dot(*plane_normal)
                / (point2 - point1).dot(*plane_normal)))
}

/// Normalize a vector, returning zero for vectors too short to normalize.
pub fn safe_normal(v: FVector) -> FVector {
    let size_squared = v.magnitude2();
    if size_squared < SMALL_NUMBER {
        FVector::new(0.0, 0.0, 0.0)
    } else {
        v / size_squared.sqrt()
    }
}

/// Two orthonormal axes lying in the plane perpendicular to `normal`.
pub fn find_best_axis_vectors(normal: &FVector) -> (FVector, FVector) {
    let nx = normal.x.abs();
    let ny = normal.y.abs();
    let nz = normal.z.abs();

    let axis1 = if nz > nx && nz > ny {
        FVector::new(1.0, 0.0, 0.0)
    } else {
        FVector::new(0.0, 0.0, 1.0)
    };

    let axis1 = safe_normal(axis1 - *normal * axis1.dot(*normal));
    let axis2 = axis1.cross(*normal);
    (axis1, axis2)
}
