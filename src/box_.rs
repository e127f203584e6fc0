use crate::math::FVector;

/// Axis-aligned bounds of a model or a subtree.  A box that has not seen a
/// point yet is invalid, and invalid boxes bound nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FBox {
    pub min: FVector,
    pub max: FVector,
    pub is_valid: bool
}

impl Default for FBox {
    fn default() -> Self {
        Self::new()
    }
}

impl FBox {
    pub fn new() -> FBox {
        FBox {
            min: FVector::new(0.0, 0.0, 0.0),
            max: FVector::new(0.0, 0.0, 0.0),
            is_valid: false
        }
    }

    pub fn new_from_min_max(min: FVector, max: FVector) -> FBox {
        FBox { min, max, is_valid: true }
    }

    pub fn new_from_points(points: &[FVector]) -> FBox {
        let mut bound = FBox::new();
        bound.add_points(points);
        bound
    }

    pub fn center(&self) -> FVector {
        (self.min + self.max) * 0.5
    }

    /// Half the size of the box along each axis.
    pub fn extent(&self) -> FVector {
        (self.max - self.min) * 0.5
    }

    /// Grow the box to take in `point`.
    pub fn add_point(&mut self, point: &FVector) {
        if !self.is_valid {
            *self = FBox::new_from_min_max(*point, *point);
            return;
        }
        self.min = FVector::new(self.min.x.min(point.x), self.min.y.min(point.y), self.min.z.min(point.z));
        self.max = FVector::new(self.max.x.max(point.x), self.max.y.max(point.y), self.max.z.max(point.z));
    }

    pub fn add_points(&mut self, points: &[FVector]) {
        points.iter().for_each(|point| self.add_point(point));
    }
}
