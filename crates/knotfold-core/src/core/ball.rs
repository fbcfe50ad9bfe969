use nalgebra::Point3;

/// A bounding ball over a set of polygon vertices.
///
/// Interior tree nodes carry a ball that, once every ancestor's pending motion
/// is composed in, contains all vertices of the node's leaf range. Leaves carry
/// a degenerate ball of radius zero whose center is the vertex position itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl Ball {
    /// A radius-zero ball around a single point.
    pub fn point(center: Point3<f64>) -> Self {
        Self {
            center,
            radius: 0.0,
        }
    }

    /// A ball enclosing both `self` and `other`.
    ///
    /// This is the fast closed-form merge, not a minimal enclosing ball: when
    /// neither ball contains the other, the centers are blended along the
    /// center line and the radius is `(d + r_l + r_r) / 2`. The result may be
    /// loose but never under-approximates the union.
    pub fn merge(&self, other: &Self) -> Self {
        let offset = other.center - self.center;
        let distance = offset.norm();

        // Containment short-circuits, which also cover coincident centers.
        if distance + self.radius <= other.radius {
            return *other;
        }
        if distance + other.radius <= self.radius {
            return *self;
        }

        let blend = (other.radius - self.radius) / (2.0 * distance);
        Self {
            center: self.center + offset * 0.5 + offset * blend,
            radius: (distance + self.radius + other.radius) / 2.0,
        }
    }

    /// True when the two balls, each grown by `extra / 2`, intersect; i.e. when
    /// the center distance is strictly below `extra + r_0 + r_1`.
    pub fn overlaps(&self, other: &Self, extra: f64) -> bool {
        let reach = extra + self.radius + other.radius;
        (other.center - self.center).norm_squared() < reach * reach
    }

    /// True when `point` lies inside the ball, up to `tolerance`.
    pub fn contains_point(&self, point: &Point3<f64>, tolerance: f64) -> bool {
        (point - self.center).norm() <= self.radius + tolerance
    }
}
