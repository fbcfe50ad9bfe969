use nalgebra::{Matrix3, Point3, Rotation3, Unit, UnitQuaternion, Vector3};

/// A rigid motion of 3-space: an orthogonal linear part plus a translation.
///
/// The sampler builds one motion per pivot move, fixing the chord line through
/// the two pivot vertices pointwise. Implementations are chosen once, at tree
/// construction time, via the tree's type parameter; there is no runtime
/// dispatch on the representation.
///
/// With `mirror` set, the linear part is improper (a rotation composed with a
/// reflection in a deterministic plane containing the axis). This extends the
/// move set; the chord line stays pointwise fixed either way.
pub trait RigidMotion: Clone + std::fmt::Debug + Send + Sync {
    /// The motion rotating by `angle` radians about the line through `origin`
    /// with direction `axis`, optionally mirrored.
    fn pivot(origin: &Point3<f64>, axis: &Unit<Vector3<f64>>, angle: f64, mirror: bool) -> Self;

    fn apply_point(&self, point: &Point3<f64>) -> Point3<f64>;

    /// `self ∘ inner`: the motion applying `inner` first, then `self`.
    fn compose(&self, inner: &Self) -> Self;

    fn inverse(&self) -> Self;
}

/// A deterministic unit vector perpendicular to `axis`, used as the normal of
/// the mirror plane. Both backends must agree on this choice.
fn mirror_plane_normal(axis: &Unit<Vector3<f64>>) -> Unit<Vector3<f64>> {
    let seed = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Unit::new_normalize(axis.cross(&seed))
}

/// Rigid motion backed by a 3x3 orthogonal matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixMotion {
    linear: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl RigidMotion for MatrixMotion {
    fn pivot(origin: &Point3<f64>, axis: &Unit<Vector3<f64>>, angle: f64, mirror: bool) -> Self {
        let rotation = Rotation3::from_axis_angle(axis, angle).into_inner();
        let linear = if mirror {
            let normal = mirror_plane_normal(axis).into_inner();
            let householder = Matrix3::identity() - 2.0 * normal * normal.transpose();
            rotation * householder
        } else {
            rotation
        };
        Self {
            translation: origin.coords - linear * origin.coords,
            linear,
        }
    }

    fn apply_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.linear * point.coords + self.translation)
    }

    fn compose(&self, inner: &Self) -> Self {
        Self {
            linear: self.linear * inner.linear,
            translation: self.linear * inner.translation + self.translation,
        }
    }

    fn inverse(&self) -> Self {
        // Orthogonal (proper or improper), so the inverse is the transpose.
        let transposed = self.linear.transpose();
        Self {
            translation: -(transposed * self.translation),
            linear: transposed,
        }
    }
}

/// Rigid motion backed by a unit quaternion.
///
/// Improper motions are not expressible as quaternions alone; since `-I`
/// commutes with every rotation and has determinant -1 in 3-space, any improper
/// orthogonal map is `-R` for the rotation `R = -Q`. The `negated` flag carries
/// that factor.
#[derive(Debug, Clone, PartialEq)]
pub struct QuaternionMotion {
    rotation: UnitQuaternion<f64>,
    translation: Vector3<f64>,
    negated: bool,
}

impl QuaternionMotion {
    fn apply_linear(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        let rotated = self.rotation * vector;
        if self.negated { -rotated } else { rotated }
    }
}

impl RigidMotion for QuaternionMotion {
    fn pivot(origin: &Point3<f64>, axis: &Unit<Vector3<f64>>, angle: f64, mirror: bool) -> Self {
        let mut rotation = UnitQuaternion::from_axis_angle(axis, angle);
        if mirror {
            // Reflection across the plane spanned by the axis and the seed
            // direction equals minus a half-turn about the plane's normal.
            let normal = mirror_plane_normal(axis);
            rotation = rotation * UnitQuaternion::from_axis_angle(&normal, std::f64::consts::PI);
        }
        let mut motion = Self {
            rotation,
            translation: Vector3::zeros(),
            negated: mirror,
        };
        motion.translation = origin.coords - motion.apply_linear(&origin.coords);
        motion
    }

    fn apply_point(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.apply_linear(&point.coords) + self.translation)
    }

    fn compose(&self, inner: &Self) -> Self {
        Self {
            translation: self.apply_linear(&inner.translation) + self.translation,
            rotation: self.rotation * inner.rotation,
            negated: self.negated ^ inner.negated,
        }
    }

    fn inverse(&self) -> Self {
        let inverted = Self {
            rotation: self.rotation.inverse(),
            translation: Vector3::zeros(),
            negated: self.negated,
        };
        Self {
            translation: -inverted.apply_linear(&self.translation),
            ..inverted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOLERANCE: f64 = 1e-10;

    fn points_approx_equal(a: &Point3<f64>, b: &Point3<f64>) -> bool {
        (a - b).norm() < TOLERANCE
    }

    fn sample_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-2.5, 3.0, 0.5),
            Point3::new(0.1, -0.7, 4.0),
            Point3::new(10.0, 10.0, -10.0),
        ]
    }

    fn sample_motions<M: RigidMotion>() -> Vec<M> {
        let axis_a = Unit::new_normalize(Vector3::new(1.0, 2.0, -0.5));
        let axis_b = Unit::new_normalize(Vector3::new(-0.3, 0.1, 1.0));
        vec![
            M::pivot(&Point3::new(0.0, 0.0, 0.0), &axis_a, 0.8, false),
            M::pivot(&Point3::new(1.0, -2.0, 3.0), &axis_b, -2.4, false),
            M::pivot(&Point3::new(1.0, -2.0, 3.0), &axis_a, 1.1, true),
            M::pivot(&Point3::new(-4.0, 0.5, 0.0), &axis_b, PI - 0.01, true),
        ]
    }

    #[test]
    fn quarter_turn_about_z_maps_x_to_y() {
        let axis = Unit::new_normalize(Vector3::z());
        let origin = Point3::new(0.0, 0.0, 0.0);
        let expected = Point3::new(0.0, 1.0, 0.0);
        let input = Point3::new(1.0, 0.0, 0.0);

        let matrix = MatrixMotion::pivot(&origin, &axis, FRAC_PI_2, false);
        let quaternion = QuaternionMotion::pivot(&origin, &axis, FRAC_PI_2, false);
        assert!(points_approx_equal(&matrix.apply_point(&input), &expected));
        assert!(points_approx_equal(
            &quaternion.apply_point(&input),
            &expected
        ));
    }

    #[test]
    fn pivot_fixes_every_point_on_the_axis() {
        let origin = Point3::new(2.0, -1.0, 0.5);
        let axis = Unit::new_normalize(Vector3::new(0.2, 1.0, -0.7));
        for mirror in [false, true] {
            let matrix = MatrixMotion::pivot(&origin, &axis, 1.9, mirror);
            let quaternion = QuaternionMotion::pivot(&origin, &axis, 1.9, mirror);
            for t in [-3.0, 0.0, 0.25, 7.0] {
                let on_axis = origin + axis.into_inner() * t;
                assert!(points_approx_equal(&matrix.apply_point(&on_axis), &on_axis));
                assert!(points_approx_equal(
                    &quaternion.apply_point(&on_axis),
                    &on_axis
                ));
            }
        }
    }

    #[test]
    fn backends_agree_on_apply_compose_and_inverse() {
        let matrix_motions = sample_motions::<MatrixMotion>();
        let quaternion_motions = sample_motions::<QuaternionMotion>();
        for (m, q) in matrix_motions.iter().zip(quaternion_motions.iter()) {
            for point in sample_points() {
                assert!(points_approx_equal(
                    &m.apply_point(&point),
                    &q.apply_point(&point)
                ));
                assert!(points_approx_equal(
                    &m.inverse().apply_point(&point),
                    &q.inverse().apply_point(&point)
                ));
            }
        }
        for (ma, qa) in matrix_motions.iter().zip(quaternion_motions.iter()) {
            for (mb, qb) in matrix_motions.iter().zip(quaternion_motions.iter()) {
                let m = ma.compose(mb);
                let q = qa.compose(qb);
                for point in sample_points() {
                    assert!(points_approx_equal(
                        &m.apply_point(&point),
                        &q.apply_point(&point)
                    ));
                }
            }
        }
    }

    #[test]
    fn compose_applies_the_inner_motion_first() {
        let axis = Unit::new_normalize(Vector3::z());
        let origin = Point3::new(0.0, 0.0, 0.0);
        let first = MatrixMotion::pivot(&Point3::new(1.0, 0.0, 0.0), &axis, 0.7, false);
        let second = MatrixMotion::pivot(&origin, &axis, -1.3, false);
        let composed = second.compose(&first);
        for point in sample_points() {
            let sequential = second.apply_point(&first.apply_point(&point));
            assert!(points_approx_equal(&composed.apply_point(&point), &sequential));
        }
    }

    #[test]
    fn inverse_round_trips_points_including_mirrored_motions() {
        for motion in sample_motions::<MatrixMotion>() {
            let inverse = motion.inverse();
            for point in sample_points() {
                let back = inverse.apply_point(&motion.apply_point(&point));
                assert!(points_approx_equal(&back, &point));
            }
        }
        for motion in sample_motions::<QuaternionMotion>() {
            let inverse = motion.inverse();
            for point in sample_points() {
                let back = inverse.apply_point(&motion.apply_point(&point));
                assert!(points_approx_equal(&back, &point));
            }
        }
    }

    #[test]
    fn rigid_motions_preserve_pairwise_distances() {
        for motion in sample_motions::<QuaternionMotion>() {
            let points = sample_points();
            for a in &points {
                for b in &points {
                    let before = (a - b).norm();
                    let after = (motion.apply_point(a) - motion.apply_point(b)).norm();
                    assert!((before - after).abs() < TOLERANCE);
                }
            }
        }
    }

    #[test]
    fn mirrored_motion_reverses_orientation() {
        let origin = Point3::new(0.0, 0.0, 0.0);
        let axis = Unit::new_normalize(Vector3::new(0.3, -1.0, 0.2));
        let motion = MatrixMotion::pivot(&origin, &axis, 0.9, true);

        let image = |v: Vector3<f64>| motion.apply_point(&Point3::from(v)) - motion.apply_point(&origin);
        let x = image(Vector3::x());
        let y = image(Vector3::y());
        let z = image(Vector3::z());
        let determinant = x.cross(&y).dot(&z);
        assert!((determinant + 1.0).abs() < TOLERANCE);
    }
}
