//! Scalar 2-D vector helpers and signed-distance-function primitives.
//!
//! Every SDF returns `(phi, normal)` where `phi < 0` means penetration, `phi = 0` is the
//! boundary, and `normal` is a unit outward normal at the query point.

use std::f64::consts::PI;

use vek::Vec2;

/// Dot product, spelled out for call sites that read better without the `vek` method call.
#[inline]
pub fn dot(a: Vec2<f64>, b: Vec2<f64>) -> f64 {
    a.dot(b)
}

/// Scalar z-component of the 2-D cross product `a x b`.
#[inline]
pub fn cross(a: Vec2<f64>, b: Vec2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Normalize `v`, returning the unit vector and the original length.
///
/// Degenerate input (zero length) returns `(Vec2::unit_x(), 0.0)` instead of NaN.
#[inline]
pub fn normalize(v: Vec2<f64>) -> (Vec2<f64>, f64) {
    let len = v.magnitude();
    if len <= f64::EPSILON {
        (Vec2::unit_x(), 0.0)
    } else {
        (v / len, len)
    }
}

/// Signed angle from `a` to `b`, in `(-pi, pi]`.
#[inline]
pub fn angle_between(a: Vec2<f64>, b: Vec2<f64>) -> f64 {
    cross(a, b).atan2(dot(a, b))
}

/// Wrap an angle in radians to `[-pi, pi]`. Idempotent on that range.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    // `rem_euclid` can return exactly `-pi` for inputs that were exactly `pi`; both are in range.
    wrapped
}

/// Clamp `value` into `[min, max]`.
#[inline]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// `(phi, outward unit normal)` at `point` for a circle centered at `center`.
///
/// Degenerate case (`point == center`) returns `phi = -radius` with normal `(1, 0)`.
pub fn circle_sdf(point: Vec2<f64>, center: Vec2<f64>, radius: f64) -> (f64, Vec2<f64>) {
    let delta = point - center;
    let (normal, dist) = normalize(delta);
    if dist <= f64::EPSILON {
        (-radius, Vec2::unit_x())
    } else {
        (dist - radius, normal)
    }
}

/// `(phi, outward unit normal)` at `point` for a capsule: a segment from `center - axis*halfLength`
/// to `center + axis*halfLength`, inflated by `radius`. `axis` must be a unit vector.
///
/// Degenerate case (`point` exactly on the capsule axis) returns `phi = -radius` with a normal
/// perpendicular to `axis`.
pub fn capsule_sdf(
    point: Vec2<f64>,
    center: Vec2<f64>,
    axis: Vec2<f64>,
    half_length: f64,
    radius: f64,
) -> (f64, Vec2<f64>) {
    let local = point - center;
    let t = clamp(dot(local, axis), -half_length, half_length);
    let closest = center + axis * t;
    let delta = point - closest;
    let (normal, dist) = normalize(delta);
    if dist <= f64::EPSILON {
        let perp = Vec2::new(-axis.y, axis.x);
        (-radius, perp)
    } else {
        (dist - radius, normal)
    }
}

/// `(phi, outward unit normal)` at `point` for an oriented box centered at `center` with unit axis
/// `ux` (the box's local x-axis; the local y-axis is the perpendicular `(-ux.y, ux.x)`) and given
/// half-extents.
///
/// Degenerate case (`point` exactly at `center`): returns `phi = -min(half_extent_x,
/// half_extent_y)` with normal `(1, 0)`.
pub fn obb_sdf(
    point: Vec2<f64>,
    center: Vec2<f64>,
    ux: Vec2<f64>,
    half_extent_x: f64,
    half_extent_y: f64,
) -> (f64, Vec2<f64>) {
    let uy = Vec2::new(-ux.y, ux.x);
    let local = point - center;
    let lx = dot(local, ux);
    let ly = dot(local, uy);

    if lx == 0.0 && ly == 0.0 {
        return (-half_extent_x.min(half_extent_y), Vec2::unit_x());
    }

    let clamped_x = clamp(lx, -half_extent_x, half_extent_x);
    let clamped_y = clamp(ly, -half_extent_y, half_extent_y);

    let inside = lx.abs() <= half_extent_x && ly.abs() <= half_extent_y;

    if inside {
        // Distance to the nearest face, negative (penetrating).
        let dx = half_extent_x - lx.abs();
        let dy = half_extent_y - ly.abs();
        let (phi, local_normal) = if dx < dy {
            (-dx, Vec2::new(lx.signum(), 0.0))
        } else {
            (-dy, Vec2::new(0.0, ly.signum()))
        };
        let world_normal = local_normal.x * ux + local_normal.y * uy;
        (phi, world_normal)
    } else {
        let local_delta = Vec2::new(lx - clamped_x, ly - clamped_y);
        let (local_normal, dist) = normalize(local_delta);
        let world_normal = local_normal.x * ux + local_normal.y * uy;
        (dist, world_normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wrap_angle_is_idempotent() {
        for raw in [-10.0_f64, -3.0, -PI, 0.0, PI, 3.0, 10.0] {
            let once = wrap_angle(raw);
            assert!((-PI..=PI).contains(&once));
            let twice = wrap_angle(once);
            assert_relative_eq!(once, twice, epsilon = 1e-9);
        }
    }

    #[test]
    fn circle_sdf_boundary_is_near_zero() {
        let center = Vec2::new(1.0, 2.0);
        let radius = 3.0;
        let point = center + Vec2::new(radius, 0.0);
        let (phi, normal) = circle_sdf(point, center, radius);
        assert!(phi.abs() < 1e-6);
        assert_relative_eq!(normal.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(normal.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn circle_sdf_degenerate_center() {
        let center = Vec2::new(0.0, 0.0);
        let (phi, normal) = circle_sdf(center, center, 2.0);
        assert_relative_eq!(phi, -2.0);
        assert_relative_eq!(normal.x, 1.0);
        assert_relative_eq!(normal.y, 0.0);
    }

    #[test]
    fn capsule_sdf_on_axis_is_degenerate() {
        let center = Vec2::new(0.0, 0.0);
        let axis = Vec2::new(1.0, 0.0);
        let point = Vec2::new(0.5, 0.0);
        let (phi, normal) = capsule_sdf(point, center, axis, 2.0, 0.5);
        assert_relative_eq!(phi, -0.5);
        assert_relative_eq!(normal.x, 0.0);
        assert_relative_eq!(normal.y, 1.0);
    }

    #[test]
    fn obb_sdf_inside_picks_nearest_face() {
        let center = Vec2::new(0.0, 0.0);
        let ux = Vec2::new(1.0, 0.0);
        // Point closer to the +x face than the +y face.
        let point = Vec2::new(0.9, 0.1);
        let (phi, normal) = obb_sdf(point, center, ux, 1.0, 1.0);
        assert!(phi < 0.0);
        assert_relative_eq!(normal.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(normal.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn obb_sdf_outside_points_away() {
        let center = Vec2::new(0.0, 0.0);
        let ux = Vec2::new(1.0, 0.0);
        let point = Vec2::new(2.0, 0.0);
        let (phi, normal) = obb_sdf(point, center, ux, 1.0, 1.0);
        assert_relative_eq!(phi, 1.0, epsilon = 1e-9);
        assert_relative_eq!(normal.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(normal.y, 0.0, epsilon = 1e-9);
    }
}
