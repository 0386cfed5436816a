//! Soft angle-constraint projection.
//!
//! Retained only for soft/bendy articulation; rigid corners should use
//! [`crate::world::WorldState::add_angle_constraint_as_rod`] instead (direct 3-point angle
//! constraints with stiff compliance over-constrain distance rods and diverge).

use vek::Vec2;

use crate::vecmath::{angle_between, wrap_angle};
use crate::world::WorldState;

use super::delta_lambda;

const EPS: f64 = 1e-9;

/// Project every angle constraint once, in insertion order.
pub fn project(world: &mut WorldState, dt: f64) {
    puffin::profile_function!();

    for idx in 0..world.angles.len() {
        let c = world.angles[idx];
        project_one(
            world,
            dt,
            c.i,
            c.j,
            c.k,
            c.theta0,
            c.compliance,
            c.lambda,
            |w, dl| w.angles[idx].lambda += dl,
        );
    }
}

/// Shared angle-constraint math for [`project`] and [`crate::solver::motor::project`] (which is
/// identical except `theta0` is replaced by a per-step `target`).
#[allow(clippy::too_many_arguments)]
pub(crate) fn project_one(
    world: &mut WorldState,
    dt: f64,
    i: usize,
    j: usize,
    k: usize,
    theta0: f64,
    compliance: f64,
    lambda: f64,
    store_lambda: impl FnOnce(&mut WorldState, f64),
) {
    let inv_mass_i = world.inv_mass(i);
    let inv_mass_j = world.inv_mass(j);
    let inv_mass_k = world.inv_mass(k);

    if inv_mass_i <= 0.0 && inv_mass_j <= 0.0 && inv_mass_k <= 0.0 {
        log::trace!("angle ({i},{j},{k}): all three particles pinned, skipping");
        return;
    }

    let p_i = world.position(i);
    let p_j = world.position(j);
    let p_k = world.position(k);

    let e1 = p_i - p_j;
    let e2 = p_k - p_j;
    let len1 = e1.magnitude();
    let len2 = e2.magnitude();

    if len1 < EPS || len2 < EPS {
        log::trace!("angle ({i},{j},{k}): degenerate zero-length edge, skipping");
        return;
    }

    let current_angle = angle_between(e1, e2);
    let c = wrap_angle(current_angle - theta0);

    let grad_i = Vec2::new(-e1.y / len1, e1.x / len1);
    let grad_k = Vec2::new(e2.y / len2, -e2.x / len2);
    let grad_j = -(grad_i + grad_k);

    let w = inv_mass_i * grad_i.magnitude_squared()
        + inv_mass_j * grad_j.magnitude_squared()
        + inv_mass_k * grad_k.magnitude_squared();

    if w < EPS {
        log::trace!("angle ({i},{j},{k}): zero generalized inverse mass, skipping");
        return;
    }

    let Some(dlambda) = delta_lambda(lambda, c, compliance, w, dt) else {
        log::trace!("angle ({i},{j},{k}): near-zero denominator, skipping");
        return;
    };

    if inv_mass_i > 0.0 {
        let corr = grad_i * (inv_mass_i * dlambda);
        world.pos_x[i] += corr.x;
        world.pos_y[i] += corr.y;
    }
    if inv_mass_j > 0.0 {
        let corr = grad_j * (inv_mass_j * dlambda);
        world.pos_x[j] += corr.x;
        world.pos_y[j] += corr.y;
    }
    if inv_mass_k > 0.0 {
        let corr = grad_k * (inv_mass_k * dlambda);
        world.pos_x[k] += corr.x;
        world.pos_y[k] += corr.y;
    }

    store_lambda(world, dlambda);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_angle_corner_relaxes_toward_target() {
        let mut world = WorldState::new();
        let i = world.add_particle(1.0, 0.3, 0.0, 0.0, 1.0, 0.0);
        let j = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let k = world.add_particle(0.0, 1.0, 0.0, 0.0, 1.0, 0.0);
        world.add_angle_constraint(i, j, k, std::f64::consts::FRAC_PI_2, 0.0);

        let dt = 1.0 / 60.0;
        let before = angle_between(world.position(i) - world.position(j), world.position(k) - world.position(j));
        for _ in 0..30 {
            world.reset_lambdas();
            project(&mut world, dt);
        }
        let after = angle_between(world.position(i) - world.position(j), world.position(k) - world.position(j));

        let target = std::f64::consts::FRAC_PI_2;
        assert!((after - target).abs() < (before - target).abs());
    }
}
