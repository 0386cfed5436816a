//! XPBD constraint projection.
//!
//! Per-substep protocol: [`crate::world::WorldState::reset_lambdas`] once, then for
//! `iterations` Gauss-Seidel passes project rods -> angles -> motors -> contacts -> joints, in
//! that fixed order (and in insertion order within each family). Numeric degeneracies are
//! silently skipped; no solver routine ever fails.

pub mod angle;
pub mod contact;
pub mod joint;
pub mod motor;
pub mod rod;

use crate::world::WorldState;

/// The shared XPBD Lagrange-multiplier update.
///
/// `w` is the inverse-mass-weighted squared gradient norm summed over every particle/body the
/// constraint touches. Returns `None` (skip this constraint) when `w + compliance/dt^2` is too
/// small to divide by safely.
#[inline]
pub(crate) fn delta_lambda(lambda: f64, c: f64, compliance: f64, w: f64, dt: f64) -> Option<f64> {
    let alpha_tilde = compliance / (dt * dt);
    let denom = w + alpha_tilde;
    if denom <= f64::EPSILON {
        return None;
    }
    Some(-(c + alpha_tilde * lambda) / denom)
}

/// Run one Gauss-Seidel pass over every constraint family, in canonical order.
pub fn project_all(world: &mut WorldState, dt: f64) {
    puffin::profile_function!();

    rod::project(world, dt);
    angle::project(world, dt);
    motor::project(world, dt);
    contact::project(world, dt);
    joint::project(world, dt);
}
