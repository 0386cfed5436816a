//! Symplectic-Euler predictor for particles and rigid bodies.
//!
//! Mirrors `RigidBody::integrate`/`solve` from the reference physics module: apply forces to
//! velocity, then velocity to position, in that order, so the scheme stays symplectic.

use vek::Vec2;

use crate::world::WorldState;

/// Apply gravity to every non-pinned particle's force accumulator.
pub fn apply_gravity(world: &mut WorldState, gravity: Vec2<f64>) {
    for id in 0..world.particle_count() {
        let inv_mass = world.inv_mass(id);
        if inv_mass <= 0.0 {
            continue;
        }
        // F += m * g, and mass = 1 / inv_mass.
        world.add_force(id, gravity / inv_mass);
    }
}

/// Integrate velocity from the force accumulator, then position from velocity, for every
/// particle. Does not clear forces; call [`WorldState::clear_forces`] separately once per
/// substep.
pub fn integrate_particles(world: &mut WorldState, dt: f64) {
    for id in 0..world.particle_count() {
        let inv_mass = world.inv_mass(id);
        if inv_mass <= 0.0 {
            continue;
        }
        let force = Vec2::new(world.force_x[id], world.force_y[id]);
        world.vel_x[id] += dt * force.x * inv_mass;
        world.vel_y[id] += dt * force.y * inv_mass;
        world.pos_x[id] += dt * world.vel_x[id];
        world.pos_y[id] += dt * world.vel_y[id];
    }
}

/// Multiply every non-pinned particle's velocity by `max(0, 1 - damping * dt)`.
pub fn apply_linear_damping(world: &mut WorldState, damping: f64, dt: f64) {
    let factor = (1.0 - damping * dt).max(0.0);
    for id in 0..world.particle_count() {
        if world.inv_mass(id) <= 0.0 {
            continue;
        }
        world.vel_x[id] *= factor;
        world.vel_y[id] *= factor;
    }
}

/// Integrate gravity + velocity + position for every non-static rigid body.
pub fn integrate_rigid_bodies(world: &mut WorldState, gravity: Vec2<f64>, dt: f64) {
    for rb in world.rigid_bodies.iter_mut() {
        if rb.inv_mass <= 0.0 {
            continue;
        }
        rb.vel_x += dt * gravity.x;
        rb.vel_y += dt * gravity.y;
        rb.x += dt * rb.vel_x;
        rb.y += dt * rb.vel_y;
        rb.angle += dt * rb.angular_vel;
    }
}

/// Multiply every non-static rigid body's linear and angular velocity by the damping factor.
pub fn apply_rigid_body_damping(world: &mut WorldState, damping: f64, dt: f64) {
    let factor = (1.0 - damping * dt).max(0.0);
    for rb in world.rigid_bodies.iter_mut() {
        if rb.inv_mass <= 0.0 {
            continue;
        }
        rb.vel_x *= factor;
        rb.vel_y *= factor;
        rb.angular_vel *= factor;
    }
}

/// Blend integrated velocity with the positional-delta velocity implied by constraint
/// projection, recovering the canonical XPBD velocity update.
///
/// `beta = 1.0` fully replaces the integrated velocity with `(pos_after - pos_before) / dt`
/// (standard XPBD); `beta = 0.0` disables stabilization and keeps the integrated velocity.
pub fn stabilize_velocity(
    integrated: Vec2<f64>,
    pos_before: Vec2<f64>,
    pos_after: Vec2<f64>,
    dt: f64,
    beta: f64,
) -> Vec2<f64> {
    if dt <= 0.0 {
        return integrated;
    }
    let positional = (pos_after - pos_before) / dt;
    positional * beta + integrated * (1.0 - beta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_fall_matches_symplectic_euler_drift() {
        let mut world = WorldState::new();
        let id = world.add_particle(0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let gravity = Vec2::new(0.0, -9.81);
        let dt = 1.0 / 60.0;

        for _ in 0..60 {
            apply_gravity(&mut world, gravity);
            integrate_particles(&mut world, dt);
            world.clear_forces();
        }

        let pos_y = world.position(id).y;
        let expected = -9.81 / 2.0;
        assert!(
            (pos_y - expected).abs() < expected.abs() * 0.02,
            "pos_y={pos_y} expected~={expected}"
        );
    }

    #[test]
    fn pinned_particle_never_moves() {
        let mut world = WorldState::new();
        let pinned = world.add_particle(1.0, 2.0, 0.0, 0.0, 0.0, 0.0);
        apply_gravity(&mut world, Vec2::new(0.0, -9.81));
        integrate_particles(&mut world, 1.0 / 60.0);
        assert_eq!(world.position(pinned), Vec2::new(1.0, 2.0));
        assert_eq!(world.velocity(pinned), Vec2::zero());
    }
}
