//! Externally driven angle (motor) constraint projection.
//!
//! Identical math to [`crate::solver::angle`], but the rest angle is a per-step `target` that the
//! caller reassigns via [`crate::world::WorldState::set_motor_target`] rather than a fixed
//! `theta0`.

use crate::world::WorldState;

use super::angle::project_one;

/// Project every motor-angle constraint once, in insertion order.
pub fn project(world: &mut WorldState, dt: f64) {
    puffin::profile_function!();

    for idx in 0..world.motors.len() {
        let m = world.motors[idx];
        project_one(
            world,
            dt,
            m.i,
            m.j,
            m.k,
            m.target,
            m.compliance,
            m.lambda,
            |w, dl| w.motors[idx].lambda += dl,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vecmath::angle_between;

    #[test]
    fn motor_drives_angle_toward_reassigned_target() {
        let mut world = WorldState::new();
        let i = world.add_particle(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let j = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let k = world.add_particle(0.0, 1.0, 0.0, 0.0, 1.0, 0.0);
        let motor = world.add_motor_angle(i, j, k, std::f64::consts::FRAC_PI_2, 0.0);

        let new_target = std::f64::consts::FRAC_PI_4;
        world.set_motor_target(motor, new_target);

        let dt = 1.0 / 60.0;
        let before = angle_between(world.position(i) - world.position(j), world.position(k) - world.position(j));
        for _ in 0..30 {
            world.reset_lambdas();
            project(&mut world, dt);
        }
        let after = angle_between(world.position(i) - world.position(j), world.position(k) - world.position(j));

        assert!((after - new_target).abs() < (before - new_target).abs());
    }
}
