//! Revolute joint projection: anchor equality, angular limits, and a bounded angular motor.
//!
//! The anchor and limit sub-constraints are ordinary rigid (zero-compliance) XPBD positional
//! constraints. The motor is the one exception in this kernel: it drives relative angular
//! *velocity* directly, clamped by `max_motor_torque * dt`, the same bounded-impulse idiom used
//! for motors in most 2-D engines, since a positional drive toward a moving target angle has no
//! stable rest state to define a Lagrange multiplier against.

use vek::Vec2;

use crate::vecmath::wrap_angle;
use crate::world::WorldState;

use super::delta_lambda;

const EPS: f64 = 1e-9;

/// Project every revolute joint once, in insertion order: anchor, then limits, then motor.
pub fn project(world: &mut WorldState, dt: f64) {
    puffin::profile_function!();

    for idx in 0..world.joints.len() {
        solve_anchor(world, dt, idx);
        solve_limits(world, dt, idx);
        solve_motor(world, dt, idx);
    }
}

fn solve_anchor(world: &mut WorldState, dt: f64, idx: usize) {
    let joint = world.joints[idx];
    let a = world.rigid_bodies[joint.body_a];
    let b = world.rigid_bodies[joint.body_b];

    let offset_a = a.rotate(joint.anchor_a);
    let offset_b = b.rotate(joint.anchor_b);
    let world_a = Vec2::new(a.x, a.y) + offset_a;
    let world_b = Vec2::new(b.x, b.y) + offset_b;
    let delta = world_a - world_b;

    let mut lambda = joint.lambda_point;
    for (axis, component) in [(Vec2::unit_x(), delta.x), (Vec2::unit_y(), delta.y)] {
        let w = a.generalized_inverse_mass(offset_a, axis) + b.generalized_inverse_mass(offset_b, axis);
        if w < EPS {
            log::trace!("joint {idx}: zero generalized inverse mass on anchor axis, skipping");
            continue;
        }
        let lambda_axis = axis.dot(lambda);
        let Some(dlambda) = delta_lambda(lambda_axis, component, 0.0, w, dt) else {
            log::trace!("joint {idx}: near-zero denominator on anchor axis, skipping");
            continue;
        };

        let impulse = axis * dlambda;
        world.rigid_bodies[joint.body_a].apply_positional_impulse(impulse, offset_a, 1.0);
        world.rigid_bodies[joint.body_b].apply_positional_impulse(impulse, offset_b, -1.0);
        lambda += axis * dlambda;
    }
    world.joints[idx].lambda_point = lambda;
}

fn solve_limits(world: &mut WorldState, dt: f64, idx: usize) {
    let joint = world.joints[idx];
    if !joint.enable_limits {
        log::trace!("joint {idx}: limits disabled, skipping");
        return;
    }

    let a = world.rigid_bodies[joint.body_a];
    let b = world.rigid_bodies[joint.body_b];
    let relative = wrap_angle(b.angle - a.angle - joint.reference_angle);

    let c = if relative < joint.lower_limit {
        relative - joint.lower_limit
    } else if relative > joint.upper_limit {
        relative - joint.upper_limit
    } else {
        log::trace!("joint {idx}: relative angle inside limit range, skipping");
        return;
    };

    let w = a.inverse_inertia() + b.inverse_inertia();
    if w < EPS {
        log::trace!("joint {idx}: zero inverse inertia on limit, skipping");
        return;
    }

    let Some(dlambda) = delta_lambda(joint.lambda_limit, c, 0.0, w, dt) else {
        log::trace!("joint {idx}: near-zero denominator on limit, skipping");
        return;
    };

    world.rigid_bodies[joint.body_a].angle -= a.inverse_inertia() * dlambda;
    world.rigid_bodies[joint.body_b].angle += b.inverse_inertia() * dlambda;
    world.joints[idx].lambda_limit += dlambda;
}

fn solve_motor(world: &mut WorldState, dt: f64, idx: usize) {
    let joint = world.joints[idx];
    if !joint.enable_motor {
        log::trace!("joint {idx}: motor disabled, skipping");
        return;
    }

    let a = world.rigid_bodies[joint.body_a];
    let b = world.rigid_bodies[joint.body_b];
    let w = a.inverse_inertia() + b.inverse_inertia();
    if w < EPS {
        log::trace!("joint {idx}: zero inverse inertia on motor, skipping");
        return;
    }

    let relative_vel = b.angular_vel - a.angular_vel;
    let max_impulse = joint.max_motor_torque * dt;
    let impulse = ((joint.motor_speed - relative_vel) / w).clamp(-max_impulse, max_impulse);
    if impulse.abs() < EPS {
        log::trace!("joint {idx}: motor impulse vanished, skipping");
        return;
    }

    world.rigid_bodies[joint.body_a].angular_vel -= a.inverse_inertia() * impulse;
    world.rigid_bodies[joint.body_b].angular_vel += b.inverse_inertia() * impulse;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::RigidBodyGeom;

    fn dummy_body(world: &mut WorldState, x: f64, y: f64, inv_mass: f64, inv_inertia: f64) -> usize {
        world.add_rigid_body(
            x,
            y,
            0.0,
            inv_mass,
            inv_inertia,
            &[RigidBodyGeom {
                local_x: 0.0,
                local_y: 0.0,
                radius: 0.1,
            }],
        )
    }

    #[test]
    fn anchor_constraint_pulls_separated_bodies_together() {
        let mut world = WorldState::new();
        let a = dummy_body(&mut world, 0.0, 0.0, 0.0, 0.0);
        let b = dummy_body(&mut world, 2.0, 0.0, 1.0, 1.0);
        world.add_revolute_joint(
            a,
            b,
            Vec2::zero(),
            Vec2::zero(),
            0.0,
            false,
            0.0,
            0.0,
            false,
            0.0,
            0.0,
        );

        let dt = 1.0 / 60.0;
        for _ in 0..60 {
            world.reset_lambdas();
            project(&mut world, dt);
        }

        let gap = (world.rigid_bodies[a].x - world.rigid_bodies[b].x).abs();
        assert!(gap < 1e-3, "gap={gap}");
    }

    #[test]
    fn motor_drives_relative_angular_velocity_toward_target_within_torque_budget() {
        let mut world = WorldState::new();
        let a = dummy_body(&mut world, 0.0, 0.0, 0.0, 0.0);
        let b = dummy_body(&mut world, 0.0, 0.0, 1.0, 1.0);
        world.add_revolute_joint(
            a,
            b,
            Vec2::zero(),
            Vec2::zero(),
            0.0,
            false,
            0.0,
            0.0,
            true,
            1.0,
            1_000.0,
        );

        let dt = 1.0 / 60.0;
        solve_motor(&mut world, dt, 0);

        let relative_vel = world.rigid_bodies[b].angular_vel - world.rigid_bodies[a].angular_vel;
        assert!((relative_vel - 1.0).abs() < 1e-6);
    }

    #[test]
    fn limits_are_inactive_while_inside_range() {
        let mut world = WorldState::new();
        let a = dummy_body(&mut world, 0.0, 0.0, 0.0, 0.0);
        let b = dummy_body(&mut world, 0.0, 0.0, 1.0, 1.0);
        world.add_revolute_joint(
            a,
            b,
            Vec2::zero(),
            Vec2::zero(),
            0.0,
            true,
            -1.0,
            1.0,
            false,
            0.0,
            0.0,
        );

        solve_limits(&mut world, 1.0 / 60.0, 0);

        assert_eq!(world.rigid_bodies[b].angle, 0.0);
    }
}
