//! Tick orchestration: predict, project, stabilize, damp.

use serde::{Deserialize, Serialize};
use vek::Vec2;

use crate::collision::detect_contacts;
use crate::integrator::{
    apply_gravity, apply_linear_damping, apply_rigid_body_damping, integrate_particles,
    integrate_rigid_bodies, stabilize_velocity,
};
use crate::solver::project_all;
use crate::world::WorldState;

/// Per-tick configuration. `dt` is the outer (full-frame) timestep; the solver internally runs
/// `substeps` XPBD substeps of `dt / substeps` each, and `iterations` Gauss-Seidel passes per
/// substep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepperConfig {
    /// Full-frame timestep, seconds.
    pub dt: f64,
    /// XPBD substeps per tick.
    pub substeps: u32,
    /// Gauss-Seidel iterations per substep.
    pub iterations: u32,
    /// Gravitational acceleration.
    pub gravity: Vec2<f64>,
    /// Linear (and angular, for rigid bodies) damping factor.
    pub damping: f64,
    /// Velocity-stabilization blend, `[0, 1]`. `1.0` is canonical XPBD; `0.0` disables it.
    pub stabilization_beta: f64,
    /// Contact-detection margin passed to [`crate::collision::detect_contacts`].
    pub contact_margin: f64,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            substeps: 4,
            iterations: 8,
            gravity: Vec2::new(0.0, -9.81),
            damping: 0.0,
            stabilization_beta: 1.0,
            contact_margin: 0.0,
        }
    }
}

/// Stateless driver over a [`WorldState`]; holds no data of its own beyond configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stepper;

impl Stepper {
    /// Advance `world` by one full tick per `cfg`.
    pub fn step(&self, world: &mut WorldState, cfg: &StepperConfig) {
        puffin::profile_function!();

        let sub_dt = cfg.dt / cfg.substeps.max(1) as f64;

        for _ in 0..cfg.substeps {
            world.reset_lambdas();

            apply_gravity(world, cfg.gravity);

            let prev_bodies: Vec<(Vec2<f64>, f64)> = world
                .rigid_bodies
                .iter()
                .map(|rb| (Vec2::new(rb.x, rb.y), rb.angle))
                .collect();
            let prev_positions: Vec<Vec2<f64>> =
                (0..world.particle_count()).map(|id| world.position(id)).collect();

            integrate_particles(world, sub_dt);
            integrate_rigid_bodies(world, cfg.gravity, sub_dt);
            world.clear_forces();

            let (contacts, particle_contacts) = detect_contacts(world, cfg.contact_margin);
            world.set_contacts(contacts);
            world.set_particle_contacts(particle_contacts);

            for _ in 0..cfg.iterations {
                project_all(world, sub_dt);
            }

            if cfg.stabilization_beta > 0.0 {
                stabilize_particles(world, &prev_positions, sub_dt, cfg.stabilization_beta);
                stabilize_rigid_bodies(world, &prev_bodies, sub_dt, cfg.stabilization_beta);
            }

            apply_linear_damping(world, cfg.damping, sub_dt);
            apply_rigid_body_damping(world, cfg.damping, sub_dt);
        }
    }
}

fn stabilize_particles(world: &mut WorldState, prev_positions: &[Vec2<f64>], dt: f64, beta: f64) {
    for id in 0..world.particle_count() {
        if world.inv_mass(id) <= 0.0 {
            continue;
        }
        let integrated = world.velocity(id);
        let pos_after = world.position(id);
        let stabilized = stabilize_velocity(integrated, prev_positions[id], pos_after, dt, beta);
        world.vel_x[id] = stabilized.x;
        world.vel_y[id] = stabilized.y;
    }
}

fn stabilize_rigid_bodies(world: &mut WorldState, prev: &[(Vec2<f64>, f64)], dt: f64, beta: f64) {
    for (rb, (prev_pos, _prev_angle)) in world.rigid_bodies.iter_mut().zip(prev.iter()) {
        if rb.inv_mass <= 0.0 && rb.inv_inertia <= 0.0 {
            continue;
        }
        let integrated = Vec2::new(rb.vel_x, rb.vel_y);
        let pos_after = Vec2::new(rb.x, rb.y);
        let stabilized = stabilize_velocity(integrated, *prev_pos, pos_after, dt, beta);
        rb.vel_x = stabilized.x;
        rb.vel_y = stabilized.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_pendulum_settles_near_rest_length_after_one_second() {
        let mut world = WorldState::new();
        let a = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let b = world.add_particle(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        world.add_rod(a, b, 1.0, 0.0);

        let stepper = Stepper;
        let cfg = StepperConfig {
            dt: 1.0 / 60.0,
            substeps: 4,
            iterations: 8,
            gravity: Vec2::new(0.0, -9.81),
            damping: 0.0,
            stabilization_beta: 1.0,
            contact_margin: 0.0,
        };

        for _ in 0..60 {
            stepper.step(&mut world, &cfg);
        }

        let dist = (world.position(a) - world.position(b)).magnitude();
        assert!((dist - 1.0).abs() < 1e-3, "dist={dist}");
        assert!(world.position(b).y < 0.0, "pendulum should swing toward -Y");
    }

    #[test]
    fn rigid_l_corner_holds_its_angle_under_load() {
        use crate::vecmath::angle_between;

        let mut world = WorldState::new();
        let i = world.add_particle(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let j = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let k = world.add_particle(0.0, 1.0, 0.0, 0.0, 1.0, 0.0);
        world.add_rod(i, j, 1.0, 0.0);
        world.add_rod(j, k, 1.0, 0.0);
        world.add_angle_constraint_as_rod(i, k, std::f64::consts::FRAC_PI_2, 1.0, 1.0, 0.0);

        let stepper = Stepper;
        let cfg = StepperConfig {
            dt: 1.0 / 60.0,
            substeps: 4,
            iterations: 8,
            gravity: Vec2::zero(),
            damping: 0.1,
            stabilization_beta: 1.0,
            contact_margin: 0.0,
        };

        for _ in 0..100 {
            world.add_force(i, Vec2::new(-0.2, 0.5));
            stepper.step(&mut world, &cfg);
        }

        let angle = angle_between(world.position(i) - world.position(j), world.position(k) - world.position(j));
        let degrees_off = (angle - std::f64::consts::FRAC_PI_2).to_degrees().abs();
        assert!(degrees_off < 1.0, "degrees_off={degrees_off}");
    }

    #[test]
    fn contact_pushes_particle_radius_outside_static_circle() {
        let mut world = WorldState::new();
        let particle = world.add_particle(0.0, 0.5, 0.0, 0.0, 1.0, 0.1);
        world.add_circle_collider(Vec2::zero(), 1.0);

        let (_, particle_contacts) = detect_contacts(&world, 0.0);
        world.set_particle_contacts(particle_contacts);

        crate::solver::contact::project(&mut world, 1.0 / 60.0);

        assert!(world.position(particle).y >= 1.1 - 1e-5);
    }

    #[test]
    fn particle_already_outside_collider_is_left_unmoved() {
        let mut world = WorldState::new();
        let particle = world.add_particle(0.0, 2.0, 0.0, 0.0, 1.0, 0.1);
        world.add_circle_collider(Vec2::zero(), 1.0);

        let (_, particle_contacts) = detect_contacts(&world, 0.0);
        world.set_particle_contacts(particle_contacts);

        crate::solver::contact::project(&mut world, 1.0 / 60.0);

        assert_eq!(world.position(particle).y, 2.0);
    }
}
