//! Bilateral distance (rod) constraint projection.
//!
//! `C = |p_i - p_j| - restLength`. Gradient is the unit vector from `j` to `i`.

use vek::Vec2;

use crate::world::WorldState;

use super::delta_lambda;

const EPS: f64 = 1e-9;

/// Project every rod constraint once (one Gauss-Seidel sweep), in insertion order.
pub fn project(world: &mut WorldState, dt: f64) {
    puffin::profile_function!();

    for idx in 0..world.rods.len() {
        let rod = world.rods[idx];
        let inv_mass_i = world.inv_mass(rod.i);
        let inv_mass_j = world.inv_mass(rod.j);

        if inv_mass_i <= 0.0 && inv_mass_j <= 0.0 {
            log::trace!("rod {idx}: both particles pinned, skipping");
            continue;
        }

        let p_i = world.position(rod.i);
        let p_j = world.position(rod.j);
        let delta = p_i - p_j;
        let len = delta.magnitude();

        if len < EPS {
            log::trace!("rod {idx}: degenerate zero-length edge, skipping");
            continue;
        }

        let normal: Vec2<f64> = delta / len;
        let w = inv_mass_i + inv_mass_j;
        if w < EPS {
            continue;
        }

        let c = len - rod.rest_length;
        let Some(dlambda) = delta_lambda(rod.lambda, c, rod.compliance, w, dt) else {
            continue;
        };

        world.rods[idx].lambda += dlambda;

        if inv_mass_i > 0.0 {
            let correction = normal * (inv_mass_i * dlambda);
            world.pos_x[rod.i] += correction.x;
            world.pos_y[rod.i] += correction.y;
        }
        if inv_mass_j > 0.0 {
            let correction = normal * (-inv_mass_j * dlambda);
            world.pos_x[rod.j] += correction.x;
            world.pos_y[rod.j] += correction.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rigid_rod_converges_to_rest_length() {
        let mut world = WorldState::new();
        let a = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let b = world.add_particle(2.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        world.add_rod(a, b, 1.0, 0.0);

        let dt = 1.0 / 60.0;
        for _ in 0..20 {
            world.reset_lambdas();
            project(&mut world, dt);
        }

        let dist = (world.position(a) - world.position(b)).magnitude();
        assert!((dist - 1.0).abs() < 1e-3, "dist={dist}");
    }

    #[test]
    fn round_trip_rest_length_equals_current_distance() {
        let mut world = WorldState::new();
        let a = world.add_particle(0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let b = world.add_particle(3.0, 4.0, 0.0, 0.0, 1.0, 0.0);
        let dist = (world.position(a) - world.position(b)).magnitude();
        world.add_rod(a, b, dist, 0.0);

        project(&mut world, 1.0 / 60.0);

        let new_dist = (world.position(a) - world.position(b)).magnitude();
        assert!((new_dist - dist).abs() < 1e-6);
    }

    #[test]
    fn pinned_particles_are_untouched() {
        let mut world = WorldState::new();
        let a = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let b = world.add_particle(1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        world.add_rod(a, b, 0.5, 0.0);

        project(&mut world, 1.0 / 60.0);

        assert_eq!(world.position(a), Vec2::new(0.0, 0.0));
        assert_eq!(world.position(b), Vec2::new(1.0, 0.0));
    }
}
