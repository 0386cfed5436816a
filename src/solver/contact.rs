//! One-shot inequality contact projection.
//!
//! Contacts are regenerated fresh by [`crate::collision::detect_contacts`] every substep (never
//! carried over), so this is a hard (zero-compliance), push-only constraint: `C = separation`,
//! active only while `C < 0`, with the accumulated multiplier clamped to stay non-negative so a
//! contact never pulls two bodies back together.

use crate::world::WorldState;

use super::delta_lambda;

const EPS: f64 = 1e-9;

/// Project every contact in [`WorldState::contacts`] and [`WorldState::particle_contacts`] once,
/// each in detection order.
pub fn project(world: &mut WorldState, dt: f64) {
    puffin::profile_function!();

    project_rigid_bodies(world, dt);
    project_particles(world, dt);
}

fn project_rigid_bodies(world: &mut WorldState, dt: f64) {
    for idx in 0..world.contacts.len() {
        let contact = world.contacts[idx];
        if contact.separation >= 0.0 {
            log::trace!("contact {idx}: non-penetrating, skipping");
            continue;
        }

        let body_id = contact.body;
        let normal = contact.normal;
        let world_offset = world.rigid_bodies[body_id].rotate(contact.anchor);
        let w = world.rigid_bodies[body_id].generalized_inverse_mass(world_offset, normal);
        if w < EPS {
            log::trace!("contact {idx}: zero generalized inverse mass, skipping");
            continue;
        }

        let Some(mut dlambda) = delta_lambda(contact.lambda, contact.separation, 0.0, w, dt) else {
            log::trace!("contact {idx}: near-zero denominator, skipping");
            continue;
        };

        let new_lambda = (contact.lambda + dlambda).max(0.0);
        dlambda = new_lambda - contact.lambda;
        if dlambda.abs() < EPS {
            log::trace!("contact {idx}: clamped impulse vanished, skipping");
            continue;
        }

        world.contacts[idx].lambda = new_lambda;
        let impulse = normal * dlambda;
        world.rigid_bodies[body_id].apply_positional_impulse(impulse, world_offset, 1.0);
    }
}

/// Same push-only projection as [`project_rigid_bodies`], but against a bare particle: no
/// rotation or anchor offset, so the generalized inverse mass is just the particle's own scalar
/// `invMass`.
fn project_particles(world: &mut WorldState, dt: f64) {
    for idx in 0..world.particle_contacts.len() {
        let contact = world.particle_contacts[idx];
        if contact.separation >= 0.0 {
            log::trace!("particle contact {idx}: non-penetrating, skipping");
            continue;
        }

        let particle = contact.particle;
        let normal = contact.normal;
        let w = world.inv_mass(particle);
        if w < EPS {
            log::trace!("particle contact {idx}: zero inverse mass, skipping");
            continue;
        }

        let Some(mut dlambda) = delta_lambda(contact.lambda, contact.separation, 0.0, w, dt) else {
            log::trace!("particle contact {idx}: near-zero denominator, skipping");
            continue;
        };

        let new_lambda = (contact.lambda + dlambda).max(0.0);
        dlambda = new_lambda - contact.lambda;
        if dlambda.abs() < EPS {
            log::trace!("particle contact {idx}: clamped impulse vanished, skipping");
            continue;
        }

        world.particle_contacts[idx].lambda = new_lambda;
        let correction = normal * (dlambda * w);
        world.pos_x[particle] += correction.x;
        world.pos_y[particle] += correction.y;
    }
}
