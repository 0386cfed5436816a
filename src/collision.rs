//! Particle/rigid-body-vs-static-collider narrow phase.
//!
//! Every rigid body's circle geoms, and every bare particle's own inflation radius, are tested
//! against every static collider. A circle of radius `r` against a primitive is the primitive's
//! own signed-distance field, offset by `-r`; the primitives' SDFs already return `(phi, outward
//! normal)` at a point, so this module never duplicates the geometry math in [`crate::vecmath`].

use crate::vecmath::{capsule_sdf, circle_sdf, obb_sdf};
use crate::world::{Contact, ParticleContact, WorldState};

/// Run narrow-phase detection for every rigid body and every non-pinned particle against every
/// static collider, returning one [`Contact`]/[`ParticleContact`] per penetrating (or
/// near-touching, within `margin`) pair.
///
/// Call once per substep and feed the results to [`WorldState::set_contacts`] and
/// [`WorldState::set_particle_contacts`] before [`crate::solver::contact::project`].
pub fn detect_contacts(world: &WorldState, margin: f64) -> (Vec<Contact>, Vec<ParticleContact>) {
    puffin::profile_function!();

    let contacts = detect_rigid_body_contacts(world, margin);
    let particle_contacts = detect_particle_contacts(world, margin);
    (contacts, particle_contacts)
}

fn detect_rigid_body_contacts(world: &WorldState, margin: f64) -> Vec<Contact> {
    let mut contacts = Vec::new();

    for (body_id, body) in world.rigid_bodies.iter().enumerate() {
        for geom in world.rigid_body_geoms(body_id) {
            let local = vek::Vec2::new(geom.local_x, geom.local_y);
            let world_point = body.local_to_world(local);

            for collider in &world.circle_colliders {
                let (phi, normal) = circle_sdf(world_point, collider.center, collider.radius);
                push_body_if_penetrating(&mut contacts, body_id, local, normal, phi - geom.radius, margin);
            }
            for collider in &world.capsule_colliders {
                let (phi, normal) = capsule_sdf(
                    world_point,
                    collider.center,
                    collider.axis,
                    collider.half_length,
                    collider.radius,
                );
                push_body_if_penetrating(&mut contacts, body_id, local, normal, phi - geom.radius, margin);
            }
            for collider in &world.obb_colliders {
                let (phi, normal) = obb_sdf(
                    world_point,
                    collider.center,
                    collider.ux,
                    collider.half_extent_x,
                    collider.half_extent_y,
                );
                push_body_if_penetrating(&mut contacts, body_id, local, normal, phi - geom.radius, margin);
            }
        }
    }

    contacts
}

/// Detect contacts for bare particles against static colliders, per the particle's own `radius`.
/// Pinned particles (`invMass == 0`) are skipped: they can never be pushed, so detecting contacts
/// for them would only do wasted work.
fn detect_particle_contacts(world: &WorldState, margin: f64) -> Vec<ParticleContact> {
    let mut contacts = Vec::new();

    for id in 0..world.particle_count() {
        if world.inv_mass(id) <= 0.0 {
            continue;
        }
        let point = world.position(id);
        let radius = world.radius(id);

        for collider in &world.circle_colliders {
            let (phi, normal) = circle_sdf(point, collider.center, collider.radius);
            push_particle_if_penetrating(&mut contacts, id, normal, phi - radius, margin);
        }
        for collider in &world.capsule_colliders {
            let (phi, normal) = capsule_sdf(
                point,
                collider.center,
                collider.axis,
                collider.half_length,
                collider.radius,
            );
            push_particle_if_penetrating(&mut contacts, id, normal, phi - radius, margin);
        }
        for collider in &world.obb_colliders {
            let (phi, normal) = obb_sdf(
                point,
                collider.center,
                collider.ux,
                collider.half_extent_x,
                collider.half_extent_y,
            );
            push_particle_if_penetrating(&mut contacts, id, normal, phi - radius, margin);
        }
    }

    contacts
}

fn push_body_if_penetrating(
    contacts: &mut Vec<Contact>,
    body: usize,
    anchor: vek::Vec2<f64>,
    normal: vek::Vec2<f64>,
    separation: f64,
    margin: f64,
) {
    if separation > margin {
        return;
    }
    contacts.push(Contact {
        body,
        anchor,
        normal,
        separation,
        lambda: 0.0,
    });
}

fn push_particle_if_penetrating(
    contacts: &mut Vec<ParticleContact>,
    particle: usize,
    normal: vek::Vec2<f64>,
    separation: f64,
    margin: f64,
) {
    if separation > margin {
        return;
    }
    contacts.push(ParticleContact {
        particle,
        normal,
        separation,
        lambda: 0.0,
    });
}
