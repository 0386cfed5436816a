//! Structure-of-arrays entity store.
//!
//! Every entity collection is an append-only `Vec` indexed by `usize`; indices are stable for
//! the lifetime of a [`WorldState`] (worlds are rebuilt for new trials rather than having
//! entities removed mid-run).

use vek::Vec2;

/// Index of a particle within a [`WorldState`].
pub type ParticleId = usize;
/// Index of a rod constraint.
pub type RodId = usize;
/// Index of an angle constraint.
pub type AngleId = usize;
/// Index of a motor-angle constraint.
pub type MotorId = usize;
/// Index of a circle collider.
pub type CircleColliderId = usize;
/// Index of a capsule collider.
pub type CapsuleColliderId = usize;
/// Index of an OBB collider.
pub type ObbColliderId = usize;
/// Index of a rigid body.
pub type RigidBodyId = usize;
/// Index of a revolute joint.
pub type JointId = usize;

/// Bilateral distance constraint between two particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rod {
    /// First particle.
    pub i: ParticleId,
    /// Second particle.
    pub j: ParticleId,
    /// Target distance between `i` and `j`.
    pub rest_length: f64,
    /// Inverse stiffness (0 = rigid).
    pub compliance: f64,
    /// Accumulated Lagrange multiplier, reset every substep.
    pub lambda: f64,
}

/// Angle constraint at vertex `j` between edges `j -> i` and `j -> k`.
///
/// Retained for soft/bendy articulation only; rigid corners should be encoded as a diagonal rod
/// via [`WorldState::add_angle_constraint_as_rod`] instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleConstraint {
    /// Edge endpoint.
    pub i: ParticleId,
    /// Vertex.
    pub j: ParticleId,
    /// Edge endpoint.
    pub k: ParticleId,
    /// Rest angle, radians, wrapped to `[-pi, pi]`.
    pub theta0: f64,
    /// Inverse stiffness.
    pub compliance: f64,
    /// Accumulated Lagrange multiplier, reset every substep.
    pub lambda: f64,
}

/// Externally driven angle constraint; identical shape to [`AngleConstraint`] but `target` may be
/// reassigned between steps (never between substeps of the same step).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorAngle {
    /// Edge endpoint.
    pub i: ParticleId,
    /// Vertex.
    pub j: ParticleId,
    /// Edge endpoint.
    pub k: ParticleId,
    /// Target angle, radians.
    pub target: f64,
    /// Inverse stiffness.
    pub compliance: f64,
    /// Accumulated Lagrange multiplier, reset every substep.
    pub lambda: f64,
}

/// Static circle collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleCollider {
    /// Center.
    pub center: Vec2<f64>,
    /// Radius.
    pub radius: f64,
}

/// Static capsule collider: a segment inflated by `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleCollider {
    /// Center of the segment.
    pub center: Vec2<f64>,
    /// Unit axis of the segment.
    pub axis: Vec2<f64>,
    /// Half-length of the segment.
    pub half_length: f64,
    /// Inflation radius.
    pub radius: f64,
}

/// Static oriented-box collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObbCollider {
    /// Center.
    pub center: Vec2<f64>,
    /// Unit local x-axis.
    pub ux: Vec2<f64>,
    /// Half-extent along `ux`.
    pub half_extent_x: f64,
    /// Half-extent along the perpendicular axis.
    pub half_extent_y: f64,
}

/// A circle owned by a rigid body, in the body's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyGeom {
    /// Local x offset from the body's origin.
    pub local_x: f64,
    /// Local y offset from the body's origin.
    pub local_y: f64,
    /// Circle radius.
    pub radius: f64,
}

/// A rigid body: position, orientation, and the geometry run it owns in the shared geom pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    /// World position.
    pub x: f64,
    /// World position.
    pub y: f64,
    /// Orientation, radians.
    pub angle: f64,
    /// Linear velocity.
    pub vel_x: f64,
    /// Linear velocity.
    pub vel_y: f64,
    /// Angular velocity.
    pub angular_vel: f64,
    /// Inverse mass (0 = static).
    pub inv_mass: f64,
    /// Inverse rotational inertia (0 = static / infinite inertia).
    pub inv_inertia: f64,
    /// Start index into the shared [`RigidBodyGeom`] pool.
    pub geom_start: usize,
    /// Number of geoms this body owns.
    pub geom_count: usize,
}

impl RigidBody {
    /// Transform a local-space point owned by this body into world space.
    pub fn local_to_world(&self, local: Vec2<f64>) -> Vec2<f64> {
        self.x_y() + self.rotate(local)
    }

    /// Rotate a local-space offset by this body's orientation, without translating it.
    pub fn rotate(&self, local: Vec2<f64>) -> Vec2<f64> {
        let (sin, cos) = self.angle.sin_cos();
        Vec2::new(cos * local.x - sin * local.y, sin * local.x + cos * local.y)
    }

    fn x_y(&self) -> Vec2<f64> {
        Vec2::new(self.x, self.y)
    }

    /// Inverse of the rotational inertia; `0.0` for a fixed body.
    pub fn inverse_inertia(&self) -> f64 {
        self.inv_inertia
    }

    /// Generalized inverse mass seen by a positional impulse applied at `world_offset` (a vector
    /// from the body's center of mass, already rotated into world space) along `normal`.
    pub fn generalized_inverse_mass(&self, world_offset: Vec2<f64>, normal: Vec2<f64>) -> f64 {
        let perp_dot = world_offset.x * normal.y - world_offset.y * normal.x;
        self.inv_mass + self.inv_inertia * perp_dot * perp_dot
    }

    /// Apply a positional impulse at `world_offset`, updating both position and orientation.
    /// `sign` is `1.0` for this body or `-1.0` for the other body in a two-body constraint.
    pub fn apply_positional_impulse(&mut self, impulse: Vec2<f64>, world_offset: Vec2<f64>, sign: f64) {
        if self.inv_mass <= 0.0 && self.inv_inertia <= 0.0 {
            return;
        }
        self.x += sign * impulse.x * self.inv_mass;
        self.y += sign * impulse.y * self.inv_mass;
        let perp_dot = world_offset.x * impulse.y - world_offset.y * impulse.x;
        self.angle += sign * self.inv_inertia * perp_dot;
    }
}

/// A one-shot contact between a rigid body's circle geometry and a static collider, regenerated
/// fresh by narrow-phase detection every substep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// The rigid body being pushed out of penetration.
    pub body: RigidBodyId,
    /// Contact point, in the body's local frame (relative to its center of mass).
    pub anchor: Vec2<f64>,
    /// Unit vector pointing from the static collider surface toward the body; the push direction.
    pub normal: Vec2<f64>,
    /// Signed separation at detection time; negative means penetrating.
    pub separation: f64,
    /// Accumulated Lagrange multiplier, reset every substep and never carried across detections.
    pub lambda: f64,
}

/// A one-shot contact between a bare [`Particle`](ParticleId)'s own inflation radius and a static
/// collider, regenerated fresh by narrow-phase detection every substep.
///
/// Unlike [`Contact`], there is no body rotation or anchor offset to account for: the particle
/// *is* the point, so the generalized inverse mass collapses to its scalar `invMass`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleContact {
    /// The particle being pushed out of penetration.
    pub particle: ParticleId,
    /// Unit vector pointing from the static collider surface toward the particle.
    pub normal: Vec2<f64>,
    /// Signed separation at detection time (particle's own SDF query inflated by its radius);
    /// negative means penetrating.
    pub separation: f64,
    /// Accumulated Lagrange multiplier, reset every substep and never carried across detections.
    pub lambda: f64,
}

/// Revolute joint connecting two rigid bodies at local anchor points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevoluteJoint {
    /// First body.
    pub body_a: RigidBodyId,
    /// Second body.
    pub body_b: RigidBodyId,
    /// Anchor on `body_a`, local space.
    pub anchor_a: Vec2<f64>,
    /// Anchor on `body_b`, local space.
    pub anchor_b: Vec2<f64>,
    /// Relative angle at rest.
    pub reference_angle: f64,
    /// Whether the angular limit is enforced.
    pub enable_limits: bool,
    /// Lower angular limit, radians.
    pub lower_limit: f64,
    /// Upper angular limit, radians.
    pub upper_limit: f64,
    /// Whether the angular motor is enabled.
    pub enable_motor: bool,
    /// Target relative angular velocity.
    pub motor_speed: f64,
    /// Maximum motor torque.
    pub max_motor_torque: f64,
    /// Accumulated positional Lagrange multiplier (anchor equality), reset every substep.
    pub lambda_point: Vec2<f64>,
    /// Accumulated angular-limit Lagrange multiplier, reset every substep.
    pub lambda_limit: f64,
}

/// All simulation state for one XPBD world.
///
/// Append-only: entities are created via the `add_*` methods and never destroyed within a run.
/// Rebuild a fresh `WorldState` for a new trial.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub(crate) pos_x: Vec<f64>,
    pub(crate) pos_y: Vec<f64>,
    pub(crate) vel_x: Vec<f64>,
    pub(crate) vel_y: Vec<f64>,
    pub(crate) force_x: Vec<f64>,
    pub(crate) force_y: Vec<f64>,
    pub(crate) inv_mass: Vec<f64>,
    pub(crate) radius: Vec<f64>,

    /// Rod (bilateral distance) constraints.
    pub rods: Vec<Rod>,
    /// Soft-articulation angle constraints.
    pub angles: Vec<AngleConstraint>,
    /// Externally-driven motor-angle constraints.
    pub motors: Vec<MotorAngle>,

    /// Static circle colliders.
    pub circle_colliders: Vec<CircleCollider>,
    /// Static capsule colliders.
    pub capsule_colliders: Vec<CapsuleCollider>,
    /// Static OBB colliders.
    pub obb_colliders: Vec<ObbCollider>,

    /// Rigid bodies.
    pub rigid_bodies: Vec<RigidBody>,
    /// Shared pool of rigid-body-local circle geometry.
    pub rigid_body_geoms: Vec<RigidBodyGeom>,

    /// Revolute joints.
    pub joints: Vec<RevoluteJoint>,

    /// Rigid-body contacts produced by the most recent narrow-phase pass. Replaced wholesale,
    /// never merged, once per substep.
    pub contacts: Vec<Contact>,
    /// Particle contacts produced by the most recent narrow-phase pass. Replaced wholesale, never
    /// merged, once per substep.
    pub particle_contacts: Vec<ParticleContact>,
}

impl WorldState {
    /// Construct an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a particle. `mass <= 0.0` creates a pinned/static particle (`inv_mass = 0`).
    pub fn add_particle(
        &mut self,
        x: f64,
        y: f64,
        vx: f64,
        vy: f64,
        mass: f64,
        radius: f64,
    ) -> ParticleId {
        let id = self.pos_x.len();
        self.pos_x.push(x);
        self.pos_y.push(y);
        self.vel_x.push(vx);
        self.vel_y.push(vy);
        self.force_x.push(0.0);
        self.force_y.push(0.0);
        self.inv_mass.push(if mass > 0.0 { 1.0 / mass } else { 0.0 });
        self.radius.push(radius);
        id
    }

    /// Number of particles currently in the world.
    pub fn particle_count(&self) -> usize {
        self.pos_x.len()
    }

    /// Position of a particle.
    pub fn position(&self, id: ParticleId) -> Vec2<f64> {
        Vec2::new(self.pos_x[id], self.pos_y[id])
    }

    /// Velocity of a particle.
    pub fn velocity(&self, id: ParticleId) -> Vec2<f64> {
        Vec2::new(self.vel_x[id], self.vel_y[id])
    }

    /// Inverse mass of a particle.
    pub fn inv_mass(&self, id: ParticleId) -> f64 {
        self.inv_mass[id]
    }

    /// Collision radius of a particle.
    pub fn radius(&self, id: ParticleId) -> f64 {
        self.radius[id]
    }

    /// Append a gravity/external force accumulator contribution to a particle.
    pub fn add_force(&mut self, id: ParticleId, force: Vec2<f64>) {
        self.force_x[id] += force.x;
        self.force_y[id] += force.y;
    }

    /// Zero every particle's force accumulator. Called once per substep after integration.
    pub fn clear_forces(&mut self) {
        self.force_x.iter_mut().for_each(|f| *f = 0.0);
        self.force_y.iter_mut().for_each(|f| *f = 0.0);
    }

    /// Append a bilateral distance (rod) constraint. `i` and `j` must differ.
    pub fn add_rod(&mut self, i: ParticleId, j: ParticleId, rest_length: f64, compliance: f64) -> RodId {
        debug_assert_ne!(i, j, "rod constraint requires two distinct particles");
        let id = self.rods.len();
        self.rods.push(Rod {
            i,
            j,
            rest_length,
            compliance,
            lambda: 0.0,
        });
        id
    }

    /// Append a soft angle constraint at vertex `j`.
    pub fn add_angle_constraint(
        &mut self,
        i: ParticleId,
        j: ParticleId,
        k: ParticleId,
        theta0: f64,
        compliance: f64,
    ) -> AngleId {
        let id = self.angles.len();
        self.angles.push(AngleConstraint {
            i,
            j,
            k,
            theta0: crate::vecmath::wrap_angle(theta0),
            compliance,
            lambda: 0.0,
        });
        id
    }

    /// Append a motor-angle constraint at vertex `j`.
    pub fn add_motor_angle(
        &mut self,
        i: ParticleId,
        j: ParticleId,
        k: ParticleId,
        target: f64,
        compliance: f64,
    ) -> MotorId {
        let id = self.motors.len();
        self.motors.push(MotorAngle {
            i,
            j,
            k,
            target: crate::vecmath::wrap_angle(target),
            compliance,
            lambda: 0.0,
        });
        id
    }

    /// Reassign a motor's target angle. Must only be called between steps, never between the
    /// substeps of a single [`crate::stepper::Stepper::step`] call.
    pub fn set_motor_target(&mut self, motor: MotorId, target: f64) {
        self.motors[motor].target = crate::vecmath::wrap_angle(target);
    }

    /// Encode a rigid corner at vertex `j` as a diagonal rod between `i` and `k`, using the law of
    /// cosines: `d = sqrt(len1^2 + len2^2 - 2*len1*len2*cos(target_angle))`.
    ///
    /// This is the preferred way to rigidize a corner; a direct 3-point angle constraint with
    /// stiff compliance over-constrains distance rods and tends to diverge.
    pub fn add_angle_constraint_as_rod(
        &mut self,
        i: ParticleId,
        k: ParticleId,
        target_angle: f64,
        len1: f64,
        len2: f64,
        compliance: f64,
    ) -> RodId {
        let d_sq = len1 * len1 + len2 * len2 - 2.0 * len1 * len2 * target_angle.cos();
        let d = d_sq.max(0.0).sqrt();
        self.add_rod(i, k, d, compliance)
    }

    /// Append a static circle collider.
    pub fn add_circle_collider(&mut self, center: Vec2<f64>, radius: f64) -> CircleColliderId {
        let id = self.circle_colliders.len();
        self.circle_colliders.push(CircleCollider { center, radius });
        id
    }

    /// Append a static capsule collider. `axis` must be a unit vector.
    pub fn add_capsule_collider(
        &mut self,
        center: Vec2<f64>,
        axis: Vec2<f64>,
        half_length: f64,
        radius: f64,
    ) -> CapsuleColliderId {
        let id = self.capsule_colliders.len();
        self.capsule_colliders.push(CapsuleCollider {
            center,
            axis,
            half_length,
            radius,
        });
        id
    }

    /// Append a static OBB collider. `ux` must be a unit vector.
    pub fn add_obb_collider(
        &mut self,
        center: Vec2<f64>,
        ux: Vec2<f64>,
        half_extent_x: f64,
        half_extent_y: f64,
    ) -> ObbColliderId {
        let id = self.obb_colliders.len();
        self.obb_colliders.push(ObbCollider {
            center,
            ux,
            half_extent_x,
            half_extent_y,
        });
        id
    }

    /// Append a rigid body, taking ownership of a contiguous run of local-space circle geoms.
    pub fn add_rigid_body(
        &mut self,
        x: f64,
        y: f64,
        angle: f64,
        inv_mass: f64,
        inv_inertia: f64,
        geoms: &[RigidBodyGeom],
    ) -> RigidBodyId {
        let geom_start = self.rigid_body_geoms.len();
        self.rigid_body_geoms.extend_from_slice(geoms);

        let id = self.rigid_bodies.len();
        self.rigid_bodies.push(RigidBody {
            x,
            y,
            angle,
            vel_x: 0.0,
            vel_y: 0.0,
            angular_vel: 0.0,
            inv_mass,
            inv_inertia,
            geom_start,
            geom_count: geoms.len(),
        });
        id
    }

    /// The geoms owned by a rigid body.
    pub fn rigid_body_geoms(&self, body: RigidBodyId) -> &[RigidBodyGeom] {
        let rb = &self.rigid_bodies[body];
        &self.rigid_body_geoms[rb.geom_start..rb.geom_start + rb.geom_count]
    }

    /// Append a revolute joint between two rigid bodies.
    #[allow(clippy::too_many_arguments)]
    pub fn add_revolute_joint(
        &mut self,
        body_a: RigidBodyId,
        body_b: RigidBodyId,
        anchor_a: Vec2<f64>,
        anchor_b: Vec2<f64>,
        reference_angle: f64,
        enable_limits: bool,
        lower_limit: f64,
        upper_limit: f64,
        enable_motor: bool,
        motor_speed: f64,
        max_motor_torque: f64,
    ) -> JointId {
        let id = self.joints.len();
        self.joints.push(RevoluteJoint {
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            reference_angle,
            enable_limits,
            lower_limit,
            upper_limit,
            enable_motor,
            motor_speed,
            max_motor_torque,
            lambda_point: Vec2::zero(),
            lambda_limit: 0.0,
        });
        id
    }

    /// Reset every constraint's accumulated Lagrange multiplier. Called once per substep.
    pub fn reset_lambdas(&mut self) {
        self.rods.iter_mut().for_each(|c| c.lambda = 0.0);
        self.angles.iter_mut().for_each(|c| c.lambda = 0.0);
        self.motors.iter_mut().for_each(|c| c.lambda = 0.0);
        self.contacts.iter_mut().for_each(|c| c.lambda = 0.0);
        self.particle_contacts.iter_mut().for_each(|c| c.lambda = 0.0);
        self.joints.iter_mut().for_each(|c| {
            c.lambda_point = Vec2::zero();
            c.lambda_limit = 0.0;
        });
    }

    /// Replace the rigid-body contact set with the result of this substep's narrow phase.
    pub fn set_contacts(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
    }

    /// Replace the particle contact set with the result of this substep's narrow phase.
    pub fn set_particle_contacts(&mut self, contacts: Vec<ParticleContact>) {
        self.particle_contacts = contacts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_angle_constraint_as_rod_matches_law_of_cosines() {
        let mut world = WorldState::new();
        let i = world.add_particle(1.0, 0.0, 0.0, 0.0, 1.0, 0.1);
        let j = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.1);
        let k = world.add_particle(0.0, 1.0, 0.0, 0.0, 1.0, 0.1);

        let current_angle =
            crate::vecmath::angle_between(world.position(i) - world.position(j), world.position(k) - world.position(j));

        let rod_id = world.add_angle_constraint_as_rod(i, k, current_angle, 1.0, 1.0, 0.0);
        let rod = world.rods[rod_id];
        let actual_dist = (world.position(i) - world.position(k)).magnitude();
        assert!((rod.rest_length - actual_dist).abs() < 1e-6);
    }

    #[test]
    fn pinned_particle_has_zero_inv_mass() {
        let mut world = WorldState::new();
        let pinned = world.add_particle(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(world.inv_mass(pinned), 0.0);
        let mobile = world.add_particle(0.0, 0.0, 0.0, 0.0, 2.0, 0.0);
        assert_eq!(world.inv_mass(mobile), 0.5);
    }
}
