//! Plain-data, buffer-uploadable mirrors of constraint and collider types.
//!
//! Every struct here is `#[repr(C)]` with a field layout matching its [`crate::world`]
//! counterpart and derives `bytemuck::{Pod, Zeroable}`, so a `Vec<GPU*>` can be uploaded to a GPU
//! buffer with a plain byte copy. No kernel dispatch lives in this crate.

use bytemuck::{Pod, Zeroable};

use crate::world::{AngleConstraint, CapsuleCollider, CircleCollider, MotorAngle, ObbCollider, Rod, WorldState};

/// GPU mirror of [`Rod`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuRod {
    pub i: u32,
    pub j: u32,
    pub rest_length: f32,
    pub compliance: f32,
}

/// GPU mirror of [`AngleConstraint`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuAngle {
    pub i: u32,
    pub j: u32,
    pub k: u32,
    pub theta0: f32,
    pub compliance: f32,
}

/// GPU mirror of [`MotorAngle`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuMotorAngle {
    pub i: u32,
    pub j: u32,
    pub k: u32,
    pub target: f32,
    pub compliance: f32,
}

/// GPU mirror of [`CircleCollider`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuCircleCollider {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
}

/// GPU mirror of [`CapsuleCollider`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuCapsuleCollider {
    pub cx: f32,
    pub cy: f32,
    pub ux: f32,
    pub uy: f32,
    pub half_length: f32,
    pub radius: f32,
}

/// GPU mirror of [`ObbCollider`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuObbCollider {
    pub cx: f32,
    pub cy: f32,
    pub ux: f32,
    pub uy: f32,
    pub half_extent_x: f32,
    pub half_extent_y: f32,
}

impl From<Rod> for GpuRod {
    fn from(r: Rod) -> Self {
        Self {
            i: r.i as u32,
            j: r.j as u32,
            rest_length: r.rest_length as f32,
            compliance: r.compliance as f32,
        }
    }
}

impl From<AngleConstraint> for GpuAngle {
    fn from(a: AngleConstraint) -> Self {
        Self {
            i: a.i as u32,
            j: a.j as u32,
            k: a.k as u32,
            theta0: a.theta0 as f32,
            compliance: a.compliance as f32,
        }
    }
}

impl From<MotorAngle> for GpuMotorAngle {
    fn from(m: MotorAngle) -> Self {
        Self {
            i: m.i as u32,
            j: m.j as u32,
            k: m.k as u32,
            target: m.target as f32,
            compliance: m.compliance as f32,
        }
    }
}

impl From<CircleCollider> for GpuCircleCollider {
    fn from(c: CircleCollider) -> Self {
        Self {
            cx: c.center.x as f32,
            cy: c.center.y as f32,
            radius: c.radius as f32,
        }
    }
}

impl From<CapsuleCollider> for GpuCapsuleCollider {
    fn from(c: CapsuleCollider) -> Self {
        Self {
            cx: c.center.x as f32,
            cy: c.center.y as f32,
            ux: c.axis.x as f32,
            uy: c.axis.y as f32,
            half_length: c.half_length as f32,
            radius: c.radius as f32,
        }
    }
}

impl From<ObbCollider> for GpuObbCollider {
    fn from(o: ObbCollider) -> Self {
        Self {
            cx: o.center.x as f32,
            cy: o.center.y as f32,
            ux: o.ux.x as f32,
            uy: o.ux.y as f32,
            half_extent_x: o.half_extent_x as f32,
            half_extent_y: o.half_extent_y as f32,
        }
    }
}

/// Snapshot every blittable collection in `world` into GPU-ready buffers.
pub fn snapshot_buffers(world: &WorldState) -> GpuBuffers {
    GpuBuffers {
        rods: world.rods.iter().copied().map(GpuRod::from).collect(),
        angles: world.angles.iter().copied().map(GpuAngle::from).collect(),
        motors: world.motors.iter().copied().map(GpuMotorAngle::from).collect(),
        circle_colliders: world
            .circle_colliders
            .iter()
            .copied()
            .map(GpuCircleCollider::from)
            .collect(),
        capsule_colliders: world
            .capsule_colliders
            .iter()
            .copied()
            .map(GpuCapsuleCollider::from)
            .collect(),
        obb_colliders: world.obb_colliders.iter().copied().map(GpuObbCollider::from).collect(),
    }
}

/// A full set of GPU-ready mirror buffers for one [`WorldState`].
#[derive(Debug, Clone, Default)]
pub struct GpuBuffers {
    pub rods: Vec<GpuRod>,
    pub angles: Vec<GpuAngle>,
    pub motors: Vec<GpuMotorAngle>,
    pub circle_colliders: Vec<GpuCircleCollider>,
    pub capsule_colliders: Vec<GpuCapsuleCollider>,
    pub obb_colliders: Vec<GpuObbCollider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_rod_mirrors_cpu_fields() {
        let rod = Rod {
            i: 3,
            j: 7,
            rest_length: 1.5,
            compliance: 0.01,
            lambda: 99.0,
        };
        let gpu: GpuRod = rod.into();
        assert_eq!(gpu.i, 3);
        assert_eq!(gpu.j, 7);
        assert_eq!(gpu.rest_length, 1.5);
    }

    #[test]
    fn snapshot_buffers_preserves_counts() {
        let mut world = WorldState::new();
        let a = world.add_particle(0.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let b = world.add_particle(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        world.add_rod(a, b, 1.0, 0.0);
        world.add_circle_collider(vek::Vec2::zero(), 1.0);

        let buffers = snapshot_buffers(&world);
        assert_eq!(buffers.rods.len(), 1);
        assert_eq!(buffers.circle_colliders.len(), 1);
    }
}
