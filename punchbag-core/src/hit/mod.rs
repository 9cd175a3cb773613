//! Hit reactions: per-bone spring-damper offsets kicked by impacts.
//!
//! Offsets are Euler angles (XYZ) applied on top of each bone's rest rotation.
//! Each frame integrates `v += (-k·o - c·v)·dt; o += v·dt` per axis; once an
//! impact's hold time has passed and a bone is close enough to rest it snaps
//! back exactly. Past `settle_after` seconds without an impact every bone is
//! snapped regardless.

use glam::{EulerRot, Quat, Vec3};
use rand::Rng;

use crate::config::schema::SpringConfig;
use crate::rig::Skeleton;

/// Per-axis weight for arm impulses. X is forward tilt, which makes hands
/// swing through the body, so it is kept small.
const ARM_AXIS_WEIGHT: Vec3 = Vec3::new(0.25, 1.15, 1.1);
const ARM_BOOST: f32 = 1.25;

#[derive(Debug, Clone, Copy)]
pub struct SpringParams {
    pub stiffness: f32,
    pub damping: f32,
}

impl Default for SpringParams {
    fn default() -> Self { Self::from(SpringConfig::default()) }
}

impl From<SpringConfig> for SpringParams {
    fn from(cfg: SpringConfig) -> Self { Self { stiffness: cfg.stiffness, damping: cfg.damping() } }
}

#[derive(Debug, Clone)]
pub struct HitBone {
    pub index: usize,
    pub rest: Quat,
    pub arm: bool,
    pub offset: Vec3,
    pub velocity: Vec3,
}

impl HitBone {
    pub fn rotation(&self) -> Quat {
        if self.offset == Vec3::ZERO {
            return self.rest;
        }
        self.rest * Quat::from_euler(EulerRot::XYZ, self.offset.x, self.offset.y, self.offset.z)
    }

    pub fn is_at_rest(&self) -> bool { self.offset == Vec3::ZERO && self.velocity == Vec3::ZERO }
}

#[derive(Debug, Clone)]
pub struct HitRig {
    bones: Vec<HitBone>,
    params: SpringParams,
    cfg: SpringConfig,
    hold: f32,
    /// Seconds since the last impact.
    quiet: f32,
}

impl HitRig {
    pub fn new(skeleton: &Skeleton, candidates: &[usize], cfg: SpringConfig) -> Self {
        let bones = candidates
            .iter()
            .map(|&index| HitBone {
                index,
                rest: skeleton.rest(index),
                arm: skeleton.tags(index).arm,
                offset: Vec3::ZERO,
                velocity: Vec3::ZERO,
            })
            .collect();
        Self { bones, params: cfg.into(), cfg, hold: 0.0, quiet: 0.0 }
    }

    pub fn bones(&self) -> &[HitBone] { &self.bones }
    pub fn params(&self) -> SpringParams { self.params }

    /// True while the latest impact still counts as pending.
    pub fn is_holding(&self) -> bool { self.hold > 0.0 }

    pub fn is_settled(&self) -> bool { !self.is_holding() && self.bones.iter().all(HitBone::is_at_rest) }

    /// Kicks every candidate with a random angular velocity.
    ///
    /// Bones earlier in the candidate list (torso, head) get larger kicks;
    /// arm bones twist and swing sideways instead of tilting forward.
    pub fn trigger<R: Rng>(&mut self, rng: &mut R) {
        self.hold = self.cfg.hold;
        self.quiet = 0.0;
        let n = self.bones.len().max(1) as f32;
        for (i, bone) in self.bones.iter_mut().enumerate() {
            let boost = if bone.arm { ARM_BOOST } else { 1.0 };
            let w = (1.0 - i as f32 / n) * boost;
            let dir = if rng.gen_bool(0.8) { 1.0 } else { -1.0 };
            let kick = if bone.arm {
                let sign_y = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
                let sign_z = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
                Vec3::new(
                    rng.gen_range(0.10..0.22) * w * dir * 7.0,
                    rng.gen_range(0.45..0.90) * sign_y * w * 7.5,
                    rng.gen_range(0.35..0.90) * sign_z * w * 7.5,
                ) * ARM_AXIS_WEIGHT
            } else {
                Vec3::new(
                    rng.gen_range(0.55..1.0) * w * dir * 7.5,
                    (rng.gen::<f32>() - 0.5) * 0.45 * w * 7.5,
                    (rng.gen::<f32>() - 0.5) * 0.55 * w * 7.5,
                )
            };
            bone.velocity += kick;
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.hold = (self.hold - dt).max(0.0);
        self.quiet += dt;
        let SpringParams { stiffness: k, damping: c } = self.params;
        let holding = self.is_holding();
        let overdue = !holding && self.quiet >= self.cfg.settle_after;
        for bone in &mut self.bones {
            if bone.is_at_rest() { continue; }
            bone.velocity += (-k * bone.offset - c * bone.velocity) * dt;
            bone.offset += bone.velocity * dt;
            let close = bone.offset.length_squared() < self.cfg.settle_offset_sq
                && bone.velocity.length_squared() < self.cfg.settle_velocity_sq;
            if overdue || (!holding && close) {
                bone.offset = Vec3::ZERO;
                bone.velocity = Vec3::ZERO;
            }
        }
    }

    /// Layers hit offsets on top of whatever rotation the pose already holds.
    pub fn apply(&self, pose: &mut [Quat]) {
        for bone in &self.bones {
            if bone.offset != Vec3::ZERO {
                let o = bone.offset;
                pose[bone.index] *= Quat::from_euler(EulerRot::XYZ, o.x, o.y, o.z);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rig() -> (Skeleton, HitRig) {
        let s = Skeleton::from_names(&["Hips", "Spine", "Neck", "Head", "LeftArm", "LeftHand", "RightArm"]);
        let c = s.candidates(6);
        let rig = HitRig::new(&s, &c, SpringConfig::default());
        (s, rig)
    }

    #[test]
    fn default_spring_is_critically_damped() {
        let p = SpringParams::default();
        assert!((p.damping * p.damping - 4.0 * p.stiffness).abs() < 1e-3);
    }

    #[test]
    fn fresh_rig_is_settled_and_idle_updates_do_nothing() {
        let (_, mut rig) = rig();
        assert!(rig.is_settled());
        rig.update(1.0 / 60.0);
        assert!(rig.bones().iter().all(|b| b.rotation() == b.rest));
    }

    #[test]
    fn impact_moves_bones_then_they_settle_exactly() {
        let (s, mut rig) = rig();
        let mut rng = StdRng::seed_from_u64(42);
        rig.trigger(&mut rng);
        assert!(!rig.is_settled());
        assert!(rig.bones().iter().all(|b| b.velocity != Vec3::ZERO));

        let dt = 1.0 / 60.0;
        for _ in 0..6 { rig.update(dt); }
        assert!(rig.bones().iter().any(|b| b.offset.length() > 0.01));

        for _ in 0..(60 * 3) { rig.update(dt); }
        assert!(rig.is_settled());
        for b in rig.bones() {
            assert_eq!(b.offset, Vec3::ZERO);
            assert_eq!(b.velocity, Vec3::ZERO);
            assert_eq!(b.rotation(), s.rest(b.index));
        }
    }

    #[test]
    fn every_seed_is_at_rest_just_after_one_quiet_second() {
        let s = Skeleton::from_names(&[
            "Hips", "Spine", "Spine1", "Neck", "Head", "LeftShoulder", "LeftArm", "LeftForeArm",
            "RightShoulder", "RightArm",
        ]);
        let c = s.candidates(6);
        let dt = 1.0 / 60.0;
        for seed in 0..200 {
            let mut rig = HitRig::new(&s, &c, SpringConfig::default());
            rig.trigger(&mut StdRng::seed_from_u64(seed));
            for _ in 0..61 { rig.update(dt); }
            assert!(rig.is_settled(), "seed {seed} still moving");
            assert!(rig.bones().iter().all(|b| b.rotation() == b.rest));
        }
    }

    #[test]
    fn a_new_impact_restarts_the_quiet_clock() {
        let (_, mut rig) = rig();
        let mut rng = StdRng::seed_from_u64(8);
        rig.trigger(&mut rng);
        for _ in 0..50 { rig.update(1.0 / 60.0); }
        rig.trigger(&mut rng);
        for _ in 0..30 { rig.update(1.0 / 60.0); }
        assert!(!rig.is_settled());
    }

    #[test]
    fn no_snap_while_impact_is_pending() {
        let (_, mut rig) = rig();
        let mut rng = StdRng::seed_from_u64(3);
        rig.trigger(&mut rng);
        rig.update(0.1);
        assert!(rig.is_holding());
        assert!(!rig.is_settled());
        rig.update(0.4);
        assert!(!rig.is_holding());
    }

    #[test]
    fn arm_kicks_favour_twist_over_tilt() {
        let s = Skeleton::from_names(&["root", "LeftArm"]);
        let mut rng = StdRng::seed_from_u64(11);
        let mut tilt = 0.0f32;
        let mut twist = 0.0f32;
        for _ in 0..50 {
            let mut rig = HitRig::new(&s, &[1], SpringConfig::default());
            rig.trigger(&mut rng);
            let v = rig.bones()[0].velocity;
            tilt += v.x.abs();
            twist += v.y.abs() + v.z.abs();
        }
        assert!(tilt * 5.0 < twist);
    }

    #[test]
    fn apply_layers_on_top_of_the_base_pose() {
        let (s, mut rig) = rig();
        let mut pose = s.rest_pose();
        rig.apply(&mut pose);
        assert_eq!(pose, s.rest_pose());

        rig.trigger(&mut StdRng::seed_from_u64(5));
        rig.update(1.0 / 30.0);
        rig.apply(&mut pose);
        let moved = rig.bones()[0].index;
        assert_ne!(pose[moved], s.rest(moved));
        assert_eq!(pose[0], s.rest(0));
    }
}
