//! Per-frame driver for the character's procedural rigs.

use glam::{EulerRot, Quat, Vec3};
use rand::Rng;
use tracing::debug;

use crate::config::schema::ToyConfig;
use crate::dance::DanceRig;
use crate::hit::HitRig;
use crate::rig::clips::ClipLibrary;
use crate::rig::{build_rigs, Skeleton};

/// Root placement of the character in the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterTransform {
    pub position: Vec3,
    /// Euler angles, XYZ.
    pub rotation: Vec3,
    pub scale: f32,
    pub visible: bool,
}

impl Default for CharacterTransform {
    fn default() -> Self { Self { position: Vec3::ZERO, rotation: Vec3::ZERO, scale: 1.0, visible: true } }
}

impl CharacterTransform {
    /// Back to the origin at unit scale; visibility is left alone.
    pub fn reset(&mut self) { *self = Self { visible: self.visible, ..Self::default() }; }

    fn orientation(&self) -> Quat { Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z) }

    pub fn to_world(&self, local: Vec3) -> Vec3 { self.position + self.orientation() * (local * self.scale) }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.orientation().inverse() * (world - self.position) / self.scale.max(1e-4)
    }

    /// Ground point under the character.
    pub fn feet(&self) -> Vec3 { Vec3::new(self.position.x, 0.0, self.position.z) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionState {
    Dancing,
    /// Dance paused after a hit; resumes when `cooldown` runs out.
    Reacting { cooldown: f32 },
    /// Paused from outside (the flush sequence) until `resume`.
    Suspended,
}

/// What a hit ended up playing.
#[derive(Debug, Clone, PartialEq)]
pub enum HitReaction {
    Clip(String),
    Procedural,
    /// No skeleton data and no clips: the hit is visual-only.
    None,
}

#[derive(Debug, Clone)]
pub struct CharacterMotion {
    rest: Vec<Quat>,
    hit: Option<HitRig>,
    dance: Option<DanceRig>,
    clips: ClipLibrary,
    state: MotionState,
    cooldown: f32,
    pose: Vec<Quat>,
}

impl CharacterMotion {
    pub fn new(skeleton: &Skeleton, cfg: &ToyConfig) -> Self {
        let rigs = build_rigs(skeleton, cfg);
        let rest = skeleton.rest_pose();
        Self {
            pose: rest.clone(),
            rest,
            hit: rigs.hit,
            dance: rigs.dance,
            clips: ClipLibrary::from_names(skeleton.clip_names()),
            state: MotionState::Dancing,
            cooldown: cfg.dance.cooldown,
        }
    }

    pub fn state(&self) -> MotionState { self.state }
    pub fn hit_rig(&self) -> Option<&HitRig> { self.hit.as_ref() }
    pub fn dance_rig(&self) -> Option<&DanceRig> { self.dance.as_ref() }
    pub fn clips(&self) -> &ClipLibrary { &self.clips }
    pub fn is_dancing(&self) -> bool { self.state == MotionState::Dancing }

    /// Local rotation for every skeleton bone after the last `update`.
    pub fn pose(&self) -> &[Quat] { &self.pose }

    /// Reacts to an impact. Dancing stops immediately.
    ///
    /// Baked hit clips take precedence over the procedural springs, the
    /// same way the dance clip would; the springs still run when both exist
    /// so the pose never freezes.
    pub fn hit<R: Rng>(&mut self, rng: &mut R) -> HitReaction {
        if self.state != MotionState::Suspended {
            self.state = MotionState::Reacting { cooldown: self.cooldown };
        }
        if let Some(rig) = self.hit.as_mut() {
            rig.trigger(rng);
        }
        match self.clips.pick_hit(rng) {
            Some(name) => {
                debug!(clip = name, "hit clip");
                HitReaction::Clip(name.to_string())
            }
            None if self.hit.is_some() => HitReaction::Procedural,
            None => HitReaction::None,
        }
    }

    pub fn suspend(&mut self) { self.state = MotionState::Suspended; }

    pub fn resume(&mut self) {
        if self.state == MotionState::Suspended {
            self.state = MotionState::Dancing;
        }
    }

    pub fn update(&mut self, dt: f32) {
        if let MotionState::Reacting { cooldown } = self.state {
            let left = cooldown - dt;
            self.state = if left > 0.0 { MotionState::Reacting { cooldown: left } } else { MotionState::Dancing };
        }
        if let Some(rig) = self.hit.as_mut() {
            rig.update(dt);
        }
        if self.state == MotionState::Dancing {
            if let Some(dance) = self.dance.as_mut() {
                dance.advance(dt);
            }
        }
        self.compose();
    }

    fn compose(&mut self) {
        self.pose.copy_from_slice(&self.rest);
        if self.state == MotionState::Dancing {
            if let Some(dance) = &self.dance {
                dance.apply(&mut self.pose);
            }
        }
        if let Some(rig) = &self.hit {
            rig.apply(&mut self.pose);
        }
    }
}
