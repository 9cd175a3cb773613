//! Idle dance: phase-staggered sinusoidal sway per bone.

use glam::{EulerRot, Quat, Vec3};
use std::f32::consts::TAU;

use crate::config::schema::DanceConfig;
use crate::rig::{Side, Skeleton};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DanceStyle {
    /// Side-to-side sway with a little pitch and roll.
    Spine,
    /// Follows the body at a smaller amplitude.
    Head,
    /// Up/down swing plus mirrored spread and twist.
    Arm,
    Other,
}

#[derive(Debug, Clone)]
pub struct DanceBone {
    pub index: usize,
    pub rest: Quat,
    pub style: DanceStyle,
    pub side: Side,
    pub phase: f32,
    pub amplitude: f32,
    pub speed: f32,
}

impl DanceBone {
    /// Euler offset (XYZ) at accumulated dance time `time`.
    pub fn offset_at(&self, time: f32) -> Vec3 {
        let a = self.amplitude;
        let t = time * self.speed + self.phase;
        match self.style {
            DanceStyle::Spine => Vec3::new(
                (t * 0.7).sin() * a * 0.3,
                t.sin() * a * 0.8,
                (t * 0.5).cos() * a * 0.2,
            ),
            DanceStyle::Head => Vec3::new((t * 0.6).sin() * a * 0.2, (t * 0.9).sin() * a * 0.6, 0.0),
            DanceStyle::Arm => {
                let p = self.phase;
                Vec3::new(
                    (t + p).sin() * a * 1.2,
                    (t * 0.8 + p).cos() * a * self.side.sign() * 0.6,
                    (t * 1.1 + p).sin() * a * 0.4,
                )
            }
            DanceStyle::Other => Vec3::new(0.0, (t * 0.7).sin() * a * 0.5, 0.0),
        }
    }

    pub fn rotation_at(&self, time: f32) -> Quat {
        let o = self.offset_at(time);
        self.rest * Quat::from_euler(EulerRot::XYZ, o.x, o.y, o.z)
    }
}

#[derive(Debug, Clone)]
pub struct DanceRig {
    bones: Vec<DanceBone>,
    time: f32,
}

impl DanceRig {
    pub fn new(skeleton: &Skeleton, candidates: &[usize], cfg: &DanceConfig) -> Self {
        let n = candidates.len().max(1) as f32;
        let bones = candidates
            .iter()
            .enumerate()
            .map(|(i, &index)| {
                let tags = skeleton.tags(index);
                let style = if tags.spine {
                    DanceStyle::Spine
                } else if tags.head {
                    DanceStyle::Head
                } else if tags.arm {
                    DanceStyle::Arm
                } else {
                    DanceStyle::Other
                };
                let amplitude = if tags.arm {
                    cfg.arm_amplitude
                } else if tags.head {
                    cfg.head_amplitude
                } else if tags.spine {
                    cfg.spine_amplitude
                } else {
                    cfg.other_amplitude
                };
                let speed = if tags.arm {
                    cfg.arm_speed
                } else if tags.head {
                    cfg.head_speed
                } else {
                    cfg.other_speed
                };
                DanceBone {
                    index,
                    rest: skeleton.rest(index),
                    style,
                    side: tags.side,
                    phase: i as f32 / n * TAU,
                    amplitude,
                    speed,
                }
            })
            .collect();
        Self { bones, time: 0.0 }
    }

    pub fn bones(&self) -> &[DanceBone] { &self.bones }
    pub fn time(&self) -> f32 { self.time }

    pub fn advance(&mut self, dt: f32) { self.time += dt; }

    /// Back to the first beat.
    pub fn restart(&mut self) { self.time = 0.0; }

    pub fn apply(&self, pose: &mut [Quat]) {
        for bone in &self.bones {
            pose[bone.index] = bone.rotation_at(self.time);
        }
    }
}
