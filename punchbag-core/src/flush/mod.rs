//! Flush sequence: spin in place, get sucked down the drain, vanish, come back.
//!
//! Rotation speeds are tuned per 60 Hz frame and scaled by `dt * 60`.

use glam::Vec3;
use rand::Rng;
use tracing::{debug, info};

use crate::config::schema::FlushConfig;
use crate::fx::{EffectKind, EffectTimeline, FlushField};
use crate::motion::CharacterTransform;

/// Minimum character scale while being sucked away.
const MIN_SCALE: f32 = 0.02;
const SPIN_BURST_INTERVAL: f32 = 0.03;
const SUCK_BURST_INTERVAL: f32 = 0.02;
/// Particles left over after the character vanished are cleaned up this late.
const PARTICLE_CLEANUP_DELAY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlushPhase {
    Idle,
    /// Spinning in place; `p` runs 0→1 over the spin part of the animation.
    Spinning { p: f32 },
    /// Pulled toward the feet; `s` runs 0→1.
    Sucking { s: f32 },
    /// Fully drained, still counted as flushing.
    Gone,
    /// Invisible while the slogan plays.
    Hidden,
}

/// Edges the app reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushEvent {
    /// Character hidden and reset; stains should go, the slogan should drop.
    Vanished,
    /// Character visible again; dancing may resume.
    Returned,
}

#[derive(Debug, Clone)]
pub struct FlushSequence {
    cfg: FlushConfig,
    phase: FlushPhase,
    clock: f32,
    since_burst: f32,
    start: Vec3,
    feet: Vec3,
    swirl: f32,
    particles_cleared: bool,
}

impl FlushSequence {
    pub fn new(cfg: FlushConfig) -> Self {
        Self {
            cfg,
            phase: FlushPhase::Idle,
            clock: 0.0,
            since_burst: 0.0,
            start: Vec3::ZERO,
            feet: Vec3::ZERO,
            swirl: 0.0,
            particles_cleared: true,
        }
    }

    pub fn phase(&self) -> FlushPhase { self.phase }
    pub fn is_running(&self) -> bool { self.phase != FlushPhase::Idle }

    /// Swirl strength under the character, 0..1.
    pub fn swirl(&self) -> f32 { self.swirl }

    /// Drain point the character and droplets are pulled toward.
    pub fn drain(&self) -> Vec3 { self.feet }

    /// Starts a flush. Refused while one is already running.
    pub fn start(&mut self, body: &CharacterTransform, timeline: &mut EffectTimeline) -> bool {
        if self.is_running() {
            debug!("flush already running");
            return false;
        }
        timeline.clear_kind(EffectKind::Particle);
        timeline.clear_kind(EffectKind::Splash);
        self.phase = FlushPhase::Spinning { p: 0.0 };
        self.clock = 0.0;
        self.since_burst = 0.0;
        self.start = body.position;
        self.feet = body.feet();
        self.particles_cleared = false;
        info!("flush");
        true
    }

    pub fn update<R: Rng>(
        &mut self,
        dt: f32,
        body: &mut CharacterTransform,
        timeline: &mut EffectTimeline,
        rng: &mut R,
    ) -> Option<FlushEvent> {
        if !self.is_running() {
            return None;
        }
        self.clock += dt;
        match self.phase {
            FlushPhase::Spinning { .. } | FlushPhase::Sucking { .. } => {
                self.animate(dt, body, timeline, rng);
                None
            }
            FlushPhase::Gone => {
                if self.clock < self.cfg.gone_delay {
                    return None;
                }
                self.enter(FlushPhase::Hidden);
                body.reset();
                body.visible = false;
                self.swirl = 0.0;
                Some(FlushEvent::Vanished)
            }
            FlushPhase::Hidden => {
                if !self.particles_cleared && self.clock >= PARTICLE_CLEANUP_DELAY {
                    timeline.clear_kind(EffectKind::Particle);
                    timeline.clear_kind(EffectKind::Splash);
                    self.particles_cleared = true;
                }
                if self.clock < self.cfg.hidden {
                    return None;
                }
                self.enter(FlushPhase::Idle);
                body.visible = true;
                Some(FlushEvent::Returned)
            }
            FlushPhase::Idle => None,
        }
    }

    fn enter(&mut self, phase: FlushPhase) {
        debug!(?phase, "flush phase");
        self.phase = phase;
        self.clock = 0.0;
    }

    fn animate<R: Rng>(&mut self, dt: f32, body: &mut CharacterTransform, timeline: &mut EffectTimeline, rng: &mut R) {
        let duration = self.cfg.duration.max(1e-4);
        let split = self.cfg.spin_fraction.clamp(1e-4, 1.0 - 1e-4);
        let t = (self.clock / duration).min(1.0);
        let frames = dt * 60.0;

        let (speed, intensity, burst_every, burst) = if t < split {
            let p = t / split;
            self.phase = FlushPhase::Spinning { p };
            body.position = self.start;
            body.scale = 1.0 - p * 0.3;
            let swirl = p * 0.6;
            (0.3 + p * 1.5, swirl, SPIN_BURST_INTERVAL, swirl * 0.5)
        } else {
            let s = (t - split) / (1.0 - split);
            self.phase = FlushPhase::Sucking { s };
            let ease = s * s * s;
            body.position = self.start.lerp(self.feet, ease);
            body.scale = (0.7 - ease * 0.7).max(MIN_SCALE);
            let swirl = 0.6 + s * 0.4;
            (1.8 - s * 1.5, swirl, SUCK_BURST_INTERVAL, swirl)
        };
        body.rotation.y += speed * frames;
        body.rotation.z += speed * 0.5 * frames;
        self.swirl = intensity;

        self.since_burst += dt;
        if self.since_burst > burst_every {
            self.since_burst = 0.0;
            timeline.spawn_particles(body.position, burst, rng);
        }
        if intensity > 0.0 && rng.gen::<f32>() < splash_chance(intensity, dt) {
            timeline.spawn_splash(self.feet, rng);
        }

        if t >= 1.0 {
            timeline.set_flush_field(None);
            self.enter(FlushPhase::Gone);
        } else {
            timeline.set_flush_field(Some(FlushField { target: self.feet, intensity }));
        }
    }
}

/// Chance of at least one splash during `dt`, given 60% of `intensity` per 60 Hz frame.
fn splash_chance(intensity: f32, dt: f32) -> f32 {
    let per_frame = (intensity * 0.6).clamp(0.0, 1.0);
    1.0 - (1.0 - per_frame).powf(dt * 60.0)
}
