//! Effect timeline: every transient sprite in the scene, keyed by a slotmap handle.
//!
//! Each effect owns a [`Progress`] clock. `update` advances the clocks and
//! runs the per-frame motion; an effect whose clock reaches 1 is reported as
//! [`Lifecycle::Expired`] for exactly one frame (so its final pose can be
//! drawn) and is removed at the start of the next `update`. Removed keys
//! queue up in [`EffectTimeline::drain_retired`] so a host can free whatever
//! texture or material it attached to them.

pub mod curves;
pub mod egg;
pub mod text;
pub mod water;

use glam::Vec3;
use rand::Rng;
use serde::Serialize;
use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::config::schema::EffectsConfig;

pub use egg::{Egg, EggTarget, YolkStain};
pub use text::{FlyingText, ReplyBubble, Shard, SloganDrop};
pub use water::{FlushField, FlushParticle, FlushSplash};

new_key_type! {
    /// Handle a host uses to attach and later dispose a visual.
    pub struct EffectKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Spawned,
    Animating,
    Expired,
}

/// Normalized clock of one effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    elapsed: f32,
    duration: f32,
}

impl Progress {
    pub fn new(duration: f32) -> Self { Self { elapsed: 0.0, duration: duration.max(1e-4) } }

    pub fn elapsed(&self) -> f32 { self.elapsed }
    pub fn duration(&self) -> f32 { self.duration }
    pub fn remaining(&self) -> f32 { (self.duration - self.elapsed).max(0.0) }

    /// `elapsed / duration`, clamped to 1.
    pub fn t(&self) -> f32 { (self.elapsed / self.duration).min(1.0) }

    pub fn is_done(&self) -> bool { self.elapsed >= self.duration }

    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt.max(0.0);
        self.t()
    }

    /// Jumps to the end.
    pub fn finish(&mut self) { self.elapsed = self.elapsed.max(self.duration); }
}

/// Something landed on the character this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Impact {
    Text { text: String, at: Vec3, amp: f32 },
    Egg { at: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    FlyingText,
    Shard,
    Reply,
    Slogan,
    Egg,
    Stain,
    Particle,
    Splash,
}

/// What the host should draw for a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteKind {
    TextBubble,
    /// Rounded comic balloon with a tail; text may span several lines.
    ComicBubble,
    Glyph,
    EggShell,
    EggYolk,
    YolkStain,
    Droplet,
    Splash,
}

/// Space a sprite position is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    World,
    /// Local to the character root; follows it around.
    Character,
}

/// Canvas layout for text sprites, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub padding: f32,
    pub max_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteState<'a> {
    pub kind: SpriteKind,
    pub text: Option<(&'a str, TextStyle)>,
    pub anchor: Anchor,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub opacity: f32,
    /// Drawn over everything, ignoring depth.
    pub on_top: bool,
}

impl<'a> SpriteState<'a> {
    pub fn new(kind: SpriteKind, position: Vec3) -> Self {
        Self {
            kind,
            text: None,
            anchor: Anchor::World,
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            opacity: 1.0,
            on_top: false,
        }
    }

    pub fn with_text(mut self, text: &'a str, style: TextStyle) -> Self { self.text = Some((text, style)); self }
    pub fn with_scale(mut self, scale: Vec3) -> Self { self.scale = scale; self }
    pub fn with_opacity(mut self, opacity: f32) -> Self { self.opacity = opacity.clamp(0.0, 1.0); self }
}

#[derive(Debug, Clone)]
pub enum Effect {
    FlyingText(FlyingText),
    Shard(Shard),
    Reply(ReplyBubble),
    Slogan(SloganDrop),
    Egg(Egg),
    Stain(YolkStain),
    Particle(FlushParticle),
    Splash(FlushSplash),
}

macro_rules! each_effect {
    ($e:expr, $x:ident => $body:expr) => {
        match $e {
            Effect::FlyingText($x) => $body,
            Effect::Shard($x) => $body,
            Effect::Reply($x) => $body,
            Effect::Slogan($x) => $body,
            Effect::Egg($x) => $body,
            Effect::Stain($x) => $body,
            Effect::Particle($x) => $body,
            Effect::Splash($x) => $body,
        }
    };
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::FlyingText(_) => EffectKind::FlyingText,
            Effect::Shard(_) => EffectKind::Shard,
            Effect::Reply(_) => EffectKind::Reply,
            Effect::Slogan(_) => EffectKind::Slogan,
            Effect::Egg(_) => EffectKind::Egg,
            Effect::Stain(_) => EffectKind::Stain,
            Effect::Particle(_) => EffectKind::Particle,
            Effect::Splash(_) => EffectKind::Splash,
        }
    }

    pub fn progress(&self) -> Progress { each_effect!(self, e => e.progress) }

    fn progress_mut(&mut self) -> &mut Progress { each_effect!(self, e => &mut e.progress) }

    fn step(&mut self, dt: f32, frame: &mut Frame<'_>) {
        let dt = match self {
            Effect::Particle(_) | Effect::Splash(_) => dt.min(frame.particle_dt_cap),
            _ => dt,
        };
        self.progress_mut().advance(dt);
        match self {
            Effect::FlyingText(f) => {
                if f.progress.is_done() {
                    frame.impacts.push(Impact::Text { text: f.text.clone(), at: f.target, amp: f.amp });
                }
            }
            Effect::Shard(s) => s.step(dt),
            Effect::Egg(e) => e.step(dt, frame.impacts),
            Effect::Particle(p) => {
                if p.step(dt, frame.field) {
                    p.progress.finish();
                }
            }
            Effect::Splash(s) => s.step(dt),
            Effect::Reply(_) | Effect::Slogan(_) | Effect::Stain(_) => {}
        }
    }

    pub fn sprite<'a>(&'a self, cfg: &EffectsConfig) -> SpriteState<'a> {
        match self {
            Effect::FlyingText(f) => f.sprite(cfg),
            Effect::Shard(s) => s.sprite(),
            Effect::Reply(r) => r.sprite(),
            Effect::Slogan(s) => s.sprite(),
            Effect::Egg(e) => e.sprite(),
            Effect::Stain(s) => s.sprite(),
            Effect::Particle(p) => p.sprite(),
            Effect::Splash(s) => s.sprite(),
        }
    }
}

struct Frame<'a> {
    impacts: &'a mut Vec<Impact>,
    field: Option<FlushField>,
    particle_dt_cap: f32,
}

#[derive(Debug, Clone)]
struct Slot {
    effect: Effect,
    lifecycle: Lifecycle,
}

#[derive(Debug)]
pub struct EffectTimeline {
    effects: SlotMap<EffectKey, Slot>,
    retired: Vec<EffectKey>,
    cfg: EffectsConfig,
    particle_dt_cap: f32,
    field: Option<FlushField>,
}

impl EffectTimeline {
    pub fn new(cfg: EffectsConfig, particle_dt_cap: f32) -> Self {
        Self { effects: SlotMap::with_key(), retired: Vec::new(), cfg, particle_dt_cap, field: None }
    }

    pub fn config(&self) -> &EffectsConfig { &self.cfg }
    pub fn len(&self) -> usize { self.effects.len() }
    pub fn is_empty(&self) -> bool { self.effects.is_empty() }
    pub fn count(&self, kind: EffectKind) -> usize { self.effects.values().filter(|s| s.effect.kind() == kind).count() }

    pub fn get(&self, key: EffectKey) -> Option<&Effect> { self.effects.get(key).map(|s| &s.effect) }
    pub fn lifecycle(&self, key: EffectKey) -> Option<Lifecycle> { self.effects.get(key).map(|s| s.lifecycle) }
    pub fn progress(&self, key: EffectKey) -> Option<Progress> { self.effects.get(key).map(|s| s.effect.progress()) }

    pub fn spawn(&mut self, effect: Effect) -> EffectKey {
        trace!(kind = ?effect.kind(), "spawn effect");
        self.effects.insert(Slot { effect, lifecycle: Lifecycle::Spawned })
    }

    pub fn spawn_flying_text(&mut self, text: &str, amp: f32, start: Vec3, target: Vec3) -> EffectKey {
        let f = FlyingText::new(text, amp, start, target, &self.cfg);
        self.spawn(Effect::FlyingText(f))
    }

    pub fn shatter<R: Rng>(&mut self, text: &str, at: Vec3, rng: &mut R) -> Vec<EffectKey> {
        Shard::burst(text, at, &self.cfg, rng).into_iter().map(|s| self.spawn(Effect::Shard(s))).collect()
    }

    pub fn spawn_reply<R: Rng>(&mut self, text: &str, face: Vec3, rng: &mut R) -> EffectKey {
        let r = ReplyBubble::near_face(text, face, &self.cfg, rng);
        self.spawn(Effect::Reply(r))
    }

    pub fn spawn_slogan(&mut self, text: &str) -> EffectKey {
        let s = SloganDrop::new(text, &self.cfg);
        self.spawn(Effect::Slogan(s))
    }

    pub fn throw_egg<R: Rng>(&mut self, rng: &mut R) -> EffectKey {
        let e = Egg::throw(&self.cfg, rng);
        self.spawn(Effect::Egg(e))
    }

    pub fn spawn_stain<R: Rng>(&mut self, local: Vec3, rng: &mut R) -> EffectKey {
        let s = YolkStain::new(local, &self.cfg, rng);
        self.spawn(Effect::Stain(s))
    }

    pub fn spawn_particles<R: Rng>(&mut self, center: Vec3, intensity: f32, rng: &mut R) -> usize {
        let burst = FlushParticle::ring(center, intensity, rng);
        let n = burst.len();
        for p in burst {
            self.spawn(Effect::Particle(p));
        }
        n
    }

    pub fn spawn_splash<R: Rng>(&mut self, target: Vec3, rng: &mut R) -> EffectKey {
        self.spawn(Effect::Splash(FlushSplash::at(target, rng)))
    }

    /// Drain pull for droplets; `None` lets them fall freely.
    pub fn set_flush_field(&mut self, field: Option<FlushField>) { self.field = field; }
    pub fn flush_field(&self) -> Option<FlushField> { self.field }

    /// Advances every effect by `dt` and returns what landed this frame.
    pub fn update(&mut self, dt: f32) -> Vec<Impact> {
        let retired = &mut self.retired;
        self.effects.retain(|key, slot| {
            let keep = slot.lifecycle != Lifecycle::Expired;
            if !keep {
                retired.push(key);
            }
            keep
        });

        let mut impacts = Vec::new();
        let mut frame = Frame { impacts: &mut impacts, field: self.field, particle_dt_cap: self.particle_dt_cap };
        for slot in self.effects.values_mut() {
            slot.effect.step(dt, &mut frame);
            slot.lifecycle = if slot.effect.progress().is_done() { Lifecycle::Expired } else { Lifecycle::Animating };
        }
        impacts
    }

    /// Removes every effect of `kind` right away.
    pub fn clear_kind(&mut self, kind: EffectKind) -> usize {
        let retired = &mut self.retired;
        let before = self.effects.len();
        self.effects.retain(|key, slot| {
            let keep = slot.effect.kind() != kind;
            if !keep {
                retired.push(key);
            }
            keep
        });
        before - self.effects.len()
    }

    pub fn clear(&mut self) {
        self.retired.extend(self.effects.keys());
        self.effects.clear();
    }

    /// Keys removed since the last drain, oldest first.
    pub fn drain_retired(&mut self) -> std::vec::Drain<'_, EffectKey> { self.retired.drain(..) }

    pub fn sprites(&self) -> impl Iterator<Item = (EffectKey, SpriteState<'_>)> + '_ {
        self.effects.iter().map(move |(key, slot)| (key, slot.effect.sprite(&self.cfg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn timeline() -> EffectTimeline { EffectTimeline::new(EffectsConfig::default(), 0.05) }

    #[test]
    fn progress_clamps_and_finishes() {
        let mut p = Progress::new(0.5);
        assert_eq!(p.t(), 0.0);
        assert_eq!(p.advance(0.25), 0.5);
        assert_eq!(p.advance(-1.0), 0.5);
        assert_eq!(p.advance(1.0), 1.0);
        assert!(p.is_done());
        assert_eq!(p.remaining(), 0.0);
        assert_eq!(Progress::new(0.0).duration(), 1e-4);
    }

    #[test]
    fn progress_reaches_one_exactly_once_then_retires() {
        let mut tl = timeline();
        let key = tl.spawn_slogan("冲走了");
        assert_eq!(tl.lifecycle(key), Some(Lifecycle::Spawned));

        let mut seen = Vec::new();
        for _ in 0..400 {
            tl.update(1.0 / 60.0);
            match tl.progress(key) {
                Some(p) => seen.push(p.t()),
                None => break,
            }
        }
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.iter().filter(|&&t| t == 1.0).count(), 1);
        assert_eq!(*seen.last().unwrap(), 1.0);
        assert!(tl.get(key).is_none());
        assert_eq!(tl.drain_retired().collect::<Vec<_>>(), [key]);
        assert_eq!(tl.drain_retired().count(), 0);
    }

    #[test]
    fn expired_effect_is_visible_for_one_frame() {
        let mut tl = timeline();
        let key = tl.spawn_slogan("x");
        tl.update(10.0);
        assert_eq!(tl.lifecycle(key), Some(Lifecycle::Expired));
        assert_eq!(tl.sprites().count(), 1);
        tl.update(0.0);
        assert_eq!(tl.lifecycle(key), None);
        assert!(tl.is_empty());
    }

    #[test]
    fn flying_text_reports_one_impact() {
        let mut tl = timeline();
        let target = Vec3::new(0.0, 1.6, 0.2);
        tl.spawn_flying_text("你好", 1.0, Vec3::new(1.0, 1.0, 3.0), target);
        let mut impacts = Vec::new();
        for _ in 0..120 {
            impacts.extend(tl.update(1.0 / 60.0));
        }
        assert_eq!(impacts, [Impact::Text { text: "你好".into(), at: target, amp: 1.0 }]);
        assert!(tl.is_empty());
    }

    #[test]
    fn egg_lands_then_lingers() {
        let mut tl = timeline();
        let mut rng = StdRng::seed_from_u64(4);
        let key = tl.throw_egg(&mut rng);
        let mut landed_at = None;
        let mut t = 0.0f32;
        while tl.get(key).is_some() && t < 3.0 {
            let impacts = tl.update(1.0 / 60.0);
            t += 1.0 / 60.0;
            if !impacts.is_empty() {
                assert!(matches!(impacts[0], Impact::Egg { .. }));
                landed_at = Some(t);
            }
        }
        let landed = landed_at.expect("egg never landed");
        assert!((landed - 0.85 / 1.2).abs() < 0.05);
        assert!((t - landed - 0.4).abs() < 0.05);
    }

    #[test]
    fn sprites_expose_text_and_anchor() {
        let mut tl = timeline();
        let mut rng = StdRng::seed_from_u64(6);
        let reply = tl.spawn_reply("别打了！", Vec3::Y, &mut rng);
        let stain = tl.spawn_stain(Vec3::new(0.0, 1.2, 0.1), &mut rng);
        let sprites: Vec<_> = tl.sprites().collect();
        assert_eq!(sprites.len(), 2);
        for (key, s) in sprites {
            if key == reply {
                assert_eq!(s.text.map(|(t, _)| t), Some("别打了！"));
                assert_eq!(s.anchor, Anchor::World);
            } else {
                assert_eq!(key, stain);
                assert_eq!(s.anchor, Anchor::Character);
                assert!(s.text.is_none());
            }
        }
    }

    #[test]
    fn clear_kind_retires_only_that_kind() {
        let mut tl = timeline();
        let mut rng = StdRng::seed_from_u64(7);
        tl.spawn_stain(Vec3::ZERO, &mut rng);
        tl.spawn_stain(Vec3::ONE, &mut rng);
        let slogan = tl.spawn_slogan("bye");
        assert_eq!(tl.clear_kind(EffectKind::Stain), 2);
        assert_eq!(tl.count(EffectKind::Stain), 0);
        assert!(tl.get(slogan).is_some());
        assert_eq!(tl.drain_retired().count(), 2);

        tl.clear();
        assert!(tl.is_empty());
        assert_eq!(tl.drain_retired().collect::<Vec<_>>(), [slogan]);
    }

    #[test]
    fn particles_use_capped_dt_and_drain_early() {
        let mut tl = timeline();
        let mut rng = StdRng::seed_from_u64(8);
        let n = tl.spawn_particles(Vec3::ZERO, 0.0, &mut rng);
        assert_eq!(n, 6);
        tl.update(1.0);
        for (_, slot) in tl.effects.iter() {
            assert!((slot.effect.progress().elapsed() - 0.05).abs() < 1e-6);
        }

        tl.set_flush_field(Some(FlushField { target: Vec3::new(0.0, 0.5, 0.0), intensity: 1.0 }));
        for _ in 0..600 {
            tl.update(1.0 / 60.0);
        }
        assert_eq!(tl.count(EffectKind::Particle), 0);
    }
}
