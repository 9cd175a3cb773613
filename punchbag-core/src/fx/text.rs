//! Text sprites: sprayed words, their shards, hit replies and the flush slogan.

use glam::Vec3;
use rand::Rng;
use std::f32::consts::{PI, TAU};

use super::curves::{clamp01, ease_out_cubic, lerp, per_frame, quad_bezier};
use super::{Progress, SpriteKind, SpriteState, TextStyle};
use crate::config::schema::EffectsConfig;

/// Shown when a sprayed text has nothing printable left to shatter.
pub const SHARD_FALLBACK: &str = "喷!";

/// A word sprayed from the input point toward the face along a Bezier arc.
#[derive(Debug, Clone)]
pub struct FlyingText {
    pub text: String,
    pub amp: f32,
    pub start: Vec3,
    pub control: Vec3,
    pub target: Vec3,
    pub(super) progress: Progress,
}

impl FlyingText {
    /// Louder sprays are bigger and faster.
    pub fn new(text: impl Into<String>, amp: f32, start: Vec3, target: Vec3, cfg: &EffectsConfig) -> Self {
        let control = start.lerp(target, 0.5) + Vec3::Y;
        let duration = cfg.text_flight / amp.clamp(0.7, 2.3);
        Self { text: text.into(), amp, start, control, target, progress: Progress::new(duration) }
    }

    pub fn position(&self) -> Vec3 { quad_bezier(self.start, self.control, self.target, self.progress.t()) }

    pub(super) fn sprite(&self, cfg: &EffectsConfig) -> SpriteState<'_> {
        let s = lerp(0.25, 1.25, ease_out_cubic(self.progress.t()));
        let style = TextStyle { font_size: cfg.text_font_size * self.amp, padding: 52.0, max_width: 460.0 * self.amp };
        SpriteState::new(SpriteKind::TextBubble, self.position())
            .with_text(&self.text, style)
            .with_scale(Vec3::splat(s))
    }
}

/// One glyph of a shattered word.
#[derive(Debug, Clone)]
pub struct Shard {
    pub glyph: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub scale: f32,
    pub(super) progress: Progress,
}

impl Shard {
    /// Splits `text` into at most `cfg.shard_max_glyphs` glyphs fanned out
    /// around `at`. Blank text shatters as [`SHARD_FALLBACK`].
    pub fn burst<R: Rng>(text: &str, at: Vec3, cfg: &EffectsConfig, rng: &mut R) -> Vec<Shard> {
        let text = match text.trim() {
            "" => SHARD_FALLBACK,
            t => t,
        };
        let glyphs: Vec<char> = text.chars().take(cfg.shard_max_glyphs).collect();
        let n = glyphs.len().max(1) as f32;
        glyphs
            .into_iter()
            .enumerate()
            .map(|(i, ch)| {
                let a = i as f32 / n * TAU;
                let mut velocity = Vec3::new(a.cos(), rng.gen_range(0.6..1.2), a.sin()) * rng.gen_range(1.2..2.0);
                velocity.x += rng.gen_range(-0.2..0.2);
                velocity.z += rng.gen_range(-0.2..0.2);
                Shard {
                    glyph: ch.to_string(),
                    position: at,
                    velocity,
                    scale: 0.18,
                    progress: Progress::new(cfg.shard_life),
                }
            })
            .collect()
    }

    pub(super) fn step(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        self.velocity *= per_frame(0.92, dt);
        self.scale *= per_frame(0.98, dt);
    }

    pub(super) fn sprite(&self) -> SpriteState<'_> {
        let style = TextStyle { font_size: 72.0, padding: 80.0, max_width: 260.0 };
        SpriteState::new(SpriteKind::Glyph, self.position)
            .with_text(&self.glyph, style)
            .with_scale(Vec3::splat(self.scale))
            .with_opacity(self.progress.remaining() / self.progress.duration())
    }
}

/// A canned protest that pops up near the face and drifts upward.
#[derive(Debug, Clone)]
pub struct ReplyBubble {
    pub text: String,
    pub origin: Vec3,
    pub rise: f32,
    pub(super) progress: Progress,
}

impl ReplyBubble {
    pub fn near_face<R: Rng>(text: impl Into<String>, face: Vec3, cfg: &EffectsConfig, rng: &mut R) -> Self {
        let jitter = Vec3::new(rng.gen_range(-0.4..0.4), rng.gen_range(0.35..0.75), rng.gen_range(-0.2..0.0));
        Self { text: text.into(), origin: face + jitter, rise: cfg.reply_rise, progress: Progress::new(cfg.reply_life) }
    }

    pub fn position(&self) -> Vec3 { self.origin + Vec3::Y * (self.rise * self.progress.elapsed()) }

    pub fn opacity(&self) -> f32 {
        let p = &self.progress;
        let fade_in = (p.t() * 3.0).min(1.0);
        let fade_out = clamp01(p.remaining() / (p.duration() * 0.6));
        clamp01(fade_in * fade_out)
    }

    pub(super) fn sprite(&self) -> SpriteState<'_> {
        let style = TextStyle { font_size: 40.0, padding: 40.0, max_width: 360.0 };
        SpriteState::new(SpriteKind::TextBubble, self.position())
            .with_text(&self.text, style)
            .with_scale(Vec3::new(1.8, 1.4, 1.0))
            .with_opacity(self.opacity())
    }
}

/// Big cartoon slogan that falls from the sky after a flush.
#[derive(Debug, Clone)]
pub struct SloganDrop {
    pub text: String,
    pub start: Vec3,
    pub end: Vec3,
    pub compact: bool,
    pub(super) progress: Progress,
}

impl SloganDrop {
    pub fn new(text: &str, cfg: &EffectsConfig) -> Self {
        let (from, to) = if cfg.compact { (6.5, 2.2) } else { (7.5, 3.0) };
        Self {
            text: text.trim().to_string(),
            start: Vec3::new(0.0, from, 0.0),
            end: Vec3::new(0.0, to, 0.0),
            compact: cfg.compact,
            progress: Progress::new(cfg.slogan_duration),
        }
    }

    pub fn position(&self) -> Vec3 {
        let t = self.progress.t();
        let mut pos = self.start.lerp(self.end, ease_out_cubic(t));
        if t > 0.8 {
            pos.y += ((t - 0.8) / 0.2 * PI).sin() * 0.15;
        }
        pos
    }

    pub fn opacity(&self) -> f32 {
        let t = self.progress.t();
        clamp01(t * 2.2) * clamp01(1.0 - (t - 0.4).max(0.0) / 0.6)
    }

    pub(super) fn sprite(&self) -> SpriteState<'_> {
        let t = self.progress.t();
        let (style, base) = if self.compact {
            (TextStyle { font_size: 64.0, padding: 50.0, max_width: 520.0 }, (3.2, 2.4))
        } else {
            (TextStyle { font_size: 88.0, padding: 70.0, max_width: 720.0 }, (4.5, 3.4))
        };
        let pulse = 1.0 + (t * PI).sin() * 0.06;
        let mut sprite = SpriteState::new(SpriteKind::TextBubble, self.position())
            .with_text(&self.text, style)
            .with_scale(Vec3::new(base.0 * pulse, base.1 * pulse, 1.0))
            .with_opacity(self.opacity());
        sprite.rotation.z = (t * 3.0).sin() * 0.06;
        sprite.on_top = true;
        sprite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn louder_text_flies_faster_within_limits() {
        let cfg = EffectsConfig::default();
        let quiet = FlyingText::new("hi", 0.1, Vec3::ZERO, Vec3::X, &cfg);
        let loud = FlyingText::new("hi", 2.0, Vec3::ZERO, Vec3::X, &cfg);
        let screaming = FlyingText::new("hi", 9.0, Vec3::ZERO, Vec3::X, &cfg);
        assert!((quiet.progress.duration() - 0.85 / 0.7).abs() < 1e-6);
        assert!(loud.progress.duration() < quiet.progress.duration());
        assert!((screaming.progress.duration() - 0.85 / 2.3).abs() < 1e-6);
        assert_eq!(quiet.control, Vec3::new(0.5, 1.0, 0.0));
    }

    #[test]
    fn flying_text_lands_on_target() {
        let cfg = EffectsConfig::default();
        let target = Vec3::new(0.0, 1.7, 0.2);
        let mut f = FlyingText::new("滚", 1.0, Vec3::new(1.0, 1.0, 3.0), target, &cfg);
        assert_eq!(f.sprite(&cfg).scale, Vec3::splat(0.25));
        f.progress.advance(5.0);
        assert!(f.position().abs_diff_eq(target, 1e-5));
        assert_eq!(f.sprite(&cfg).scale, Vec3::splat(1.25));
    }

    #[test]
    fn burst_caps_glyphs_and_falls_back_on_blank() {
        let cfg = EffectsConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let long = Shard::burst("一二三四五六七八九十十一", Vec3::ZERO, &cfg, &mut rng);
        assert_eq!(long.len(), 10);
        assert_eq!(long[9].glyph, "十");

        let blank = Shard::burst("   ", Vec3::ZERO, &cfg, &mut rng);
        let glyphs: Vec<&str> = blank.iter().map(|s| s.glyph.as_str()).collect();
        assert_eq!(glyphs, ["喷", "!"]);
        assert!(blank.iter().all(|s| s.velocity.y > 0.0));
    }

    #[test]
    fn shards_slow_down_and_shrink() {
        let cfg = EffectsConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = Shard::burst("a", Vec3::ZERO, &cfg, &mut rng).remove(0);
        let v0 = s.velocity.length();
        s.step(1.0 / 60.0);
        assert!((s.velocity.length() - v0 * 0.92).abs() < 1e-4);
        assert!((s.scale - 0.18 * 0.98).abs() < 1e-6);
        assert_ne!(s.position, Vec3::ZERO);
    }

    #[test]
    fn reply_fades_in_then_out() {
        let cfg = EffectsConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut r = ReplyBubble::near_face("别打了！", Vec3::new(0.0, 1.6, 0.0), &cfg, &mut rng);
        assert_eq!(r.opacity(), 0.0);
        assert!(r.origin.y >= 1.6 + 0.35 && r.origin.y < 1.6 + 0.75);
        r.progress.advance(0.5);
        assert_eq!(r.opacity(), 1.0);
        assert!((r.position().y - r.origin.y - 0.175).abs() < 1e-5);
        r.progress.advance(0.7);
        assert!(r.opacity() < 0.5);
        r.progress.advance(1.0);
        assert_eq!(r.opacity(), 0.0);
    }

    #[test]
    fn slogan_falls_and_bounces() {
        let mut cfg = EffectsConfig::default();
        let mut s = SloganDrop::new("  冲走了。 ", &cfg);
        assert_eq!(s.text, "冲走了。");
        assert_eq!(s.position(), Vec3::new(0.0, 7.5, 0.0));
        s.progress.advance(2.7);
        assert!(s.position().y > 3.0);
        s.progress.advance(1.0);
        assert!((s.position().y - 3.0).abs() < 1e-5);
        assert!(s.opacity() < 1e-5);
        assert!(s.sprite().on_top);

        cfg.compact = true;
        let c = SloganDrop::new("x", &cfg);
        assert_eq!(c.start.y, 6.5);
        assert_eq!(c.end.y, 2.2);
    }
}
