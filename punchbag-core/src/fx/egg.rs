//! Thrown eggs and the yolk they leave behind.

use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

use super::curves::clamp01;
use super::{Anchor, Impact, Progress, SpriteKind, SpriteState};
use crate::config::schema::EffectsConfig;

/// Shell spin per 60 Hz frame.
const SPIN_PER_FRAME: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EggTarget {
    Head,
    Chest,
    Belly,
}

impl EggTarget {
    /// Head 35 %, chest 35 %, belly 30 %.
    pub fn pick<R: Rng>(rng: &mut R) -> Self {
        match rng.gen::<f32>() {
            r if r < 0.35 => EggTarget::Head,
            r if r < 0.7 => EggTarget::Chest,
            _ => EggTarget::Belly,
        }
    }

    fn height<R: Rng>(self, rng: &mut R) -> f32 {
        match self {
            EggTarget::Head => 1.9 + rng.gen_range(0.0..0.3),
            EggTarget::Chest => 1.3 + rng.gen_range(0.0..0.4),
            EggTarget::Belly => 0.8 + rng.gen_range(0.0..0.4),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Egg {
    pub start: Vec3,
    pub end: Vec3,
    pub target: EggTarget,
    /// Arc parameter, advancing at `speed` per second and frozen at `break_at`.
    pub flight: f32,
    pub broken: bool,
    pub spin: f32,
    speed: f32,
    break_at: f32,
    arc_height: f32,
    pub(super) progress: Progress,
}

impl Egg {
    pub fn throw<R: Rng>(cfg: &EffectsConfig, rng: &mut R) -> Self {
        let target = EggTarget::pick(rng);
        let start = Vec3::new(rng.gen_range(-0.6..0.6), 0.6, 3.0);
        let end = Vec3::new(rng.gen_range(-0.25..0.25), target.height(rng), rng.gen_range(-0.15..0.15));
        Self::between(start, end, target, cfg)
    }

    pub fn between(start: Vec3, end: Vec3, target: EggTarget, cfg: &EffectsConfig) -> Self {
        let speed = cfg.egg_speed.max(1e-4);
        Self {
            start,
            end,
            target,
            flight: 0.0,
            broken: false,
            spin: 0.0,
            speed,
            break_at: cfg.egg_break_at,
            arc_height: cfg.egg_arc_height,
            progress: Progress::new(cfg.egg_break_at / speed + cfg.egg_linger),
        }
    }

    /// Point on the arc at parameter `t`.
    pub fn arc(&self, t: f32) -> Vec3 { self.start.lerp(self.end, t) + Vec3::Y * ((PI * t).sin() * self.arc_height) }

    pub fn position(&self) -> Vec3 { self.arc(self.flight) }

    /// Where the egg breaks; it stops there short of the body.
    pub fn hit_point(&self) -> Vec3 { self.arc(self.break_at) }

    pub(super) fn step(&mut self, dt: f32, impacts: &mut Vec<Impact>) {
        self.spin += SPIN_PER_FRAME * 60.0 * dt;
        if self.broken { return; }
        self.flight += dt * self.speed;
        if self.flight >= self.break_at {
            self.flight = self.break_at;
            self.broken = true;
            impacts.push(Impact::Egg { at: self.hit_point() });
        }
    }

    pub(super) fn sprite(&self) -> SpriteState<'_> {
        let kind = if self.broken { SpriteKind::EggYolk } else { SpriteKind::EggShell };
        let mut sprite = SpriteState::new(kind, self.position()).with_scale(Vec3::new(1.0, 1.35, 1.0));
        sprite.rotation = Vec3::new(self.spin, 0.0, self.spin);
        sprite
    }
}

/// Yolk splatter stuck to the character, in character-local space.
#[derive(Debug, Clone)]
pub struct YolkStain {
    pub local: Vec3,
    pub drip_speed: f32,
    pub(super) progress: Progress,
}

impl YolkStain {
    pub fn new<R: Rng>(local: Vec3, cfg: &EffectsConfig, rng: &mut R) -> Self {
        Self { local, drip_speed: rng.gen_range(0.15..0.25), progress: Progress::new(cfg.stain_life) }
    }

    pub fn position(&self) -> Vec3 { self.local - Vec3::Y * (self.drip_speed * self.progress.elapsed()) }

    fn freshness(&self) -> f32 { clamp01(self.progress.remaining() / self.progress.duration()) }

    pub(super) fn sprite(&self) -> SpriteState<'_> {
        let f = self.freshness();
        let s = 0.4 + (1.0 - f) * 0.2;
        let mut sprite = SpriteState::new(SpriteKind::YolkStain, self.position())
            .with_scale(Vec3::new(s, s * 1.25, 1.0))
            .with_opacity(0.9 * f);
        sprite.anchor = Anchor::Character;
        sprite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn targets_follow_the_zone_split() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            match EggTarget::pick(&mut rng) {
                EggTarget::Head => counts[0] += 1,
                EggTarget::Chest => counts[1] += 1,
                EggTarget::Belly => counts[2] += 1,
            }
        }
        assert!((900..1200).contains(&counts[0]), "{counts:?}");
        assert!((900..1200).contains(&counts[1]), "{counts:?}");
        assert!((750..1050).contains(&counts[2]), "{counts:?}");
    }

    #[test]
    fn thrown_eggs_start_in_front_and_aim_at_the_body() {
        let cfg = EffectsConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let egg = Egg::throw(&cfg, &mut rng);
            assert_eq!(egg.start.z, 3.0);
            assert!(egg.start.x.abs() <= 0.6);
            assert!(egg.end.y >= 0.8 && egg.end.y <= 2.2);
        }
    }

    #[test]
    fn egg_breaks_once_at_the_arc_point() {
        let cfg = EffectsConfig::default();
        let mut egg = Egg::between(Vec3::new(0.0, 0.6, 3.0), Vec3::new(0.0, 1.5, 0.0), EggTarget::Chest, &cfg);
        let mut impacts = Vec::new();
        let dt = 1.0 / 60.0;
        while !egg.broken {
            egg.step(dt, &mut impacts);
            assert!(egg.flight <= 0.85);
        }
        assert_eq!(impacts.len(), 1);
        let Impact::Egg { at } = &impacts[0] else { panic!("expected egg impact") };
        let expected = Vec3::new(0.0, 0.6 + 0.9 * 0.85 + (PI * 0.85).sin() * 1.5, 3.0 - 3.0 * 0.85);
        assert!(at.abs_diff_eq(expected, 1e-4));

        let frozen = egg.position();
        egg.step(0.2, &mut impacts);
        assert_eq!(egg.position(), frozen);
        assert_eq!(impacts.len(), 1);
        assert_eq!(egg.sprite().kind, SpriteKind::EggYolk);
    }

    #[test]
    fn huge_step_still_reports_the_hit() {
        let cfg = EffectsConfig::default();
        let mut egg = Egg::between(Vec3::ZERO, Vec3::ONE, EggTarget::Head, &cfg);
        let mut impacts = Vec::new();
        egg.step(10.0, &mut impacts);
        assert!(egg.broken);
        assert_eq!(impacts.len(), 1);
    }

    #[test]
    fn stain_drips_and_fades() {
        let cfg = EffectsConfig::default();
        let mut rng = StdRng::seed_from_u64(8);
        let mut stain = YolkStain::new(Vec3::new(0.1, 1.5, 0.2), &cfg, &mut rng);
        let fresh = stain.sprite();
        assert!((fresh.opacity - 0.9).abs() < 1e-6);
        assert_eq!(fresh.anchor, Anchor::Character);
        assert!((fresh.scale.x - 0.4).abs() < 1e-6);

        stain.progress.advance(4.0);
        let half = stain.sprite();
        assert!((half.opacity - 0.45).abs() < 1e-5);
        assert!((half.scale.x - 0.5).abs() < 1e-5);
        assert!((half.scale.y - 0.625).abs() < 1e-5);
        let dropped = 1.5 - half.position.y;
        assert!((0.6..=1.0).contains(&dropped));
    }
}
