//! Water droplets and splashes thrown up by the flush swirl.

use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

use super::curves::per_frame;
use super::{Progress, SpriteKind, SpriteState};

/// Pull applied to droplets while a flush is running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlushField {
    pub target: Vec3,
    pub intensity: f32,
}

/// Droplets closer than this to the drain vanish early.
pub const DRAIN_RADIUS: f32 = 0.2;

#[derive(Debug, Clone)]
pub struct FlushParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub spin: Vec3,
    pub(super) progress: Progress,
}

impl FlushParticle {
    /// One burst on a ring around `center`; louder swirls throw more drops.
    pub fn ring<R: Rng>(center: Vec3, intensity: f32, rng: &mut R) -> Vec<FlushParticle> {
        let count = (6.0 + intensity.max(0.0) * 12.0) as usize;
        (0..count)
            .map(|i| {
                let a = i as f32 / count as f32 * TAU;
                let radius = rng.gen_range(0.3..0.5);
                let height = rng.gen_range(0.0..1.5);
                FlushParticle {
                    position: center + Vec3::new(a.cos() * radius, height, a.sin() * radius),
                    velocity: Vec3::new(rng.gen_range(-0.1..0.1), rng.gen_range(-0.6..-0.3), rng.gen_range(-0.1..0.1)),
                    size: rng.gen_range(0.06..0.1),
                    spin: Vec3::ZERO,
                    progress: Progress::new(rng.gen_range(1.0..1.5)),
                }
            })
            .collect()
    }

    /// Integrates one frame. Returns true when the drop reached the drain.
    pub(super) fn step(&mut self, dt: f32, field: Option<FlushField>) -> bool {
        if let Some(f) = field {
            let pull = (f.target - self.position).normalize_or_zero();
            self.velocity += pull * (f.intensity * 4.0 * dt);
        }
        self.velocity *= per_frame(0.92, dt);
        self.velocity.y -= 2.0 * dt;
        self.position += self.velocity * dt;
        self.spin += Vec3::new(2.0, 1.5, 0.0) * dt;
        field.is_some_and(|f| self.position.distance(f.target) < DRAIN_RADIUS)
    }

    pub(super) fn sprite(&self) -> SpriteState<'_> {
        let f = (self.progress.remaining() / self.progress.duration()).max(0.0);
        let mut sprite = SpriteState::new(SpriteKind::Droplet, self.position)
            .with_scale(Vec3::splat(self.size * (0.8 + f * 0.7)))
            .with_opacity(f * 0.8);
        sprite.rotation = self.spin;
        sprite
    }
}

#[derive(Debug, Clone)]
pub struct FlushSplash {
    pub position: Vec3,
    pub velocity: Vec3,
    pub base_scale: f32,
    pub(super) progress: Progress,
}

impl FlushSplash {
    pub fn at<R: Rng>(target: Vec3, rng: &mut R) -> Self {
        let jitter = Vec3::new(rng.gen_range(-0.25..0.25), rng.gen_range(-0.15..0.15), rng.gen_range(-0.25..0.25));
        Self {
            position: target + jitter,
            velocity: Vec3::new(rng.gen_range(-1.25..1.25), rng.gen_range(0.0..1.2), rng.gen_range(-1.25..1.25)),
            base_scale: rng.gen_range(1.3..1.7),
            progress: Progress::new(rng.gen_range(0.5..0.8)),
        }
    }

    pub(super) fn step(&mut self, dt: f32) {
        self.velocity.y -= 9.8 * dt;
        self.position += self.velocity * dt;
    }

    pub(super) fn sprite(&self) -> SpriteState<'_> {
        let f = (self.progress.remaining() / self.progress.duration()).max(0.0);
        SpriteState::new(SpriteKind::Splash, self.position)
            .with_scale(Vec3::splat(self.base_scale * (0.3 + f * 0.7)))
            .with_opacity(f * 0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn burst_size_grows_with_intensity() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(FlushParticle::ring(Vec3::ZERO, 0.0, &mut rng).len(), 6);
        assert_eq!(FlushParticle::ring(Vec3::ZERO, 0.5, &mut rng).len(), 12);
        assert_eq!(FlushParticle::ring(Vec3::ZERO, 1.0, &mut rng).len(), 18);
    }

    #[test]
    fn ring_surrounds_the_center() {
        let mut rng = StdRng::seed_from_u64(2);
        let center = Vec3::new(1.0, 0.0, -1.0);
        for p in FlushParticle::ring(center, 1.0, &mut rng) {
            let flat = Vec3::new(p.position.x - center.x, 0.0, p.position.z - center.z).length();
            assert!((0.3 - 1e-5..0.5 + 1e-5).contains(&flat));
            assert!(p.position.y >= 0.0 && p.position.y < 1.5);
            assert!(p.velocity.y < 0.0);
        }
    }

    #[test]
    fn field_pulls_drops_into_the_drain() {
        let mut rng = StdRng::seed_from_u64(3);
        let field = FlushField { target: Vec3::ZERO, intensity: 1.0 };
        let mut p = FlushParticle::ring(Vec3::ZERO, 0.0, &mut rng).remove(0);
        let start = p.position.distance(field.target);
        let mut drained = false;
        for _ in 0..120 {
            if p.step(1.0 / 60.0, Some(field)) {
                drained = true;
                break;
            }
        }
        assert!(drained || p.position.distance(field.target) < start);
    }

    #[test]
    fn free_drops_just_fall() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut p = FlushParticle::ring(Vec3::ZERO, 0.0, &mut rng).remove(0);
        let y = p.position.y;
        assert!(!p.step(0.05, None));
        assert!(p.position.y < y);
    }

    #[test]
    fn splash_falls_under_gravity() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut s = FlushSplash::at(Vec3::ZERO, &mut rng);
        let vy = s.velocity.y;
        s.step(0.1);
        assert!((s.velocity.y - (vy - 0.98)).abs() < 1e-5);
        assert!(s.base_scale >= 1.3 && s.base_scale < 1.7);
    }
}
