//! Interpolation helpers shared by the effects.

use glam::Vec3;

pub fn lerp(a: f32, b: f32, t: f32) -> f32 { a + (b - a) * t }

pub fn clamp01(v: f32) -> f32 { v.clamp(0.0, 1.0) }

pub fn ease_out_cubic(t: f32) -> f32 { 1.0 - (1.0 - t).powi(3) }

pub fn ease_in_cubic(t: f32) -> f32 { t * t * t }

/// Quadratic Bezier through `p0`, `p1` (control), `p2`, evaluated by nested lerps.
pub fn quad_bezier(p0: Vec3, p1: Vec3, p2: Vec3, t: f32) -> Vec3 {
    let a = p0.lerp(p1, t);
    let b = p1.lerp(p2, t);
    a.lerp(b, t)
}

/// Converts a per-frame factor tuned at 60 fps into one for an arbitrary `dt`.
pub fn per_frame(factor: f32, dt: f32) -> f32 { factor.powf(dt * 60.0) }

/// Additive counterpart of [`per_frame`]: a step tuned at 60 fps, scaled to `dt`.
pub fn per_frame_sum(step: f32, dt: f32) -> f32 { step * dt * 60.0 }
