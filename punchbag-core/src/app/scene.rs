//! Scene sprites that live outside the effect timeline: the comic balloons
//! behind the character and the live voice bubble shown while recording.

use glam::Vec3;

use crate::fx::curves::per_frame_sum;
use crate::fx::{SpriteKind, SpriteState, TextStyle};

pub const BACKDROP_LINES: [&str; 2] = ["压力山大!\n受够了!", "我要发泄!"];
/// Behind the character so the balloons never clip through it.
const BACKDROP_Z: f32 = -1.8;
const BACKDROP_STYLE: TextStyle = TextStyle { font_size: 56.0, padding: 46.0, max_width: 420.0 };
/// Upward drift per 60 Hz frame at the crest of the bob.
const BOB: f32 = 0.003;

pub const LIVE_VOICE_STYLE: TextStyle = TextStyle { font_size: 44.0, padding: 46.0, max_width: 420.0 };
const LIVE_VOICE_SCALE: Vec3 = Vec3::new(1.2, 1.0, 1.0);

#[derive(Debug, Clone, PartialEq)]
pub struct BackdropBubble {
    pub text: &'static str,
    pub position: Vec3,
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct Backdrop {
    bubbles: Vec<BackdropBubble>,
}

impl Backdrop {
    /// Two balloons flanking the character; `compact` pulls them in for narrow viewports.
    pub fn new(compact: bool) -> Self {
        let (x, y, scale) = if compact { (1.0, [1.8, 1.6], 2.0) } else { (1.6, [2.2, 2.0], 3.2) };
        let bubbles = vec![
            BackdropBubble { text: BACKDROP_LINES[0], position: Vec3::new(x, y[0], BACKDROP_Z), scale },
            BackdropBubble { text: BACKDROP_LINES[1], position: Vec3::new(-x, y[1], BACKDROP_Z + 0.1), scale },
        ];
        Self { bubbles }
    }

    pub fn bubbles(&self) -> &[BackdropBubble] { &self.bubbles }

    /// Bobs bubble `i` by `sin(now·2 + i)·0.003` per 60 Hz frame.
    pub fn update(&mut self, now: f32, dt: f32) {
        for (i, b) in self.bubbles.iter_mut().enumerate() {
            b.position.y += (now * 2.0 + i as f32).sin() * per_frame_sum(BOB, dt);
        }
    }

    pub fn sprites(&self) -> impl Iterator<Item = SpriteState<'_>> + '_ {
        self.bubbles.iter().map(|b| {
            SpriteState::new(SpriteKind::ComicBubble, b.position)
                .with_text(b.text, BACKDROP_STYLE)
                .with_scale(Vec3::splat(b.scale))
        })
    }
}

/// The bubble riding on the voice button while recording.
pub fn live_voice_sprite(text: &str, at: Vec3) -> SpriteState<'_> {
    let mut sprite = SpriteState::new(SpriteKind::TextBubble, at)
        .with_text(text, LIVE_VOICE_STYLE)
        .with_scale(LIVE_VOICE_SCALE);
    sprite.on_top = true;
    sprite
}
