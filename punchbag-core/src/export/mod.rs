//! Trace export: per-frame bone rotations and sprite states as JSON.
//!
//! A headless run has nothing to draw, so the trace is what a viewer (or a
//! test) consumes instead.

use anyhow::{Context, Result};
use serde::Serialize;
use slotmap::Key;

use crate::app::{AppState, Stats};
use crate::fx::{Anchor, SpriteKind, SpriteState};
use crate::motion::CharacterTransform;
use crate::rig::Skeleton;

#[derive(Debug, Clone, Serialize)]
pub struct TraceMeta {
    pub version: String,
    pub fps: f32,
    pub seed: Option<u64>,
    pub bones: Vec<String>,
}

impl Default for TraceMeta {
    fn default() -> Self { Self { version: crate::VERSION.to_string(), fps: 60.0, seed: None, bones: Vec::new() } }
}

impl TraceMeta {
    pub fn for_skeleton(skeleton: &Skeleton, fps: f32, seed: Option<u64>) -> Self {
        Self { fps, seed, bones: skeleton.bones().iter().map(|b| b.name.clone()).collect(), ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpriteRecord {
    /// Stable for the sprite's whole life; scene sprites have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<u64>,
    pub kind: SpriteKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub anchor: Anchor,
    pub position: [f32; 3],
    pub scale: [f32; 3],
    pub opacity: f32,
}

impl SpriteRecord {
    fn new(key: Option<u64>, s: &SpriteState<'_>) -> Self {
        Self {
            key,
            kind: s.kind,
            text: s.text.map(|(t, _)| t.to_string()),
            anchor: s.anchor,
            position: s.position.to_array(),
            scale: s.scale.to_array(),
            opacity: s.opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterRecord {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: f32,
    pub visible: bool,
}

impl From<&CharacterTransform> for CharacterRecord {
    fn from(t: &CharacterTransform) -> Self {
        Self { position: t.position.to_array(), rotation: t.rotation.to_array(), scale: t.scale, visible: t.visible }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceFrame {
    pub time: f32,
    /// Local rotation of every bone as `[x, y, z, w]`, in skeleton order.
    pub bones: Vec<[f32; 4]>,
    pub sprites: Vec<SpriteRecord>,
    /// Backdrop balloons and the live voice bubble.
    pub scene: Vec<SpriteRecord>,
    pub character: CharacterRecord,
}

impl TraceFrame {
    pub fn capture(app: &AppState) -> Self {
        Self {
            time: app.now(),
            bones: app.motion().pose().iter().map(|q| q.to_array()).collect(),
            sprites: app.timeline().sprites().map(|(k, s)| SpriteRecord::new(Some(k.data().as_ffi()), &s)).collect(),
            scene: app.scene_sprites().map(|s| SpriteRecord::new(None, &s)).collect(),
            character: app.body().into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    pub meta: TraceMeta,
    pub frames: Vec<TraceFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
}

impl Trace {
    pub fn new(meta: TraceMeta) -> Self { Self { meta, frames: Vec::new(), stats: None } }

    pub fn record(&mut self, app: &AppState) { self.frames.push(TraceFrame::capture(app)); }

    pub fn finish(&mut self, app: &AppState) { self.stats = Some(app.stats()); }

    pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string_pretty(self)?) }

    pub fn write_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).with_context(|| format!("creating trace {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)
            .with_context(|| format!("writing trace {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Offline;
    use crate::config::schema::ToyConfig;
    use std::sync::Arc;

    fn app() -> (Skeleton, AppState) {
        let skeleton = Skeleton::from_names(&["Hips", "Spine", "Neck", "Head"]);
        let app = AppState::with_seed(&skeleton, ToyConfig::default(), Arc::new(Offline), 11);
        (skeleton, app)
    }

    #[test]
    fn frame_captures_pose_and_sprites() {
        let (skeleton, mut app) = app();
        app.shoot_text("哼", 1.0);
        app.update(1.0 / 60.0);
        let frame = TraceFrame::capture(&app);
        assert_eq!(frame.bones.len(), skeleton.bone_count());
        assert_eq!(frame.sprites.len(), 1);
        assert_eq!(frame.sprites[0].kind, SpriteKind::TextBubble);
        assert_eq!(frame.sprites[0].text.as_deref(), Some("哼"));
        assert!(frame.character.visible);
        assert!(frame.sprites[0].key.is_some());
        assert_eq!(frame.scene.len(), 2);
        assert!(frame.scene.iter().all(|s| s.kind == SpriteKind::ComicBubble && s.key.is_none()));
    }

    #[test]
    fn trace_serializes_with_snake_case_kinds() {
        let (skeleton, mut app) = app();
        let mut trace = Trace::new(TraceMeta::for_skeleton(&skeleton, 60.0, Some(11)));
        app.throw_egg();
        app.update(1.0 / 60.0);
        trace.record(&app);
        trace.finish(&app);
        let json: serde_json::Value = serde_json::from_str(&trace.to_json().unwrap()).unwrap();
        assert_eq!(json["meta"]["bones"][3], "Head");
        assert_eq!(json["meta"]["seed"], 11);
        assert_eq!(json["frames"][0]["sprites"][0]["kind"], "egg_shell");
        assert_eq!(json["frames"][0]["bones"][0].as_array().unwrap().len(), 4);
        assert_eq!(json["stats"]["eggs"], 1);
        assert_eq!(json["frames"][0]["scene"][1]["kind"], "comic_bubble");
        assert!(json["frames"][0]["scene"][1].get("key").is_none());
    }

    #[test]
    fn write_json_reports_bad_paths() {
        let trace = Trace::new(TraceMeta::default());
        let err = trace.write_json("/nonexistent-dir/trace.json").unwrap_err();
        assert!(err.to_string().contains("creating trace"));
    }
}
