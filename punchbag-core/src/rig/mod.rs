//! Skeleton import and rig building.
//!
//! Bones are tagged once at import time ([`classify`]); the hit and dance rigs
//! are then built from the same ordered candidate list.

pub mod classify;
pub mod clips;

use anyhow::{Context, Result};
use glam::Quat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::schema::ToyConfig;
use crate::dance::DanceRig;
use crate::hit::HitRig;
pub use classify::{classify, BoneClass, BoneTags, Side};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDesc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default = "rest_identity")]
    pub rest: Quat,
}

fn rest_identity() -> Quat { Quat::IDENTITY }

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkeletonError {
    #[error("bone {bone} ({name}) has parent {parent} outside the skeleton")]
    ParentOutOfRange { bone: usize, name: String, parent: usize },
    #[error("bone {bone} ({name}) is its own parent")]
    SelfParent { bone: usize, name: String },
}

/// Bone list of a skinned character, in the asset's bone order.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<BoneDesc>,
    tags: Vec<BoneTags>,
    clips: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SkeletonFile {
    #[serde(default)]
    bones: Vec<BoneDesc>,
    /// Names of animation clips baked into the asset, if any.
    #[serde(default)]
    clips: Vec<String>,
}

impl Skeleton {
    pub fn new(bones: Vec<BoneDesc>) -> Result<Self, SkeletonError> {
        for (i, b) in bones.iter().enumerate() {
            match b.parent {
                Some(p) if p == i => return Err(SkeletonError::SelfParent { bone: i, name: b.name.clone() }),
                Some(p) if p >= bones.len() => {
                    return Err(SkeletonError::ParentOutOfRange { bone: i, name: b.name.clone(), parent: p })
                }
                _ => {}
            }
        }
        let tags = bones.iter().map(|b| classify(&b.name)).collect();
        Ok(Self { bones, tags, clips: Vec::new() })
    }

    pub fn with_clips(mut self, clips: Vec<String>) -> Self {
        self.clips = clips;
        self
    }

    /// Convenience for tests and tools: a chain of bones with identity rest poses.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let bones = names
            .iter()
            .enumerate()
            .map(|(i, n)| BoneDesc {
                name: n.as_ref().to_string(),
                parent: i.checked_sub(1),
                rest: Quat::IDENTITY,
            })
            .collect();
        Self::new(bones).unwrap_or_default()
    }

    pub fn bone_count(&self) -> usize { self.bones.len() }
    pub fn bones(&self) -> &[BoneDesc] { &self.bones }
    pub fn tags(&self, index: usize) -> BoneTags { self.tags[index] }
    pub fn rest(&self, index: usize) -> Quat { self.bones[index].rest }
    pub fn clip_names(&self) -> &[String] { &self.clips }

    /// Number of ancestors above `index`.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut cur = self.bones[index].parent;
        while let Some(p) = cur {
            depth += 1;
            if depth > self.bones.len() { break; }
            cur = self.bones[p].parent;
        }
        depth
    }

    /// Rest rotations for every bone, the pose both rigs start from.
    pub fn rest_pose(&self) -> Vec<Quat> {
        self.bones.iter().map(|b| b.rest).collect()
    }

    /// Upper-body bones ordered by class, then by skeleton order.
    ///
    /// When no bone name classifies, falls back to bones `1..fallback_limit`
    /// (skipping the root).
    pub fn candidates(&self, fallback_limit: usize) -> Vec<usize> {
        let mut picked: Vec<usize> = (0..self.bones.len())
            .filter(|&i| self.tags[i].class != BoneClass::Other)
            .collect();
        picked.sort_by_key(|&i| (self.tags[i].class, i));
        if picked.is_empty() {
            picked = (1..fallback_limit.min(self.bones.len())).collect();
        }
        picked
    }
}

/// The two parallel rigs built from one skeleton. Either may be missing.
#[derive(Debug, Clone, Default)]
pub struct Rigs {
    pub hit: Option<HitRig>,
    pub dance: Option<DanceRig>,
}

pub fn build_rigs(skeleton: &Skeleton, cfg: &ToyConfig) -> Rigs {
    let hit_bones = skeleton.candidates(cfg.spring.fallback_bones);
    let dance_bones = skeleton.candidates(cfg.dance.fallback_bones);
    debug!(bones = skeleton.bone_count(), hit = hit_bones.len(), dance = dance_bones.len(), "building rigs");
    let hit = (!hit_bones.is_empty()).then(|| HitRig::new(skeleton, &hit_bones, cfg.spring));
    let dance = (!dance_bones.is_empty()).then(|| DanceRig::new(skeleton, &dance_bones, &cfg.dance));
    if hit.is_none() { debug!("no hit candidates; procedural hit disabled"); }
    if dance.is_none() { debug!("no dance candidates; procedural dance disabled"); }
    Rigs { hit, dance }
}

pub fn load_from_yaml_str(s: &str) -> Result<Skeleton> {
    let file: SkeletonFile = serde_yaml::from_str(s)?;
    Ok(Skeleton::new(file.bones)?.with_clips(file.clips))
}

pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Skeleton> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading skeleton {}", path.display()))?;
    load_from_yaml_str(&data)
}
