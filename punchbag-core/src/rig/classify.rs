//! Name-based bone tagging, run once when a skeleton is imported.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Skeletal region a bone belongs to. Variant order is candidate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BoneClass {
    Spine,
    Neck,
    Head,
    Clavicle,
    UpperArm,
    LowerArm,
    Hand,
    Other,
}

impl BoneClass {
    pub fn label(self) -> &'static str {
        match self {
            BoneClass::Spine => "spine",
            BoneClass::Neck => "neck",
            BoneClass::Head => "head",
            BoneClass::Clavicle => "clavicle",
            BoneClass::UpperArm => "upper-arm",
            BoneClass::LowerArm => "lower-arm",
            BoneClass::Hand => "hand",
            BoneClass::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Mirror factor for side-dependent motion.
    pub fn sign(self) -> f32 {
        match self { Side::Left => -1.0, Side::Right => 1.0 }
    }
}

/// Everything the rigs need to know about a bone, derived from its name.
///
/// `arm`, `head` and `spine` are looser than `class`: a bone named
/// `ShoulderTwist` is a clavicle but also counts as an arm for weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoneTags {
    pub class: BoneClass,
    pub arm: bool,
    pub head: bool,
    pub spine: bool,
    pub side: Side,
}

struct Patterns {
    groups: [(BoneClass, Regex); 7],
    arm: Regex,
    left: Regex,
}

impl Patterns {
    fn new() -> Self {
        let re = |p: &str| Regex::new(&format!("(?i){p}")).expect("static bone pattern");
        Self {
            groups: [
                (BoneClass::Spine, re("spine|chest|upperchest|torso")),
                (BoneClass::Neck, re("neck")),
                (BoneClass::Head, re("head")),
                (BoneClass::Clavicle, re("clavicle|collar|shoulder")),
                (BoneClass::UpperArm, re(r"upperarm|uparm|arm\.?l|arm\.?r|arm_l|arm_r|leftarm|rightarm")),
                (BoneClass::LowerArm, re("lowerarm|forearm|loarm|elbow")),
                (BoneClass::Hand, re("hand|wrist")),
            ],
            arm: re("clavicle|collar|shoulder|arm|forearm|hand|wrist|elbow"),
            left: re(r"left|l\.|_l"),
        }
    }

    fn get() -> &'static Patterns {
        static PATTERNS: OnceLock<Patterns> = OnceLock::new();
        PATTERNS.get_or_init(Patterns::new)
    }
}

pub fn classify(name: &str) -> BoneTags {
    let p = Patterns::get();
    let class = p
        .groups
        .iter()
        .find(|(_, re)| re.is_match(name))
        .map(|(class, _)| *class)
        .unwrap_or(BoneClass::Other);
    let side = if p.left.is_match(name) { Side::Left } else { Side::Right };
    BoneTags {
        class,
        arm: p.arm.is_match(name),
        head: p.groups[2].1.is_match(name),
        spine: p.groups[0].1.is_match(name),
        side,
    }
}
