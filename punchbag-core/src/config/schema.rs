use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToyConfig {
    pub spring: SpringConfig,
    pub dance: DanceConfig,
    pub effects: EffectsConfig,
    pub flush: FlushConfig,
    pub chat: ChatConfig,
    pub completion: CompletionConfig,
    pub pools: Pools,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub stiffness: f32,
    /// Defaults to critical damping (2·sqrt(stiffness)) when absent.
    pub damping: Option<f32>,
    /// Seconds a fresh impact counts as pending; settling is blocked meanwhile.
    pub hold: f32,
    pub settle_offset_sq: f32,
    pub settle_velocity_sq: f32,
    /// Seconds after the last impact by which every bone is back at rest exactly.
    pub settle_after: f32,
    /// Bones taken from the front of the skeleton when nothing classifies.
    pub fallback_bones: usize,
}

impl SpringConfig {
    pub fn damping(&self) -> f32 {
        self.damping.unwrap_or_else(|| 2.0 * self.stiffness.max(0.0).sqrt())
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 38.0,
            damping: None,
            hold: 0.45,
            settle_offset_sq: 1e-5,
            settle_velocity_sq: 1e-4,
            settle_after: 1.0,
            fallback_bones: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DanceConfig {
    pub arm_amplitude: f32,
    pub head_amplitude: f32,
    pub spine_amplitude: f32,
    pub other_amplitude: f32,
    pub arm_speed: f32,
    pub head_speed: f32,
    pub other_speed: f32,
    /// Seconds after the last hit before the dance resumes.
    pub cooldown: f32,
    pub fallback_bones: usize,
}

impl Default for DanceConfig {
    fn default() -> Self {
        Self {
            arm_amplitude: 0.25,
            head_amplitude: 0.15,
            spine_amplitude: 0.2,
            other_amplitude: 0.12,
            arm_speed: 1.8,
            head_speed: 1.2,
            other_speed: 1.5,
            cooldown: 0.45,
            fallback_bones: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub text_flight: f32,
    pub text_font_size: f32,
    pub shard_life: f32,
    pub shard_max_glyphs: usize,
    pub reply_life: f32,
    pub reply_rise: f32,
    pub slogan_duration: f32,
    pub egg_speed: f32,
    pub egg_break_at: f32,
    pub egg_arc_height: f32,
    pub egg_linger: f32,
    pub stain_life: f32,
    pub shake: f32,
    /// Narrow viewports use the compact slogan layout.
    pub compact: bool,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            text_flight: 0.85,
            text_font_size: 56.0,
            shard_life: 0.45,
            shard_max_glyphs: 10,
            reply_life: 1.4,
            reply_rise: 0.35,
            slogan_duration: 3.0,
            egg_speed: 1.2,
            egg_break_at: 0.85,
            egg_arc_height: 1.5,
            egg_linger: 0.4,
            stain_life: 8.0,
            shake: 0.3,
            compact: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    pub duration: f32,
    /// Fraction of `duration` spent spinning in place before being sucked down.
    pub spin_fraction: f32,
    pub gone_delay: f32,
    pub hidden: f32,
    pub max_particle_dt: f32,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self { duration: 1.5, spin_fraction: 0.4, gone_delay: 0.5, hidden: 3.0, max_particle_dt: 0.05 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self { Self { endpoint: None, timeout_secs: 20 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1/chat/completions".into(),
            model: "Qwen/Qwen3-8B".into(),
            temperature: 1.3,
            max_tokens: 50,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pools {
    pub hit_replies: Vec<String>,
    pub slogans: Vec<String>,
    pub chat_fallbacks: Vec<String>,
}

impl Default for Pools {
    fn default() -> Self {
        let own = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            hit_replies: own(&[
                "错了错了！",
                "别打了！",
                "有话好好说！",
                "我知道错了还不行吗？",
                "轻点轻点！",
                "哎哟～",
                "饶命啊大哥！",
                "我再也不敢了！",
                "冷静冷静……",
                "嘴下留情！",
                "打脸就过分了！",
            ]),
            slogans: own(&[
                "冲走了，压力也走了。",
                "好了，先把烦恼冲下去。",
                "呼——这一波，算你赢。",
                "别急，先把心情清空一下。",
                "今天就到这儿，明天再说。",
                "已冲走：烦恼.exe",
                "压力：已清空（回收站）。",
                "冲走成功！请勿回收。",
                "已完成：情绪卸载 100%。",
                "冲走了！谁都别拦我快乐！",
                "冲走的是压力，不是你。",
                "把糟心事冲走，把自己留下。",
                "讨厌的事：拜拜了您嘞。",
                "不爽归不爽，先冲掉再讲。",
                "世界很吵，先让它安静一秒。",
                "冲走了。\n你也该轻一点了。",
                "压力下去了。\n你还在。",
                "这一坨烦恼没了。\n下一口气更顺。",
            ]),
            chat_fallbacks: own(&[
                "你说啥？风太大听不见！",
                "就这？再骂大声点！",
                "我听到了，但我选择装死。",
                "网络不好，算你赢一次。",
                "嘴上功夫不错嘛～",
            ]),
        }
    }
}
