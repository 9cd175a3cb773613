//! Application state: everything the frame loop and the buttons touch.

pub mod scene;
pub mod sign;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::chat::{ChatReply, Pool, ReplyPump, ReplySource};
use crate::config::schema::{Pools, ToyConfig};
use crate::fx::curves::per_frame;
use crate::fx::{EffectKey, EffectKind, EffectTimeline, Impact, SpriteState};
use crate::flush::{FlushEvent, FlushSequence};
use crate::motion::{CharacterMotion, CharacterTransform, HitReaction};
use crate::rig::Skeleton;
use crate::voice::{ManualEntry, MicProblem, Shot, VoiceOutcome, VoiceSession};

pub use scene::{Backdrop, BackdropBubble};
pub use sign::{sign_text, split_lines};

/// Face point in character space for a roughly human-sized model.
pub const DEFAULT_FACE: Vec3 = Vec3::new(0.0, 1.7, 0.35);
/// Where sprayed text starts: just in front of the camera, lower right.
pub const DEFAULT_INPUT_POINT: Vec3 = Vec3::new(0.8, 1.2, 3.0);
const SHAKE_SPEED: f32 = 30.0;
const SHAKE_ANGLE: f32 = 0.25;
const SHAKE_DECAY: f32 = 0.9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub hits: u32,
    pub eggs: u32,
    pub texts: u32,
    pub flushes: u32,
    pub chat_replies: u32,
    pub chat_fallbacks: u32,
}

/// What happened during one `update`.
#[derive(Debug, Default)]
pub struct FrameReport {
    pub impacts: Vec<Impact>,
    pub reactions: Vec<HitReaction>,
    pub chat: Option<ChatReply>,
    pub flush: Option<FlushEvent>,
}

#[derive(Debug)]
pub struct AppState {
    cfg: ToyConfig,
    motion: CharacterMotion,
    timeline: EffectTimeline,
    flush: FlushSequence,
    body: CharacterTransform,
    backdrop: Backdrop,
    face_local: Vec3,
    input_point: Vec3,
    shake: f32,
    now: f32,
    sign: String,
    voice: Option<VoiceSession>,
    pump: ReplyPump,
    hit_replies: Pool,
    slogans: Pool,
    rng: StdRng,
    stats: Stats,
}

impl AppState {
    pub fn new(skeleton: &Skeleton, cfg: ToyConfig, replies: Arc<dyn ReplySource>) -> Self {
        Self::with_rng(skeleton, cfg, replies, StdRng::from_entropy())
    }

    /// Reproducible runs for tests and headless simulation.
    pub fn with_seed(skeleton: &Skeleton, cfg: ToyConfig, replies: Arc<dyn ReplySource>, seed: u64) -> Self {
        Self::with_rng(skeleton, cfg, replies, StdRng::seed_from_u64(seed))
    }

    fn with_rng(skeleton: &Skeleton, cfg: ToyConfig, replies: Arc<dyn ReplySource>, rng: StdRng) -> Self {
        let defaults = Pools::default();
        let fallbacks = Pool::or_default(&cfg.pools.chat_fallbacks, &defaults.chat_fallbacks);
        Self {
            motion: CharacterMotion::new(skeleton, &cfg),
            timeline: EffectTimeline::new(cfg.effects, cfg.flush.max_particle_dt),
            flush: FlushSequence::new(cfg.flush),
            body: CharacterTransform::default(),
            backdrop: Backdrop::new(cfg.effects.compact),
            face_local: DEFAULT_FACE,
            input_point: DEFAULT_INPUT_POINT,
            shake: 0.0,
            now: 0.0,
            sign: sign::DEFAULT_SIGN.to_string(),
            voice: None,
            pump: ReplyPump::new(replies, fallbacks),
            hit_replies: Pool::or_default(&cfg.pools.hit_replies, &defaults.hit_replies),
            slogans: Pool::or_default(&cfg.pools.slogans, &defaults.slogans),
            rng,
            stats: Stats::default(),
            cfg,
        }
    }

    pub fn config(&self) -> &ToyConfig { &self.cfg }
    pub fn motion(&self) -> &CharacterMotion { &self.motion }
    pub fn timeline(&self) -> &EffectTimeline { &self.timeline }
    pub fn flush_sequence(&self) -> &FlushSequence { &self.flush }
    pub fn body(&self) -> &CharacterTransform { &self.body }
    pub fn backdrop(&self) -> &Backdrop { &self.backdrop }
    pub fn stats(&self) -> Stats { self.stats }
    pub fn now(&self) -> f32 { self.now }
    pub fn is_shaking(&self) -> bool { self.shake > 0.0 }
    pub fn is_flushing(&self) -> bool { self.flush.is_running() }
    pub fn is_recording(&self) -> bool { self.voice.is_some() }
    pub fn chat_busy(&self) -> bool { self.pump.is_busy() }

    /// Keys of effects removed since the last call, for visual cleanup.
    pub fn drain_retired(&mut self) -> Vec<EffectKey> { self.timeline.drain_retired().collect() }

    /// Face target in character space, usually estimated from the model bounds.
    pub fn set_face_local(&mut self, face: Vec3) { self.face_local = face; }
    pub fn face_world(&self) -> Vec3 { self.body.to_world(self.face_local) }

    pub fn set_input_point(&mut self, point: Vec3) { self.input_point = point; }
    pub fn input_point(&self) -> Vec3 { self.input_point }

    pub fn sign_text(&self) -> &str { &self.sign }
    pub fn sign_lines(&self) -> Vec<String> { split_lines(&self.sign) }

    pub fn set_sign_text(&mut self, input: &str) -> &str {
        self.sign = sign_text(input);
        &self.sign
    }

    pub fn throw_egg(&mut self) -> EffectKey {
        self.stats.eggs += 1;
        debug!("egg thrown");
        self.timeline.throw_egg(&mut self.rng)
    }

    /// Sprays `text` from the input point at the face.
    pub fn shoot_text(&mut self, text: &str, amp: f32) -> EffectKey {
        self.stats.texts += 1;
        let target = self.face_world();
        self.timeline.spawn_flying_text(text, amp, self.input_point, target)
    }

    pub fn flush(&mut self) -> bool {
        if !self.flush.start(&self.body, &mut self.timeline) {
            return false;
        }
        self.motion.suspend();
        self.shake = 0.0;
        self.stats.flushes += 1;
        true
    }

    /// Shoots the message and asks for a reply. Refused while a reply is pending.
    pub fn submit_chat(&mut self, message: &str) -> bool {
        if !self.pump.submit(message) {
            return false;
        }
        self.shoot_text(message.trim(), 1.0);
        true
    }

    pub fn start_voice(&mut self, recognizer: bool) -> bool {
        if self.voice.is_some() {
            return false;
        }
        self.voice = Some(VoiceSession::start(recognizer));
        true
    }

    pub fn voice(&self) -> Option<&VoiceSession> { self.voice.as_ref() }
    pub fn voice_mut(&mut self) -> Option<&mut VoiceSession> { self.voice.as_mut() }

    /// Puts the reason in the live bubble. Ignored when not recording.
    pub fn mic_failed(&mut self, problem: MicProblem) -> bool {
        let Some(voice) = self.voice.as_mut() else { return false };
        voice.mic_failed(problem);
        true
    }

    /// Live transcript bubble, riding on the input point while recording.
    pub fn live_voice_sprite(&self) -> Option<SpriteState<'_>> {
        self.voice.as_ref().map(|v| scene::live_voice_sprite(v.live_text(), self.input_point))
    }

    /// Backdrop balloons plus the live voice bubble; the timeline's sprites are separate.
    pub fn scene_sprites(&self) -> impl Iterator<Item = SpriteState<'_>> + '_ {
        self.backdrop.sprites().chain(self.live_voice_sprite())
    }

    /// Ends recording. Recognized speech is shot right away; without a
    /// recognizer the caller gets a draft to finish by hand.
    pub fn stop_voice(&mut self) -> Option<ManualEntry> {
        match self.voice.take()?.finish() {
            VoiceOutcome::Shoot(shot) => {
                self.shoot(shot);
                None
            }
            VoiceOutcome::ManualEntry(entry) => Some(entry),
        }
    }

    pub fn send_manual(&mut self, entry: ManualEntry, typed: &str) -> EffectKey { self.shoot(entry.send(typed)) }

    pub fn cancel_manual(&mut self, entry: ManualEntry, typed: &str) -> Option<EffectKey> {
        entry.cancel(typed).map(|shot| self.shoot(shot))
    }

    fn shoot(&mut self, shot: Shot) -> EffectKey { self.shoot_text(&shot.text, shot.amp) }

    pub fn update(&mut self, dt: f32) -> FrameReport {
        let dt = dt.max(0.0);
        self.now += dt;
        let mut report = FrameReport::default();

        report.flush = self.flush.update(dt, &mut self.body, &mut self.timeline, &mut self.rng);
        match report.flush {
            Some(FlushEvent::Vanished) => {
                self.timeline.clear_kind(EffectKind::Stain);
                let slogan = self.slogans.pick(&mut self.rng).to_string();
                self.timeline.spawn_slogan(&slogan);
            }
            Some(FlushEvent::Returned) => {
                self.motion.resume();
                info!("character is back");
            }
            None => {}
        }

        report.impacts = self.timeline.update(dt);
        for impact in &report.impacts {
            report.reactions.push(self.land(impact));
        }
        self.motion.update(dt);

        if !self.flush.is_running() {
            self.wobble(dt);
        }
        self.backdrop.update(self.now, dt);

        if let Some(reply) = self.pump.poll(&mut self.rng) {
            if reply.fallback {
                self.stats.chat_fallbacks += 1;
            } else {
                self.stats.chat_replies += 1;
            }
            let face = self.face_world();
            self.timeline.spawn_reply(&reply.text, face, &mut self.rng);
            report.chat = Some(reply);
        }
        report
    }

    fn land(&mut self, impact: &Impact) -> HitReaction {
        self.stats.hits += 1;
        if !self.flush.is_running() {
            self.shake = self.shake.max(self.cfg.effects.shake);
        }
        match impact {
            Impact::Text { text, at, .. } => {
                self.timeline.shatter(text, *at, &mut self.rng);
            }
            Impact::Egg { at } => {
                let local = self.body.to_local(*at);
                self.timeline.spawn_stain(local, &mut self.rng);
            }
        }
        let reaction = self.motion.hit(&mut self.rng);
        let line = self.hit_replies.pick(&mut self.rng).to_string();
        let face = self.face_world();
        self.timeline.spawn_reply(&line, face, &mut self.rng);
        reaction
    }

    fn wobble(&mut self, dt: f32) {
        if self.shake > 0.0 {
            self.shake -= dt;
            self.body.rotation.y = (self.now * SHAKE_SPEED).sin() * SHAKE_ANGLE;
        } else {
            self.body.rotation.y *= per_frame(SHAKE_DECAY, dt);
        }
    }
}
