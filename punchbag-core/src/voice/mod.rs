//! Voice spray: microphone loudness and the text that gets shot at the face.
//!
//! Speech recognition itself lives outside the crate; a host feeds interim
//! and final transcripts into [`VoiceSession::on_transcript`] and raw
//! analyser bytes into [`VoiceSession::feed`].

use tracing::{debug, warn};

/// Bubble text while nothing has been recognized yet.
pub const LIVE_PLACEHOLDER: &str = "...";
/// Sent when the manual entry box is submitted empty.
pub const SPEECHLESS: &str = "（气到说不出话）";
/// Sent when the manual entry box is dismissed empty.
pub const MUTTER: &str = "……";
pub const MIC_DENIED: &str = "（麦克风权限被拒绝）";
pub const NO_RECORDER: &str = "（未支持实时语音）";

const SMOOTHING: f32 = 0.85;
const MIN_VOLUME: f32 = 0.02;
/// Loudness that maps to the middle of the amplitude range.
const VOLUME_SCALE: f32 = 0.35;
pub const MIN_AMP: f32 = 0.7;
pub const MAX_AMP: f32 = 2.3;

/// RMS of unsigned 8-bit time-domain samples centered on 128.
pub fn rms_u8(samples: &[u8]) -> f32 {
    if samples.is_empty() { return 0.0; }
    let sum: f32 = samples
        .iter()
        .map(|&b| {
            let v = (b as f32 - 128.0) / 128.0;
            v * v
        })
        .sum();
    (sum / samples.len() as f32).sqrt()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoudnessMeter {
    current: f32,
    peak: f32,
}

impl LoudnessMeter {
    pub fn current(&self) -> f32 { self.current }
    pub fn peak(&self) -> f32 { self.peak }

    pub fn reset(&mut self) { *self = Self::default(); }

    /// Folds one analyser frame into the smoothed loudness.
    pub fn feed(&mut self, samples: &[u8]) -> f32 {
        self.current = self.current * SMOOTHING + rms_u8(samples) * (1.0 - SMOOTHING);
        self.peak = self.peak.max(self.current);
        self.current
    }

    /// Spray amplitude in `[MIN_AMP, MAX_AMP]`; silence still gives `MIN_AMP`.
    pub fn amplitude(&self) -> f32 {
        let vol = self.peak.max(self.current).max(MIN_VOLUME);
        let norm = (vol / VOLUME_SCALE).clamp(0.0, 2.0);
        (MIN_AMP + norm * 1.6).clamp(MIN_AMP, MAX_AMP)
    }
}

/// Text to spray and how hard.
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub text: String,
    pub amp: f32,
}

/// Recording ended without a recognizer: the user types the line instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualEntry {
    pub draft: String,
    pub amp: f32,
}

impl ManualEntry {
    /// Always shoots something.
    pub fn send(self, typed: &str) -> Shot {
        let text = match typed.trim() {
            "" => SPEECHLESS.to_string(),
            t => t.to_string(),
        };
        Shot { text, amp: self.amp }
    }

    /// A dismissed empty box still mutters; a dismissed draft is dropped.
    pub fn cancel(self, typed: &str) -> Option<Shot> {
        typed.trim().is_empty().then(|| Shot { text: MUTTER.to_string(), amp: (self.amp * 0.8).max(MIN_AMP) })
    }
}

/// Why the microphone could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicProblem {
    Denied,
    /// Audio capture works but nothing can record it.
    Unsupported,
}

impl MicProblem {
    pub fn notice(self) -> &'static str {
        match self {
            MicProblem::Denied => MIC_DENIED,
            MicProblem::Unsupported => NO_RECORDER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceOutcome {
    Shoot(Shot),
    ManualEntry(ManualEntry),
}

#[derive(Debug, Clone)]
pub struct VoiceSession {
    live_text: String,
    meter: LoudnessMeter,
    recognizer: bool,
}

impl VoiceSession {
    /// `recognizer` says whether transcripts will arrive during recording.
    pub fn start(recognizer: bool) -> Self {
        debug!(recognizer, "voice recording");
        Self { live_text: LIVE_PLACEHOLDER.to_string(), meter: LoudnessMeter::default(), recognizer }
    }

    pub fn live_text(&self) -> &str { &self.live_text }
    pub fn meter(&self) -> &LoudnessMeter { &self.meter }
    pub fn has_recognizer(&self) -> bool { self.recognizer }

    pub fn feed(&mut self, samples: &[u8]) -> f32 { self.meter.feed(samples) }

    /// Final text wins over interim; blank results keep the previous text.
    pub fn on_transcript(&mut self, interim: &str, final_text: &str) {
        let next = (if final_text.is_empty() { interim } else { final_text }).trim();
        if !next.is_empty() {
            self.live_text = next.to_string();
        }
    }

    /// Status line shown in the live bubble (permission denied and the like).
    pub fn notice(&mut self, text: &str) { self.live_text = text.to_string(); }

    /// Shows why recording is not happening. The session stays open so the
    /// user can still end it.
    pub fn mic_failed(&mut self, problem: MicProblem) {
        warn!(?problem, "microphone unavailable");
        self.notice(problem.notice());
    }

    pub fn finish(self) -> VoiceOutcome {
        let amp = self.meter.amplitude();
        let text = match self.live_text.trim() {
            "" => LIVE_PLACEHOLDER.to_string(),
            t => t.to_string(),
        };
        if self.recognizer {
            VoiceOutcome::Shoot(Shot { text, amp })
        } else {
            VoiceOutcome::ManualEntry(ManualEntry { draft: text, amp })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_and_full_swing() {
        assert_eq!(rms_u8(&[]), 0.0);
        assert_eq!(rms_u8(&[128; 64]), 0.0);
        assert!((rms_u8(&[0, 0, 0, 0]) - 1.0).abs() < 1e-6);
        assert!((rms_u8(&[192, 64]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn meter_smooths_and_keeps_peak() {
        let mut m = LoudnessMeter::default();
        assert!((m.feed(&[0; 8]) - 0.15).abs() < 1e-6);
        assert!((m.feed(&[0; 8]) - (0.15 * 0.85 + 0.15)).abs() < 1e-6);
        let peak = m.peak();
        m.feed(&[128; 8]);
        assert!(m.current() < peak);
        assert_eq!(m.peak(), peak);
        m.reset();
        assert_eq!(m, LoudnessMeter::default());
    }

    #[test]
    fn amplitude_maps_into_range() {
        let mut m = LoudnessMeter::default();
        assert!((m.amplitude() - (0.7 + 0.02 / 0.35 * 1.6)).abs() < 1e-6);
        for _ in 0..100 {
            m.feed(&[0; 16]);
        }
        assert_eq!(m.amplitude(), MAX_AMP);
    }

    #[test]
    fn transcripts_replace_the_placeholder() {
        let mut s = VoiceSession::start(true);
        assert_eq!(s.live_text(), "...");
        s.on_transcript("你", "");
        assert_eq!(s.live_text(), "你");
        s.on_transcript("   ", "");
        assert_eq!(s.live_text(), "你");
        s.on_transcript("你这个", " 你这个笨蛋 ");
        assert_eq!(s.live_text(), "你这个笨蛋");
        match s.finish() {
            VoiceOutcome::Shoot(shot) => {
                assert_eq!(shot.text, "你这个笨蛋");
                assert!(shot.amp >= MIN_AMP);
            }
            other => panic!("expected a shot, got {other:?}"),
        }
    }

    #[test]
    fn no_recognizer_falls_back_to_typing() {
        let s = VoiceSession::start(false);
        let VoiceOutcome::ManualEntry(entry) = s.finish() else { panic!("expected manual entry") };
        assert_eq!(entry.draft, "...");

        assert_eq!(entry.clone().send("  ").text, SPEECHLESS);
        assert_eq!(entry.clone().send(" 滚 ").text, "滚");
        let muttered = entry.clone().cancel("").unwrap();
        assert_eq!(muttered.text, MUTTER);
        assert_eq!(muttered.amp, MIN_AMP);
        assert!(entry.cancel("draft").is_none());
    }

    #[test]
    fn mic_failure_shows_in_the_live_bubble() {
        let mut s = VoiceSession::start(false);
        s.mic_failed(MicProblem::Denied);
        assert_eq!(s.live_text(), MIC_DENIED);
        s.mic_failed(MicProblem::Unsupported);
        assert_eq!(s.live_text(), NO_RECORDER);
        let VoiceOutcome::ManualEntry(entry) = s.finish() else { panic!("expected manual entry") };
        assert_eq!(entry.draft, NO_RECORDER);
    }

    #[test]
    fn loud_cancel_keeps_most_of_the_amplitude() {
        let entry = ManualEntry { draft: String::new(), amp: 2.0 };
        assert!((entry.cancel("").unwrap().amp - 1.6).abs() < 1e-6);
    }
}
