//! Baked animation clips, split into hit reactions and dance loops by name.

use rand::Rng;
use regex::Regex;
use std::sync::OnceLock;

fn hit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("(?i)hit|hurt|impact|damage|react|stun|knock").expect("static clip pattern"))
}

fn loop_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("(?i)dance|dancing|idle|stand|breath|loop|walk|run").expect("static clip pattern"))
}

fn idle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("(?i)idle|stand|breath|loop").expect("static clip pattern"))
}

#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    hit: Vec<String>,
    dance: Vec<String>,
    last_hit: Option<usize>,
}

impl ClipLibrary {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let names: Vec<&str> = names.iter().map(|s| s.as_ref()).collect();
        let own = |v: Vec<&str>| -> Vec<String> { v.into_iter().map(str::to_string).collect() };

        let by_hit: Vec<&str> = names.iter().copied().filter(|n| hit_re().is_match(n)).collect();
        let non_loop: Vec<&str> = names.iter().copied().filter(|n| !loop_re().is_match(n)).collect();
        let hit = if !by_hit.is_empty() {
            by_hit
        } else if !non_loop.is_empty() {
            non_loop
        } else {
            names.clone()
        };

        let by_dance: Vec<&str> = names.iter().copied().filter(|n| loop_re().is_match(n)).collect();
        let mut dance = if !by_dance.is_empty() {
            by_dance
        } else {
            names.iter().copied().filter(|n| idle_re().is_match(n)).collect()
        };
        if dance.is_empty() {
            dance.extend(names.first().copied());
        }

        Self { hit: own(hit), dance: own(dance), last_hit: None }
    }

    pub fn hit_clips(&self) -> &[String] { &self.hit }
    pub fn dance_clips(&self) -> &[String] { &self.dance }
    pub fn is_empty(&self) -> bool { self.hit.is_empty() && self.dance.is_empty() }

    /// Random hit clip, avoiding an immediate repeat when there is a choice.
    pub fn pick_hit<R: Rng>(&mut self, rng: &mut R) -> Option<&str> {
        if self.hit.is_empty() { return None; }
        let mut i = rng.gen_range(0..self.hit.len());
        if self.hit.len() > 1 && Some(i) == self.last_hit {
            i = (i + 1) % self.hit.len();
        }
        self.last_hit = Some(i);
        Some(&self.hit[i])
    }

    pub fn pick_dance<R: Rng>(&self, rng: &mut R) -> Option<&str> {
        if self.dance.is_empty() { return None; }
        Some(&self.dance[rng.gen_range(0..self.dance.len())])
    }
}
