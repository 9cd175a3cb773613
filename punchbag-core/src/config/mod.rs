pub mod schema;

use anyhow::{Context, Result};
use schema::ToyConfig;

pub fn load_from_yaml_str(s: &str) -> Result<ToyConfig> {
    let cfg: ToyConfig = serde_yaml::from_str(s)?;
    Ok(cfg)
}

pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<ToyConfig> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    load_from_yaml_str(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_from_yaml_str("{}").unwrap();
        assert_eq!(cfg.spring.stiffness, 38.0);
        assert_eq!(cfg.dance.fallback_bones, 8);
        assert_eq!(cfg.pools.hit_replies.len(), 11);
        assert_eq!(cfg.pools.slogans.len(), 18);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = load_from_yaml_str("spring:\n  stiffness: 64.0\neffects:\n  compact: true\n").unwrap();
        assert_eq!(cfg.spring.stiffness, 64.0);
        assert_eq!(cfg.spring.hold, 0.45);
        assert!((cfg.spring.damping() - 16.0).abs() < 1e-5);
        assert!(cfg.effects.compact);
        assert_eq!(cfg.effects.reply_life, 1.4);
    }

    #[test]
    fn explicit_damping_wins() {
        let cfg = load_from_yaml_str("spring:\n  damping: 9.5\n").unwrap();
        assert_eq!(cfg.spring.damping(), 9.5);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(load_from_yaml_str("spring: [1, 2").is_err());
    }
}
