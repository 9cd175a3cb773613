pub mod app;
pub mod chat;
pub mod completion;
pub mod config;
pub mod dance;
pub mod export;
pub mod flush;
pub mod fx;
pub mod hit;
pub mod motion;
pub mod rig;
pub mod voice;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
