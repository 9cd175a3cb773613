use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use punchbag_core::app::AppState;
use punchbag_core::chat::{HttpReplySource, Offline, ReplySource};
use punchbag_core::completion::{Action, HttpCompleter, TauntSession};
use punchbag_core::config::{self, schema::{CompletionConfig, ToyConfig}};
use punchbag_core::export::{Trace, TraceMeta};
use punchbag_core::fx::EffectKind;
use punchbag_core::motion::HitReaction;
use punchbag_core::{rig, VERSION};

#[derive(Parser, Debug)]
#[command(name = "punchbag", version = VERSION, about = "Stress-relief punching bag toy, headless")]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a skeleton YAML and show how its bones are rigged
    Inspect {
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the toy without a window and report what happened
    Simulate {
        path: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 6.0)]
        seconds: f32,
        #[arg(long, default_value_t = 60.0)]
        fps: f32,
        #[arg(long)]
        seed: Option<u64>,
        /// Eggs to throw, one every half second
        #[arg(long, default_value_t = 1)]
        eggs: u32,
        /// Text to spray at the face; repeatable
        #[arg(long = "say")]
        say: Vec<String>,
        /// Message for the reply endpoint (canned reply if none is configured)
        #[arg(long)]
        chat: Option<String>,
        /// Press the flush button at this time, in seconds
        #[arg(long)]
        flush_at: Option<f32>,
        /// Write a JSON trace of every frame
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Talk to the taunt generator from the terminal
    Taunt {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, env = "PUNCHBAG_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("punchbag=debug,punchbag_core=debug,warn")
        } else {
            EnvFilter::new("punchbag=info,punchbag_core=info,warn")
        }
    });
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true)).init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ToyConfig> {
    match path {
        Some(p) => config::load_from_path(p),
        None => Ok(ToyConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Inspect { path, config } => inspect(&path, config.as_ref()),
        Command::Simulate { path, config, seconds, fps, seed, eggs, say, chat, flush_at, out } => {
            let cfg = load_config(config.as_ref())?;
            let script = Script { seconds, fps, eggs, say, chat, flush_at };
            simulate(&path, cfg, seed, &script, out.as_ref())
        }
        Command::Taunt { config, base_url, model, api_key } => {
            let mut cfg = load_config(config.as_ref())?.completion;
            if let Some(url) = base_url { cfg.base_url = url; }
            if let Some(m) = model { cfg.model = m; }
            let Some(key) = api_key.filter(|k| !k.trim().is_empty()) else {
                bail!("no API key: pass --api-key or set PUNCHBAG_API_KEY");
            };
            taunt(cfg, &key)
        }
    }
}

fn inspect(path: &Path, config: Option<&PathBuf>) -> Result<()> {
    let cfg = load_config(config)?;
    let skeleton = rig::load_from_path(path)?;
    println!(
        "{} {} ({} bones, {} clips)",
        "Loaded skeleton:".bold(),
        path.display(),
        skeleton.bone_count(),
        skeleton.clip_names().len()
    );
    for (i, bone) in skeleton.bones().iter().enumerate() {
        let tags = skeleton.tags(i);
        let indent = "  ".repeat(skeleton.depth(i));
        let mut flags = Vec::new();
        if tags.arm { flags.push("arm"); }
        if tags.head { flags.push("head"); }
        if tags.spine { flags.push("spine"); }
        println!(
            "  [{i:>3}] {indent}{:<24} {:<10} {:?} {}",
            bone.name,
            tags.class.label(),
            tags.side,
            flags.join(",").dimmed()
        );
    }

    let rigs = rig::build_rigs(&skeleton, &cfg);
    let names = |idx: Vec<usize>| -> String {
        idx.iter().map(|&i| skeleton.bones()[i].name.as_str()).collect::<Vec<_>>().join(", ")
    };
    match &rigs.hit {
        Some(hit) => {
            let p = hit.params();
            println!("{} k={:.1} c={:.2}", "Hit rig:".green(), p.stiffness, p.damping);
            println!("  bones: {}", names(hit.bones().iter().map(|b| b.index).collect()));
        }
        None => println!("{}", "Hit rig: none (visual-only hits)".yellow()),
    }
    match &rigs.dance {
        Some(dance) => {
            println!("{}", "Dance rig:".green());
            for b in dance.bones() {
                println!(
                    "  {:<24} {:?} amp={:.3} speed={:.2} phase={:.2}",
                    skeleton.bones()[b.index].name, b.style, b.amplitude, b.speed, b.phase
                );
            }
        }
        None => println!("{}", "Dance rig: none".yellow()),
    }
    if !skeleton.clip_names().is_empty() {
        let clips = rig::clips::ClipLibrary::from_names(skeleton.clip_names());
        println!("  hit clips: {}", clips.hit_clips().join(", "));
        println!("  dance clips: {}", clips.dance_clips().join(", "));
    }
    Ok(())
}

struct Script {
    seconds: f32,
    fps: f32,
    eggs: u32,
    say: Vec<String>,
    chat: Option<String>,
    flush_at: Option<f32>,
}

fn reply_source(cfg: &ToyConfig) -> Result<Arc<dyn ReplySource>> {
    Ok(match HttpReplySource::from_config(&cfg.chat)? {
        Some(http) => {
            info!(endpoint = http.endpoint(), "using chat endpoint");
            Arc::new(http)
        }
        None => Arc::new(Offline),
    })
}

fn simulate(
    path: &Path,
    cfg: ToyConfig,
    seed: Option<u64>,
    script: &Script,
    out: Option<&PathBuf>,
) -> Result<()> {
    if script.fps <= 0.0 || script.seconds < 0.0 {
        bail!("fps must be positive and seconds non-negative");
    }
    let skeleton = rig::load_from_path(path)?;
    let replies = reply_source(&cfg)?;
    let mut app = match seed {
        Some(s) => AppState::with_seed(&skeleton, cfg, replies, s),
        None => AppState::new(&skeleton, cfg, replies),
    };
    let mut trace = out.map(|_| Trace::new(TraceMeta::for_skeleton(&skeleton, script.fps, seed)));

    let dt = 1.0 / script.fps;
    let frames = (script.seconds * script.fps).round() as u32;
    let at = |frame: u32, time: f32| (time * script.fps).round() as u32 == frame;
    let mut eggs_left = script.eggs;
    let mut lines = script.say.iter();
    let (mut procedural, mut clips, mut silent) = (0u32, 0u32, 0u32);

    if let Some(msg) = &script.chat {
        if !app.submit_chat(msg) {
            warn!("chat message was empty; nothing sent");
        }
    }
    for frame in 0..frames {
        if eggs_left > 0 && frame % (script.fps * 0.5).max(1.0) as u32 == 0 {
            app.throw_egg();
            eggs_left -= 1;
        }
        if frame % (script.fps * 0.5).max(1.0) as u32 == (script.fps * 0.25) as u32 {
            if let Some(line) = lines.next() {
                app.shoot_text(line, 1.0);
            }
        }
        if script.flush_at.is_some_and(|t| at(frame, t)) && !app.flush() {
            debug!("flush already running");
        }

        let report = app.update(dt);
        for r in &report.reactions {
            match r {
                HitReaction::Procedural => procedural += 1,
                HitReaction::Clip(_) => clips += 1,
                HitReaction::None => silent += 1,
            }
        }
        if let Some(reply) = &report.chat {
            let tag = if reply.fallback { "canned".yellow() } else { "server".green() };
            println!("[{:>6.2}s] reply ({tag}): {}", app.now(), reply.text);
        }
        if let Some(event) = report.flush {
            println!("[{:>6.2}s] flush: {event:?}", app.now());
        }
        app.drain_retired();
        if let Some(t) = trace.as_mut() {
            t.record(&app);
        }
    }
    if app.chat_busy() {
        warn!("simulation ended before the chat reply arrived");
    }

    let stats = app.stats();
    println!("{} {:.2}s at {} fps", "Simulated".bold(), app.now(), script.fps);
    println!("  hits: {} (procedural={procedural}, clip={clips}, visual-only={silent})", stats.hits);
    println!("  eggs thrown: {}, texts sprayed: {}, flushes: {}", stats.eggs, stats.texts, stats.flushes);
    println!("  chat replies: {}, canned: {}", stats.chat_replies, stats.chat_fallbacks);
    let tl = app.timeline();
    println!(
        "  live effects: {} (stains={}, replies={}, particles={})",
        tl.len(),
        tl.count(EffectKind::Stain),
        tl.count(EffectKind::Reply),
        tl.count(EffectKind::Particle)
    );

    if let (Some(mut t), Some(path)) = (trace, out) {
        t.finish(&app);
        t.write_json(path)?;
        println!("Wrote {} frames to {}", t.frames.len(), path.display());
    }
    Ok(())
}

fn taunt(cfg: CompletionConfig, api_key: &str) -> Result<()> {
    let completer = HttpCompleter::new(cfg.base_url.clone(), api_key, Duration::from_secs(cfg.timeout_secs))?;
    let mut session = TauntSession::new(cfg);
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    loop {
        println!();
        println!("{} hits={} mood={}", "Punching bag".bold(), session.hits(), session.mood().label());
        println!("  1 egg   2 paint   3 speech   4 flush   5 idle   0 quit");
        let Some(choice) = prompt(&mut input, "> ")? else { break };
        let action = match choice.as_str() {
            "0" => break,
            "1" => Action::Egg,
            "2" => Action::Paint,
            "3" => match prompt(&mut input, "say: ")? {
                Some(text) if !text.is_empty() => Action::Speech(text),
                Some(_) => continue,
                None => break,
            },
            "4" => Action::Flush,
            "5" => Action::Idle,
            other => {
                println!("{}", format!("unknown choice {other:?}").yellow());
                continue;
            }
        };
        match session.act(&action, &completer) {
            Ok(t) => println!("[{}] {}", t.mood.label().dimmed(), t.text.green()),
            Err(e) => println!("{} {e}", "failed:".red()),
        }
    }
    Ok(())
}

/// `None` at end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
