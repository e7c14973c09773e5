//! `ortf` – command line companion for the `or_tf` transform bridge.
//!
//! 1. `ortf render <manifest>` prints the exact command lines a registration
//!    manifest produces, one per line, ready to feed to the plugin.
//! 2. `ortf check <manifest>` replays the manifest through an in-process
//!    simulated plugin and reports the registrations it ends up holding, or
//!    the first command it rejected.
//! 3. `ortf init` writes `~/.ortf/config.toml` with the current settings.

mod config;
mod manifest;

use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use ortf_client::sim::{SimEnvironment, SimPlugin};
use ortf_client::{OrTfError, TfClient};
use tracing::{debug, info};

use crate::manifest::Manifest;

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"); ORTF_LOG_FORMAT=json
    // switches to newline-delimited JSON.  Logs go to stderr so `render`
    // output stays pipeable.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ORTF_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("{}: {}", "Usage error".red(), e);
            print_help();
            return ExitCode::from(2);
        }
    };

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            eprintln!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    debug!(?cfg, "configuration loaded");

    match run(invocation, &cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument parsing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Invocation {
    Render {
        manifest: PathBuf,
    },
    Check {
        manifest: PathBuf,
        world: Option<String>,
        json: bool,
    },
    Init,
    Help,
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let Some((sub, rest)) = args.split_first() else {
        return Ok(Invocation::Help);
    };

    let mut manifest: Option<PathBuf> = None;
    let mut world: Option<String> = None;
    let mut json = false;

    let mut it = rest.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--world" => {
                let v = it.next().ok_or("--world needs a frame id")?;
                world = Some(v.clone());
            }
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{flag}'")),
            path if manifest.is_none() => manifest = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }

    let need_manifest = |m: Option<PathBuf>| m.ok_or_else(|| format!("'{sub}' needs a manifest path"));

    match sub.as_str() {
        "render" => {
            if json || world.is_some() {
                return Err("'render' takes no flags".to_string());
            }
            Ok(Invocation::Render {
                manifest: need_manifest(manifest)?,
            })
        }
        "check" => Ok(Invocation::Check {
            manifest: need_manifest(manifest)?,
            world,
            json,
        }),
        "init" => Ok(Invocation::Init),
        "help" | "--help" | "-h" => Ok(Invocation::Help),
        other => Err(format!("unknown command '{other}'")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn run(invocation: Invocation, cfg: &config::Config) -> Result<(), String> {
    match invocation {
        Invocation::Render { manifest } => {
            let m = Manifest::load(&manifest)?;
            for line in render(&m).map_err(|e| e.to_string())? {
                println!("{line}");
            }
            Ok(())
        }
        Invocation::Check {
            manifest,
            world,
            json,
        } => {
            let m = Manifest::load(&manifest)?;
            let world = world
                .or_else(|| m.world_frame.clone())
                .unwrap_or_else(|| cfg.world_frame.clone());
            let plugin = replay(&m, &world).map_err(|e| e.to_string())?;
            if json || cfg.json_output {
                let out = serde_json::to_string_pretty(&plugin.records())
                    .map_err(|e| format!("Failed to serialize records: {e}"))?;
                println!("{out}");
            } else {
                print_summary(&plugin);
            }
            Ok(())
        }
        Invocation::Init => {
            let path = config::config_path();
            if path.exists() {
                println!("  Config already present at {}", path.display().to_string().bold());
                return Ok(());
            }
            config::save(cfg)?;
            println!(
                "  {} Config saved to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            Ok(())
        }
        Invocation::Help => {
            print_help();
            Ok(())
        }
    }
}

/// Command lines for every manifest entry, in dispatch order.
fn render(m: &Manifest) -> Result<Vec<String>, OrTfError> {
    m.commands().iter().map(|c| c.to_command_line()).collect()
}

/// Send the manifest through a simulated plugin whose environment holds
/// exactly the bodies the manifest names.
fn replay(m: &Manifest, world: &str) -> Result<SimPlugin, OrTfError> {
    let mut builder = SimEnvironment::builder();
    for name in m.body_names() {
        builder = builder.with_body(name);
    }
    let mut env = builder.build();
    let mut client = TfClient::new(&mut env, world)?;

    for command in m.commands() {
        client.send(&command)?;
    }
    info!(
        world_frame = world,
        commands = client.plugin().records().len(),
        "manifest replayed"
    );
    Ok(client.plugin().clone())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_summary(plugin: &SimPlugin) {
    println!();
    println!(
        "  {} world frame {}, tracking {}",
        "✓".green().bold(),
        plugin.world_frame_id().bold(),
        plugin.state().to_string().cyan()
    );

    let bodies = plugin.tracked_bodies();
    println!("  Bodies ({}):", bodies.len());
    for (name, tb) in &bodies {
        let t = tb.offset.translation;
        let mut detail = format!("offset ({}, {}, {})", t.x, t.y, t.z);
        if tb.planar_tracking {
            detail.push_str(&format!(", planar z={}", tb.fixed_translation_z));
        }
        println!("    • {} → {}  {}", name.bold(), tb.frame_id, detail.dimmed());
    }

    let hands = plugin.hands();
    println!("  Hands ({}):", hands.len());
    for (name, frame) in &hands {
        println!("    • {} → {}", name.bold(), frame);
    }
    println!();
}

fn print_help() {
    println!();
    println!("  {} {}", "ortf".bold(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Command line companion for the or_tf transform bridge");
    println!();
    println!("  {}", "Usage:".bold());
    println!("    ortf render <manifest>                    print plugin command lines");
    println!("    ortf check <manifest> [--world F] [--json] replay against a simulated plugin");
    println!("    ortf init                                 write ~/.ortf/config.toml");
    println!("    ortf help                                 show this text");
    println!();
}
