//! `wayfind` – terminal host for an indoor wayfinding session.
//!
//! This binary:
//!
//! 1. Loads `~/.wayfind/config.toml`, writing the defaults on first run.
//! 2. Builds a [`WayfindSession`] on simulated device services.
//! 3. Drops the user into an **interactive REPL** (`/help` lists commands).
//! 4. Intercepts **Ctrl-C** to stop the session and exit cleanly.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use wayfind_hal::sim::SimRig;
use wayfind_middleware::EventBus;
use wayfind_runtime::{Collaborators, WayfindSession, init_tracing};

fn main() {
    let _tracing = init_tracing("wayfind");

    print_banner();

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – ending the session …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => first_run(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::WayfindConfig::default()
        }
    };

    // ── Session ───────────────────────────────────────────────────────────
    let session_config = cfg.to_session_config();
    let rig = SimRig::new();
    let session = match WayfindSession::new(
        session_config,
        Collaborators::from_sim(&rig),
        EventBus::default(),
    ) {
        Ok(session) => session,
        Err(e) => {
            println!("{}: {}", "Cannot start session".red(), e);
            std::process::exit(1);
        }
    };
    info!(
        targets = cfg.targets.len(),
        floors = cfg.floors.len(),
        radius_m = cfg.fence.radius_m,
        "session ready"
    );

    let mut shell = repl::Shell::new(session, rig);
    shell.execute(repl::Command::Status);
    println!();
    println!(
        "  Simulated device: use {} and {} to get past the location check.",
        "/grant".bold().cyan(),
        "/fix <lat> <lon>".bold().cyan()
    );
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(shell, shutdown);
}

fn first_run() -> config::WayfindConfig {
    let cfg = config::WayfindConfig::default();
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
    cfg
}

fn print_banner() {
    println!();
    println!("{}", r#" _      __            ____         __"#.bold().cyan());
    println!("{}", r#"| | /| / /__ ___ __  / __(_)__  ___/ /"#.bold().cyan());
    println!("{}", r#"| |/ |/ / _ `/ // / / _// / _ \/ _  / "#.bold().cyan());
    println!("{}", r#"|__/|__/\_,_/\_, / /_/ /_/_//_/\_,_/  "#.bold().cyan());
    println!("{}", r#"            /___/                       "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Wayfind".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Indoor AR wayfinding");
    println!();
}
