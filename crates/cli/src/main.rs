//! Sandbox process: serves engine calls from the host.
//!
//! The host starts `sandbox` as a child process and talks to it over
//! stdin/stdout with length-prefixed MessagePack frames. Logs go to stderr.
//! The process exits when the host closes stdin.

mod commands;

use std::io;
use std::path::Path;
use std::process;

use sandbox_executor::{MemoryEngine, MethodRegistry, SandboxConfig, Transport};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use commands::build_cli;

fn main() {
    let matches = build_cli().get_matches();

    if matches.get_flag("print-default-config") {
        print!("{}", SandboxConfig::default_toml());
        return;
    }

    let config_path = matches.get_one::<String>("config").map(Path::new);

    if matches.get_flag("init-config") {
        if let Some(path) = config_path {
            if let Err(e) = SandboxConfig::write_default_if_missing(path) {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
        return;
    }

    let config = match config_path {
        Some(path) => match SandboxConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => SandboxConfig::default(),
    };

    let log_filter = matches
        .get_one::<String>("log-filter")
        .cloned()
        .unwrap_or_else(|| config.log_filter.clone());
    init_tracing(&log_filter);

    if let Err(e) = run(&config) {
        error!(target: "sandbox", error = %e, kind = e.kind(), "Sandbox stopped");
        process::exit(1);
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `fallback`.
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn run(config: &SandboxConfig) -> sandbox_executor::Result<()> {
    // Registration errors surface here, before the first call is read
    let dispatcher = MethodRegistry::with_builtin_methods()?.into_dispatcher();
    let mut engine = MemoryEngine::new(config.schema_version);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut transport = Transport::new(stdin.lock(), stdout.lock(), config.max_message_bytes);

    let served = dispatcher.serve(&mut engine, &mut transport)?;
    info!(target: "sandbox", served, "Sandbox exiting");
    Ok(())
}
