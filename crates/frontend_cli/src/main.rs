//! Composition root for the API frontend.
//!
//! # Responsibility
//! - Decide startup order: logging, secrets gate, providers, freeze.
//! - Own the only process exits; library code returns errors.

use clap::Parser;
use frontend_core::secrets::DEFAULT_SECRET_KEY_ENV;
use frontend_core::{
    default_log_level, init_logging, start, ApiRoot, BoxedProvider, LogTarget, SecretsConfig,
    SecretsGate, StartupError,
};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "frontend", version, about = "API frontend with startup-time capability providers")]
struct Cli {
    /// trace|debug|info|warn|error; defaults by build mode.
    #[arg(long, env = "FRONTEND_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rotated log files; stderr when unset.
    #[arg(long, env = "FRONTEND_LOG_DIR")]
    log_dir: Option<String>,

    /// Environment variable holding the base64 secret key.
    #[arg(long, default_value = DEFAULT_SECRET_KEY_ENV)]
    secret_key_env: String,

    /// Key file read when the environment variable is unset.
    #[arg(long, env = "FRONTEND_SECRET_KEY_FILE")]
    secret_key_file: Option<PathBuf>,

    /// Provider storage directory; in-memory when unset.
    #[arg(long, env = "FRONTEND_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Start without enterprise providers.
    #[arg(long)]
    no_enterprise: bool,

    /// Print the slot table after startup.
    #[arg(long)]
    slots: bool,

    /// JSON request to execute; repeatable, run in order.
    #[arg(long = "request", value_name = "JSON")]
    requests: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    let logging = LogTarget::from_dir(cli.log_dir.as_deref())
        .and_then(|target| init_logging(&level, target));
    if let Err(err) = logging {
        eprintln!("Failed to init logging: {err}");
        return ExitCode::FAILURE;
    }

    let gate = SecretsGate::new(SecretsConfig {
        key_env: Some(cli.secret_key_env.clone()),
        key_file: cli.secret_key_file.clone(),
    });
    let no_enterprise = cli.no_enterprise;
    let api = match start(&gate, cli.data_dir.clone(), |ctx| -> Vec<BoxedProvider> {
        if no_enterprise {
            Vec::new()
        } else {
            frontend_enterprise::providers(ctx)
        }
    }) {
        Ok(api) => api,
        Err(StartupError::Secrets(err)) => {
            eprintln!("Failed to init secrets package: {err}");
            return ExitCode::FAILURE;
        }
        Err(StartupError::Provider(err)) => {
            eprintln!("Failed to install providers: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        "event=startup module=cli status=ok version={} enterprise={}",
        frontend_core::core_version(),
        !no_enterprise
    );

    if cli.slots {
        print_slots(&api);
    }

    for raw in &cli.requests {
        let response = api.execute_json(raw);
        match serde_json::to_string(&response) {
            Ok(line) => println!("{line}"),
            Err(err) => {
                eprintln!("Failed to encode response: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn print_slots(api: &ApiRoot) {
    for slot in api.registry().slots() {
        println!(
            "{}\t{}\t{}",
            slot.name,
            if slot.is_filled() { "filled" } else { "absent" },
            slot.provider.unwrap_or("-")
        );
    }
}
