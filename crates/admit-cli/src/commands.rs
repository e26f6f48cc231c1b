use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use admit_engine::{ActivationResult, ConfirmResult, HeaderRule, ImportSummary, LifecycleEngine, PassStatus};
use admit_server::{AdmitServer, ServerConfig};
use admit_store::{CodeStore, SyncMode, WalCodeStore, WalConfig};
use admit_types::generate_code;
use anyhow::Context;
use chrono::Utc;
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

/// Log file used by one-shot commands when neither `--data` nor the config names one.
const DEFAULT_DATA_PATH: &str = "admit.wal";

/// Most codes one `generate` run will print.
const MAX_GENERATE: usize = 1_000_000;

type Engine = LifecycleEngine<WalCodeStore>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        format,
        config,
        data,
        ..
    } = cli;
    let mut config = load_config(config.as_deref())?;
    if data.is_some() {
        config.data_path = data;
    }

    match command {
        Command::Serve(args) => cmd_serve(config, args),
        Command::Import(args) => cmd_import(&open_engine(&config)?, args, config.header_rule, &format),
        Command::Activate(args) => cmd_activate(&open_engine(&config)?, args, &format),
        Command::Verify(args) => cmd_verify(&open_engine(&config)?, args, &format),
        Command::Confirm(args) => cmd_confirm(&open_engine(&config)?, args, &format),
        Command::Generate(args) => cmd_generate(args, &format),
        Command::Stats(_) => cmd_stats(&open_engine(&config)?, &format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

fn open_engine(config: &ServerConfig) -> anyhow::Result<Engine> {
    let path = config
        .data_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
    let sync_mode = if config.sync_every_write {
        SyncMode::EveryWrite
    } else {
        SyncMode::OsDefault
    };
    tracing::debug!(path = %path.display(), "opening pass records");
    let store = WalCodeStore::open(&path, WalConfig { sync_mode })
        .with_context(|| format!("opening pass records at {}", path.display()))?;
    Ok(LifecycleEngine::new(Arc::new(store), config.engine.clone()))
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = AdmitServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

/// Read an import file and feed its lines to the engine.
pub(crate) fn import_file(engine: &Engine, file: &Path, rule: HeaderRule) -> anyhow::Result<ImportSummary> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let lines: Vec<&str> = text.lines().collect();
    Ok(engine.bulk_import(lines.as_slice(), |line| rule.looks_like_code(line))?)
}

fn cmd_import(engine: &Engine, args: ImportArgs, default_rule: HeaderRule, format: &OutputFormat) -> anyhow::Result<()> {
    let rule = args.header.unwrap_or(default_rule);
    let summary = import_file(engine, &args.file, rule)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "imported": summary.imported, "skipped": summary.skipped })),
        OutputFormat::Text => {
            println!("{} Imported {} codes from {}", "✓".green().bold(), summary.imported.to_string().bold(), args.file.display());
            if summary.skipped > 0 {
                println!("  Skipped: {} (header, blank or duplicate)", summary.skipped.to_string().yellow());
            }
        }
    }
    Ok(())
}

fn cmd_activate(engine: &Engine, args: CodeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let result = engine.activate(&args.code, Utc::now())?;
    let activated_at = result.record().and_then(|r| r.activated_at);
    match format {
        OutputFormat::Json => println!("{}", json!({ "status": result.label(), "activated_at": activated_at })),
        OutputFormat::Text => match (&result, activated_at) {
            (ActivationResult::Activated(_), Some(at)) => {
                println!("{} Pass {} activated at {}", "✓".green().bold(), args.code.yellow(), at.to_rfc3339());
            }
            (ActivationResult::AlreadyActivated(_), Some(at)) => {
                println!("Pass {} was already activated at {}", args.code.yellow(), at.to_rfc3339());
            }
            _ => println!("{} Unknown code {}", "✗".red().bold(), args.code.yellow()),
        },
    }
    Ok(())
}

fn status_label(status: PassStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        PassStatus::Active => text.green().bold(),
        PassStatus::Unused => text.cyan(),
        PassStatus::Expired | PassStatus::Used => text.red(),
        PassStatus::NotFound => text.dimmed(),
    }
}

fn cmd_verify(engine: &Engine, args: CodeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let status = engine.verify(&args.code, Utc::now())?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "status": status })),
        OutputFormat::Text => println!("Pass {}: {}", args.code.yellow(), status_label(status)),
    }
    Ok(())
}

fn cmd_confirm(engine: &Engine, args: CodeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let result = engine.confirm_use(&args.code, Utc::now())?;
    match (format, result) {
        (OutputFormat::Json, ConfirmResult::Confirmed) => println!("{}", json!({ "status": "confirmed" })),
        (OutputFormat::Json, ConfirmResult::Rejected(reason)) => {
            println!("{}", json!({ "status": "rejected", "reason": reason }))
        }
        (OutputFormat::Text, ConfirmResult::Confirmed) => {
            println!("{} Entry confirmed for {}", "✓".green().bold(), args.code.yellow())
        }
        (OutputFormat::Text, ConfirmResult::Rejected(reason)) => {
            println!("{} Entry rejected for {}: {}", "✗".red().bold(), args.code.yellow(), reason.to_string().red())
        }
    }
    Ok(())
}

/// `count` distinct random codes of `length` characters.
pub(crate) fn generate_codes(count: usize, length: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let mut seen = HashSet::new();
    let mut codes = Vec::new();
    while codes.len() < count {
        let code = generate_code(&mut rng, length).to_string();
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }
    codes
}

fn cmd_generate(args: GenerateArgs, format: &OutputFormat) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.count <= MAX_GENERATE,
        "cannot generate more than {MAX_GENERATE} codes at once"
    );
    // Short codes have a small space; refuse counts that could never finish.
    let space = 62f64.powi(args.length.clamp(1, 16) as i32);
    anyhow::ensure!(
        (args.count as f64) <= space / 2.0,
        "cannot generate {} distinct codes of length {}",
        args.count,
        args.length
    );
    let codes = generate_codes(args.count, args.length);
    match format {
        OutputFormat::Json => println!("{}", json!(codes)),
        OutputFormat::Text => {
            for code in codes {
                println!("{code}");
            }
        }
    }
    Ok(())
}

fn cmd_stats(engine: &Engine, format: &OutputFormat) -> anyhow::Result<()> {
    let records = engine.store().count()?;
    let path = engine.store().path().display().to_string();
    match format {
        OutputFormat::Json => println!("{}", json!({ "records": records, "data": path })),
        OutputFormat::Text => {
            println!("Records: {}", records.to_string().bold());
            println!("Data: {}", path.cyan());
            println!("Validity window: {}s", engine.config().validity_window_secs);
        }
    }
    Ok(())
}
