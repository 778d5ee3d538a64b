//! Forge - Rust CAD 智能脚本系统
//!
//! 入口：初始化日志、装配流水线组件，运行交互式主循环；退出时持久化会话。

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forge::config::{load_config, AppConfig};
use forge::core::Orchestrator;
use forge::llm::create_generator_from_config;
use forge::plugins::PluginRegistry;
use forge::safety::{DenyRules, ScriptValidator};
use forge::sandbox::{BridgeSandbox, DryRunSandbox, ScriptSandbox};
use forge::session::{Session, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let generator = create_generator_from_config(&cfg.llm);
    let validator = ScriptValidator::new(DenyRules::from_config(&cfg.safety));
    let sandbox: Arc<dyn ScriptSandbox> = match cfg.sandbox.bridge_url {
        Some(ref url) => {
            tracing::info!("Using sandbox bridge at {}", url);
            Arc::new(BridgeSandbox::new(url, cfg.sandbox.execute_timeout_secs))
        }
        None => {
            tracing::warn!("No sandbox bridge configured, running in dry-run mode");
            Arc::new(DryRunSandbox)
        }
    };
    let plugins = PluginRegistry::from_config(&cfg.plugins);

    let session_dir = cfg
        .app
        .session_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("sessions"));
    let store = SessionStore::new(&session_dir);

    let session = Session::new();
    tracing::info!(session = %session.id, "Session started");

    let mut orchestrator = Orchestrator::new(
        generator,
        validator,
        sandbox,
        plugins,
        session,
        cfg.pipeline.summarize_threshold,
        cfg.pipeline.max_retries,
        cfg.sandbox.execute_timeout_secs,
    );

    println!("Forge interactive mode. Type 'plugins' to list capabilities, 'quit' to exit.");

    let stdin = std::io::stdin();
    loop {
        print!("forge> ");
        std::io::stdout().flush().ok();

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit" | "q") {
            break;
        }
        if input == "plugins" {
            for name in orchestrator.capability_names() {
                println!("  - {}", name);
            }
            continue;
        }

        match orchestrator.process_request(input).await {
            Ok(report) => {
                if !report.turn.script.is_empty() {
                    println!("--- script ---\n{}\n--------------", report.turn.script);
                }
                println!("{}", report.describe());
            }
            Err(e) => println!("Request failed: {}", e),
        }
    }

    store
        .save(&orchestrator.into_session())
        .context("Failed to persist session")?;
    tracing::info!("Session persisted, bye");

    Ok(())
}
