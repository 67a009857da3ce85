use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use lumora_catalog::{CatalogStore, Matcher};
use lumora_core::{BotConfig, ChatError, DialogueController};
use lumora_provider::create_provider;
use lumora_schema::ChatRequest;
use lumora_session::{HistoryStore, SessionStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "lumora", about = "Lighting consultant chat backend")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "lumora.yaml")]
    config: PathBuf,

    /// Directory for rolling log files (stderr only when omitted)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load config and catalog, report what was found
    Validate,
    /// Interactive consultation in the terminal
    Chat {
        /// Reuse a fixed session id instead of a generated one
        #[arg(long)]
        session: Option<String>,
    },
}

fn init_tracing(log_dir: Option<&PathBuf>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
        let file_appender = tracing_appender::rolling::daily(dir, "lumora.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
        Ok(Some(guard))
    } else {
        registry.init();
        Ok(None)
    }
}

fn build_controller(config: &BotConfig) -> Result<DialogueController> {
    let catalog = CatalogStore::load_json(&config.catalog_path)?;
    let matcher = Arc::new(Matcher::new(
        catalog,
        Duration::from_secs(config.search_cache_seconds),
    ));
    let sessions = Arc::new(SessionStore::new(config.session_ttl_seconds));
    let history = Arc::new(HistoryStore::new(config.history_turns));

    let (provider, model) = match &config.provider {
        Some(provider_config) => {
            let mut provider_config = provider_config.clone();
            if provider_config.api_key.is_none() {
                provider_config.api_key = std::env::var("LUMORA_API_KEY").ok();
            }
            (
                Some(create_provider(&provider_config)?),
                provider_config.model.clone(),
            )
        }
        None => (None, String::new()),
    };

    Ok(DialogueController::new(
        matcher,
        sessions,
        history,
        provider,
        model,
        config.scenario.clone(),
        Duration::from_secs(config.llm_timeout_seconds),
    ))
}

async fn run_chat(config: &BotConfig, session: Option<String>) -> Result<()> {
    let controller = build_controller(config)?;
    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::info!(session = %session_id, "chat session started");
    println!("Сессия {session_id}. Команды: /quote <контакт>, /transfer <контакт>, /quit");

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }
        if let Some(contact) = input.strip_prefix("/quote ") {
            let lead = controller.quote_lead(&session_id, contact.trim(), None, None);
            println!("{}", serde_json::to_string_pretty(&lead)?);
            continue;
        }
        if let Some(contact) = input.strip_prefix("/transfer ") {
            let lead = controller.transfer_lead(&session_id, contact.trim());
            println!("{}", serde_json::to_string_pretty(&lead)?);
            continue;
        }

        let request = ChatRequest {
            message: input.to_owned(),
            session_id: Some(session_id.clone()),
        };
        match controller.handle_message(&request, None).await {
            Ok(response) => {
                println!("\n{}\n", response.assistant_text);
                for product in &response.products {
                    println!(
                        "  - {} ({}, счёт {})",
                        product.product.model.as_deref().unwrap_or("без модели"),
                        product.display_lumens,
                        product.score
                    );
                }
            }
            Err(ChatError::ProviderUnconfigured) => {
                anyhow::bail!("provider is not configured; add a provider block to the config")
            }
            Err(error) => println!("Ошибка запроса: {error}"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_ref())?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = if cli.config.exists() {
        BotConfig::load(&cli.config)?
    } else {
        BotConfig::default()
    };

    match command {
        Commands::Validate => {
            let catalog = CatalogStore::load_json(&config.catalog_path)
                .with_context(|| "catalog validation failed")?;
            println!(
                "Config valid. {} catalog products, provider {}, session ttl {}s.",
                catalog.len(),
                config
                    .provider
                    .as_ref()
                    .map(|p| p.id.as_str())
                    .unwrap_or("none"),
                config.session_ttl_seconds
            );
        }
        Commands::Chat { session } => run_chat(&config, session).await?,
    }

    Ok(())
}
