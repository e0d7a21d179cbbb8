//! Trigger application binary - composition root.
//!
//! `serve` runs the fulfillment backend. `menu` and `fire` host a widget
//! from the command line against catalog and context files.

mod cli;

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;

use trigger_action::render::{FieldKind, FieldRenderer};
use trigger_action::TriggerWidget;
use trigger_api::{start_server, AppState};
use trigger_core::config::TriggerConfig;
use trigger_core::types::{ActionId, Catalog, InteractionContext};

use cli::{CliArgs, Command};

type AppResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config = TriggerConfig::load_or_default(&config_file);

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting trigger v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(path = %config_file.display(), "Configuration resolved");

    match args.command {
        Command::Serve { port, public_dir } => serve(config, port, public_dir).await,
        Command::Menu { catalog, json } => menu(&config, &catalog, json),
        Command::Fire {
            catalog,
            context,
            action,
            set,
        } => fire(&config, &catalog, &context, ActionId(action), set).await,
    }
}

async fn serve(mut config: TriggerConfig, port: Option<u16>, public_dir: Option<PathBuf>) -> AppResult {
    config.server.port = cli::resolve_port(port, config.server.port);
    if let Some(dir) = public_dir {
        config.server.public_dir = dir.to_string_lossy().into_owned();
    }

    let state = AppState::acknowledging(&config.server);
    start_server(&config.server, state).await?;
    Ok(())
}

fn menu(config: &TriggerConfig, catalog_path: &Path, json: bool) -> AppResult {
    let catalog = Catalog::load(catalog_path)?;
    let renderer = FieldRenderer::new(Utc::now(), config.widget.datetime_horizon_days);

    if json {
        let actions: Vec<serde_json::Value> = catalog
            .iter()
            .map(|(id, action)| {
                serde_json::json!({
                    "id": id,
                    "name": action.name,
                    "url": action.url,
                    "fields": renderer.render_action(action, id),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&actions)?);
        return Ok(());
    }

    for (id, action) in catalog.iter() {
        println!("[{}] {} -> {}", id, action.name, action.url);
        for field in renderer.render_action(action, id) {
            let kind = match &field.kind {
                FieldKind::Text => "text".to_string(),
                FieldKind::Choice { options } => format!("one of {}", options.join(" | ")),
                FieldKind::DateTime { .. } => format!(
                    "datetime until {}",
                    field.kind.max_attribute().unwrap_or_default()
                ),
            };
            println!("      {} ({}): {}", field.name, field.label, kind);
        }
    }
    Ok(())
}

async fn fire(
    config: &TriggerConfig,
    catalog_path: &Path,
    context_path: &Path,
    action: ActionId,
    values: Vec<(String, String)>,
) -> AppResult {
    let catalog = Catalog::load(catalog_path)?;
    let context = InteractionContext::load(context_path)?;

    let mut widget = TriggerWidget::with_http_client(catalog, config)?;
    widget.set_context(context);
    if !widget.is_visible() {
        return Err("selected interaction is not a telephony interaction".into());
    }

    widget.toggle()?;
    widget.select(action)?;
    for (name, value) in values {
        widget.write(action, &name, value)?;
    }
    if let Some(modal) = widget.modal()? {
        println!("{}", modal.title);
        for field in &modal.fields {
            println!("  {} = {:?}", field.label, field.value);
        }
    }

    let outcome = widget.submit(action)?.outcome().await;
    match outcome.acknowledgment(config.submission.surface_transport_errors) {
        Some(text) => println!("{}", text),
        None => tracing::debug!(outcome = %outcome, "No acknowledgment for outcome"),
    }

    if outcome.is_success() {
        Ok(())
    } else {
        Err(outcome.to_string().into())
    }
}
