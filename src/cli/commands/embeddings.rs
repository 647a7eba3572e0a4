//! Embeddings command implementation.
//!
//! Provides CLI commands for managing embedding providers:
//! - `status` - Show provider availability and configuration
//! - `configure` - Configure embedding provider settings
//! - `test` - Embed a sample text with the active provider

use std::time::Instant;

use colored::Colorize;
use serde::Serialize;

use super::runtime;
use crate::cli::{CommandContext, EmbeddingsCommands};
use crate::embeddings::{
    create_embedding_provider, detect_available_providers, get_embedding_settings,
    reset_embedding_settings, resolve_provider_type, save_embedding_settings, EmbeddingProvider,
    EmbeddingProviderType, EmbeddingSettings, ProviderInfo,
};
use crate::error::{Error, Result};

/// Output for embeddings status command.
#[derive(Serialize)]
struct StatusOutput {
    configured_provider: Option<String>,
    available_providers: Vec<String>,
    recommended: Option<String>,
    active_provider: Option<ProviderInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_error: Option<String>,
    settings: EmbeddingSettings,
}

/// Output for embeddings test command.
#[derive(Serialize)]
struct TestOutput {
    provider: String,
    model: String,
    dimensions: usize,
    input_text: String,
    embedding_sample: Vec<f32>,
    elapsed_ms: u128,
}

/// Output for configure command.
#[derive(Serialize)]
struct ConfigureOutput {
    message: String,
    settings: EmbeddingSettings,
}

/// Execute embeddings command.
///
/// # Errors
///
/// Returns an error if the config cannot be read or written, or if the
/// provider under test fails.
pub fn execute(command: &EmbeddingsCommands, ctx: &CommandContext) -> Result<()> {
    let rt = runtime()?;

    rt.block_on(async {
        match command {
            EmbeddingsCommands::Status => execute_status(ctx).await,
            EmbeddingsCommands::Configure {
                model,
                endpoint,
                token,
                dimensions,
                reset,
            } => {
                let update = SettingsUpdate {
                    provider: ctx.provider,
                    model: model.clone(),
                    endpoint: endpoint.clone(),
                    token: token.clone(),
                    dimensions: *dimensions,
                };
                execute_configure(update, *reset, ctx).await
            }
            EmbeddingsCommands::Test { text } => execute_test(text, ctx).await,
        }
    })
}

/// Hide all but the last four characters of a secret.
fn redact(token: &str) -> String {
    let visible: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{visible}")
}

/// Show embeddings status and provider availability.
async fn execute_status(ctx: &CommandContext) -> Result<()> {
    let mut settings = get_embedding_settings()?.unwrap_or_default();
    settings.hf_token = settings.hf_token.as_deref().map(redact);

    let detection = detect_available_providers().await;
    let configured = ctx.provider.or_else(resolve_provider_type);
    let (active, active_error) = match create_embedding_provider(configured).await {
        Ok(provider) => (Some(provider.info()), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let output = StatusOutput {
        configured_provider: configured.map(|p| p.to_string()),
        available_providers: detection.available,
        recommended: detection.recommended,
        active_provider: active,
        active_error,
        settings,
    };

    if ctx.json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", "Embeddings Status".bold());
    println!("=================");
    println!();
    println!(
        "Configured Provider: {}",
        output.configured_provider.as_deref().unwrap_or("auto-detect")
    );
    println!();

    println!("Available Providers:");
    for name in &output.available_providers {
        println!("  {} {name}", "✓".green());
    }
    println!();

    if let Some(ref active) = output.active_provider {
        println!("Active Provider:");
        println!("  Name:       {}", active.name);
        println!("  Model:      {}", active.model);
        println!("  Dimensions: {}", active.dimensions);
    } else {
        println!("{}", "No embedding provider available.".yellow());
        if let Some(ref e) = output.active_error {
            println!("  {}", e.dimmed());
        }
        println!();
        println!("To enable embeddings:");
        println!("  - Install Ollama: https://ollama.ai, then `ollama pull all-minilm`");
        println!("  - Or set HF_TOKEN environment variable");
        println!("  - Or use the offline provider: --provider hashing");
    }

    Ok(())
}

/// Fields given to `embeddings configure`.
struct SettingsUpdate {
    provider: Option<EmbeddingProviderType>,
    model: Option<String>,
    endpoint: Option<String>,
    token: Option<String>,
    dimensions: Option<usize>,
}

/// Apply an update to stored settings; `model` and `endpoint` go to the
/// provider being configured, or the stored one.
fn apply_update(
    update: SettingsUpdate,
    current: &EmbeddingSettings,
) -> Result<(EmbeddingSettings, Vec<&'static str>)> {
    let mut settings = EmbeddingSettings::default();
    let mut messages = Vec::new();
    let target = update
        .provider
        .or(current.provider)
        .unwrap_or(EmbeddingProviderType::Ollama);

    if let Some(provider) = update.provider {
        settings.provider = Some(provider);
        messages.push("Provider configured");
    }

    if let Some(model) = update.model {
        match target {
            EmbeddingProviderType::Ollama => settings.ollama_model = Some(model),
            EmbeddingProviderType::Huggingface => settings.hf_model = Some(model),
            EmbeddingProviderType::Model2vec => settings.model2vec_model = Some(model),
            EmbeddingProviderType::Hashing => {
                return Err(Error::InvalidArgument(
                    "the hashing provider has no model; use --dimensions".into(),
                ));
            }
        }
        messages.push("Model configured");
    }

    if let Some(endpoint) = update.endpoint {
        match target {
            EmbeddingProviderType::Ollama => settings.ollama_endpoint = Some(endpoint),
            EmbeddingProviderType::Huggingface => settings.hf_endpoint = Some(endpoint),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "the {other} provider has no endpoint"
                )));
            }
        }
        messages.push("Endpoint configured");
    }

    if let Some(token) = update.token {
        settings.hf_token = Some(token);
        messages.push("Token configured");
    }

    if let Some(dimensions) = update.dimensions {
        if dimensions == 0 {
            return Err(Error::InvalidArgument("--dimensions must be at least 1".into()));
        }
        settings.hash_dimensions = Some(dimensions);
        messages.push("Dimensions configured");
    }

    Ok((settings, messages))
}

/// Configure embedding settings.
async fn execute_configure(update: SettingsUpdate, reset: bool, ctx: &CommandContext) -> Result<()> {
    if reset {
        reset_embedding_settings()?;
        if ctx.json {
            let output = ConfigureOutput {
                message: "Embedding settings reset".into(),
                settings: EmbeddingSettings::default(),
            };
            println!("{}", serde_json::to_string(&output)?);
        } else {
            println!("Embedding settings reset.");
        }
        return Ok(());
    }

    let current = get_embedding_settings()?.unwrap_or_default();
    let (settings, messages) = apply_update(update, &current)?;

    if messages.is_empty() {
        // Nothing to change: show the current state
        return execute_status(ctx).await;
    }

    save_embedding_settings(&settings)?;
    let message = messages.join(", ");

    if ctx.json {
        let mut saved = settings.merged_over(&current);
        saved.hf_token = saved.hf_token.as_deref().map(redact);
        let output = ConfigureOutput {
            message,
            settings: saved,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Configuration updated: {message}");
        println!();
        execute_status(ctx).await?;
    }

    Ok(())
}

/// Embed a sample text with the active provider.
async fn execute_test(text: &str, ctx: &CommandContext) -> Result<()> {
    let provider = create_embedding_provider(ctx.provider).await?;
    let info = provider.info();

    let start = Instant::now();
    let vector = provider.generate_embedding(text).await?;
    let elapsed_ms = start.elapsed().as_millis();

    if vector.len() != info.dimensions {
        return Err(Error::DimensionMismatch {
            expected: info.dimensions,
            actual: vector.len(),
        });
    }

    let output = TestOutput {
        provider: info.name,
        model: info.model,
        dimensions: vector.len(),
        input_text: text.to_string(),
        embedding_sample: vector.iter().take(5).copied().collect(),
        elapsed_ms,
    };

    if ctx.json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} {} ({})", "✓".green(), output.provider, output.model);
        println!("  Dimensions: {}", output.dimensions);
        println!("  Time:       {}ms", output.elapsed_ms);
        println!("  Sample:     {:?}", output.embedding_sample);
    }

    Ok(())
}
