
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{BEARER_TOKEN_ENV, BedrockConfig, Config, ConfigError, RagConfig, RetryConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Bedrock RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Bedrock Configuration").bold().yellow());
    eprintln!("Choose the region and hosted models used for chat and embeddings.");
    eprintln!();

    configure_bedrock(&mut config.bedrock)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_rag(&mut config.rag)?;
    configure_retry(&mut config.retry)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if std::env::var_os(BEARER_TOKEN_ENV).is_none() {
        eprintln!(
            "{}",
            style(format!("⚠ Warning: {} is not set", BEARER_TOKEN_ENV)).yellow()
        );
        eprintln!("Requests to Bedrock will be rejected until an API key is exported.");
    }

    if test_endpoint_connection(&config.bedrock)? {
        eprintln!("{}", style("✓ Bedrock endpoint reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the Bedrock endpoint").yellow()
        );
        eprintln!("You can continue, but check the region and network before indexing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Bedrock Settings:").bold().yellow());
    eprintln!("  Region: {}", style(&config.bedrock.region).cyan());
    eprintln!("  Chat Model: {}", style(&config.bedrock.chat_model).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.bedrock.embedding_model).cyan()
    );
    match config.endpoint_url() {
        Ok(url) => eprintln!("  Endpoint: {}", style(url).cyan()),
        Err(e) => eprintln!("  Endpoint: {} ({})", style("Invalid").red(), e),
    }
    let token_state = if std::env::var_os(BEARER_TOKEN_ENV).is_some() {
        style("set").green()
    } else {
        style("missing").red()
    };
    eprintln!("  {}: {}", BEARER_TOKEN_ENV, token_state);

    eprintln!();
    eprintln!("{}", style("Chat Settings:").bold().yellow());
    eprintln!("  Temperature: {}", style(config.chat.temperature).cyan());
    eprintln!(
        "  Languages: {}",
        style(config.chat.languages.join(", ")).cyan()
    );
    eprintln!(
        "  Max Input: {} characters",
        style(config.chat.max_input_chars).cyan()
    );

    eprintln!();
    eprintln!("{}", style("RAG Settings:").bold().yellow());
    eprintln!("  Temperature: {}", style(config.rag.temperature).cyan());
    eprintln!("  PDF Directory: {}", style(config.rag.data_dir.display()).cyan());
    eprintln!("  Index Directory: {}", style(config.rag.index_dir.display()).cyan());
    eprintln!("  Top K: {}", style(config.rag.top_k).cyan());
    eprintln!(
        "  Chunking: {} chars, {} overlap",
        style(config.rag.chunk_size).cyan(),
        style(config.rag.chunk_overlap).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retry Settings:").bold().yellow());
    eprintln!("  Max Retries: {}", style(config.retry.max_retries).cyan());
    eprintln!(
        "  Base Delay: {}s",
        style(config.retry.base_delay_seconds).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_bedrock(bedrock: &mut BedrockConfig) -> Result<()> {
    let region: String = Input::new()
        .with_prompt("AWS region")
        .default(bedrock.region.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = BedrockConfig {
                region: input.clone(),
                ..BedrockConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model id")
        .default(bedrock.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model id cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model id")
        .default(bedrock.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model id cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let endpoint: String = Input::new()
        .with_prompt("Endpoint override (blank for the regional default)")
        .default(bedrock.endpoint.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;

    bedrock.set_region(region)?;
    bedrock.set_chat_model(chat_model)?;
    bedrock.set_embedding_model(embedding_model)?;
    bedrock.set_endpoint(normalize_endpoint(&endpoint))?;

    Ok(())
}

fn configure_rag(rag: &mut RagConfig) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(rag.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;

    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(rag.chunk_size)
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(rag.chunk_overlap)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input < chunk_size {
                Ok(())
            } else {
                Err("Overlap must be smaller than the chunk size")
            }
        })
        .interact_text()?;

    rag.set_top_k(top_k)?;
    rag.set_chunking(chunk_size, chunk_overlap)?;

    Ok(())
}

fn configure_retry(retry: &mut RetryConfig) -> Result<()> {
    let max_retries: u32 = Input::new()
        .with_prompt("Max retries when throttled")
        .default(retry.max_retries)
        .interact_text()?;

    let base_delay: f64 = Input::new()
        .with_prompt("Base retry delay (seconds)")
        .default(retry.base_delay_seconds)
        .interact_text()?;

    retry.set_max_retries(max_retries)?;
    retry.set_base_delay_seconds(base_delay)?;

    Ok(())
}

fn normalize_endpoint(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn test_endpoint_connection(bedrock: &BedrockConfig) -> Result<bool> {
    let url = bedrock.endpoint_url()?;

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
