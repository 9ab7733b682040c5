
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::{Config, ConfigError, OpenAiConfig, Secrets};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 NPC Lore Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("OpenAI Configuration").bold().yellow());
    eprintln!("Configure the embedding and chat-completion endpoints.");
    eprintln!();

    configure_openai(&mut config.openai)?;

    let persona: String = Input::new()
        .with_prompt("NPC persona (system prompt)")
        .default(config.npc.persona.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Persona cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    config.npc.persona = persona;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_api_connection(&config.openai) {
        eprintln!("{}", style("✓ API endpoint reachable!").green());
    } else {
        eprintln!("{}", style("⚠ Warning: Could not reach the API endpoint").yellow());
        eprintln!("You can continue, but building and answering will fail until it is reachable.");
    }

    let secrets = Secrets::load(config.secrets_path()).context("Failed to read secrets file")?;
    if secrets.get(&config.openai.api_key_name).is_none() {
        eprintln!(
            "{}",
            style(format!(
                "⚠ No '{}' entry found in {}",
                config.openai.api_key_name,
                config.secrets_path().display()
            ))
            .yellow()
        );
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
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("OpenAI Settings:").bold().yellow());
    match config.openai.api_url() {
        Ok(url) => eprintln!("  API URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  API URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!(
        "  Embedding Model: {}",
        style(&config.openai.embedding_model).cyan()
    );
    eprintln!("  Chat Model: {}", style(&config.openai.chat_model).cyan());
    eprintln!("  API Key Name: {}", style(&config.openai.api_key_name).cyan());
    eprintln!("  Timeout: {}s", style(config.openai.timeout_seconds).cyan());
    eprintln!(
        "  Retry Attempts: {}",
        style(config.openai.retry_attempts).cyan()
    );

    eprintln!();
    eprintln!("{}", style("NPC Settings:").bold().yellow());
    eprintln!("  Persona: {}", style(&config.npc.persona).cyan());

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());
    eprintln!("Secrets file: {}", style(config.secrets_path().display()).dim());
    eprintln!("Knowledge file: {}", style(config.knowledge_path().display()).dim());
    eprintln!("Vector DB: {}", style(config.vector_db_path().display()).dim());

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    if config_dir.join("config.toml").exists() {
        let config = Config::load(config_dir)?;
        eprintln!("{}", style("Found existing configuration.").green());
        Ok(config)
    } else {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        Config::load(config_dir)
    }
}

fn configure_openai(openai: &mut OpenAiConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("API base URL")
        .default(openai.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OpenAiConfig {
                base_url: input.clone(),
                ..OpenAiConfig::default()
            };
            temp_config.api_url()?;
            Ok(())
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model")
        .default(openai.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chat_model: String = Input::new()
        .with_prompt("Chat model")
        .default(openai.chat_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt("Request timeout (seconds)")
        .default(openai.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=300).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 300 seconds")
            }
        })
        .interact_text()?;

    openai.set_base_url(base_url)?;
    openai.set_embedding_model(embedding_model)?;
    openai.set_chat_model(chat_model)?;
    openai.set_timeout_seconds(timeout_seconds)?;

    Ok(())
}

fn test_api_connection(openai: &OpenAiConfig) -> bool {
    let Ok(url) = openai.api_url().and_then(|base| {
        base.join("models")
            .map_err(|_| ConfigError::InvalidUrl(base.to_string()))
    }) else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .into();

    // Unauthenticated probes get a 4xx from a live endpoint
    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
