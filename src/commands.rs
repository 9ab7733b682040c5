use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::config::{Config, Secrets};
use crate::knowledge;
use crate::llm::OpenAiClient;
use crate::retrieval::{Orchestrator, RetrievalError};
use crate::store::{SharedStore, VectorStore};

/// Load the configuration and the remote client it describes
fn load_client(config_dir: &Path) -> Result<(Config, OpenAiClient)> {
    let config = Config::load(config_dir)?;
    let secrets = Secrets::load(config.secrets_path())?;
    let client = OpenAiClient::new(&config, &secrets).context("Failed to create OpenAI client")?;
    Ok((config, client))
}

/// Compile an item table into the knowledge file
#[inline]
pub fn compile_items(config_dir: &Path, items_path: &Path) -> Result<usize> {
    let config = Config::load(config_dir)?;

    let rows = knowledge::read_item_table(items_path)
        .with_context(|| format!("Failed to read item table {}", items_path.display()))?;
    let records = knowledge::compile(&rows);

    let output = config.knowledge_path();
    knowledge::persist(&records, &output).context("Failed to write knowledge file")?;

    println!(
        "Compiled {} knowledge entries from {} rows",
        records.len(),
        rows.len()
    );
    println!("Knowledge file: {}", output.display());
    Ok(records.len())
}

/// Embed the knowledge file and replace the vector snapshot.
///
/// The snapshot on disk is only touched once every record has been embedded.
#[inline]
pub async fn build_store(config_dir: &Path) -> Result<usize> {
    let (config, client) = load_client(config_dir)?;

    let records = knowledge::load(&config.knowledge_path())
        .context("Failed to load knowledge file, run 'npc-lore compile' first")?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(records.len() as u64).with_style(
            ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding item {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let result = VectorStore::build(&records, &client, |progress| {
        bar.set_message(progress.item_id.to_string());
        bar.set_position(progress.completed as u64);
    })
    .await;
    bar.finish_and_clear();

    let store = match result {
        Ok(store) => store,
        Err(e) => {
            println!("Build failed at item {}: {}", e.failed_id, e.cause);
            println!("The existing vector snapshot was left unchanged.");
            return Err(e.into());
        }
    };

    let output = config.vector_db_path();
    store
        .save(&output)
        .with_context(|| format!("Failed to write vector snapshot {}", output.display()))?;

    println!(
        "Embedded {} knowledge entries ({} dimensions)",
        store.len(),
        store.dimension()
    );
    println!("Vector snapshot: {}", output.display());
    Ok(store.len())
}

/// Wire the orchestrator from the configuration directory.
///
/// A snapshot that fails to load leaves the orchestrator not ready instead of failing.
#[inline]
pub async fn open_orchestrator(config_dir: &Path) -> Result<Orchestrator> {
    let (config, client) = load_client(config_dir)?;
    let client = Arc::new(client);

    let store = SharedStore::new();
    match store.load_from(&config.vector_db_path()).await {
        Ok(count) => info!("Knowledge store ready with {} entries", count),
        Err(e) => warn!("Knowledge store not loaded: {}", e),
    }

    Ok(Orchestrator::new(store, client.clone(), client).with_persona(config.npc.persona))
}

/// Print the knowledge sentence closest to a question
#[inline]
pub async fn search(config_dir: &Path, question: &str) -> Result<()> {
    let orchestrator = open_orchestrator(config_dir).await?;

    match orchestrator.retrieve(question).await {
        Ok(Some(retrieved)) => {
            println!("Item {} (similarity {:.4})", retrieved.id, retrieved.similarity);
            println!("{}", retrieved.sentence);
        }
        Ok(None) => println!("The knowledge store is empty."),
        Err(RetrievalError::NotReady) => {
            println!("No vector snapshot is loaded. Run 'npc-lore build' first.");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Answer a single question
#[inline]
pub async fn ask(config_dir: &Path, question: &str) -> Result<()> {
    let orchestrator = open_orchestrator(config_dir).await?;
    let answer = orchestrator.answer(question).await;
    println!("{}", answer.text());
    Ok(())
}

/// Talk to the NPC until end of input or "exit"
#[inline]
pub async fn chat(config_dir: &Path) -> Result<()> {
    let orchestrator = open_orchestrator(config_dir).await?;
    if !orchestrator.store().is_ready().await {
        println!("No vector snapshot is loaded. Run 'npc-lore build' first.");
    }

    println!("Talk to the NPC. Type 'exit' to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        let spinner = if console::user_attended() {
            let spinner = ProgressBar::new_spinner().with_message("Thinking...");
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        } else {
            ProgressBar::hidden()
        };
        let answer = orchestrator.answer(question).await;
        spinner.finish_and_clear();

        println!("NPC: {}", answer.text());
    }

    println!("Farewell, traveler.");
    Ok(())
}
