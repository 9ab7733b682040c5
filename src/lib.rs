use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoreError>;

#[derive(Error, Debug)]
pub enum LoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Knowledge error: {0}")]
    Knowledge(#[from] knowledge::KnowledgeError),

    #[error("Build failed: {0}")]
    Build(#[from] store::BuildFailure),

    #[error("Load failed: {0}")]
    Load(#[from] store::LoadFailure),

    #[error("Client error: {0}")]
    Client(#[from] llm::ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod knowledge;
pub mod llm;
mod persist;
pub mod retrieval;
pub mod store;
