use clap::{Parser, Subcommand};
use npc_lore::Result;
use npc_lore::commands::{ask, build_store, chat, compile_items, search};
use npc_lore::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "npc-lore")]
#[command(about = "Retrieval-augmented NPC answers grounded in game item data")]
#[command(version)]
struct Cli {
    /// Configuration directory (defaults to ~/.npc-lore)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the OpenAI connection and NPC persona
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Compile an item table (CSV) into the knowledge file
    Compile {
        /// Path to the item table
        items: PathBuf,
    },
    /// Embed the knowledge file into a new vector snapshot
    Build,
    /// Show the knowledge sentence closest to a question
    Search {
        question: String,
    },
    /// Ask the NPC a single question
    Ask {
        question: String,
    },
    /// Start an interactive conversation with the NPC
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Compile { items } => {
            compile_items(&config_dir, &items)?;
        }
        Commands::Build => {
            build_store(&config_dir).await?;
        }
        Commands::Search { question } => {
            search(&config_dir, &question).await?;
        }
        Commands::Ask { question } => {
            ask(&config_dir, &question).await?;
        }
        Commands::Chat => {
            chat(&config_dir).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn build_command() {
        let cli = Cli::try_parse_from(["npc-lore", "build"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Build));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn compile_command_with_path() {
        let cli = Cli::try_parse_from(["npc-lore", "compile", "data/Item_Data.csv"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Compile { items } = parsed.command {
                assert_eq!(items, PathBuf::from("data/Item_Data.csv"));
            } else {
                panic!("expected compile command");
            }
        }
    }

    #[test]
    fn compile_requires_path() {
        let cli = Cli::try_parse_from(["npc-lore", "compile"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn ask_command_with_config_dir() {
        let cli = Cli::try_parse_from([
            "npc-lore",
            "ask",
            "What is a sword?",
            "--config-dir",
            "/tmp/npc",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/npc")));
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "What is a sword?");
            } else {
                panic!("expected ask command");
            }
        }
    }

    #[test]
    fn config_dir_before_subcommand() {
        let cli = Cli::try_parse_from(["npc-lore", "--config-dir", "lore", "chat"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.config_dir, Some(PathBuf::from("lore")));
            assert!(matches!(parsed.command, Commands::Chat));
        }
    }

    #[test]
    fn search_command() {
        let cli = Cli::try_parse_from(["npc-lore", "search", "shield"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Search { question } if question == "shield"));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["npc-lore", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["npc-lore", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["npc-lore", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
