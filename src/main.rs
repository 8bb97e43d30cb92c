use anyhow::Result;
use bedrock_rag::commands::{ask, build_index, run_chat, run_rag, show_status};
use bedrock_rag::config::{run_interactive_config, show_config};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bedrock-rag")]
#[command(about = "Multilingual chat and PDF question answering on Amazon Bedrock")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Bedrock connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chat with the model in a language of your choice
    Chat,
    /// Build the PDF index and ask questions interactively
    Rag,
    /// Build or rebuild the vector index from the PDF directory
    Index,
    /// Answer a single question from the vector index
    Ask {
        /// Question to answer
        question: String,
    },
    /// Show configuration, credentials and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Chat => {
            run_chat().await?;
        }
        Commands::Rag => {
            run_rag().await?;
        }
        Commands::Index => {
            build_index().await?;
        }
        Commands::Ask { question } => {
            ask(&question).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["bedrock-rag", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
        }
    }

    #[test]
    fn interactive_commands() {
        for (arg, expected) in [("chat", "chat"), ("rag", "rag"), ("index", "index")] {
            let parsed = Cli::try_parse_from(["bedrock-rag", arg]).expect("command parses");
            let name = match parsed.command {
                Commands::Chat => "chat",
                Commands::Rag => "rag",
                Commands::Index => "index",
                _ => "other",
            };
            assert_eq!(name, expected);
        }
    }

    #[test]
    fn ask_command_with_question() {
        let cli = Cli::try_parse_from(["bedrock-rag", "ask", "What is the capital of France?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question } = parsed.command {
                assert_eq!(question, "What is the capital of France?");
            } else {
                panic!("expected ask command");
            }
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["bedrock-rag", "ask"]);
        assert!(cli.is_err());

        if let Err(error) = cli {
            assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["bedrock-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Config { show: true }));
        }
    }

    #[test]
    fn config_without_flag_is_interactive() {
        let parsed = Cli::try_parse_from(["bedrock-rag", "config"]).expect("config parses");
        assert!(matches!(parsed.command, Commands::Config { show: false }));
    }

    #[test]
    fn unknown_command_fails() {
        let cli = Cli::try_parse_from(["bedrock-rag", "serve"]);
        assert!(cli.is_err());

        if let Err(error) = cli {
            assert_eq!(error.kind(), ErrorKind::InvalidSubcommand);
        }
    }
}
