use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod chat;
pub mod serve;

use crate::ai::ProviderKind;

#[derive(Subcommand)]
enum Command {
    /// Run the web server with the chat page and API
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Start a chat session in the terminal
    Chat {
        /// Provider to start with, defaults to the first configured one
        #[arg(long, value_enum)]
        provider: Option<ProviderKind>,

        /// Model to start with, defaults to the provider's first model
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    // Handle each sub command
    match args.command {
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::Chat { provider, model }) => {
            chat::run(provider, model).await?;
        }
        None => {}
    }

    Ok(())
}
