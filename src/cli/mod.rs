//! Command-line interface parsing and handling
//!
//! Configuration is layered: the TOML file, then `ASK_CBIOPORTAL_URL` and
//! `MODEL`, then command-line flags.

pub mod ask;
pub mod health;
pub mod history;
pub mod settings;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::core::app::App;
use crate::core::channel::websocket::WebSocketTransport;
use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::core::history::{FileStore, HistoryPersistence, KeyValueStore, MemoryStore};
use crate::core::session::SessionId;
use crate::ui::chat_loop::run_chat;
use crate::ui::markdown::Renderer;
use crate::ui::terminal::TerminalView;
use crate::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "askportal")]
#[command(about = "Ask questions about cBioPortal data from the terminal")]
#[command(
    long_about = "askportal connects to an ask-cbioportal server and streams answers to \
your questions. Conversations are kept locally and can be resumed, listed and exported.\n\n\
One-off questions:\n\
  askportal ask \"How many studies are there?\" [--no-stream]\n\n\
Environment Variables:\n\
  ASK_CBIOPORTAL_URL  Server base URL (defaults to http://127.0.0.1:8000)\n\
  MODEL               Model hint forwarded with each question\n\
  RUST_LOG            Diagnostic log filter (defaults to warn)\n\n\
Commands inside the chat:\n\
  /help               List chat commands\n\
  /new, /list         Start or list conversations\n\
  /switch <n|id>      Resume another conversation\n\
  /quit               Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server base URL
    #[arg(short = 's', long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Model hint forwarded to the server
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Config file to use instead of the default location
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write diagnostics to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Keep conversations in memory only
    #[arg(long, global = true)]
    pub no_history: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question; several words are joined with spaces
        #[arg(required = true)]
        question: Vec<String>,
        /// Print the answer once it is complete
        #[arg(long)]
        no_stream: bool,
    },
    /// Inspect saved conversations
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Check that the server is up
    Health,
    /// Set configuration values, or show them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List saved conversations, most recent first
    List,
    /// Print a conversation
    Show {
        /// List number, id or id prefix
        id: String,
        /// Render as HTML
        #[arg(long)]
        html: bool,
    },
    /// Delete a conversation
    Delete {
        /// List number, id or id prefix
        id: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

fn config_path(args: &Args) -> Result<PathBuf, Box<dyn Error>> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::get_config_path()?),
    }
}

/// Applies command-line flags on top of `config`.
pub fn apply_cli_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(server) = args.server.as_deref().filter(|s| !s.trim().is_empty()) {
        config.server_url = Some(server.trim().to_string());
    }
    if let Some(model) = args.model.as_deref().filter(|m| !m.trim().is_empty()) {
        config.model = Some(model.trim().to_string());
    }
    config
}

pub fn build_renderer(config: &Config) -> Renderer {
    Renderer::default()
        .with_download_prefix(config.download_prefix())
        .with_syntax_highlighting(config.syntax_highlighting())
}

pub fn build_persistence(config: &Config, no_history: bool) -> HistoryPersistence {
    let store: Box<dyn KeyValueStore> = match (no_history, config.history_dir()) {
        (true, _) => Box::new(MemoryStore::new()),
        (false, Some(dir)) => {
            info!(dir = %path_display(&dir), "using history directory");
            Box::new(FileStore::new(dir))
        }
        (false, None) => {
            warn!("no data directory available; conversations will not be saved");
            Box::new(MemoryStore::new())
        }
    };
    HistoryPersistence::new(store)
}

fn load_config(path: &Path, args: &Args) -> Result<Config, Box<dyn Error>> {
    let config = Config::load_from_path(path)?.with_env_overrides();
    Ok(apply_cli_overrides(config, args))
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let path = config_path(&args)?;

    match args.command {
        None | Some(Commands::Chat) => {
            let config = load_config(&path, &args)?;
            let transport = Arc::new(WebSocketTransport::new(config.server_url()));
            let (app, events) = App::new(
                transport,
                config.reconnect_delay(),
                build_persistence(&config, args.no_history),
                build_renderer(&config),
                TerminalView::stdout(),
                config.model.clone(),
            );
            run_chat(app, events).await
        }
        Some(Commands::Ask {
            ref question,
            no_stream,
        }) => {
            let config = load_config(&path, &args)?;
            let transport = Arc::new(WebSocketTransport::new(config.server_url()));
            let persistence = build_persistence(&config, args.no_history);
            let options = ask::AskOptions {
                model_hint: config.model.clone(),
                stream: !no_stream,
                reconnect_delay: config.reconnect_delay(),
                ..ask::AskOptions::default()
            };
            let mut stdout = std::io::stdout();
            ask::ask(
                transport,
                &persistence,
                build_renderer(&config),
                SessionId::new(),
                &question.join(" "),
                options,
                &mut stdout,
            )
            .await?;
            Ok(())
        }
        Some(Commands::History { ref action }) => {
            let config = load_config(&path, &args)?;
            let persistence = build_persistence(&config, args.no_history);
            let mut saved = persistence.load();
            match action {
                HistoryCommand::List => println!("{}", history::list_conversations(&saved)),
                HistoryCommand::Show { id, html } => {
                    let renderer = build_renderer(&config);
                    println!(
                        "{}",
                        history::show_conversation(&saved, id, *html, &renderer)?
                    );
                }
                HistoryCommand::Delete { id } => {
                    let title = history::delete_conversation(&mut saved, &persistence, id)?;
                    println!("Deleted \"{title}\"");
                }
            }
            Ok(())
        }
        Some(Commands::Health) => {
            let config = load_config(&path, &args)?;
            health::check_health(config.server_url()).await
        }
        Some(Commands::Set { ref key, ref value }) => {
            let mut config = Config::load_from_path(&path)?;
            match key {
                Some(key) => {
                    let message = settings::set(&mut config, key, value)?;
                    config.save_to_path(&path)?;
                    println!("{message}");
                }
                None => {
                    println!("Configuration ({}):", path_display(&path));
                    println!("{}", settings::describe(&config));
                }
            }
            Ok(())
        }
        Some(Commands::Unset { ref key }) => {
            let mut config = Config::load_from_path(&path)?;
            let message = settings::unset(&mut config, key)?;
            config.save_to_path(&path)?;
            println!("{message}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
