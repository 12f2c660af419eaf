//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod conversation_list;
pub mod say;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::http::HttpBackend;
use crate::cli::conversation_list::list_conversations;
use crate::cli::say::run_say;
use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{init_tracing, LogSink};

#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
))]
#[command(about = "A terminal chat client for a conversation service")]
#[command(
    long_about = "Parley is a full-screen terminal client for a chat service that keeps \
conversations on the server. Replies stream in as they are generated, older messages \
load on demand, and new conversations get their title from the server.\n\n\
Authentication:\n\
  The bearer token is read from $PARLEY_TOKEN (or the variable named by token_env \
in the config file).\n\n\
Controls:\n\
  Enter             Send the message / open the selected conversation\n\
  Tab               Switch between the conversation list and the input\n\
  Ctrl+N            Start a new conversation\n\
  PageUp            Load older messages\n\
  r / d             Rename / delete the selected conversation\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend root URL (overrides the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Conversation to open (or to send to with `say`)
    #[arg(short = 'c', long, global = true, value_name = "ID")]
    pub conversation: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one message and print the streamed reply
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List conversations, most recently updated first
    Conversations {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Write a config file populated with the defaults
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings
    Show,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

fn config_path(args: &Args) -> Result<PathBuf, Box<dyn Error>> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::default_path()?),
    }
}

fn build_backend(config: &Config, base_url: Option<&str>) -> HttpBackend {
    let base_url = base_url
        .map(str::to_string)
        .unwrap_or_else(|| config.base_url());
    HttpBackend::new(&base_url, config.token())
}

fn init_config(path: &Path, force: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() && !force {
        eprintln!(
            "⚠️  {} already exists (use --force to replace it)",
            path_display(path)
        );
        std::process::exit(1);
    }
    Config::with_defaults().save_to_path(path)?;
    println!("✅ Wrote {}", path_display(path));
    Ok(())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.as_ref().unwrap_or(&Commands::Chat);

    let sink = match (&args.log, command) {
        (Some(path), _) => LogSink::File(path),
        (None, Commands::Chat) => LogSink::Discard,
        (None, _) => LogSink::Stderr,
    };
    init_tracing(sink)?;

    let path = config_path(&args)?;
    let config = Config::load_from_path(&path)?;
    let backend = build_backend(&config, args.base_url.as_deref());

    match command {
        Commands::Chat => {
            run_chat(
                Arc::new(backend),
                config.sync_settings(),
                config.reveal_timing(),
                args.conversation,
            )
            .await
        }
        Commands::Say { prompt } => run_say(&backend, args.conversation, prompt.clone()).await,
        Commands::Conversations { page } => {
            list_conversations(&backend, *page, config.sync_settings().conversations_per_page)
                .await
        }
        Commands::Config { action } => match action.as_ref().unwrap_or(&ConfigAction::Show) {
            ConfigAction::Path => {
                println!("{}", path.display());
                Ok(())
            }
            ConfigAction::Init { force } => init_config(&path, *force),
            ConfigAction::Show => {
                config.print_all();
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn chat_is_the_default_command() {
        let args = Args::try_parse_from(["parley", "-c", "42"]).expect("parse");
        assert!(args.command.is_none());
        assert_eq!(args.conversation, Some(42));
    }

    #[test]
    fn say_collects_prompt_words_and_global_flags() {
        let args = Args::try_parse_from([
            "parley",
            "say",
            "-c",
            "7",
            "--base-url",
            "http://example.test/api",
            "hello",
            "-there",
        ])
        .expect("parse");

        match args.command {
            Some(Commands::Say { prompt }) => assert_eq!(prompt, vec!["hello", "-there"]),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(args.conversation, Some(7));
        assert_eq!(args.base_url.as_deref(), Some("http://example.test/api"));
    }

    #[test]
    fn config_subcommands_parse() {
        let args = Args::try_parse_from(["parley", "config", "init", "--force"]).expect("parse");
        match args.command {
            Some(Commands::Config { action }) => {
                assert_eq!(action, Some(ConfigAction::Init { force: true }))
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn base_url_flag_overrides_config() {
        let config = Config {
            base_url: Some("http://configured.test/api".into()),
            ..Default::default()
        };
        assert_eq!(
            build_backend(&config, Some("http://flag.test/api/")).base_url(),
            "http://flag.test/api"
        );
        assert_eq!(
            build_backend(&config, None).base_url(),
            "http://configured.test/api"
        );
    }

    #[test]
    fn config_init_writes_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("config.toml");

        init_config(&path, false).expect("init");

        let loaded = Config::load_from_path(&path).expect("load");
        assert_eq!(loaded, Config::with_defaults());
    }
}
