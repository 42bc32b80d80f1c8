//! Command-line interface parsing and handling
//!
//! `diybot` with no subcommand opens the chat UI. `say` streams one answer
//! to stdout; `auth` and `config` manage the keyring and the config file.

pub mod say;

#[cfg(test)]
mod tests;

use std::error::Error;
use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use crate::auth::{AuthKey, AuthManager, CredentialKind, CredentialSource};
use crate::cli::say::run_say;
use crate::core::app::{App, SessionContext};
use crate::core::chat_stream::RequestAuth;
use crate::core::config::{
    path_display, ConfigStore, Settings, SettingsOverrides, Transport, CONFIG_KEYS,
};
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::{init_tracing, LogTarget};

const VERSION_INFO: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ", rustc ",
    env!("VERGEN_RUSTC_SEMVER"),
    ")"
);

#[derive(Parser)]
#[command(name = "diybot")]
#[command(version = VERSION_INFO)]
#[command(about = "A terminal chat client that streams LLM completions as live Markdown")]
#[command(
    long_about = "diybot is a full-screen terminal chat client. Replies stream in and are \
rendered as Markdown while they arrive, with a cursor on the node that is still growing.\n\n\
Authentication:\n\
  Use 'diybot auth set' to store the proxy auth key in your system keyring.\n\
  Use 'diybot auth set --openai' for the OpenAI API key.\n\n\
Environment Variables (fallback if nothing is stored):\n\
  DIYBOT_AUTH_KEY   Proxy auth key (48 letters or digits)\n\
  OPENAI_API_KEY    OpenAI API key for the openai-completions transport\n\
  DIYBOT_ENDPOINT   Chat proxy URL\n\
  DIYBOT_MODEL      Model name\n\
  DIYBOT_CONFIG     Path to an alternate config.toml\n\
  DIYBOT_LOG        Log filter (falls back to RUST_LOG)\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a newline\n\
  Esc               Stop the reply\n\
  Ctrl+L            Clear the conversation\n\
  Ctrl+Y            Copy the latest code block\n\
  Up/Down/PgUp/PgDn Scroll the transcript (End follows new text)\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to request
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Chat proxy URL
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Upstream API: proxy or openai-completions
    #[arg(short = 't', long, global = true, value_name = "TRANSPORT")]
    pub transport: Option<Transport>,

    /// Write logs to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one prompt and print the reply
    Say {
        /// Reveal the reply word by word
        #[arg(long)]
        typewriter: bool,
        /// Prompt text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Manage stored credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Show or change configuration values
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Store a credential in the keyring (reads stdin when no key is given)
    Set {
        key: Option<String>,
        /// Store the OpenAI API key instead of the proxy auth key
        #[arg(long)]
        openai: bool,
    },
    /// Show where each credential comes from
    Status,
    /// Remove a stored credential
    Clear {
        #[arg(long)]
        openai: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print stored and effective values
    Show,
    /// Set a configuration value
    Set {
        key: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset { key: String },
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            transport: self.transport,
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let overrides = args.overrides();

    let log_target = match (&args.command, args.log.as_deref()) {
        (None | Some(Commands::Chat), Some(path)) => LogTarget::File(path),
        (None | Some(Commands::Chat), None) => LogTarget::Off,
        (_, _) => LogTarget::Stderr,
    };
    if let Err(err) = init_tracing(log_target) {
        eprintln!("⚠️  Logging disabled: {err}");
    }

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let app = build_app(&overrides)?;
            run_chat(app).await
        }
        Commands::Say { typewriter, prompt } => {
            let app = build_app(&overrides)?;
            run_say(app, prompt, typewriter).await
        }
        Commands::Auth { command } => run_auth(command),
        Commands::Config { command } => run_config(command, &overrides),
    }
}

fn build_app(overrides: &SettingsOverrides) -> Result<App, Box<dyn Error>> {
    let store = ConfigStore::open_default()?;
    let settings = store.load()?.resolve(overrides);
    debug!(
        config = %path_display(store.path()),
        transport = %settings.transport,
        "settings resolved"
    );
    let auth = resolve_auth(&AuthManager::new(), &settings)?;
    Ok(App::new(SessionContext::new(settings, auth)))
}

fn resolve_auth(
    manager: &AuthManager,
    settings: &Settings,
) -> Result<RequestAuth, Box<dyn Error>> {
    match settings.transport {
        Transport::Proxy => match manager.auth_key()? {
            Some(key) => Ok(RequestAuth::Cookie(key)),
            None => {
                warn!("no proxy auth key configured; sending requests without one");
                Ok(RequestAuth::None)
            }
        },
        Transport::OpenaiCompletions => match manager.openai_token()? {
            Some(token) => Ok(RequestAuth::Bearer(token)),
            None => Err(
                "No OpenAI API key found. Run 'diybot auth set --openai' or set OPENAI_API_KEY."
                    .into(),
            ),
        },
    }
}

fn credential_kind(openai: bool) -> CredentialKind {
    if openai {
        CredentialKind::OpenAiToken
    } else {
        CredentialKind::ProxyAuthKey
    }
}

fn run_auth(command: AuthCommands) -> Result<(), Box<dyn Error>> {
    let manager = AuthManager::new();
    match command {
        AuthCommands::Set { key, openai } => {
            let kind = credential_kind(openai);
            let raw = match key {
                Some(key) => key,
                None => read_secret_line(io::stdin().lock())?,
            };
            let secret = match kind {
                CredentialKind::ProxyAuthKey => AuthKey::parse(&raw)?.as_str().to_string(),
                CredentialKind::OpenAiToken => raw.trim().to_string(),
            };
            if secret.is_empty() {
                return Err(format!("No {} given", kind.label()).into());
            }
            manager.store(kind, &secret)?;
            println!("✅ Stored {} in the keyring", kind.label());
        }
        AuthCommands::Status => {
            for kind in [CredentialKind::ProxyAuthKey, CredentialKind::OpenAiToken] {
                println!("{}", describe_credential(kind, manager.lookup(kind)?));
            }
        }
        AuthCommands::Clear { openai } => {
            let kind = credential_kind(openai);
            if manager.remove(kind)? {
                println!("✅ Removed {} from the keyring", kind.label());
            } else {
                println!("No {} stored in the keyring", kind.label());
            }
        }
    }
    Ok(())
}

fn read_secret_line(mut input: impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn describe_credential(kind: CredentialKind, found: Option<(String, CredentialSource)>) -> String {
    match found {
        Some((_, CredentialSource::Keyring)) => format!("{}: stored in keyring", kind.label()),
        Some((_, CredentialSource::Environment)) => {
            format!("{}: from environment", kind.label())
        }
        None => format!("{}: not set", kind.label()),
    }
}

fn run_config(
    command: ConfigCommands,
    overrides: &SettingsOverrides,
) -> Result<(), Box<dyn Error>> {
    let store = ConfigStore::open_default()?;
    match command {
        ConfigCommands::Show => {
            let config = store.load()?;
            println!("Config file: {}", path_display(store.path()));
            config.print_all(&config.resolve(overrides));
            println!("Keys: {}", CONFIG_KEYS.join(", "));
        }
        ConfigCommands::Set { key, value } => {
            let value = value.join(" ");
            store.mutate(|config| config.set_value(&key, &value).map_err(Into::into))?;
            println!("✅ Set {key} = {value}");
        }
        ConfigCommands::Unset { key } => {
            store.mutate(|config| config.unset_value(&key).map_err(Into::into))?;
            println!("✅ Unset {key}");
        }
    }
    Ok(())
}
