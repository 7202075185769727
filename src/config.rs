use std::env;
use std::path::Path;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::backend::{BackendSetupError, HttpChatBackend, RequestDefaults, resolve_endpoint};
use crate::ui::PageAssets;
use crate::widget::WidgetOptions;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Chat service URL (absolute, or a path such as /api/chat)
    #[arg(long, env = "CHAT_URL", global = true)]
    pub chat_url: Option<String>,

    /// Ask the chat service for diagnostics
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the chat widget (default)
    Serve,
    /// Send one message and print the reply
    Ask(AskArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// Message to send
    pub message: String,

    /// Number of retrieved chunks
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,

    /// Model name forwarded to the service
    #[arg(long)]
    pub model: Option<String>,

    /// Access role (viewer, analyst, ...)
    #[arg(long)]
    pub role: Option<String>,

    /// Answering mode (rag or agent)
    #[arg(long)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub ui: PageAssets,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub session_ttl_secs: u64,
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    /// Absolute URL, or a path joined onto `base_url`.
    pub chat_url: String,
    #[serde(default)]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub debug: bool,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl ServerConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            role: self.role.clone(),
            top_k: self.top_k,
            model: self.model.clone(),
            mode: self.mode.clone(),
        }
    }

    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            debug: self.debug,
            defaults: self.request_defaults(),
        }
    }

    /// Build the HTTP client for the configured chat URL.
    pub fn build_backend(&self) -> Result<HttpChatBackend, BackendSetupError> {
        let endpoint = resolve_endpoint(&self.chat_url, self.base_url.as_deref())?;
        HttpChatBackend::new(endpoint, self.timeout())
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::load_from_cli(&cli)
    }

    /// Layer defaults, config file, `PAMS_` env vars and CLI flags.
    ///
    /// Priority: CLI flag > CLI env var > `PAMS_` env var > config file > defaults.
    pub fn load_from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.session_ttl_secs", 30 * 60)?
            .set_default("server.static_dir", "static")?
            .set_default("backend.chat_url", "http://127.0.0.1:8000/chat")?
            .set_default("backend.timeout_secs", 60)?
            .set_default("backend.debug", false)?;

        match &cli.config {
            Some(path) => {
                builder = builder.add_source(File::new(path, file_format(path)));
            }
            None if Path::new("config.yaml").exists() => {
                builder = builder.add_source(File::new("config.yaml", FileFormat::Yaml));
            }
            None => {}
        }

        // E.g. PAMS_BACKEND__CHAT_URL=http://pams:8000/api/chat
        builder = builder.add_source(
            Environment::with_prefix("PAMS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(chat_url) = &cli.chat_url {
            builder = builder.set_override("backend.chat_url", chat_url.as_str())?;
        }
        if cli.debug {
            builder = builder.set_override("backend.debug", true)?;
        }
        if let Some(Command::Ask(ask)) = &cli.command {
            builder = builder
                .set_override_option("backend.top_k", ask.top_k.map(i64::from))?
                .set_override_option("backend.model", ask.model.clone())?
                .set_override_option("backend.role", ask.role.clone())?
                .set_override_option("backend.mode", ask.mode.clone())?;
        }

        builder.build()?.try_deserialize()
    }
}

fn file_format(path: &str) -> FileFormat {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("toml") => FileFormat::Toml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Yaml,
    }
}
