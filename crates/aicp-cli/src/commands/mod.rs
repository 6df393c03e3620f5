use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use aicp_config::ConfigLoader;
use aicp_core::Result;
use aicp_providers::{GeminiProvider, MockProvider, OpenAiProvider, Provider};

mod chat;
mod registry;
mod run_eval;

/// Command-line interface for the AI control plane gateway and pipeline engines.
#[derive(Parser)]
#[command(name = "aicp", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the `aicp.toml` config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the model registry file path for this invocation.
    #[arg(long, global = true)]
    registry_path: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error).
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable debug logging.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output but errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which completion backend a command should talk to.
#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "lower")]
pub enum ProviderKind {
    Mock,
    Openai,
    Gemini,
}

impl ProviderKind {
    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Mock => "mock-echo",
            ProviderKind::Openai => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-1.5-pro",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single completion request through the gateway.
    Chat {
        /// The user message to send.
        message: String,

        /// Which provider to route the request to.
        #[arg(long, value_enum, default_value = "mock")]
        provider: ProviderKind,

        /// Override the model name sent to the provider.
        #[arg(long)]
        model: Option<String>,

        /// Redact PII (email, phone, SSN, credit card) in the request and response. On by default.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        redact: bool,

        /// Disable PII redaction.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        no_redact: bool,
    },
    /// Run a small demonstration pipeline over a prompt: generate, then validate the output.
    RunEval {
        /// The prompt to evaluate.
        prompt: String,
    },
    /// Inspect and mutate the model registry.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// List every registered model and its versions.
    List,
    /// Register a new (staging) version of a model.
    Register {
        name: String,
        version: String,
        provider: String,
        model_name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Promote a version to production, archiving the current production version.
    Promote { name: String, version: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(config.logging.level.as_str())
        };
        aicp_observability::setup_logging(log_level, &config.logging.format)
            .map_err(|e| aicp_core::AicpError::Config(e.to_string()))?;
        let _metrics_handle = aicp_observability::init_metrics()
            .map_err(|e| aicp_core::AicpError::Config(e.to_string()))?;

        let registry_path = self
            .registry_path
            .clone()
            .unwrap_or_else(|| config.registry.path.clone());

        match self.command {
            Commands::Chat {
                message,
                provider,
                model,
                redact: _,
                no_redact,
            } => {
                let redact = !no_redact;
                chat::run(config, provider, model, message, redact).await
            }
            Commands::RunEval { prompt } => run_eval::run(config, prompt).await,
            Commands::Registry { action } => registry::run(registry_path, action).await,
        }
    }
}

/// Build the provider backing a given [`ProviderKind`], reading API keys
/// from the environment by convention (`OPENAI_API_KEY`, `GEMINI_API_KEY`).
/// Absence of a key is not checked here: the provider raises at call time,
/// which the reliability layer treats as an ordinary failure.
pub(crate) fn build_provider(kind: ProviderKind, echo_seed: Option<&str>) -> Arc<dyn Provider> {
    match kind {
        ProviderKind::Mock => {
            let text = echo_seed
                .map(|s| format!("Echo: {s}"))
                .unwrap_or_else(|| "Echo: (no input)".to_string());
            Arc::new(MockProvider::new("mock").with_response(text))
        }
        ProviderKind::Openai => {
            let key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
            Arc::new(OpenAiProvider::new(key))
        }
        ProviderKind::Gemini => {
            let key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
            Arc::new(GeminiProvider::new(key))
        }
    }
}

pub(crate) fn default_model(kind: ProviderKind) -> &'static str {
    kind.default_model()
}
