mod check;
mod config;
mod interactive;

use anyhow::Context;
use better_prompt_engine::HttpSuggestionClient;
use better_prompt_engine::SuggestionSession;
use clap::Parser;
use clap::Subcommand;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigKey;
use crate::config::ConfigLayer;
use crate::config::ConfigStore;
use crate::config::Settings;
use crate::interactive::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Suggest better words for a prompt while it is being typed"
)]
struct Cli {
    /// Suggestion service endpoint.
    #[arg(long, env = "BETTER_PROMPT_API_URL")]
    api_url: Option<String>,

    /// Key sent as the `api-key` query parameter.
    #[arg(long, env = "BETTER_PROMPT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Quiet period after the last edit before a request is sent.
    #[arg(long, env = "BETTER_PROMPT_DEBOUNCE_MS", value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Prompts with fewer words are never sent.
    #[arg(long, env = "BETTER_PROMPT_MIN_WORDS", value_name = "N")]
    min_words: Option<usize>,

    /// Print every session update as a JSON object per line.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Send one request to the suggestion service and report the result.
    Check {
        /// Prompt to send; defaults to a short Persian sentence.
        prompt: Option<String>,
    },
    /// Persist a setting in `~/.better-prompt/config.toml`.
    SetConfig {
        #[arg(value_enum)]
        key: ConfigKey,
        value: String,
    },
}

impl Cli {
    fn flag_layer(&self) -> ConfigLayer {
        ConfigLayer {
            api_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            debounce_ms: self.debounce_ms,
            min_words_for_request: self.min_words,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries session output; diagnostics go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn resolve_settings(cli: &Cli, store: Option<&ConfigStore>) -> anyhow::Result<Settings> {
    let workdir = std::env::current_dir().context("resolve current directory")?;
    let dotenv = match config::load_dotenv(&workdir) {
        Ok(layer) => layer,
        Err(err) => {
            tracing::warn!("ignoring .env: {err:#}");
            ConfigLayer::default()
        }
    };
    let file = match store.map(ConfigStore::load).transpose() {
        Ok(layer) => layer.unwrap_or_default(),
        Err(err) => {
            tracing::warn!("ignoring config.toml: {err:#}");
            ConfigLayer::default()
        }
    };
    Ok(Settings::resolve([cli.flag_layer(), dotenv, file]))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let store = match ConfigStore::new_default() {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::warn!("failed to locate better-prompt config: {err}");
            None
        }
    };

    if let Some(CliCommand::SetConfig { key, value }) = &cli.command {
        let Some(store) = store else {
            anyhow::bail!("cannot determine where to store config.toml");
        };
        store
            .set(*key, value)
            .with_context(|| format!("update {}", store.path().display()))?;
        println!("Saved {} to {}", key.toml_key(), store.path().display());
        return Ok(());
    }

    let settings = resolve_settings(&cli, store.as_ref())?;
    tracing::debug!(
        api_url = %settings.api_url,
        debounce = ?settings.debounce,
        min_words = settings.min_words_for_request,
        "resolved settings"
    );
    let client = HttpSuggestionClient::new(&settings.api_url, &settings.api_key)
        .context("configure suggestion client")?;

    if let Some(CliCommand::Check { prompt }) = &cli.command {
        let prompt = prompt.as_deref().unwrap_or(check::DEFAULT_CHECK_PROMPT);
        let report = check::run_check(&client, prompt).await;
        if report.is_success() {
            println!("{report}");
            return Ok(());
        }
        eprintln!("{report}");
        std::process::exit(1);
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    if format == OutputFormat::Text {
        eprintln!("{}", interactive::HELP);
    }

    let session = SuggestionSession::new(client, settings.coordinator_config());
    interactive::run(
        session,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        format,
    )
    .await
}
