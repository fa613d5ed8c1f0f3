use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use better_prompt_engine::CoordinatorConfig;
use better_prompt_engine::DEFAULT_DEBOUNCE;
use better_prompt_engine::DEFAULT_ENDPOINT;
use better_prompt_engine::DEFAULT_MIN_WORDS_FOR_REQUEST;
use clap::ValueEnum;
use tempfile::NamedTempFile;
use toml_edit::DocumentMut;
use toml_edit::Item as TomlItem;
use toml_edit::value;

/// One source of settings. Unset fields fall through to the next, lower-precedence source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub debounce_ms: Option<u64>,
    pub min_words_for_request: Option<usize>,
}

impl ConfigLayer {
    /// Keeps every field set on `self` and fills the rest from `lower`.
    pub fn or(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            api_url: self.api_url.or(lower.api_url),
            api_key: self.api_key.or(lower.api_key),
            debounce_ms: self.debounce_ms.or(lower.debounce_ms),
            min_words_for_request: self.min_words_for_request.or(lower.min_words_for_request),
        }
    }
}

/// Fully resolved settings for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub api_key: String,
    pub debounce: Duration,
    pub min_words_for_request: usize,
}

impl Settings {
    /// Resolves `layers`, ordered from highest to lowest precedence, on top of the defaults.
    pub fn resolve(layers: impl IntoIterator<Item = ConfigLayer>) -> Settings {
        let merged = layers
            .into_iter()
            .fold(ConfigLayer::default(), ConfigLayer::or);
        Settings {
            api_url: merged
                .api_url
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key: merged.api_key.unwrap_or_default(),
            debounce: merged
                .debounce_ms
                .map_or(DEFAULT_DEBOUNCE, Duration::from_millis),
            min_words_for_request: merged
                .min_words_for_request
                .unwrap_or(DEFAULT_MIN_WORDS_FOR_REQUEST),
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            debounce: self.debounce,
            min_words_for_request: self.min_words_for_request,
        }
    }
}

/// Keys that can be persisted in `config.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum ConfigKey {
    ApiUrl,
    ApiKey,
    DebounceMs,
    MinWordsForRequest,
}

impl ConfigKey {
    pub fn toml_key(self) -> &'static str {
        match self {
            ConfigKey::ApiUrl => "api_url",
            ConfigKey::ApiKey => "api_key",
            ConfigKey::DebounceMs => "debounce_ms",
            ConfigKey::MinWordsForRequest => "min_words_for_request",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings stored in `config.toml`. A missing file is an empty layer; a file that
    /// is not valid TOML is reported and only its top-level `key = value` lines are recovered.
    pub fn load(&self) -> anyhow::Result<ConfigLayer> {
        let Some(content) = read_document_string(&self.path)? else {
            return Ok(ConfigLayer::default());
        };

        match content.parse::<DocumentMut>() {
            Ok(doc) => Ok(read_layer(&doc)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "config.toml is not valid TOML, reading top-level keys only: {err}"
                );
                Ok(parse_layer_fallback(&content))
            }
        }
    }

    /// Stores `raw` under `key`, keeping the rest of the file (comments included) untouched.
    pub fn set(&self, key: ConfigKey, raw: &str) -> anyhow::Result<()> {
        let content = read_document_string(&self.path)?.unwrap_or_default();
        let mut doc = content
            .parse::<DocumentMut>()
            .with_context(|| format!("{} is not valid TOML", self.path.display()))?;

        let toml_key = key.toml_key();
        doc[toml_key] = match key {
            ConfigKey::ApiUrl | ConfigKey::ApiKey => value(raw),
            ConfigKey::DebounceMs | ConfigKey::MinWordsForRequest => {
                let number: i64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("`{toml_key}` must be a non-negative integer"))?;
                if number < 0 {
                    anyhow::bail!("`{toml_key}` must be a non-negative integer");
                }
                value(number)
            }
        };

        write_atomic_text(&self.path, &doc.to_string())
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".better-prompt").join("config.toml")
}

fn read_layer(doc: &DocumentMut) -> ConfigLayer {
    ConfigLayer {
        api_url: read_string(doc, "api_url"),
        api_key: read_string(doc, "api_key"),
        debounce_ms: read_integer(doc, "debounce_ms"),
        min_words_for_request: read_integer(doc, "min_words_for_request"),
    }
}

fn read_string(doc: &DocumentMut, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(TomlItem::as_str)
        .and_then(non_empty)
}

fn read_integer<T: TryFrom<i64>>(doc: &DocumentMut, key: &str) -> Option<T> {
    doc.get(key)
        .and_then(TomlItem::as_integer)
        .and_then(|n| T::try_from(n).ok())
}

fn parse_layer_fallback(contents: &str) -> ConfigLayer {
    let mut layer = ConfigLayer::default();

    for line in contents.lines() {
        let trimmed = line.trim_start();
        // Only root keys are meaningful; everything after the first table header is skipped.
        if trimmed.starts_with('[') {
            break;
        }
        let Some(line) = strip_toml_comment(trimmed) else {
            continue;
        };
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim() {
            "api_url" => layer.api_url = parse_quoted(raw).and_then(non_empty),
            "api_key" => layer.api_key = parse_quoted(raw).and_then(non_empty),
            "debounce_ms" => layer.debounce_ms = raw.parse().ok(),
            "min_words_for_request" => layer.min_words_for_request = raw.parse().ok(),
            _ => {}
        }
    }

    layer
}

fn parse_quoted(raw: &str) -> Option<&str> {
    raw.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
}

fn strip_toml_comment(line: &str) -> Option<&str> {
    let line = line.split_once('#').map_or(line, |(head, _)| head).trim();
    if line.is_empty() { None } else { Some(line) }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Reads the `.env` file in `dir`, if any, without exporting anything into the process
/// environment.
pub fn load_dotenv(dir: &Path) -> anyhow::Result<ConfigLayer> {
    let path = dir.join(".env");
    if !path.is_file() {
        return Ok(ConfigLayer::default());
    }

    let entries = dotenv::from_path_iter(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut layer = ConfigLayer::default();
    for entry in entries {
        let (key, raw) = entry.with_context(|| format!("parse {}", path.display()))?;
        match key.as_str() {
            "API_URL" => layer.api_url = non_empty(&raw),
            "API_KEY" => layer.api_key = non_empty(&raw),
            "DEBOUNCE_DELAY" => layer.debounce_ms = parse_dotenv_number(&key, &raw),
            "MIN_WORDS_FOR_REQUEST" => {
                layer.min_words_for_request = parse_dotenv_number(&key, &raw);
            }
            _ => {}
        }
    }
    Ok(layer)
}

fn parse_dotenv_number<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(number) => Some(number),
        Err(_) => {
            tracing::warn!(key, value = raw, "ignoring non-numeric .env value");
            None
        }
    }
}

fn read_document_string(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(anyhow::Error::new(err).context("read config.toml")),
    }
}

fn write_atomic_text(path: &Path, contents: &str) -> anyhow::Result<()> {
    let Some(parent) = path.parent() else {
        anyhow::bail!("invalid config path: {}", path.display());
    };
    std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp config")?;
    use std::io::Write as _;
    tmp.write_all(contents.as_bytes())
        .context("write temp config")?;
    if !contents.ends_with('\n') {
        tmp.write_all(b"\n").context("write temp newline")?;
    }
    tmp.flush().context("flush temp config")?;

    tmp.persist(path).map_err(|err| {
        anyhow::Error::new(err.error).context(format!("persist config to {}", path.display()))
    })?;
    Ok(())
}
