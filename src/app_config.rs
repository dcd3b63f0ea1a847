//! Application configuration loading for CLI defaults.
//!
//! Values come from three layers, highest priority first: command-line
//! flags, the optional config file, built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use catalog_mirror::crawl::{DEFAULT_ENDPOINT, DEFAULT_PAGE_SIZE};
use catalog_mirror::download::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_SIZE_BYTES, DEFAULT_SUCCESS_PAUSE, DEFAULT_TIMEOUT_SECS,
};
use catalog_mirror::http::ClientOptions;

use crate::cli::{CrawlArgs, DownloadArgs, RenderArgs};

const APP_DIR: &str = "catalog-mirror";
const DEFAULT_RECORDS_FILE: &str = "output.json";
const DEFAULT_OUTPUT_DIR: &str = "data";
const DEFAULT_HTML_FILE: &str = "index.html";

/// File configuration for command defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Root directory for downloaded attachments.
    pub output_dir: Option<PathBuf>,
    /// Record file read by `download` and `render`, written by `crawl`.
    pub input: Option<PathBuf>,
    /// Attempts per attachment (1..=10).
    pub max_attempts: Option<u32>,
    /// Pause after each successful download in seconds (0..=600).
    pub pause_secs: Option<u64>,
    /// Size ceiling in bytes.
    pub max_size_bytes: Option<u64>,
    /// Connect and read timeout in seconds (1..=3600).
    pub timeout_secs: Option<u64>,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: Option<bool>,
    /// Records requested per crawl page (1..=10000).
    pub page_size: Option<u32>,
    /// Search endpoint URL.
    pub endpoint: Option<String>,
}

impl FileConfig {
    /// Validates config values against the same constraints as the CLI.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_attempts) = self.max_attempts
            && !(1..=10).contains(&max_attempts)
        {
            bail!("Invalid config value for `max_attempts`: {max_attempts}. Expected range: 1..=10");
        }
        if let Some(pause_secs) = self.pause_secs
            && pause_secs > 600
        {
            bail!("Invalid config value for `pause_secs`: {pause_secs}. Expected range: 0..=600");
        }
        if self.max_size_bytes == Some(0) {
            bail!("Invalid config value for `max_size_bytes`: 0. Expected a positive byte count");
        }
        if let Some(timeout_secs) = self.timeout_secs
            && !(1..=3600).contains(&timeout_secs)
        {
            bail!("Invalid config value for `timeout_secs`: {timeout_secs}. Expected range: 1..=3600");
        }
        if let Some(page_size) = self.page_size
            && !(1..=10_000).contains(&page_size)
        {
            bail!("Invalid config value for `page_size`: {page_size}. Expected range: 1..=10000");
        }
        if let Some(endpoint) = &self.endpoint
            && url::Url::parse(endpoint).is_err()
        {
            bail!("Invalid config value for `endpoint`: '{endpoint}' is not a URL");
        }
        Ok(())
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    fn file(&self) -> FileConfig {
        self.config.clone().unwrap_or_default()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/catalog-mirror/config.toml`
/// 2. `$HOME/.config/catalog-mirror/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(p) if p.exists() => Some(load_file_config(p)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(parse_string_literal(value).with_context(context)?));
            }
            "input" => {
                cfg.input = Some(PathBuf::from(parse_string_literal(value).with_context(context)?));
            }
            "endpoint" => {
                cfg.endpoint = Some(parse_string_literal(value).with_context(context)?);
            }
            "max_attempts" => {
                cfg.max_attempts = Some(parse_integer_u32(value).with_context(context)?);
            }
            "page_size" => {
                cfg.page_size = Some(parse_integer_u32(value).with_context(context)?);
            }
            "pause_secs" => {
                cfg.pause_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "max_size_bytes" => {
                cfg.max_size_bytes = Some(parse_integer_u64(value).with_context(context)?);
            }
            "timeout_secs" => {
                cfg.timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "accept_invalid_certs" => {
                cfg.accept_invalid_certs = Some(parse_boolean(value).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_integer_u32(raw_value: &str) -> Result<u32> {
    let value = parse_integer_u64(raw_value)?;
    u32::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u32"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Effective settings for `crawl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub endpoint: String,
    pub page_size: u32,
    pub output: PathBuf,
    pub client: ClientOptions,
}

/// Effective settings for `download`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub max_attempts: u32,
    pub success_pause: Duration,
    pub max_size_bytes: u64,
    pub client: ClientOptions,
}

/// Effective settings for `render`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub input: PathBuf,
    pub output: PathBuf,
}

fn client_options(timeout_secs: Option<u64>, insecure: bool, file: &FileConfig) -> ClientOptions {
    ClientOptions {
        timeout_secs: timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        accept_invalid_certs: insecure || file.accept_invalid_certs.unwrap_or(false),
    }
}

/// Merges `crawl` flags over the config file.
#[must_use]
pub fn crawl_settings(args: &CrawlArgs, loaded: &LoadedConfig) -> CrawlSettings {
    let file = loaded.file();
    CrawlSettings {
        endpoint: args
            .endpoint
            .clone()
            .or_else(|| file.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        page_size: args.page_size.or(file.page_size).unwrap_or(DEFAULT_PAGE_SIZE),
        output: args
            .output
            .clone()
            .or_else(|| file.input.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDS_FILE)),
        client: client_options(args.timeout_secs, args.insecure, &file),
    }
}

/// Merges `download` flags over the config file.
#[must_use]
pub fn download_settings(args: &DownloadArgs, loaded: &LoadedConfig) -> DownloadSettings {
    let file = loaded.file();
    DownloadSettings {
        input: args
            .input
            .clone()
            .or_else(|| file.input.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDS_FILE)),
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        max_attempts: args
            .max_attempts
            .or(file.max_attempts)
            .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        success_pause: args
            .pause_secs
            .or(file.pause_secs)
            .map_or(DEFAULT_SUCCESS_PAUSE, Duration::from_secs),
        max_size_bytes: args
            .max_size_bytes
            .or(file.max_size_bytes)
            .unwrap_or(DEFAULT_MAX_SIZE_BYTES),
        client: client_options(args.timeout_secs, args.insecure, &file),
    }
}

/// Merges `render` flags over the config file.
#[must_use]
pub fn render_settings(args: &RenderArgs, loaded: &LoadedConfig) -> RenderSettings {
    let file = loaded.file();
    RenderSettings {
        input: args
            .input
            .clone()
            .or(file.input)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDS_FILE)),
        output: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HTML_FILE)),
    }
}
