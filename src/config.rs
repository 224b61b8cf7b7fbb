//! Run configuration, read from the environment (and `.env` via dotenv).

use crate::processing::MatchSettings;
use chrono_tz::Tz;
use std::path::PathBuf;

/// Pause between consecutive per-resource `az` calls.
pub const SLEEP_MSEC: u64 = 200;

pub const DEFAULT_OUTPUT: &str = "azure_resource_graph";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Subscription to scan; `None` means the `az` CLI default.
    pub subscription_id: Option<String>,
    /// Prefix of all output files.
    pub output: String,
    /// Skip per-resource enrichment.
    pub basic_mode: bool,
    /// Load `<output>.json` instead of querying Azure.
    pub use_snapshot: bool,
    pub include_potential: bool,
    pub write_markdown: bool,
    pub write_report: bool,
    pub match_settings: MatchSettings,
    pub timezone: Tz,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            subscription_id: None,
            output: DEFAULT_OUTPUT.to_string(),
            basic_mode: false,
            use_snapshot: false,
            include_potential: true,
            write_markdown: true,
            write_report: true,
            match_settings: MatchSettings::default(),
            timezone: Tz::UTC,
        }
    }
}

impl Config {
    /// Build from process environment variables.
    pub fn from_env() -> Config {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparsable values keep defaults.
    pub fn from_lookup<F>(get: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let flag = |key: &str, default: bool| match get(key) {
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                log::warn!("Ignoring {key}={value}, expected a boolean");
                default
            }),
            None => default,
        };

        let min_name_length = match get("ARG_MIN_NAME_LENGTH") {
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                log::warn!("Ignoring ARG_MIN_NAME_LENGTH={value}, expected a number");
                defaults.match_settings.min_name_length
            }),
            None => defaults.match_settings.min_name_length,
        };

        let timezone = match get("ARG_TIMEZONE") {
            Some(value) => value.trim().parse::<Tz>().unwrap_or_else(|e| {
                log::warn!("Ignoring ARG_TIMEZONE={value}: {e}");
                defaults.timezone
            }),
            None => defaults.timezone,
        };

        Config {
            subscription_id: get("AZURE_SUBSCRIPTION_ID")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            output: get("ARG_OUTPUT")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.output),
            basic_mode: flag("ARG_BASIC_MODE", defaults.basic_mode),
            use_snapshot: flag("ARG_USE_SNAPSHOT", defaults.use_snapshot),
            include_potential: !flag("ARG_NO_POTENTIAL_DEPS", !defaults.include_potential),
            write_markdown: !flag("ARG_NO_MD", !defaults.write_markdown),
            write_report: !flag("ARG_NO_REPORT", !defaults.write_report),
            match_settings: MatchSettings {
                min_name_length,
                ignore_hyphens: flag("ARG_IGNORE_HYPHENS", defaults.match_settings.ignore_hyphens),
            },
            timezone,
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.json", self.output))
    }

    pub fn markdown_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.md", self.output))
    }

    pub fn report_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_report.md", self.output))
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
