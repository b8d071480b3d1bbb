//! Configuration types and CLI options.
//!
//! [`Opt`] is the raw command-line / environment surface. [`Config`] is the
//! resolved form the library consumes; it can be built programmatically
//! without any CLI dependencies.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::config::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_DB_DIR, DEFAULT_DB_FILENAME, DEFAULT_PORT,
    DEFAULT_UPDATE_INTERVAL_HOURS, MAXMIND_DOWNLOAD_BASE,
};

/// Logging level for the application.
///
/// `LOG_LEVEL` accepts ERROR, INFO and DEBUG; WARN and TRACE are also
/// understood.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    /// Parses a level name case-insensitively. An empty value means INFO.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(LogLevel::Error),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "INFO" | "" => Some(LogLevel::Info),
            "DEBUG" => Some(LogLevel::Debug),
            "TRACE" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command-line options. Every option also reads an environment variable,
/// so the service can be configured entirely from the container environment.
///
/// # Examples
///
/// ```bash
/// # Country database under /data, refreshed every 30 days
/// MAXMIND_LICENSE_KEY=... geoip_api
///
/// # City database in a custom directory with the answer cache enabled
/// geoip_api --db-dir ./db --db-filename GeoLite2-City.mmdb --cache-enabled
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "geoip_api",
    about = "Answers GeoIP lookups from a self-updating MaxMind GeoLite2 database."
)]
pub struct Opt {
    /// MaxMind license key used to download database updates
    #[arg(long, env = "MAXMIND_LICENSE_KEY", hide_env_values = true)]
    pub license_key: Option<String>,

    /// Full path of the database file (takes precedence over --db-dir/--db-filename)
    #[arg(long, env = "GEOIP_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Directory holding the database file
    #[arg(long, env = "GEOIP_DB_DIR")]
    pub db_dir: Option<PathBuf>,

    /// Database file name; a name containing "city" selects the City edition
    #[arg(long, env = "GEOIP_DB_FILENAME")]
    pub db_filename: Option<String>,

    /// Treat the database as stale at startup ("true" enables)
    #[arg(
        long,
        env = "FORCE_DB_UPDATE",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_true_flag
    )]
    pub force_update: bool,

    /// Hours between update checks; 0 disables periodic checks (default 720)
    #[arg(long, env = "DB_UPDATE_INTERVAL_HOURS")]
    pub update_interval_hours: Option<String>,

    /// Cache resolved answers in memory ("true" enables)
    #[arg(
        long,
        env = "CACHE_ENABLED",
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_true_flag
    )]
    pub cache_enabled: bool,

    /// Maximum number of cached answers (default 10000)
    #[arg(long, env = "CACHE_SIZE")]
    pub cache_size: Option<String>,

    /// Log level: ERROR|INFO|DEBUG
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO")]
    pub log_level: String,

    /// Log format: plain|json
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// HTTP listen port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Provider download endpoint (for mirrors)
    #[arg(long, env = "GEOIP_DOWNLOAD_URL", default_value = MAXMIND_DOWNLOAD_BASE, hide = true)]
    pub download_url: String,
}

/// Only the literal "true" (case-insensitive) turns a flag on.
fn parse_true_flag(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}

/// Dataset location, credential and freshness settings.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Canonical path of the dataset file
    pub path: PathBuf,
    /// Provider credential; downloads are impossible without it
    pub license_key: Option<String>,
    /// Treat the dataset as stale at startup
    pub force_update: bool,
    /// Freshness threshold and scheduler period; 0 disables periodic checks
    pub update_interval_hours: u64,
    /// Provider endpoint
    pub download_base_url: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: resolve_dataset_path(None, None, None),
            license_key: None,
            force_update: false,
            update_interval_hours: DEFAULT_UPDATE_INTERVAL_HOURS,
            download_base_url: MAXMIND_DOWNLOAD_BASE.to_string(),
        }
    }
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use geoip_api::Config;
///
/// let mut config = Config::default();
/// config.cache_enabled = true;
/// config.dataset.path = "/srv/geoip/GeoLite2-City.mmdb".into();
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Dataset settings
    pub dataset: DatasetConfig,
    /// Whether resolved answers are cached
    pub cache_enabled: bool,
    /// Cache capacity; 0 disables the cache
    pub cache_capacity: usize,
    /// HTTP listen port
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DatasetConfig::default(),
            cache_enabled: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            port: DEFAULT_PORT,
        }
    }
}

impl From<Opt> for Config {
    /// Resolves raw options. Lenient values (interval, cache size) fall back
    /// to their defaults with a log line, so call this after the logger is up.
    fn from(opt: Opt) -> Self {
        let path = resolve_dataset_path(
            opt.db_path.as_deref(),
            opt.db_dir.as_deref(),
            opt.db_filename.as_deref(),
        );
        let license_key = opt.license_key.filter(|k| !k.trim().is_empty());

        Self {
            dataset: DatasetConfig {
                path,
                license_key,
                force_update: opt.force_update,
                update_interval_hours: resolve_update_interval(
                    opt.update_interval_hours.as_deref(),
                ),
                download_base_url: opt.download_url,
            },
            cache_enabled: opt.cache_enabled,
            cache_capacity: resolve_cache_capacity(opt.cache_size.as_deref()),
            port: opt.port,
        }
    }
}

/// Logger settings taken from [`Opt`].
///
/// Resolved on their own because the logger must be up before [`Config`]
/// resolution starts logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Raw `LOG_LEVEL` value that was not understood; `level` is INFO then.
    pub unrecognized_level: Option<String>,
}

impl From<&Opt> for LogSettings {
    fn from(opt: &Opt) -> Self {
        let parsed = LogLevel::from_name(&opt.log_level);
        Self {
            level: parsed.unwrap_or(LogLevel::Info),
            format: opt.log_format,
            unrecognized_level: parsed.is_none().then(|| opt.log_level.clone()),
        }
    }
}

/// Resolves the canonical dataset path.
///
/// Precedence:
/// 1. an explicit full path;
/// 2. otherwise directory (configured, or `/data`) joined with the file name
///    (configured, or `GeoLite2-Country.mmdb`).
///
/// Empty values count as unset.
pub fn resolve_dataset_path(
    explicit: Option<&Path>,
    dir: Option<&Path>,
    filename: Option<&str>,
) -> PathBuf {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }
    let dir = dir
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new(DEFAULT_DB_DIR));
    let filename = filename
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_DB_FILENAME);
    dir.join(filename)
}

/// Resolves the update interval in hours.
///
/// Unset means 720. A non-negative integer is taken as is (0 disables periodic
/// checks). Anything else falls back to 720.
pub fn resolve_update_interval(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return DEFAULT_UPDATE_INTERVAL_HOURS;
    };
    match raw.parse::<i64>() {
        Ok(hours) if hours >= 0 => hours.unsigned_abs(),
        Ok(_) => {
            log::info!(
                "DB_UPDATE_INTERVAL_HOURS must be non-negative, using default {}",
                DEFAULT_UPDATE_INTERVAL_HOURS
            );
            DEFAULT_UPDATE_INTERVAL_HOURS
        }
        Err(_) => {
            log::info!(
                "Invalid DB_UPDATE_INTERVAL_HOURS '{}', using default {}",
                raw,
                DEFAULT_UPDATE_INTERVAL_HOURS
            );
            DEFAULT_UPDATE_INTERVAL_HOURS
        }
    }
}

/// Resolves the cache capacity; invalid values fall back to 10000.
pub fn resolve_cache_capacity(raw: Option<&str>) -> usize {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return DEFAULT_CACHE_CAPACITY;
    };
    raw.parse::<usize>().unwrap_or_else(|_| {
        log::info!(
            "Invalid CACHE_SIZE '{}', using default {}",
            raw,
            DEFAULT_CACHE_CAPACITY
        );
        DEFAULT_CACHE_CAPACITY
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
    }

    #[test]
    fn test_log_level_from_name() {
        assert_eq!(LogLevel::from_name("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_name("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_name("Debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_name(""), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_name("verbose"), None);
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_dataset_path(
            Some(Path::new("/srv/geo/custom.mmdb")),
            Some(Path::new("/other")),
            Some("GeoLite2-City.mmdb"),
        );
        assert_eq!(path, PathBuf::from("/srv/geo/custom.mmdb"));
    }

    #[test]
    fn test_dir_with_and_without_filename() {
        assert_eq!(
            resolve_dataset_path(None, Some(Path::new("/db")), Some("GeoLite2-City.mmdb")),
            PathBuf::from("/db/GeoLite2-City.mmdb")
        );
        assert_eq!(
            resolve_dataset_path(None, Some(Path::new("/db")), None),
            PathBuf::from("/db/GeoLite2-Country.mmdb")
        );
    }

    #[test]
    fn test_global_default_honors_filename() {
        assert_eq!(
            resolve_dataset_path(None, None, None),
            PathBuf::from("/data/GeoLite2-Country.mmdb")
        );
        assert_eq!(
            resolve_dataset_path(None, None, Some("GeoLite2-City.mmdb")),
            PathBuf::from("/data/GeoLite2-City.mmdb")
        );
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        assert_eq!(
            resolve_dataset_path(Some(Path::new("")), Some(Path::new("")), Some("  ")),
            PathBuf::from("/data/GeoLite2-Country.mmdb")
        );
    }

    #[test]
    fn test_update_interval_resolution() {
        assert_eq!(resolve_update_interval(None), 720);
        assert_eq!(resolve_update_interval(Some("")), 720);
        assert_eq!(resolve_update_interval(Some("24")), 24);
        assert_eq!(resolve_update_interval(Some("0")), 0);
        assert_eq!(resolve_update_interval(Some("-5")), 720);
        assert_eq!(resolve_update_interval(Some("weekly")), 720);
        assert_eq!(resolve_update_interval(Some("1.5")), 720);
    }

    #[test]
    fn test_cache_capacity_resolution() {
        assert_eq!(resolve_cache_capacity(None), 10_000);
        assert_eq!(resolve_cache_capacity(Some("500")), 500);
        assert_eq!(resolve_cache_capacity(Some("lots")), 10_000);
        assert_eq!(resolve_cache_capacity(Some("-1")), 10_000);
    }

    #[test]
    fn test_opt_parsing_flags_and_defaults() {
        let opt = Opt::try_parse_from([
            "geoip_api",
            "--db-dir",
            "/tmp/geo",
            "--db-filename",
            "GeoLite2-City.mmdb",
            "--force-update",
            "--cache-enabled",
            "true",
            "--update-interval-hours",
            "48",
        ])
        .expect("options should parse");
        let config = Config::from(opt);

        assert_eq!(config.dataset.path, PathBuf::from("/tmp/geo/GeoLite2-City.mmdb"));
        assert!(config.dataset.force_update);
        assert!(config.cache_enabled);
        assert_eq!(config.dataset.update_interval_hours, 48);
        assert_eq!(config.cache_capacity, 10_000);
    }

    #[test]
    fn test_log_settings_from_options() {
        let opt = Opt::try_parse_from(["geoip_api", "--log-level", "debug", "--log-format", "json"])
            .expect("options should parse");
        assert_eq!(
            LogSettings::from(&opt),
            LogSettings {
                level: LogLevel::Debug,
                format: LogFormat::Json,
                unrecognized_level: None,
            }
        );

        let opt = Opt::try_parse_from(["geoip_api", "--log-level", "verbose"])
            .expect("options should parse");
        let settings = LogSettings::from(&opt);
        assert_eq!(settings.level, LogLevel::Info);
        assert_eq!(settings.format, LogFormat::Plain);
        assert_eq!(settings.unrecognized_level.as_deref(), Some("verbose"));
    }

    #[test]
    fn test_force_flag_requires_literal_true() {
        assert_eq!(parse_true_flag("true"), Ok(true));
        assert_eq!(parse_true_flag("TRUE"), Ok(true));
        assert_eq!(parse_true_flag("1"), Ok(false));
        assert_eq!(parse_true_flag("yes"), Ok(false));
    }
}
