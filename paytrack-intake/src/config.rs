//! Service settings resolution
//!
//! Each setting comes from the first source that supplies it: command line
//! (or its `PAYTRACK_*` environment variable, via clap), then the TOML config
//! file, then the compiled default.

use clap::Parser;
use paytrack_common::config::{CompiledDefaults, RootFolderResolver, TomlConfig};
use std::path::PathBuf;

/// Command-line arguments for paytrack-intake
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "paytrack-intake")]
#[command(about = "Payroll contract intake service")]
#[command(version)]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "PAYTRACK_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PAYTRACK_PORT")]
    pub port: Option<u16>,

    /// Folder holding the database, uploads and generated documents
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// Maximum accepted upload size in bytes
    #[arg(long, env = "PAYTRACK_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<u64>,

    /// Remote contract parser endpoint
    #[arg(long, env = "PAYTRACK_PARSER_URL")]
    pub parser_url: Option<String>,

    /// Log filter directive (RUST_LOG still wins)
    #[arg(long, env = "PAYTRACK_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    pub host: String,
    pub port: u16,
    pub root_folder: PathBuf,
    pub max_upload_bytes: u64,
    pub allowed_origins: Vec<String>,
    pub default_region: String,
    pub default_currency: String,
    pub parser_url: Option<String>,
    pub event_bus_capacity: usize,
    pub log_level: String,
}

impl IntakeSettings {
    pub fn resolve(args: &Args, toml: &TomlConfig, defaults: &CompiledDefaults) -> Self {
        let root_folder = RootFolderResolver::new("paytrack-intake")
            .with_cli_arg(args.root_folder.clone())
            .with_toml(toml)
            .resolve();

        let parser_url = args
            .parser_url
            .clone()
            .or_else(|| toml.parser_url.clone())
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Self {
            host: args
                .host
                .clone()
                .or_else(|| toml.host.clone())
                .unwrap_or_else(|| defaults.host.clone()),
            port: args.port.or(toml.port).unwrap_or(defaults.port),
            root_folder,
            max_upload_bytes: args
                .max_upload_bytes
                .or(toml.max_upload_bytes)
                .unwrap_or(defaults.max_upload_bytes),
            allowed_origins: toml.allowed_origins.clone(),
            default_region: toml
                .default_region
                .clone()
                .unwrap_or_else(|| defaults.default_region.clone()),
            default_currency: toml
                .default_currency
                .clone()
                .unwrap_or_else(|| defaults.default_currency.clone()),
            parser_url,
            event_bus_capacity: toml
                .event_bus_capacity
                .filter(|c| *c > 0)
                .unwrap_or(defaults.event_bus_capacity),
            log_level: args
                .log_level
                .clone()
                .or_else(|| toml.logging.level.clone())
                .unwrap_or_else(|| defaults.log_level.clone()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Upload ceiling as a usize, saturating on 32-bit targets
    pub fn max_upload_usize(&self) -> usize {
        usize::try_from(self.max_upload_bytes).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_beats_toml_beats_default() {
        let defaults = CompiledDefaults::for_current_platform();
        let toml = TomlConfig {
            port: Some(6001),
            host: Some("0.0.0.0".to_string()),
            max_upload_bytes: Some(2048),
            parser_url: Some("http://toml-parser/parse".to_string()),
            ..Default::default()
        };
        let args = Args {
            port: Some(7001),
            root_folder: Some(PathBuf::from("/tmp/paytrack-cli-root")),
            ..Default::default()
        };

        let settings = IntakeSettings::resolve(&args, &toml, &defaults);
        assert_eq!(settings.port, 7001);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.max_upload_bytes, 2048);
        assert_eq!(settings.parser_url.as_deref(), Some("http://toml-parser/parse"));
        assert_eq!(settings.root_folder, PathBuf::from("/tmp/paytrack-cli-root"));
        assert_eq!(settings.default_currency, "INR");
        assert_eq!(settings.bind_address(), "0.0.0.0:7001");
    }

    #[test]
    fn test_blank_parser_url_means_local() {
        let args = Args {
            parser_url: Some("  ".to_string()),
            root_folder: Some(PathBuf::from("/tmp/x")),
            ..Default::default()
        };
        let settings = IntakeSettings::resolve(
            &args,
            &TomlConfig::default(),
            &CompiledDefaults::for_current_platform(),
        );
        assert_eq!(settings.parser_url, None);
        assert_eq!(settings.event_bus_capacity, 100);
    }
}
