//! CLI argument definitions for the trigger binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Trigger: configured agent actions submitted to fulfillment endpoints.
#[derive(Parser, Debug)]
#[command(name = "trigger", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the fulfillment backend.
    Serve {
        /// Listen port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Directory served under /public.
        #[arg(long = "public-dir")]
        public_dir: Option<PathBuf>,
    },

    /// Print the action menu and the fields each action renders.
    Menu {
        /// Action catalog (JSON array).
        #[arg(long)]
        catalog: PathBuf,

        /// Print as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Open one action, fill its form and submit it.
    Fire {
        /// Action catalog (JSON array).
        #[arg(long)]
        catalog: PathBuf,

        /// Interaction context (JSON with `tasks` and `selected`).
        #[arg(long)]
        context: PathBuf,

        /// Position of the action in the catalog.
        #[arg(long)]
        action: usize,

        /// Field value as name=value. Repeatable.
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TRIGGER_CONFIG env var > ~/.trigger/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TRIGGER_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Resolve the server port.
///
/// Priority: --port flag > PORT env var > config file value > 8080.
pub fn resolve_port(flag: Option<u16>, config_port: u16) -> u16 {
    port_from(flag, std::env::var("PORT").ok().as_deref(), config_port)
}

fn port_from(flag: Option<u16>, env: Option<&str>, config_port: u16) -> u16 {
    if let Some(p) = flag {
        return p;
    }
    if let Some(p) = env.and_then(|v| v.trim().parse::<u16>().ok()) {
        return p;
    }
    if config_port != 0 {
        return config_port;
    }
    8080
}

/// Parse `name=value`. The value may itself contain `=`.
fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got {:?}", raw)),
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".trigger").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".trigger").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_priority() {
        assert_eq!(port_from(Some(9000), Some("7000"), 8081), 9000);
        assert_eq!(port_from(None, Some("7000"), 8081), 7000);
        assert_eq!(port_from(None, None, 8081), 8081);
        assert_eq!(port_from(None, None, 0), 8080);
    }

    #[test]
    fn test_unparseable_port_env_ignored() {
        assert_eq!(port_from(None, Some("eighty"), 8081), 8081);
        assert_eq!(port_from(None, Some(""), 0), 8080);
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("phone=+1555").unwrap(),
            ("phone".to_string(), "+1555".to_string())
        );
        assert_eq!(
            parse_assignment("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_fire_command_parses() {
        let args = CliArgs::try_parse_from([
            "trigger",
            "fire",
            "--catalog",
            "actions.json",
            "--context",
            "ctx.json",
            "--action",
            "1",
            "--set",
            "phone=555",
            "--set",
            "queue=Sales",
        ])
        .unwrap();
        match args.command {
            Command::Fire { action, set, .. } => {
                assert_eq!(action, 1);
                assert_eq!(set.len(), 2);
                assert_eq!(set[1], ("queue".to_string(), "Sales".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["trigger", "serve", "--config", "/tmp/t.toml", "-p", "9001"])
                .unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/t.toml"));
        assert!(matches!(args.command, Command::Serve { port: Some(9001), .. }));
    }

    #[test]
    fn test_log_level_override() {
        let args = CliArgs::try_parse_from(["trigger", "-l", "debug", "menu", "--catalog", "a.json"])
            .unwrap();
        assert_eq!(args.resolve_log_level("info"), "debug");
    }
}
