//! Cli: command line arguments of the `delog` binary.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "delog", version, about = "Parse log files into structured records")]
pub struct Cli {
    /// Log file to parse
    pub path: PathBuf,

    /// Configuration file (defaults to $DELOG_CONFIG_FILE or ./delog.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Parser type, e.g. `basic`
    #[arg(long, short = 'p')]
    pub parser: Option<String>,

    /// Parser setting as NAME=VALUE (repeatable)
    #[arg(long = "set", short = 's', value_name = "NAME=VALUE", value_parser = parse_setting)]
    pub settings: Vec<(String, String)>,

    /// Pretty-print each record
    #[arg(long)]
    pub pretty: bool,
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got `{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "delog", "server.log", "--parser", "basic", "--set", "server=tf2", "-s", "mode=a=b",
            "--pretty",
        ])
        .unwrap();

        assert_eq!(cli.path, PathBuf::from("server.log"));
        assert_eq!(cli.parser.as_deref(), Some("basic"));
        assert_eq!(
            cli.settings,
            vec![
                ("server".to_string(), "tf2".to_string()),
                ("mode".to_string(), "a=b".to_string())
            ]
        );
        assert!(cli.pretty);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_path_is_required() {
        assert!(Cli::try_parse_from(["delog"]).is_err());
    }

    #[test]
    fn test_setting_without_equals_rejected() {
        assert!(parse_setting("server").is_err());
        assert!(parse_setting("=x").is_err());
        assert_eq!(parse_setting("k=").unwrap(), ("k".to_string(), String::new()));
    }
}
