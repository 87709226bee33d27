use std::ffi::OsStr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct AnalyzeArgs {
    #[arg(
        conflicts_with = "file",
        help = "Text to analyze; read from stdin when neither TEXT nor --file is given"
    )]
    pub text: Option<String>,

    #[arg(long, help = "Read the text to analyze from a file")]
    pub file: Option<PathBuf>,

    #[arg(long, help = "Opaque value echoed back next to the result")]
    pub context: Option<String>,

    #[arg(
        long,
        help = "Wrap the text in literal quotes before encoding, as older deployments expect"
    )]
    pub legacy_quoted_text: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Analyze the tone of a text and print the result as JSON
    Analyze(AnalyzeArgs),
    /// Probe the service and print its health as JSON
    Status,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Tone Analyzer client")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .tone/config.toml"
    )]
    pub workspace: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log format: human or json"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_subcommand_parses_text_and_context() {
        let cli = Cli::try_parse_from([
            "toned",
            "--workspace",
            "/tmp/ws",
            "analyze",
            "I am thrilled",
            "--context",
            "req-1",
            "--log-format",
            "json",
        ])
        .expect("analyze should parse");

        assert_eq!(cli.workspace, PathBuf::from("/tmp/ws"));
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.text.as_deref(), Some("I am thrilled"));
                assert_eq!(args.context.as_deref(), Some("req-1"));
                assert!(args.file.is_none());
                assert!(!args.legacy_quoted_text);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn analyze_rejects_text_and_file_together() {
        let result = Cli::try_parse_from(["toned", "analyze", "hello", "--file", "input.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn status_subcommand_uses_default_workspace() {
        let cli = Cli::try_parse_from(["toned", "status"]).expect("status should parse");

        assert_eq!(cli.workspace, PathBuf::from("."));
        assert_eq!(cli.log_format.as_str(), "human");
        assert_eq!(cli.command, Commands::Status);
    }

    #[test]
    fn parse_log_format_rejects_unknown_value() {
        let err = parse_log_format("xml").expect_err("expected error");
        assert!(err.contains("invalid log format"));
    }
}
