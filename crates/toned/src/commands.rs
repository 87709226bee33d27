use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tone_analyzer::{TextEncoding, ToneAnalysis, ToneAnalyzer};
use tone_config::{ConfigCredentialsSource, ToneConfig, ensure_workspace_config, validate_config};
use tone_connector::HttpConnectorFactory;

use crate::cli::AnalyzeArgs;

#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub result: ToneAnalysis,
}

pub fn run_analyze_command(workspace: &Path, args: AnalyzeArgs) -> Result<()> {
    let text = resolve_text(&args, std::io::stdin())?;
    let config = load_config(workspace)?;
    let runtime = build_runtime()?;

    let mut analyzer = build_analyzer(&config, &runtime)?;
    if args.legacy_quoted_text {
        analyzer = analyzer.with_text_encoding(TextEncoding::LegacyQuoted);
    }

    let (tx, rx) = oneshot::channel();
    let submitted = analyzer.get_tone(
        Some(move |result: Option<ToneAnalysis>, context: Option<String>| {
            let _ = tx.send((result, context));
        }),
        &text,
        args.context,
    )?;
    if !submitted {
        bail!(
            "tone request was not submitted; check the ToneAnalyzerV3 credentials in {}",
            tone_config::config_path(workspace).display()
        );
    }

    let (result, context) = runtime
        .block_on(rx)
        .context("tone request completed without a response")?;
    let Some(result) = result else {
        bail!("tone request failed; see the log for details");
    };

    write_json_to_stdout(&AnalyzeReport { context, result })
}

pub fn run_status_command(workspace: &Path) -> Result<()> {
    let config = load_config(workspace)?;
    let runtime = build_runtime()?;
    let analyzer = build_analyzer(&config, &runtime)?;

    let health = runtime.block_on(analyzer.check_health());
    write_json_to_stdout(&health)?;

    if !health.healthy {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(workspace: &Path) -> Result<ToneConfig> {
    let config = ensure_workspace_config(workspace).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            tone_config::config_path(workspace).display()
        )
    })?;
    for warning in validate_config(&config) {
        tracing::warn!(code = warning.code, "{}", warning.message);
    }
    Ok(config)
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")
}

fn build_analyzer(config: &ToneConfig, runtime: &Runtime) -> Result<ToneAnalyzer> {
    let timeout = (config.service.timeout_secs > 0)
        .then(|| Duration::from_secs(config.service.timeout_secs));
    let connectors = HttpConnectorFactory::new(runtime.handle().clone(), timeout)
        .context("failed to build http connector")?;
    let credentials = ConfigCredentialsSource::from_config(config);

    Ok(ToneAnalyzer::from_config(
        config,
        &credentials,
        Arc::new(connectors),
    ))
}

fn resolve_text(args: &AnalyzeArgs, mut stdin: impl Read) -> Result<String> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => {
            let mut buffer = String::new();
            stdin
                .read_to_string(&mut buffer)
                .context("failed to read text from stdin")?;
            buffer
        }
    };

    if text.trim().is_empty() {
        bail!("no text to analyze");
    }
    Ok(text)
}

fn write_json_to_stdout(value: &impl Serialize) -> Result<()> {
    let mut out = std::io::stdout();
    serde_json::to_writer_pretty(&mut out, value).context("failed to serialize JSON output")?;
    writeln!(&mut out).context("failed to write trailing newline")?;
    Ok(())
}
