use anyhow::{Context, Result};
use toned::cli::{Commands, parse_cli};
use toned::commands::{run_analyze_command, run_status_command};
use toned::logging::init_logging;

fn main() -> Result<()> {
    let cli = parse_cli();
    init_logging(cli.log_format)?;

    let workspace = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    match cli.command {
        Commands::Analyze(args) => run_analyze_command(&workspace, args),
        Commands::Status => run_status_command(&workspace),
    }
}
