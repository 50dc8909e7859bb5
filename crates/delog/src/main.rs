use clap::Parser;
use tracing::warn;

use delog::runtime::{boot, cli::Cli, run};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = boot::boot(&cli)?;

    let stdout = std::io::stdout();
    let summary = run::run(&cli.path, &config, stdout.lock())?;
    if summary.failed > 0 {
        warn!("{} line(s) could not be parsed", summary.failed);
    }
    Ok(())
}
