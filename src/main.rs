use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    ytcomments::logging::init().context("init logging")?;

    let cli = ytcomments::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        ytcomments::cli::Command::Extract(args) => {
            ytcomments::commands::extract(args)
                .await
                .context("extract")?;
        }
        ytcomments::cli::Command::Resolve(args) => {
            ytcomments::commands::resolve(args).context("resolve")?;
        }
    }

    Ok(())
}
