use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use baitreader::cli::{Cli, Command};
use baitreader::commands;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    baitreader::logging::init(baitreader::logging::default_directive(cli.reader.verbose))
        .context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let config = commands::resolve_config(&cli.reader).context("load config")?;

    match cli.command {
        Command::Read(args) => commands::read(&config, args).await.context("read")?,
        Command::Next => commands::step(&config, true).await.context("next")?,
        Command::Prev => commands::step(&config, false).await.context("prev")?,
        Command::Resume => commands::resume(&config).await.context("resume")?,
        Command::Search(args) => commands::search(&config, args).await.context("search")?,
        Command::Edit(args) => commands::edit(&config, args).await.context("edit")?,
        Command::Bookmark(args) => commands::bookmark(&config, args)
            .await
            .context("bookmark")?,
        Command::Toc(args) => commands::toc(&config, args).await.context("toc")?,
    }

    Ok(())
}
