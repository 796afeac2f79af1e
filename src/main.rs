use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use ndl::PipelineError;
use ndl::cli::Cli;
use ndl::environment::{HostEnvironment, ProbeConfig};
use ndl::languages::LanguageSet;
use ndl::query::{Haystack, Query};
use ndl::{render, search, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if let Some(query) = cli.reformat_grep_output {
        let stdin = io::stdin();
        let stdout = io::stdout();
        render::reformat(stdin.lock(), stdout.lock(), &query)
            .context("failed to render grep output")?;
        return Ok(ExitCode::SUCCESS);
    }

    let languages = LanguageSet::parse(&cli.langs)?;
    let env = HostEnvironment::probe(ProbeConfig {
        languages,
        renderer: cli.renderer,
        cwd: None,
        show_header: !cli.no_header,
    })
    .await?;
    let query = Query::from_words(&cli.query, Haystack::for_host(&env))?;

    if cli.explain {
        let explanation = search::explain(&query, &env)?;
        let json = serde_json::to_string_pretty(&explanation)?;
        println!("{json}");
        return Ok(ExitCode::SUCCESS);
    }

    match search::execute(&query, &env).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(err @ PipelineError::MissingTool { .. }) => {
            eprintln!("{err}");
            Ok(ExitCode::from(1))
        }
        Err(err) => Err(err.into()),
    }
}
