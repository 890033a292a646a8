//! sdlforge CLI: directive-driven schema compiler.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "sdlforge",
    version,
    about = "Directive-driven schema compiler: plugin transformers, resolver pipelines, infrastructure documents"
)]
struct Cli {
    #[command(subcommand)]
    command: sdlforge::cli::Commands,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = sdlforge::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
