use clap::Parser;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = roadmap::api::run_http_server(port).await {
            tracing::error!("server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let cli = roadmap::api::Cli::parse();
    match roadmap::api::render_cli_report(cli) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            eprintln!("{e}");
            eprintln!("Usage: roadmap [flags] | roadmap serve [port]");
            std::process::exit(2);
        }
    }
}
