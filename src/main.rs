use clap::Parser;
use csv_column_translator::translation::cancel_pair;
use csv_column_translator::utils::config::LoggingConfig;
use csv_column_translator::{execute, AppConfig, Cli, GeminiClient};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(Some(&cli.config))?;
    init_tracing(&config.logging)?;

    let api_key = cli.api_key()?;
    let client = GeminiClient::new(&cli.api_config(&config), api_key)?;
    tracing::info!(model = client.model(), "Using Gemini model");

    let (cancel_handle, cancel) = cancel_pair();

    tokio::spawn({
        let handle = cancel_handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; finishing in-flight requests before writing output");
                handle.cancel();
            }
        }
    });

    if let Some(secs) = cli.run_timeout {
        let handle = cancel_handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!(timeout_secs = secs, "Run timeout reached; no new requests will be issued");
            handle.cancel();
        });
    }

    let summary = execute(&cli, &config, Arc::new(client), &cancel).await?;

    eprintln!("\n{}", summary);
    eprintln!("Output saved to: {}", cli.output);

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("csv_column_translator={}", logging.level).parse()?);

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
