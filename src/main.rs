use std::sync::Arc;

use edu_reco::chat::{HttpStreamSource, StreamSource};
use edu_reco::config::AppConfig;
use edu_reco::flow;
use edu_reco::terminal::Terminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🎓 Edu Reco v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Guide stream: {}", config.stream_url);

    let source: Arc<dyn StreamSource> = Arc::new(HttpStreamSource::from_config(&config));
    let mut terminal = Terminal::stdio();

    flow::run(&config, source, &mut terminal).await?;

    Ok(())
}
