use sentiment_rebalancer::{
    agent::SentimentAgent,
    audit::DecisionLog,
    config::AppConfig,
    differ::TransactionDiffer,
    llm::{CompletionClient, MockCompletionClient, TogetherClient},
    models::{sample_news, NewsItem},
    policy::AllocationPolicy,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// One-shot analysis. Usage: `rebalancer [news.json]` where the file holds a
/// JSON array of `{ "source", "content" }` items.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;

    let items: Vec<NewsItem> = match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "Loading news items");
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        }
        None => sample_news(),
    };

    let client: Arc<dyn CompletionClient> = if config.has_api_key() {
        Arc::new(TogetherClient::from_config(&config)?)
    } else {
        warn!("TOGETHER_API_KEY not set - using keyword fallback");
        Arc::new(MockCompletionClient::unavailable())
    };

    let agent = SentimentAgent::new(
        client,
        AllocationPolicy::default(),
        TransactionDiffer::new(config.diff_config())?,
        DecisionLog::with_capacity(config.decision_log_capacity)?,
    )
    .with_retry_policy(config.llm_timeout(), config.llm_max_retries);

    let current = agent.default_holdings();

    match agent.analyze(items, &current).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            Err(Box::new(e) as Box<dyn std::error::Error>)
        }
    }
}
