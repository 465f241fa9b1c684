use sentiment_rebalancer::{
    agent::SentimentAgent,
    api::start_server,
    audit::DecisionLog,
    config::AppConfig,
    differ::TransactionDiffer,
    llm::{CompletionClient, MockCompletionClient, TogetherClient},
    policy::AllocationPolicy,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let client: Arc<dyn CompletionClient> = if config.has_api_key() {
        Arc::new(TogetherClient::from_config(&config)?)
    } else {
        warn!("TOGETHER_API_KEY not set - every request will use the keyword fallback");
        Arc::new(MockCompletionClient::unavailable())
    };

    info!("Sentiment Rebalancer - API Server");
    info!(
        port = config.port,
        model = %config.together_model,
        notional_usd = config.notional_usd,
        materiality_usd = config.materiality_usd,
        "Configuration loaded"
    );

    let agent = SentimentAgent::new(
        client,
        AllocationPolicy::default(),
        TransactionDiffer::new(config.diff_config())?,
        DecisionLog::with_capacity(config.decision_log_capacity)?,
    )
    .with_retry_policy(config.llm_timeout(), config.llm_max_retries);

    info!("Agent initialized, starting API server");

    start_server(Arc::new(agent), config.port).await?;

    Ok(())
}
