use azure_chat::{AzureOpenAiClient, AzureOpenAiConfig, ChatSession};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // stdout carries the conversation, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AzureOpenAiConfig::from_env();
    let deployment = config.deployment.clone();
    let client = AzureOpenAiClient::new(config)?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    ChatSession::new(client, deployment)
        .run(stdin, &mut stdout)
        .await?;

    Ok(())
}
