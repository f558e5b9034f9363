//! # azure-chat
//!
//! A small terminal chat client for Azure OpenAI chat-completions
//! deployments.
//!
//! Every request carries a single message. The session primes the
//! deployment with a system prompt once, then forwards each input line on
//! its own; replies do not see earlier turns.
//!
//! ```rust,no_run
//! use azure_chat::{AzureOpenAiClient, AzureOpenAiConfig, ChatSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AzureOpenAiConfig::from_env();
//!     let deployment = config.deployment.clone();
//!     let client = AzureOpenAiClient::new(config)?;
//!
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     let mut stdout = tokio::io::stdout();
//!     ChatSession::new(client, deployment).run(stdin, &mut stdout).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod provider;
pub mod session;

pub use crate::core::{
    ChatCompletions, ChatError, ChatRole, Choice, ChoiceMessage, Completion, GenerationConfig,
    HttpClientConfig, Message, Usage,
};
pub use provider::{AzureOpenAiClient, AzureOpenAiConfig};
pub use session::{ChatSession, ExitReason, SessionState, SessionSummary};
