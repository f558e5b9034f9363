use async_trait::async_trait;

use super::{
    error::ChatError,
    types::{Completion, Message},
};

/// A backend able to answer one chat-completion request at a time.
#[async_trait]
pub trait ChatCompletions: Send + Sync {
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<Completion, ChatError>;
}
