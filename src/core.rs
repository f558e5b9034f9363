pub mod error;
pub mod http;
pub mod traits;
pub mod types;

pub use error::ChatError;
pub use http::{HttpClient, HttpClientConfig};
pub use traits::ChatCompletions;
pub use types::{ChatRole, Choice, ChoiceMessage, Completion, GenerationConfig, Message, Usage};
