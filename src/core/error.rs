use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: BoxedSource,
    },

    /// The service rejected the API key (401/403).
    #[error("Authentication error ({status_code}): {message}")]
    Authentication { message: String, status_code: u16 },

    #[error("API error{}: {message}", .status_code.map(|c| format!(" ({c})")).unwrap_or_default())]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: BoxedSource,
    },

    #[error("Completion contained no text content")]
    EmptyCompletion,

    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// HTTP status attached to the error, if the service answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ChatError::Authentication { status_code, .. } => Some(*status_code),
            ChatError::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }
}
