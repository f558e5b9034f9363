pub mod azure {
    pub const ENDPOINT_ENV_VAR: &str = "ENDPOINT_URL";
    pub const DEPLOYMENT_ENV_VAR: &str = "DEPLOYMENT_NAME";
    pub const API_KEY_ENV_VAR: &str = "AZURE_OPENAI_API_KEY";
    pub const TIMEOUT_ENV_VAR: &str = "AZURE_OPENAI_TIMEOUT_SECS";
    pub const MAX_RETRIES_ENV_VAR: &str = "AZURE_OPENAI_MAX_RETRIES";

    pub const DEFAULT_ENDPOINT: &str = "your-endpoint-url";
    pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
    pub const DEFAULT_API_KEY: &str = "your-api-key";

    pub const API_VERSION: &str = "2024-05-01-preview";
    pub const API_KEY_HEADER: &str = "api-key";
}
