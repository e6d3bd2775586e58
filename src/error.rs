use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParleyError>;

#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),

    #[error("tool `{0}` not found")]
    UnknownTool(String),

    #[error("tool `{tool}` is missing required parameter `{parameter}`")]
    MissingParameter { tool: String, parameter: String },

    #[error("tool `{name}` invocation failed: {source}")]
    ToolExecution {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("language model error: {0}")]
    Provider(String),

    #[error("invalid tool descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid routing pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
