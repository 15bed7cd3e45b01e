/// Error types for the translation connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// Missing or invalid translator settings (URL, auth key, chunk size)
    Configuration(String),
    /// Connection-level failure, no response was received
    Transport(String),
    /// The remote service answered with a non-success status
    RemoteService { status: u16, reason: String },
    /// Success status, but the body could not be decoded or was short
    MalformedResponse(String),
    /// Translated data could not be committed onto the job
    Apply(String),
    /// The job store has no job with this id
    JobNotFound(u64),
    /// The work queue rejected or lost a unit
    Queue(String),
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ConnectorError::Transport(msg) => {
                write!(f, "API service returned following error: {}", msg)
            }
            ConnectorError::RemoteService { status, reason } => write!(
                f,
                "API service returned following error: {} ({})",
                reason, status
            ),
            ConnectorError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            ConnectorError::Apply(msg) => write!(f, "Unable to apply translation: {}", msg),
            ConnectorError::JobNotFound(id) => write!(f, "Job {} not found", id),
            ConnectorError::Queue(msg) => write!(f, "Queue error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectorError {}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        ConnectorError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::MalformedResponse(err.to_string())
    }
}

/// Result type for connector operations
pub type ConnectorResult<T> = Result<T, ConnectorError>;
