use thiserror::Error;

/// Everything the core can fail with. Callers branch on the variant, not on
/// message contents.
#[derive(Debug, Error)]
pub enum OpsError {
    #[error("request not found")]
    NotFound,

    /// A lifecycle guard rejected the operation. Carries the status that was
    /// actually observed so the caller can report it.
    #[error("operation not allowed from status {status}")]
    InvalidState { status: String },

    #[error("malformed plan: {0}")]
    MalformedPlan(String),

    /// The planner answered, but without a usable plan.
    #[error("planner returned no usable plan: {0}")]
    UpstreamInvalid(String),

    /// The planner was unreachable or timed out.
    #[error("planner unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("no stored plan for this request")]
    MissingPlan,

    /// Opaque failure from a tool step.
    #[error("tool step failed: {0}")]
    ToolFailed(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl OpsError {
    /// Stable token for API consumers and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OpsError::NotFound => "NOT_FOUND",
            OpsError::InvalidState { .. } => "INVALID_STATE",
            OpsError::MalformedPlan(_) => "MALFORMED_PLAN",
            OpsError::UpstreamInvalid(_) => "UPSTREAM_INVALID",
            OpsError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            OpsError::UnknownTool(_) => "UNKNOWN_TOOL",
            OpsError::MissingPlan => "MISSING_PLAN",
            OpsError::ToolFailed(_) => "TOOL_FAILED",
            OpsError::Store(_) => "STORE",
            OpsError::Serde(_) => "SERDE",
        }
    }
}

pub type OpsResult<T> = Result<T, OpsError>;
