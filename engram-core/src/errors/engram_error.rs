//! Closed error taxonomy for the Engram core (spec §7).
//!
//! Validation and not-found errors are returned unchanged to callers.
//! Dependency failures (store I/O, provider calls) are wrapped with
//! context. Cancellation propagates as its own variant so callers can
//! distinguish "the deadline passed" from "the operation failed".

/// Top-level error type for every Engram service.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    // --- Validation ---
    #[error("content must not be empty")]
    ContentEmpty,
    #[error("agent_id must not be empty")]
    AgentMissing,
    #[error("invalid memory type: {type_name}")]
    InvalidType { type_name: String },
    #[error("invalid outcome: {outcome}")]
    InvalidOutcome { outcome: String },
    #[error("invalid feedback signal: {signal}")]
    FeedbackInvalidSignal { signal: String },
    #[error("invalid policy type: {type_name}")]
    PolicyInvalidType { type_name: String },
    #[error("policy max_memories must be > 0")]
    PolicyMaxMemories,
    #[error("policy priority_weight must be > 0")]
    PolicyPriorityWeight,
    #[error("recall query must not be empty")]
    RecallQueryEmpty,
    #[error("episode content must not be empty")]
    EpisodeContentEmpty,

    // --- Not found ---
    #[error("agent not found: {agent_id}")]
    AgentNotFound { agent_id: String },
    #[error("memory not found: {id}")]
    MemoryNotFound { id: String },
    #[error("episode not found: {id}")]
    EpisodeNotFound { id: String },
    #[error("procedure not found: {id}")]
    ProcedureNotFound { id: String },
    #[error("schema not found: {id}")]
    SchemaNotFound { id: String },
    #[error("working memory session not found for agent {agent_id}")]
    SessionNotFound { agent_id: String },

    // --- Conflict ---
    #[error("agent conflict: {external_id} already exists in tenant {tenant_id}")]
    AgentConflict {
        tenant_id: String,
        external_id: String,
    },

    // --- Dependency ---
    #[error("storage error: {message}")]
    StorageError { message: String },
    #[error("provider error ({provider}): {message}")]
    ProviderError { provider: String, message: String },
    #[error("config error: {0}")]
    ConfigError(String),

    // --- Cancellation / deadline ---
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    // --- Serialization passthrough ---
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngramError {
    /// Stable machine-readable identifier, one per variant, used by
    /// callers and metrics to distinguish core failures from
    /// degraded-mode warnings without string-matching the message.
    pub fn code(&self) -> &'static str {
        match self {
            EngramError::ContentEmpty => "CONTENT_EMPTY",
            EngramError::AgentMissing => "AGENT_MISSING",
            EngramError::InvalidType { .. } => "INVALID_TYPE",
            EngramError::InvalidOutcome { .. } => "INVALID_OUTCOME",
            EngramError::FeedbackInvalidSignal { .. } => "FEEDBACK_INVALID_SIGNAL",
            EngramError::PolicyInvalidType { .. } => "POLICY_INVALID_TYPE",
            EngramError::PolicyMaxMemories => "POLICY_MAX_MEMORIES",
            EngramError::PolicyPriorityWeight => "POLICY_PRIORITY_WEIGHT",
            EngramError::RecallQueryEmpty => "RECALL_QUERY_EMPTY",
            EngramError::EpisodeContentEmpty => "EPISODE_CONTENT_EMPTY",
            EngramError::AgentNotFound { .. } => "AGENT_NOT_FOUND",
            EngramError::MemoryNotFound { .. } => "MEMORY_NOT_FOUND",
            EngramError::EpisodeNotFound { .. } => "EPISODE_NOT_FOUND",
            EngramError::ProcedureNotFound { .. } => "PROCEDURE_NOT_FOUND",
            EngramError::SchemaNotFound { .. } => "SCHEMA_NOT_FOUND",
            EngramError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            EngramError::AgentConflict { .. } => "AGENT_CONFLICT",
            EngramError::StorageError { .. } => "STORAGE_ERROR",
            EngramError::ProviderError { .. } => "PROVIDER_ERROR",
            EngramError::ConfigError(_) => "CONFIG_ERROR",
            EngramError::Cancelled => "CANCELLED",
            EngramError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            EngramError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether this error originates from an optional/best-effort step
    /// (provider or config) as opposed to the primary mutation failing.
    pub fn is_degraded_mode(&self) -> bool {
        matches!(self, EngramError::ProviderError { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type EngramResult<T> = Result<T, EngramError>;
