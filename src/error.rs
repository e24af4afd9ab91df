use thiserror::Error;

use crate::scene::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid timer delay: {delay_ms}ms (delay must be >= 0)")]
    InvalidDelay { delay_ms: i64 },
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("append would create a cycle: {child} is an ancestor of {parent}")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("{child} is not a direct child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("type mismatch for {node}: expected {expected}, actual {actual}")]
    TypeMismatch {
        node: NodeId,
        expected: String,
        actual: String,
    },
    #[error("callback failure in {context}: {message}")]
    CallbackFailure { context: String, message: String },
    #[error(
        "{op} exceeded max task steps (possible uncleared repeating timer): limit={limit}, steps={steps}, now_ms={now_ms}, pending_timers={pending}"
    )]
    StepLimitExceeded {
        op: &'static str,
        limit: usize,
        steps: usize,
        now_ms: i64,
        pending: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("script error: {0}")]
    Script(String),
}

impl Error {
    /// Error constructor for host/script callbacks that need to fail with a
    /// plain message.
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }
}
