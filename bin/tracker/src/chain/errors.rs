//! Error types for chain connectivity

/// Errors that can occur during chain operations
#[derive(Debug)]
pub enum ChainError {
    /// The RPC endpoint could not answer a head or log query.
    /// Aborts the current sync call; the cursor is left untouched.
    RpcUnavailable(String),

    /// A single log's payload could not be decoded.
    /// Counted against the batch-error budget, never fatal on its own.
    DecodeError { reason: String },

    /// A row failed to persist to the event store
    StoreWrite(String),

    /// Contract address could not be parsed
    InvalidAddress(String),

    /// Configuration error
    InvalidConfig(String),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::RpcUnavailable(msg) => write!(f, "RPC unavailable: {}", msg),
            ChainError::DecodeError { reason } => write!(f, "Log decode error: {}", reason),
            ChainError::StoreWrite(msg) => write!(f, "Event store write failed: {}", msg),
            ChainError::InvalidAddress(msg) => write!(f, "Invalid contract address: {}", msg),
            ChainError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}
