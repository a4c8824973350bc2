use thiserror::Error;

/// Failures surfaced while encoding or decoding an event stream.
///
/// `UnsupportedArgument` and `UnknownVariant` are the two non-recoverable
/// classes from the error taxonomy; a bootstrap/dispatch boundary turns
/// them into a process exit. `HandlerIsNil` is likewise fatal at the point
/// it is discovered. `HandlerNotFound` is recoverable and is returned by
/// callers that resolve a handler name ahead of a call rather than during
/// decode.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("event argument {index} has unsupported type '{type_name}'")]
    UnsupportedArgument { index: usize, type_name: String },

    #[error("decoded unknown event variant tag {0}")]
    UnknownVariant(u8),

    #[error("no handler named '{0}' is defined")]
    HandlerNotFound(String),

    #[error("handler '{0}' resolved to nil")]
    HandlerIsNil(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
