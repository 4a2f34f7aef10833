//! Error types returned by the public API.

use crate::parse::CodecParameters;

/// A fatal session error.
///
/// Every variant except [`Closed`](Self::Closed) is raised exactly once per session, at the moment it closes the
/// transport. Recoverable conditions such as truncated or incomplete box structure are never surfaced here; they only
/// cause the offending chunk to be dropped.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The sink backend cannot render the stream's codec.
    #[error("Unsupported codec `{0}`")]
    UnsupportedCodec(CodecParameters),

    /// The sink backend refused to create a sink.
    #[error("Sink creation rejected for `{0}`")]
    SinkRejectedCreation(CodecParameters),

    /// The sink failed while appending a fragment.
    #[error("Sink append failed")]
    SinkAppendFailure,

    /// The session was already closed.
    #[error("Session closed")]
    Closed,
}
