//! Error types returned while walking box structure.

use derive_more::Display;
use fmp4live_common::error::{ReportStack, ReportableError};

use super::FourCC;

/// Error type returned by the box reader and walker.
///
/// Neither variant is fatal to a session: both abort classification of the current chunk only, and the next chunk
/// is classified afresh.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Fewer bytes remain in the buffer than the value being read requires.
    #[error("Truncated buffer")]
    TruncatedBuffer,

    /// A box header declares a length which cannot describe a box, e.g. the unsupported `0` (to end of file) and `1`
    /// (64-bit extended size) sentinels.
    #[error("Malformed box")]
    MalformedBox,
}

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "while reading box header at offset {}", _0)]
pub(crate) struct WhileReadingHeader(pub(crate) usize);

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "while looking for `{}` box in parent at offset {}", _0, _1)]
pub(crate) struct WhileFindingChild(pub(crate) FourCC, pub(crate) usize);

#[derive(Clone, Copy, Debug, Display)]
#[display(fmt = "`{}` box declares length {} but {} bytes remain", _0, _1, _2)]
pub(crate) struct BoxOverrunsBuffer(pub(crate) FourCC, pub(crate) u32, pub(crate) usize);

impl ReportableError for ParseError {
    type Stack = ReportStack;
}
