use fmp4live_common::error::{Result, ResultExt};
use fmp4live_common::report_attach;

use super::header::read_u8;
use super::{BoxHeader, BoxWalker, FourCC, ParseError, PathStep};

/// Path from a `moof` box to the `trun` box of its first track fragment.
pub const TRUN_PATH: [PathStep; 2] = [PathStep::child(FourCC::TRAF), PathStep::child(FourCC::TRUN)];

/// The `first-sample-flags-present` bit of the `trun` flags' least significant byte.
pub const FIRST_SAMPLE_FLAGS_PRESENT: u8 = 0x04;

/// Offset of the least significant `trun` flags byte from the start of the box: 8 header bytes, the version byte, then
/// the two more significant flags bytes.
const FLAGS_LOW_OFFSET: usize = 11;

/// Whether the `trun` box described by `trun` declares explicit first sample flags.
///
/// A fragment run that overrides its first sample's flags starts on an independently decodable sample, making it a
/// safe point to begin feeding a decoder.
pub fn has_first_sample_flags(buf: &[u8], trun: &BoxHeader) -> Result<bool, ParseError> {
    let trun_bytes = buf
        .get(trun.range())
        .ok_or_else(|| report_attach!(ParseError::TruncatedBuffer, "while reading `trun` flags"))?;
    let flags = read_u8(trun_bytes, FLAGS_LOW_OFFSET).attach_printable("while reading `trun` flags")?;
    Ok(flags & FIRST_SAMPLE_FLAGS_PRESENT != 0)
}

/// Whether the `moof` box starting at `moof_start` begins with a keyframe-aligned run.
///
/// Returns `None` if `traf` or `trun` is not (yet) present.
pub fn is_keyframe_fragment(walker: &BoxWalker<'_>, moof_start: usize) -> Result<Option<bool>, ParseError> {
    let Some(trun) = walker.find_descendant(moof_start, &TRUN_PATH)? else {
        return Ok(None);
    };
    has_first_sample_flags(walker.buf(), &trun).map(Some)
}
