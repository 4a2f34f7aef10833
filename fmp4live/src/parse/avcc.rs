use std::fmt;

use fmp4live_common::error::{Result, ResultExt};

use super::header::read_u8;
use super::{BoxWalker, FourCC, ParseError, PathStep};

/// The AVC codec parameters of a stream, as needed to open a sink for it.
///
/// Built from the `AVCProfileIndication`, `profile_compatibility` and `AVCLevelIndication` bytes of the
/// `AVCDecoderConfigurationRecord` carried in the `avcC` box (ISO/IEC 14496-15).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodecParameters {
    /// `AVCProfileIndication`, e.g. `0x64` for High profile.
    pub profile: u8,

    /// `profile_compatibility` constraint flags.
    pub compatibility: u8,

    /// `AVCLevelIndication`, e.g. `0x1f` for level 3.1.
    pub level: u8,
}

/// Path from a `moov` box to the `avcC` box of its first video track.
///
/// `stsd` carries a version, flags and entry count (8 bytes) before its sample entries, and a visual sample entry
/// such as `avc1` carries 78 bytes of fixed fields before its child boxes.
pub const AVCC_PATH: [PathStep; 7] = [
    PathStep::child(FourCC::TRAK),
    PathStep::child(FourCC::MDIA),
    PathStep::child(FourCC::MINF),
    PathStep::child(FourCC::STBL),
    PathStep::child(FourCC::STSD),
    PathStep::after_fields(FourCC::AVC1, 8),
    PathStep::after_fields(FourCC::AVCC, 78),
];

/// Offset of `AVCProfileIndication` from the start of the `avcC` box: its 8-byte header, then `configurationVersion`.
const PROFILE_OFFSET: usize = 9;

impl CodecParameters {
    /// The container MIME type.
    pub const CONTAINER: &'static str = "video/mp4";

    /// The RFC 6381 codec string, e.g. `avc1.64001f`.
    pub fn codec(&self) -> String {
        format!("avc1.{:02x}{:02x}{:02x}", self.profile, self.compatibility, self.level)
    }

    /// The full MIME type with codecs parameter, e.g. `video/mp4;codecs="avc1.64001f"`.
    pub fn mime_type(&self) -> String {
        format!("{};codecs=\"{}\"", Self::CONTAINER, self.codec())
    }
}

impl fmt::Display for CodecParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mime_type())
    }
}

/// Extract the [`CodecParameters`] from the `moov` box starting at `moov_start`.
///
/// Returns `None` if the path to `avcC` does not (yet) resolve.
pub fn find_codec_parameters(walker: &BoxWalker<'_>, moov_start: usize) -> Result<Option<CodecParameters>, ParseError> {
    let Some(avcc) = walker.find_descendant(moov_start, &AVCC_PATH)? else {
        return Ok(None);
    };

    let avcc_bytes = &walker.buf()[avcc.range()];
    let read = |offset| read_u8(avcc_bytes, offset).attach_printable("while reading `avcC` profile and level");
    let params = CodecParameters {
        profile: read(PROFILE_OFFSET)?,
        compatibility: read(PROFILE_OFFSET + 1)?,
        level: read(PROFILE_OFFSET + 2)?,
    };
    log::debug!("avcC @ 0x{:08x}: {params}", avcc.start);
    Ok(Some(params))
}

#[cfg(test)]
mod test {
    use assert_matches::assert_matches;

    use crate::util::test::{test_box, test_init};

    use super::*;

    const BUDGET: usize = 3;

    #[test]
    fn codec_string() {
        let params = CodecParameters { profile: 0x64, compatibility: 0x00, level: 0x1f };
        assert_eq!(params.codec(), "avc1.64001f");
        assert_eq!(params.mime_type(), "video/mp4;codecs=\"avc1.64001f\"");
        assert_eq!(params.to_string(), params.mime_type());

        let params = CodecParameters { profile: 0x42, compatibility: 0xc0, level: 0x0a };
        assert_eq!(params.codec(), "avc1.42c00a");
    }

    #[test]
    fn from_moov() {
        let moov = test_init().profile([0x64, 0x00, 0x1f]).build().moov_bytes();
        let walker = BoxWalker::new(&moov, BUDGET);
        let params = find_codec_parameters(&walker, 0).unwrap().unwrap();
        assert_eq!(params.mime_type(), "video/mp4;codecs=\"avc1.64001f\"");
    }

    #[test]
    fn missing_avcc() {
        let moov = test_init().avcc(false).build().moov_bytes();
        let walker = BoxWalker::new(&moov, BUDGET);
        assert_eq!(find_codec_parameters(&walker, 0).unwrap(), None);
    }

    #[test]
    fn missing_trak() {
        let moov = test_box(FourCC::MOOV).child(test_box(FourCC::MVHD)).to_vec();
        let walker = BoxWalker::new(&moov, BUDGET);
        assert_eq!(find_codec_parameters(&walker, 0).unwrap(), None);
    }

    #[test]
    fn short_avcc() {
        let moov = test_init().avcc_len(2).build().moov_bytes();
        let walker = BoxWalker::new(&moov, BUDGET);
        assert_matches!(find_codec_parameters(&walker, 0).unwrap_err().get_ref(), ParseError::TruncatedBuffer);
    }
}
