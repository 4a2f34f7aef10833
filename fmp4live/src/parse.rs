//! Hand-rolled walker over ISO Base Media File Format box structure.
//!
//! Boxes are never materialised as a tree. Each lookup reads 8-byte box headers at integer offsets into one chunk
//! buffer and follows only the path of boxes leading to its target.

mod avcc;
pub mod error;
mod header;
mod trun;
mod walker;

pub use avcc::{find_codec_parameters, CodecParameters, AVCC_PATH};
pub use error::ParseError;
pub use header::{read_box_header, read_tag, read_u32_be, BoxHeader};
pub use trun::{has_first_sample_flags, is_keyframe_fragment, FIRST_SAMPLE_FLAGS_PRESENT, TRUN_PATH};
pub use walker::{BoxWalker, PathStep, TopLevelBoxes};

pub use fmp4live_common::parse::FourCC;
