use std::ops::Range;

use fmp4live_common::error::Result;
use fmp4live_common::{bail_attach, ensure_attach, report_attach};

use super::error::WhileReadingHeader;
use super::{FourCC, ParseError};

/// A transient descriptor of one box, derived from its 8-byte header at some offset within a chunk buffer.
///
/// The descriptor does not own or borrow the buffer; it only records where the box lives in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxHeader {
    /// The total length of the box, header included.
    pub length: u32,

    /// The box type.
    pub box_type: FourCC,

    /// The offset of the first header byte within the buffer.
    pub start: usize,
}

impl BoxHeader {
    /// The encoded length of a compact box header: a 32-bit length followed by a [`FourCC`].
    pub const ENCODED_LEN: usize = 8;

    /// The offset of the first byte following this box's header.
    pub const fn payload_offset(&self) -> usize {
        self.start + Self::ENCODED_LEN
    }

    /// The offset one past the last byte of this box, saturating rather than wrapping on hostile lengths.
    pub const fn end(&self) -> usize {
        self.start.saturating_add(self.length as usize)
    }

    /// The byte range this box occupies within its buffer.
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Read a big-endian `u32` at `offset`.
pub fn read_u32_be(buf: &[u8], offset: usize) -> Result<u32, ParseError> {
    match buf.get(offset..).and_then(|rest| rest.get(..4)) {
        Some(&[a, b, c, d]) => Ok(u32::from_be_bytes([a, b, c, d])),
        _ => bail_attach!(ParseError::TruncatedBuffer, "while reading u32"),
    }
}

/// Read a four-character box type at `offset`.
pub fn read_tag(buf: &[u8], offset: usize) -> Result<FourCC, ParseError> {
    match buf.get(offset..).and_then(|rest| rest.get(..FourCC::ENCODED_LEN)) {
        Some(&[a, b, c, d]) => Ok(FourCC { value: [a, b, c, d] }),
        _ => bail_attach!(ParseError::TruncatedBuffer, "while reading box type"),
    }
}

/// Read the 8-byte box header at `offset`.
///
/// Only the compact form is supported. A length of `0` (box extends to end of file), `1` (64-bit extended size
/// follows), or anything else shorter than the header itself is reported as [`ParseError::MalformedBox`].
pub fn read_box_header(buf: &[u8], offset: usize) -> Result<BoxHeader, ParseError> {
    let length = read_u32_be(buf, offset).map_err(|err| err.attach_printable(WhileReadingHeader(offset)))?;
    let box_type = read_tag(buf, offset + 4).map_err(|err| err.attach_printable(WhileReadingHeader(offset)))?;
    ensure_attach!(
        length as usize >= BoxHeader::ENCODED_LEN,
        ParseError::MalformedBox,
        WhileReadingHeader(offset),
        format!("`{box_type}` box declares length {length}"),
    );
    Ok(BoxHeader { length, box_type, start: offset })
}

/// Read the byte at `offset`, reporting a truncated buffer instead of panicking.
pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Result<u8, ParseError> {
    buf.get(offset)
        .copied()
        .ok_or_else(|| report_attach!(ParseError::TruncatedBuffer, format!("while reading byte at offset {offset}")))
}
