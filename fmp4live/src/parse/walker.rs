use fmp4live_common::error::{Result, ResultExt};
use fmp4live_common::bail_attach;

use super::error::{BoxOverrunsBuffer, WhileFindingChild};
use super::{read_box_header, read_u32_be, BoxHeader, FourCC, ParseError};

/// One step of a descendant lookup: the child box to find, and how many bytes of fixed fields precede the first
/// child in the payload of the box being searched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathStep {
    /// The type of the child box to find.
    pub box_type: FourCC,

    /// Bytes of fixed fields between the parent's header and its first child.
    pub header_skip: usize,
}

/// A depth-first, by-name walker over the boxes of one chunk buffer.
///
/// Every sibling scan inspects at most `scan_budget` boxes. A scan that ends without a match is "not found" rather than
/// an error, and callers retry on a later chunk.
#[derive(Clone, Copy, Debug)]
pub struct BoxWalker<'a> {
    buf: &'a [u8],
    scan_budget: usize,
}

/// Iterator over top-level boxes of a buffer, returned by [`BoxWalker::top_level`].
pub struct TopLevelBoxes<'a> {
    walker: BoxWalker<'a>,
    offset: usize,
    remaining: usize,
}

//
// PathStep impls
//

impl PathStep {
    /// A step finding `box_type`, whose parent's children begin right after its header.
    pub const fn child(box_type: FourCC) -> Self {
        Self { box_type, header_skip: 0 }
    }

    /// A step finding `box_type`, whose parent's children begin `header_skip` bytes into its payload.
    pub const fn after_fields(box_type: FourCC, header_skip: usize) -> Self {
        Self { box_type, header_skip }
    }
}

//
// BoxWalker impls
//

impl<'a> BoxWalker<'a> {
    /// Construct a walker over `buf` inspecting at most `scan_budget` siblings per scan.
    pub fn new(buf: &'a [u8], scan_budget: usize) -> Self {
        Self { buf, scan_budget }
    }

    /// The buffer being walked.
    pub fn buf(&self) -> &'a [u8] {
        self.buf
    }

    /// Iterate over the boxes at the top level of the buffer, within the scan budget.
    ///
    /// Iteration stops after the first error, which is yielded.
    pub fn top_level(&self) -> TopLevelBoxes<'a> {
        TopLevelBoxes { walker: *self, offset: 0, remaining: self.scan_budget }
    }

    /// Find the first child of type `box_type` in the box starting at `parent_start`.
    ///
    /// Scanning begins `header_skip` bytes past the parent's header and ends at the parent's declared end. The
    /// returned child is guaranteed to lie entirely within the buffer.
    pub fn find_child(
        &self,
        box_type: FourCC,
        parent_start: usize,
        header_skip: usize,
    ) -> Result<Option<BoxHeader>, ParseError> {
        let parent = read_box_header(self.buf, parent_start)?;
        self.find_child_of(&parent, box_type, header_skip)
            .attach_printable(WhileFindingChild(box_type, parent_start))
    }

    /// Follow `path` down from the box starting at `start`, one [`find_child`](Self::find_child) per step.
    ///
    /// If any step finds nothing, the whole lookup finds nothing.
    pub fn find_descendant(&self, start: usize, path: &[PathStep]) -> Result<Option<BoxHeader>, ParseError> {
        let mut current = read_box_header(self.buf, start)?;
        for step in path {
            match self
                .find_child_of(&current, step.box_type, step.header_skip)
                .attach_printable(WhileFindingChild(step.box_type, current.start))?
            {
                Some(child) => current = child,
                None => {
                    log::debug!("no `{}` box within `{}` at offset {}", step.box_type, current.box_type, current.start);
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }

    fn find_child_of(
        &self,
        parent: &BoxHeader,
        box_type: FourCC,
        header_skip: usize,
    ) -> Result<Option<BoxHeader>, ParseError> {
        let end = parent.end();
        let mut offset = parent.payload_offset().saturating_add(header_skip);
        let mut remaining = self.scan_budget;

        while offset < end {
            if remaining == 0 {
                log::debug!("scan budget exhausted looking for `{box_type}` in `{}`", parent.box_type);
                return Ok(None);
            }
            remaining -= 1;

            // A zero length here terminates the children rather than describing a box.
            if read_u32_be(self.buf, offset)? == 0 {
                return Ok(None);
            }
            let child = read_box_header(self.buf, offset)?;
            if child.box_type == box_type {
                self.ensure_within_buffer(&child)?;
                return Ok(Some(child));
            }
            offset = child.end();
        }
        Ok(None)
    }

    fn ensure_within_buffer(&self, header: &BoxHeader) -> Result<(), ParseError> {
        if header.end() > self.buf.len() {
            bail_attach!(
                ParseError::TruncatedBuffer,
                BoxOverrunsBuffer(header.box_type, header.length, self.buf.len() - header.start),
            );
        }
        Ok(())
    }
}

//
// TopLevelBoxes impls
//

impl Iterator for TopLevelBoxes<'_> {
    type Item = Result<BoxHeader, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.offset >= self.walker.buf.len() {
            return None;
        }
        self.remaining -= 1;

        match read_box_header(self.walker.buf, self.offset) {
            Ok(header) => {
                self.offset = header.end();
                Some(Ok(header))
            }
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }
}
