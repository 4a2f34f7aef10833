//! Per-chunk classification driving a stream from its initialization segment up to its first keyframe fragment.

use std::mem;

use bytes::BytesMut;
use derive_more::Display;
use fmp4live_common::error::Report;
use fmp4live_common::report_attach;

use crate::parse::{
    find_codec_parameters, is_keyframe_fragment, BoxHeader, BoxWalker, CodecParameters, FourCC, ParseError,
    TopLevelBoxes,
};

/// The phase of a stream's pipeline. Phases only ever advance.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Waiting for a chunk carrying a `styp` or `ftyp` box.
    AwaitingInit,

    /// Waiting for a `moov` box from which codec parameters can be extracted.
    AwaitingMoov,

    /// Waiting for a `moof` box whose first run starts on a keyframe.
    AwaitingKeyframeMoof,

    /// Every chunk is passed on without inspection.
    Streaming,
}

/// What should happen to a classified chunk.
#[derive(Debug)]
pub enum Verdict {
    /// The chunk starts or continues the streamed media and should be handed on for buffering.
    Admit,

    /// The chunk carries initialization data (`styp`, `ftyp` or `moov`) ahead of the first keyframe fragment.
    Init,

    /// The chunk precedes a safe start point and should be dropped.
    Discard(Discard),
}

/// Why a chunk was discarded.
#[derive(Debug)]
pub enum Discard {
    /// The structure the current phase waits for was not found in the chunk.
    Incomplete,

    /// The chunk's fragment does not begin on a keyframe.
    NotKeyframe,

    /// The chunk's box structure could not be read.
    Malformed(Report<ParseError>),
}

/// The result of [`Classifier::classify`].
#[derive(Debug)]
pub struct Classification {
    /// What to do with the chunk.
    pub verdict: Verdict,

    /// Codec parameters extracted for the first time from this chunk.
    pub discovered: Option<CodecParameters>,
}

/// A forward-only state machine classifying each incoming chunk against the current [`Phase`].
///
/// A single chunk may carry several phases' worth of boxes, e.g. `styp` followed by `moov`, in which case the phase
/// advances more than once while classifying it. At most `scan_budget` top-level boxes are inspected per chunk.
///
/// Chunk boundaries need not fall on box boundaries. An initialization box (`styp`, `ftyp` or `moov`) the current phase
/// waits for, cut off by the end of a chunk, is held and completed from the following chunks before it is inspected. The remainder of any other
/// box cut off that way is skipped over at the start of the following chunks.
#[derive(Clone, Debug)]
pub struct Classifier {
    phase: Phase,
    codec: Option<CodecParameters>,
    scan_budget: usize,
    max_init_size: usize,
    carry: Carry,
}

/// What the previous chunk left unfinished at its end.
#[derive(Clone, Debug)]
enum Carry {
    Nothing,

    /// The leading bytes of an initialization box, starting with its header.
    Init(BytesMut),

    /// The number of bytes still to come of a box which is not inspected.
    Skip(usize),
}

enum Advance {
    Skipped,
    Init,
    Codec(CodecParameters),
    Keyframe,
    NotKeyframe,
    Incomplete,
}

//
// Classifier impls
//

impl Classifier {
    /// The default limit on the declared length of an initialization box held across chunks: 1 MiB.
    pub const DEFAULT_MAX_INIT_SIZE: usize = 1024 * 1024;

    /// Construct a new `Classifier` in [`Phase::AwaitingInit`].
    pub fn new(scan_budget: usize) -> Self {
        Self {
            phase: Phase::AwaitingInit,
            codec: None,
            scan_budget,
            max_init_size: Self::DEFAULT_MAX_INIT_SIZE,
            carry: Carry::Nothing,
        }
    }

    /// Limit the declared length of an initialization box which may be held across chunks.
    ///
    /// A longer box cut off by the end of a chunk is reported as [`Discard::Malformed`].
    pub fn with_max_init_size(mut self, max_init_size: usize) -> Self {
        self.max_init_size = max_init_size;
        self
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The codec parameters, once extracted. They are never recomputed.
    pub fn codec_parameters(&self) -> Option<CodecParameters> {
        self.codec
    }

    /// Classify `chunk`, advancing the phase as far as its boxes allow.
    pub fn classify(&mut self, chunk: &[u8]) -> Classification {
        if self.phase == Phase::Streaming {
            return Classification { verdict: Verdict::Admit, discovered: None };
        }

        let joined;
        let (buf, continues_init) = match mem::replace(&mut self.carry, Carry::Nothing) {
            Carry::Nothing => (chunk, false),
            Carry::Skip(owed) if owed >= chunk.len() => {
                if owed > chunk.len() {
                    self.carry = Carry::Skip(owed - chunk.len());
                }
                log::debug!("skipping {} byte chunk inside a box", chunk.len());
                return Self::finish(false, None, Discard::Incomplete);
            }
            Carry::Skip(owed) => (&chunk[owed..], false),
            Carry::Init(mut held) => {
                held.extend_from_slice(chunk);
                joined = held;
                (&joined[..], true)
            }
        };

        let walker = BoxWalker::new(buf, self.scan_budget);
        let mut carries_init = continues_init;
        let mut discovered = None;

        let mut boxes = walker.top_level();
        while let Some(header) = boxes.next() {
            let header = match header {
                Ok(header) => header,
                Err(err) => return self.malformed(chunk, carries_init, discovered, err),
            };

            let owed = header.end().saturating_sub(buf.len());
            if owed != 0 && self.holds(header.box_type) {
                if header.length as usize > self.max_init_size {
                    let err = report_attach!(
                        ParseError::MalformedBox,
                        format!("`{}` box of {} bytes exceeds limit of {}", header.box_type, header.length, self.max_init_size),
                    );
                    return self.malformed(chunk, carries_init, discovered, err);
                }
                log::debug!("holding {} bytes of `{}` box, {owed} bytes to come", buf.len() - header.start, header.box_type);
                self.carry = Carry::Init(BytesMut::from(&buf[header.start..]));
                return Self::finish(true, discovered, Discard::Incomplete);
            }

            let advance = match self.advance(&walker, &header) {
                Ok(advance) => advance,
                // The structure looked for may simply lie beyond the end of this chunk.
                Err(err) if owed != 0 && *err.get_ref() == ParseError::TruncatedBuffer => Advance::Incomplete,
                Err(err) => return self.malformed(chunk, carries_init, discovered, err),
            };
            if owed != 0 && !matches!(advance, Advance::Keyframe) {
                self.carry = Carry::Skip(owed);
            }
            match advance {
                Advance::Skipped => {}
                Advance::Init => carries_init = true,
                Advance::Codec(codec) => {
                    carries_init = true;
                    discovered = Some(codec);
                }
                Advance::Keyframe => return Classification { verdict: Verdict::Admit, discovered },
                Advance::NotKeyframe => {
                    self.skip_remainder(boxes, buf.len());
                    return Self::finish(carries_init, discovered, Discard::NotKeyframe);
                }
                Advance::Incomplete => {
                    self.skip_remainder(boxes, buf.len());
                    break;
                }
            }
        }
        Self::finish(carries_init, discovered, Discard::Incomplete)
    }

    fn advance(&mut self, walker: &BoxWalker<'_>, header: &BoxHeader) -> Result<Advance, Report<ParseError>> {
        match (self.phase, header.box_type) {
            (Phase::AwaitingInit, FourCC::STYP | FourCC::FTYP) => {
                self.enter(Phase::AwaitingMoov);
                Ok(Advance::Init)
            }
            (Phase::AwaitingMoov, FourCC::STYP | FourCC::FTYP) => Ok(Advance::Init),
            (Phase::AwaitingMoov, FourCC::MOOV) => match find_codec_parameters(walker, header.start)? {
                Some(codec) => {
                    debug_assert!(self.codec.is_none(), "codec parameters extracted twice");
                    self.codec = Some(codec);
                    log::info!("codec parameters: {codec}");
                    self.enter(Phase::AwaitingKeyframeMoof);
                    Ok(Advance::Codec(codec))
                }
                None => Ok(Advance::Incomplete),
            },
            (Phase::AwaitingKeyframeMoof, FourCC::MOOF) => match is_keyframe_fragment(walker, header.start)? {
                Some(true) => {
                    self.enter(Phase::Streaming);
                    Ok(Advance::Keyframe)
                }
                Some(false) => Ok(Advance::NotKeyframe),
                None => Ok(Advance::Incomplete),
            },
            _ => Ok(Advance::Skipped),
        }
    }

    /// Walk the top-level boxes left in a chunk of `len` bytes, and skip the remainder of the last one if the chunk cuts
    /// it off.
    fn skip_remainder(&mut self, boxes: TopLevelBoxes<'_>, len: usize) {
        if let Some(Ok(last)) = boxes.last() {
            let owed = last.end().saturating_sub(len);
            if owed != 0 {
                self.carry = Carry::Skip(owed);
            }
        }
    }

    /// Whether a `box_type` box cut off by the end of a chunk is held until complete.
    fn holds(&self, box_type: FourCC) -> bool {
        match self.phase {
            Phase::AwaitingInit => matches!(box_type, FourCC::STYP | FourCC::FTYP),
            Phase::AwaitingMoov => matches!(box_type, FourCC::STYP | FourCC::FTYP | FourCC::MOOV),
            Phase::AwaitingKeyframeMoof | Phase::Streaming => false,
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug_assert!(phase > self.phase);
        log::info!("phase {} -> {phase}", self.phase);
        self.phase = phase;
    }

    fn malformed(
        &mut self,
        chunk: &[u8],
        carries_init: bool,
        discovered: Option<CodecParameters>,
        err: Report<ParseError>,
    ) -> Classification {
        log::warn!("malformed chunk of {} bytes in phase {}: {err:?}", chunk.len(), self.phase);
        self.carry = Carry::Nothing;
        Self::finish(carries_init, discovered, Discard::Malformed(err))
    }

    fn finish(carries_init: bool, discovered: Option<CodecParameters>, discard: Discard) -> Classification {
        let verdict = if carries_init { Verdict::Init } else { Verdict::Discard(discard) };
        Classification { verdict, discovered }
    }
}
