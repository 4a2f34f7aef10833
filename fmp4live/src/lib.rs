#![warn(missing_docs)]

//! `fmp4live` is the ingest side of a low-latency live video client for fragmented MP4 streams.
//!
//! A live server pushes a stream as a sequence of binary chunks: an initialization segment (`styp` or `ftyp`, then
//! `moov`) followed by an endless series of media fragments (`moof` + `mdat`). A client joining such a stream has to
//! find the codec parameters before it can open a decoder, and then must not feed the decoder anything before the
//! first fragment which starts on a keyframe. This crate provides:
//!
//! - A bounds-checked [box reader and walker](parse) over chunk buffers which never panics on hostile input.
//! - A [`Classifier`] deciding, chunk by chunk, what to drop and where the stream can safely start.
//! - A [`BufferingEngine`] delivering admitted chunks to a rate-limited [`Sink`] in strict arrival order, optionally
//!   keeping playback near the live edge.
//! - A [`Session`] tying these together with a [`SinkBackend`] and [`Transport`], closing the transport exactly once
//!   on any fatal error.
//!
//! # Usage
//!
//! The embedding code implements [`SinkBackend`], [`Sink`] and [`Transport`] for its decoder and connection, then
//! routes every received chunk and sink signal to a [`Session`], either directly or as a stream of [`Event`]s:
//!
//! ```ignore
//! let mut session = Session::with_config(backend, transport, Config::builder().min_buffer_window(2.0).build());
//! fmp4live::run(&mut session, events).await?;
//! ```

mod buffer;
mod classify;
mod error;
pub mod parse;
mod session;
mod sink;
mod sync;

use derive_builder::Builder;
use derive_more::Display;

//
// public types
//

pub use buffer::{BufferingEngine, Delivery, LiveEdge};
pub use classify::{Classification, Classifier, Discard, Phase, Verdict};
pub use error::Error;
pub use parse::CodecParameters;
pub use session::{ChunkOutcome, Session, SessionState};
pub use sink::{AppendOutcome, Sink, SinkBackend, SinkRejected, SinkStatus, Transport};
pub use sync::{run, run_blocking, Event};

#[derive(Builder, Clone, Debug)]
#[builder(build_fn(name = "try_build"))]
/// Configuration for a [`Session`].
pub struct Config {
    /// The minimum retained window `W`, in seconds, kept behind the live edge.
    ///
    /// When positive, playback is moved back toward the live edge whenever it falls more than
    /// [`seek_threshold`](Self::seek_threshold) `* W` behind the buffered end.
    ///
    /// The default is 0, which disables live-edge correction.
    #[builder(default)]
    pub min_buffer_window: f64,

    /// Fraction of [`min_buffer_window`](Self::min_buffer_window) playback may lag behind the buffered end before
    /// being corrected.
    ///
    /// The default is 0.9.
    #[builder(default = "0.9")]
    pub seek_threshold: f64,

    /// Fraction of [`min_buffer_window`](Self::min_buffer_window) behind the buffered end that a correction seeks to.
    ///
    /// The default is 0.5.
    #[builder(default = "0.5")]
    pub seek_target: f64,

    /// The maximum number of sibling boxes inspected at each level of a chunk while looking for the structure the
    /// current [`Phase`] waits for.
    ///
    /// The default is 3.
    #[builder(default = "3")]
    pub scan_budget: usize,

    /// The maximum declared length, in bytes, of an initialization box (`styp`, `ftyp` or `moov`) which arrives split
    /// across chunks and is held until complete.
    ///
    /// The default is 1 MiB.
    #[builder(default = "Classifier::DEFAULT_MAX_INIT_SIZE")]
    pub max_init_size: usize,

    /// What to do with initialization chunks received before the first keyframe fragment.
    ///
    /// The default is [`PreludePolicy::Accumulate`].
    #[builder(default)]
    pub prelude: PreludePolicy,
}

/// What a [`Session`] does with chunks carrying initialization data (`styp`, `ftyp` and `moov`) before the sink
/// exists.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq)]
pub enum PreludePolicy {
    /// Drop them. The sink then only ever sees media fragments, and must be initialized out of band.
    #[display(fmt = "drop")]
    Drop,

    /// Concatenate them into a prelude appended to the sink before anything else once it opens.
    #[default]
    #[display(fmt = "accumulate")]
    Accumulate,
}

//
// Config impls
//

impl Config {
    /// Construct a builder for `Config`.
    ///
    /// See the documentation for [`ConfigBuilder`].
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The live-edge tracking parameters derived from this configuration.
    pub fn live_edge(&self) -> LiveEdge {
        LiveEdge { window: self.min_buffer_window, threshold: self.seek_threshold, target: self.seek_target }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

//
// ConfigBuilder impls
//

impl ConfigBuilder {
    /// Build a new [`Config`].
    pub fn build(&self) -> Config {
        // Every field has a default.
        self.try_build().unwrap_or_else(|_| unreachable!())
    }
}
