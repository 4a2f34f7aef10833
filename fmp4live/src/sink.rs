//! The boundary between a [`Session`](crate::Session) and the components it drives but does not own the behaviour of:
//! the buffering/rendering sink, and the transport delivering chunks.

use bytes::Bytes;
use derive_more::Display;

use crate::parse::CodecParameters;

/// The result of handing a fragment to a [`Sink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The sink accepted the fragment. It is expected to signal update completion later.
    Ok,

    /// The sink is mid-update and did not take the fragment. It will be retried, in order, on the next update
    /// completion.
    Busy,

    /// The sink failed. This is fatal to the session.
    Fail,
}

/// Telemetry reported by a [`Sink`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SinkStatus {
    /// Total media buffered, in seconds from the start of the timeline.
    pub buffered_duration: f64,

    /// Current playback position, in seconds.
    pub current_position: f64,

    /// Whether an append is still being processed.
    pub is_updating: bool,
}

/// A buffering/rendering sink which media fragments are appended to.
///
/// Besides the calls below, a sink raises four signals which the embedding code must route to the owning
/// [`Session`](crate::Session): opened ([`on_sink_opened`](crate::Session::on_sink_opened)), update finished
/// ([`on_update_finished`](crate::Session::on_update_finished)), closed and ended.
pub trait Sink {
    /// Append a fragment.
    fn append(&mut self, fragment: Bytes) -> AppendOutcome;

    /// Set the offset added to timestamps of subsequently appended fragments, in seconds.
    fn set_timestamp_offset(&mut self, offset: f64);

    /// Query the sink's current telemetry.
    fn status(&self) -> SinkStatus;

    /// Move the playback position, in seconds.
    fn seek(&mut self, position: f64);
}

/// A sink refused to be created for some [`CodecParameters`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[display(fmt = "sink creation rejected")]
pub struct SinkRejected;

/// A factory for [`Sink`]s, with the capability query consulted before creating one.
pub trait SinkBackend {
    /// The sink type created.
    type Sink: Sink;

    /// Whether sinks created by this backend can render a stream with the given codec parameters.
    fn is_codec_supported(&self, codec: &CodecParameters) -> bool;

    /// Create a sink for a stream with the given codec parameters.
    ///
    /// The sink is not expected to accept appends until it signals it has opened.
    fn create(&mut self, codec: &CodecParameters) -> Result<Self::Sink, SinkRejected>;
}

/// The transport delivering chunks to a [`Session`](crate::Session).
pub trait Transport {
    /// Tear down the transport. A session calls this at most once.
    fn close(&mut self);
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn append(&mut self, fragment: Bytes) -> AppendOutcome {
        (**self).append(fragment)
    }

    fn set_timestamp_offset(&mut self, offset: f64) {
        (**self).set_timestamp_offset(offset)
    }

    fn status(&self) -> SinkStatus {
        (**self).status()
    }

    fn seek(&mut self, position: f64) {
        (**self).seek(position)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn close(&mut self) {
        (**self).close()
    }
}
