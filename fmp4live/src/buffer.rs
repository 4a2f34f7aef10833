use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use crate::sink::{AppendOutcome, Sink, SinkStatus};
use crate::Error;

/// Live-edge tracking parameters.
///
/// With a retained window `W` greater than zero, once at least `W` seconds are buffered and the playback position
/// falls more than `threshold * W` behind the buffered end, playback is moved to `target * W` behind the buffered end.
/// A window of zero disables the correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveEdge {
    /// The minimum retained window `W`, in seconds.
    pub window: f64,

    /// Fraction of `W` the playback position may lag behind before being corrected.
    pub threshold: f64,

    /// Fraction of `W` behind the buffered end to correct the playback position to.
    pub target: f64,
}

/// How [`BufferingEngine::push`] disposed of a fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Appended to the sink directly.
    Appended,

    /// Queued until the sink is ready for it.
    Queued,
}

/// Hands fragments to a [`Sink`] in strict arrival order.
///
/// A fragment is appended directly when nothing is queued ahead of it and the sink is open and idle. Otherwise it
/// joins a FIFO queue, which is drained one fragment per sink update completion. Data retained before the sink exists
/// is concatenated into a single prelude buffer and appended first once the sink opens.
#[derive(Debug)]
pub struct BufferingEngine<S> {
    sink: Option<S>,
    opened: bool,
    queue: VecDeque<Bytes>,
    prelude: Option<BytesMut>,
    live_edge: LiveEdge,
}

//
// LiveEdge impls
//

impl LiveEdge {
    /// The playback position to seek to given `status`, if it has drifted too far from the live edge.
    pub fn correction(&self, status: &SinkStatus) -> Option<f64> {
        if self.window <= 0.0 {
            return None;
        }
        let SinkStatus { buffered_duration, current_position, .. } = *status;
        let lag = buffered_duration - current_position;
        if buffered_duration >= self.window && lag > self.threshold * self.window {
            Some(buffered_duration - self.target * self.window)
        } else {
            None
        }
    }
}

//
// BufferingEngine impls
//

impl<S: Sink> BufferingEngine<S> {
    /// Construct a new `BufferingEngine` with no sink.
    pub fn new(live_edge: LiveEdge) -> Self {
        Self { sink: None, opened: false, queue: VecDeque::new(), prelude: None, live_edge }
    }

    /// The attached sink, if any.
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// Whether a sink has been attached.
    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// The number of fragments waiting in the queue.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// The number of bytes held in the prelude, if there is one.
    pub fn prelude_len(&self) -> Option<usize> {
        self.prelude.as_ref().map(BytesMut::len)
    }

    /// Attach the sink fragments will be delivered to. It is not appended to until [opened](Self::on_opened).
    pub fn attach(&mut self, sink: S) {
        debug_assert!(self.sink.is_none(), "sink attached twice");
        self.sink = Some(sink);
    }

    /// Concatenate `chunk` onto the prelude.
    pub fn retain_prelude(&mut self, chunk: &[u8]) {
        let prelude = self.prelude.get_or_insert_with(BytesMut::new);
        prelude.extend_from_slice(chunk);
        log::debug!("prelude now {} bytes", prelude.len());
    }

    /// Deliver `fragment`, directly if possible and through the queue otherwise.
    pub fn push(&mut self, fragment: Bytes) -> Result<Delivery, Error> {
        let idle = match &self.sink {
            Some(sink) => self.opened && !sink.status().is_updating,
            None => false,
        };
        if idle && self.queue.is_empty() {
            let appended = self.deliver(fragment)?;
            return Ok(if appended { Delivery::Appended } else { Delivery::Queued });
        }
        self.queue.push_back(fragment);
        log::debug!("queued fragment, {} waiting", self.queue.len());
        Ok(Delivery::Queued)
    }

    /// Handle the sink signalling it is ready: append the prelude if there is one, or else the queue head.
    pub fn on_opened(&mut self) -> Result<(), Error> {
        self.opened = true;
        match self.prelude.take() {
            Some(prelude) => {
                log::debug!("appending {} byte prelude", prelude.len());
                self.deliver(prelude.freeze()).map(drop)
            }
            None => self.drain_one(),
        }
    }

    /// Handle the sink signalling an append completed: append the queue head, if any.
    pub fn on_update_finished(&mut self) -> Result<(), Error> {
        self.drain_one()
    }

    /// Detach the sink, dropping anything still queued or retained.
    pub fn detach(&mut self) -> Option<S> {
        self.opened = false;
        self.queue.clear();
        self.prelude = None;
        self.sink.take()
    }

    fn drain_one(&mut self) -> Result<(), Error> {
        if !self.opened {
            return Ok(());
        }
        match self.queue.pop_front() {
            Some(fragment) => self.deliver(fragment).map(drop),
            None => Ok(()),
        }
    }

    /// Append `fragment` to the sink, putting it back at the queue head if the sink is busy.
    ///
    /// Returns whether the sink took the fragment.
    fn deliver(&mut self, fragment: Bytes) -> Result<bool, Error> {
        let Some(sink) = self.sink.as_mut() else {
            self.queue.push_front(fragment);
            return Ok(false);
        };

        let status = sink.status();
        if let Some(position) = self.live_edge.correction(&status) {
            log::debug!(
                "playback at {:.3}s lags buffered end {:.3}s, seeking to {position:.3}s",
                status.current_position,
                status.buffered_duration,
            );
            sink.seek(position);
        }
        sink.set_timestamp_offset(status.buffered_duration);

        match sink.append(fragment.clone()) {
            AppendOutcome::Ok => Ok(true),
            AppendOutcome::Busy => {
                self.queue.push_front(fragment);
                log::debug!("sink busy, {} waiting", self.queue.len());
                Ok(false)
            }
            AppendOutcome::Fail => Err(Error::SinkAppendFailure),
        }
    }
}
