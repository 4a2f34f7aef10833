use bytes::Bytes;
use futures_util::{pin_mut, stream, FutureExt, Stream, StreamExt};

use crate::sink::{SinkBackend, Transport};
use crate::{Error, Session};

/// An input to a [`Session`]: a received chunk, or a signal from its sink or transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A chunk received from the transport.
    Chunk(Bytes),

    /// The sink is ready to accept appends.
    SinkOpened,

    /// The sink finished processing an append.
    UpdateFinished,

    /// The sink was closed.
    SinkClosed,

    /// The sink reached the end of the stream.
    SinkEnded,

    /// The transport's connection was closed.
    TransportClosed,
}

//
// public functions
//

/// Feed `events` to `session` in order until they run out or the session closes.
///
/// # Errors
///
/// Returns the fatal [`Error`] which closed the session, if any.
pub async fn run<B, T, S>(session: &mut Session<B, T>, events: S) -> Result<(), Error>
where
    B: SinkBackend,
    T: Transport,
    S: Stream<Item = Event>,
{
    pin_mut!(events);
    while let Some(event) = events.next().await {
        session.handle(event)?;
        if session.is_closed() {
            break;
        }
    }
    Ok(())
}

/// Feed `events` to `session` synchronously. See [`run`].
pub fn run_blocking<B, T, I>(session: &mut Session<B, T>, events: I) -> Result<(), Error>
where
    B: SinkBackend,
    T: Transport,
    I: IntoIterator<Item = Event>,
{
    let future = run(session, stream::iter(events));

    // `future` never yields, as an iterator stream is always ready.
    future.now_or_never().unwrap_or_else(|| unreachable!())
}

//
// Session impls
//

impl<B: SinkBackend, T: Transport> Session<B, T> {
    /// Dispatch `event` to the matching handler.
    ///
    /// The [`ChunkOutcome`](crate::ChunkOutcome) of a chunk is only logged.
    pub fn handle(&mut self, event: Event) -> Result<(), Error> {
        match event {
            Event::Chunk(chunk) => {
                let len = chunk.len();
                let outcome = self.push_chunk(chunk)?;
                log::trace!("{len} byte chunk: {outcome:?}");
                Ok(())
            }
            Event::SinkOpened => self.on_sink_opened(),
            Event::UpdateFinished => self.on_update_finished(),
            Event::SinkClosed => {
                self.on_sink_closed();
                Ok(())
            }
            Event::SinkEnded => {
                self.on_sink_ended();
                Ok(())
            }
            Event::TransportClosed => {
                self.on_transport_closed();
                Ok(())
            }
        }
    }
}
