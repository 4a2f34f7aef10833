use bytes::Bytes;

use crate::buffer::{BufferingEngine, Delivery};
use crate::classify::{Classifier, Discard, Phase, Verdict};
use crate::parse::CodecParameters;
use crate::sink::{SinkBackend, Transport};
use crate::{Config, Error, PreludePolicy};

/// What became of a chunk passed to [`Session::push_chunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The chunk preceded a safe start point and was dropped.
    Dropped,

    /// The chunk carried initialization data and was kept in the prelude.
    Retained,

    /// The chunk was appended to the sink.
    Appended,

    /// The chunk was queued behind the sink.
    Queued,
}

/// The lifecycle state of a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Chunks are being classified; no sink exists yet.
    Open,

    /// A sink has been created and admitted chunks are being delivered to it.
    Active,

    /// The transport has been closed. Nothing further is processed.
    Closed,
}

/// One live stream connection: classification, buffering, the sink, and the transport they stop on failure.
///
/// A session is driven one event at a time: each received chunk goes to [`push_chunk`](Self::push_chunk), and each
/// signal raised by the sink goes to the matching `on_*` method. Any fatal error closes the transport exactly once,
/// after which the session ignores sink signals and refuses chunks.
pub struct Session<B: SinkBackend, T: Transport> {
    config: Config,
    backend: B,
    transport: T,
    classifier: Classifier,
    engine: BufferingEngine<B::Sink>,
    state: SessionState,
}

impl<B: SinkBackend, T: Transport> Session<B, T> {
    /// Construct a new `Session` with the default [`Config`].
    pub fn new(backend: B, transport: T) -> Self {
        Self::with_config(backend, transport, Config::default())
    }

    /// Construct a new `Session` with the given [`Config`].
    pub fn with_config(backend: B, transport: T, config: Config) -> Self {
        Self {
            classifier: Classifier::new(config.scan_budget).with_max_init_size(config.max_init_size),
            engine: BufferingEngine::new(config.live_edge()),
            config,
            backend,
            transport,
            state: SessionState::Open,
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// The current pipeline phase.
    pub fn phase(&self) -> Phase {
        self.classifier.phase()
    }

    /// The stream's codec parameters, once discovered.
    pub fn codec_parameters(&self) -> Option<CodecParameters> {
        self.classifier.codec_parameters()
    }

    /// The sink, once created and until the session closes.
    pub fn sink(&self) -> Option<&B::Sink> {
        self.engine.sink()
    }

    /// The number of fragments waiting for the sink.
    pub fn queued_len(&self) -> usize {
        self.engine.queued_len()
    }

    /// Whether initialization data is being held for the sink.
    pub fn has_prelude(&self) -> bool {
        self.engine.prelude_len().is_some()
    }

    /// Classify and dispose of one received chunk.
    ///
    /// # Errors
    ///
    /// A fatal [`Error`] is returned, after the transport has been closed, if the stream's codec is unsupported, the
    /// sink cannot be created, or the sink fails an append. [`Error::Closed`] is returned for chunks received after
    /// the session closed.
    pub fn push_chunk(&mut self, chunk: Bytes) -> Result<ChunkOutcome, Error> {
        if self.is_closed() {
            return Err(Error::Closed);
        }

        let classified = self.classifier.classify(&chunk);
        if let Some(codec) = classified.discovered {
            if !self.backend.is_codec_supported(&codec) {
                return Err(self.fail(Error::UnsupportedCodec(codec)));
            }
        }

        match classified.verdict {
            Verdict::Discard(reason) => {
                match reason {
                    Discard::Incomplete => log::debug!("dropping {} byte chunk: incomplete", chunk.len()),
                    Discard::NotKeyframe => log::debug!("dropping {} byte chunk: not a keyframe", chunk.len()),
                    Discard::Malformed(_) => log::debug!("dropping {} byte chunk: malformed", chunk.len()),
                }
                Ok(ChunkOutcome::Dropped)
            }
            Verdict::Init => match self.config.prelude {
                PreludePolicy::Accumulate => {
                    self.engine.retain_prelude(&chunk);
                    Ok(ChunkOutcome::Retained)
                }
                PreludePolicy::Drop => {
                    log::debug!("dropping {} byte initialization chunk", chunk.len());
                    Ok(ChunkOutcome::Dropped)
                }
            },
            Verdict::Admit => {
                // Admission implies a `moov` has already yielded codec parameters.
                if let (false, Some(codec)) = (self.engine.has_sink(), self.classifier.codec_parameters()) {
                    self.create_sink(codec)?;
                }
                match self.engine.push(chunk) {
                    Ok(Delivery::Appended) => Ok(ChunkOutcome::Appended),
                    Ok(Delivery::Queued) => Ok(ChunkOutcome::Queued),
                    Err(err) => Err(self.fail(err)),
                }
            }
        }
    }

    /// Handle the sink signalling it is ready to accept data.
    pub fn on_sink_opened(&mut self) -> Result<(), Error> {
        if self.is_closed() {
            return Ok(());
        }
        log::info!("sink opened");
        self.engine.on_opened().map_err(|err| self.fail(err))
    }

    /// Handle the sink signalling it finished processing an append.
    pub fn on_update_finished(&mut self) -> Result<(), Error> {
        if self.is_closed() {
            return Ok(());
        }
        self.engine.on_update_finished().map_err(|err| self.fail(err))
    }

    /// Handle the sink signalling it was closed.
    pub fn on_sink_closed(&mut self) {
        log::info!("sink closed");
        self.close();
    }

    /// Handle the sink signalling the stream ended.
    pub fn on_sink_ended(&mut self) {
        log::info!("sink ended");
        self.close();
    }

    /// Handle the transport reporting the connection closed.
    pub fn on_transport_closed(&mut self) {
        log::info!("transport closed");
        self.close();
    }

    /// Close the transport and release the sink. Calling this more than once has no further effect.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        self.state = SessionState::Closed;
        self.transport.close();
        self.engine.detach();
    }

    fn create_sink(&mut self, codec: CodecParameters) -> Result<(), Error> {
        match self.backend.create(&codec) {
            Ok(sink) => {
                log::info!("created sink for {codec}");
                self.engine.attach(sink);
                self.state = SessionState::Active;
                Ok(())
            }
            Err(rejected) => {
                log::warn!("{rejected} for {codec}");
                Err(self.fail(Error::SinkRejectedCreation(codec)))
            }
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        log::warn!("closing session: {err}");
        self.close();
        err
    }
}
