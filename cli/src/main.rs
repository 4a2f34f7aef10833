use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser as _, ValueEnum};
use fmp4live::parse::{read_box_header, FourCC};
use fmp4live::{
    AppendOutcome, ChunkOutcome, CodecParameters, Config, PreludePolicy, Session, Sink, SinkBackend, SinkRejected,
    SinkStatus, Transport,
};

/// Replay a recorded fragmented MP4 stream through an ingest session, as if it were arriving live.
#[derive(clap::Parser)]
struct Args {
    /// Split the file into chunks of this many bytes.
    ///
    /// If not specified, the file is split along top-level box boundaries, with each `moof` sent together with the
    /// `mdat` following it.
    #[clap(long)]
    chunk_size: Option<usize>,

    /// The minimum retained window in seconds. Zero disables live-edge correction.
    #[clap(long, default_value_t = 0.0)]
    window: f64,

    /// Seconds of media each appended fragment is assumed to add to the simulated sink.
    #[clap(long, default_value_t = 1.0)]
    fragment_duration: f64,

    /// What to do with initialization chunks received before the first keyframe fragment.
    #[clap(long, value_enum, default_value_t = Prelude::Accumulate)]
    prelude: Prelude,

    /// Path to the recorded stream.
    file: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Prelude {
    Drop,
    Accumulate,
}

/// A sink which accepts every append, finishing each update before the next chunk arrives.
#[derive(Clone)]
struct SimulatedSink {
    state: Rc<RefCell<SimulatedState>>,
}

#[derive(Default)]
struct SimulatedState {
    status: SinkStatus,
    fragment_duration: f64,
    appends: usize,
    seeks: usize,
}

struct SimulatedBackend(SimulatedSink);

struct LoggingTransport;

#[derive(Default)]
struct Tally {
    dropped: usize,
    retained: usize,
    appended: usize,
    queued: usize,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .context("Error initializing logging")?;

    let args = Args::try_parse().context("Error parsing command line arguments")?;

    let data = Bytes::from(std::fs::read(&args.file).context("Error reading file")?);
    let chunks = match args.chunk_size {
        Some(0) => anyhow::bail!("chunk size must be positive"),
        Some(chunk_size) => split_fixed(&data, chunk_size),
        None => split_boxes(&data)?,
    };

    let config = Config::builder()
        .min_buffer_window(args.window)
        .prelude(match args.prelude {
            Prelude::Drop => PreludePolicy::Drop,
            Prelude::Accumulate => PreludePolicy::Accumulate,
        })
        .build();
    let sink = SimulatedSink::new(args.fragment_duration);
    let mut session = Session::with_config(SimulatedBackend(sink.clone()), LoggingTransport, config);

    let mut tally = Tally::default();
    let mut opened = false;
    for chunk in chunks {
        let outcome = session.push_chunk(chunk).context("Error ingesting chunk")?;
        tally.count(outcome);

        if session.sink().is_some() && !opened {
            opened = true;
            session.on_sink_opened().context("Error opening sink")?;
        }
        while sink.finish_update() {
            session.on_update_finished().context("Error appending to sink")?;
        }
    }
    session.on_transport_closed();

    let state = sink.state.borrow();
    match session.codec_parameters() {
        Some(codec) => println!("codec: {codec}"),
        None => println!("codec: not found"),
    }
    println!("phase: {}", session.phase());
    println!(
        "chunks: {} appended, {} queued, {} retained, {} dropped",
        tally.appended, tally.queued, tally.retained, tally.dropped
    );
    println!(
        "sink: {} appends, {:.3}s buffered, {} live-edge seeks",
        state.appends, state.status.buffered_duration, state.seeks
    );

    Ok(())
}

fn split_fixed(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    (0..data.len()).step_by(chunk_size).map(|start| data.slice(start..data.len().min(start + chunk_size))).collect()
}

fn split_boxes(data: &Bytes) -> Result<Vec<Bytes>, anyhow::Error> {
    let mut chunks = Vec::new();
    let mut chunk_start = 0;
    let mut offset = 0;
    while offset < data.len() {
        let header = read_box_header(data, offset).map_err(|err| anyhow::anyhow!("{err:?}"))?;
        let end = header.end().min(data.len());
        // A `moof` travels together with the `mdat` after it.
        if header.box_type != FourCC::MOOF {
            chunks.push(data.slice(chunk_start..end));
            chunk_start = end;
        }
        offset = end;
    }
    if chunk_start < data.len() {
        chunks.push(data.slice(chunk_start..));
    }
    log::info!("split {} bytes into {} chunks", data.len(), chunks.len());
    Ok(chunks)
}

impl Tally {
    fn count(&mut self, outcome: ChunkOutcome) {
        match outcome {
            ChunkOutcome::Dropped => self.dropped += 1,
            ChunkOutcome::Retained => self.retained += 1,
            ChunkOutcome::Appended => self.appended += 1,
            ChunkOutcome::Queued => self.queued += 1,
        }
    }
}

impl SimulatedSink {
    fn new(fragment_duration: f64) -> Self {
        let state = SimulatedState { fragment_duration, ..Default::default() };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    /// Complete any update in progress, returning whether there was one.
    fn finish_update(&self) -> bool {
        let mut state = self.state.borrow_mut();
        std::mem::replace(&mut state.status.is_updating, false)
    }
}

impl Sink for SimulatedSink {
    fn append(&mut self, _fragment: Bytes) -> AppendOutcome {
        let mut state = self.state.borrow_mut();
        let duration = state.fragment_duration;
        state.status.buffered_duration += duration;
        state.status.is_updating = true;
        state.appends += 1;
        AppendOutcome::Ok
    }

    fn set_timestamp_offset(&mut self, offset: f64) {
        log::trace!("timestamp offset {offset:.3}s");
    }

    fn status(&self) -> SinkStatus {
        self.state.borrow().status
    }

    fn seek(&mut self, position: f64) {
        let mut state = self.state.borrow_mut();
        state.status.current_position = position;
        state.seeks += 1;
    }
}

impl SinkBackend for SimulatedBackend {
    type Sink = SimulatedSink;

    fn is_codec_supported(&self, codec: &CodecParameters) -> bool {
        log::info!("checking support for {codec}");
        true
    }

    fn create(&mut self, _codec: &CodecParameters) -> Result<SimulatedSink, SinkRejected> {
        Ok(self.0.clone())
    }
}

impl Transport for LoggingTransport {
    fn close(&mut self) {
        log::info!("transport closed");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn chunking_args() {
        let args = Args::try_parse_from(["fmp4live-cli", "--chunk-size", "16", "stream.mp4"]).unwrap();
        assert_eq!(args.chunk_size, Some(16));

        let args = Args::try_parse_from(["fmp4live-cli", "stream.mp4"]).unwrap();
        assert_eq!(args.chunk_size, None);

        assert!(Args::try_parse_from(["fmp4live-cli", "--boxes", "stream.mp4"]).is_err());
    }
}
