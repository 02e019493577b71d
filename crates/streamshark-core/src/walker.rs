//! Capture walker: drives the decoders over every frame of a capture.
//!
//! The walk is a small state machine, `ReadingHeader -> ReadingFrame* ->
//! Done | Failed`. Each frame's bytes are carved out of the capture using the
//! record's captured length before any layer is decoded, so the outer cursor
//! always advances by exactly that length whatever the layers inside do.
//! Frame numbers start at 1, as in common capture viewers.

use std::path::Path;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

use crate::capture::{CaptureHeader, FrameRecord, layout, parse_capture_header, parse_frame_record};
use crate::config::{MismatchPolicy, ReassemblyConfig};
use crate::error::DecodeError;
use crate::payload::{Extraction, Filler, PayloadOutcome, extract_payload};
use crate::protocols::ethernet::parse_ethernet;
use crate::protocols::ipv4::parse_ipv4;
use crate::protocols::tcp::parse_tcp;
use crate::reader::ByteReader;
use crate::reassembly::{AssembledStream, InsertOutcome, StreamAssembler};
use crate::{CaptureSummary, Reassembly};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    ReadingHeader,
    ReadingFrame,
    Done,
    Failed,
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Stored { sequence: u32, len: usize },
    Duplicate { sequence: u32 },
    Filtered { len: usize },
    Empty,
    /// Protocol mismatch stepped over under `MismatchPolicy::SkipFrame`.
    Skipped,
}

#[derive(Debug, Default)]
struct WalkStats {
    frames_total: u64,
    frames_stored: u64,
    frames_duplicate: u64,
    frames_filtered: u64,
    frames_empty: u64,
    frames_skipped: u64,
    frames_padded: u64,
    padding_unverified: u64,
    unaccounted_trailers: u64,
    dangling_bytes: u64,
    first_ts: Option<f64>,
    last_ts: Option<f64>,
}

pub struct CaptureWalker<'a> {
    reader: ByteReader<'a>,
    config: &'a ReassemblyConfig,
    state: WalkState,
    header: Option<CaptureHeader>,
    assembler: StreamAssembler,
    stats: WalkStats,
    frame: u64,
    failure: Option<DecodeError>,
}

impl<'a> CaptureWalker<'a> {
    pub fn new(capture: &'a [u8], config: &'a ReassemblyConfig) -> Self {
        Self {
            reader: ByteReader::new(capture),
            config,
            state: WalkState::ReadingHeader,
            header: None,
            assembler: StreamAssembler::new(config.duplicates),
            stats: WalkStats::default(),
            frame: 0,
            failure: None,
        }
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// The validated global header, once `ReadingHeader` has succeeded.
    pub fn header(&self) -> Option<&CaptureHeader> {
        self.header.as_ref()
    }

    /// The error that moved the walk into `Failed`.
    pub fn failure(&self) -> Option<&DecodeError> {
        self.failure.as_ref()
    }

    /// Absolute offset of the next unread capture byte.
    pub fn offset(&self) -> usize {
        self.reader.offset()
    }

    /// Perform one state transition and return the new state.
    ///
    /// In `ReadingFrame` one transition decodes exactly one frame. `Done` and
    /// `Failed` are terminal: stepping `Done` again is a no-op and stepping
    /// `Failed` returns the error that ended the walk.
    ///
    /// # Errors
    /// Any fatal decode error; the walker is left in `Failed`.
    pub fn step(&mut self) -> Result<WalkState, DecodeError> {
        let result = match self.state {
            WalkState::ReadingHeader => self.read_header(),
            WalkState::ReadingFrame => self.read_frame().map(|_| ()),
            WalkState::Done => return Ok(self.state),
            WalkState::Failed => return Err(self.replay_failure()),
        };
        match result {
            Ok(()) => Ok(self.state),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Decode the next frame, returning `None` once the capture is exhausted.
    ///
    /// Reads the global header first if that has not happened yet.
    ///
    /// # Errors
    /// Any fatal decode error; the walker is left in `Failed`.
    pub fn next_frame(&mut self) -> Result<Option<FrameOutcome>, DecodeError> {
        if self.state == WalkState::ReadingHeader {
            self.step()?;
        }
        match self.state {
            WalkState::ReadingFrame => self.read_frame().map_err(|err| self.fail(err)),
            WalkState::Failed => Err(self.replay_failure()),
            WalkState::ReadingHeader | WalkState::Done => Ok(None),
        }
    }

    /// Walk to the end of the capture and assemble the stream.
    ///
    /// # Errors
    /// The first fatal decode error, including one raised by an earlier
    /// `step`. No partial stream is returned.
    pub fn run(mut self) -> Result<Reassembly, DecodeError> {
        while self.step()? != WalkState::Done {}
        Ok(self.finish())
    }

    fn fail(&mut self, err: DecodeError) -> DecodeError {
        self.state = WalkState::Failed;
        warn!(offset = self.reader.offset(), error = %err, "capture walk failed");
        self.failure = Some(err.clone());
        err
    }

    fn replay_failure(&self) -> DecodeError {
        self.failure.clone().unwrap_or_else(|| DecodeError::InvalidCapture {
            offset: self.reader.offset(),
            reason: "walk failed".to_string(),
        })
    }

    fn read_header(&mut self) -> Result<(), DecodeError> {
        let header = parse_capture_header(&mut self.reader)?;
        debug!(
            version = %format!("{}.{}", header.version_major, header.version_minor),
            byte_order = ?header.byte_order,
            snap_len = header.snap_len,
            "capture header accepted"
        );
        self.header = Some(header);
        self.state = WalkState::ReadingFrame;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<FrameOutcome>, DecodeError> {
        if self.reader.is_empty() {
            self.state = WalkState::Done;
            return Ok(None);
        }
        if self.reader.remaining() < layout::RECORD_HEADER_LEN {
            let dangling = self.reader.read_rest().len();
            warn!(
                offset = self.reader.offset() - dangling,
                bytes = dangling,
                "capture ends with a partial record header"
            );
            self.stats.dangling_bytes = dangling as u64;
            self.state = WalkState::Done;
            return Ok(None);
        }

        self.frame += 1;
        self.stats.frames_total += 1;
        let outcome = match self.decode_frame() {
            Ok(outcome) => outcome,
            Err(DecodeError::UnsupportedProtocol {
                frame,
                layer,
                offset,
                found,
            }) if self.config.on_mismatch == MismatchPolicy::SkipFrame => {
                debug!(frame, %layer, offset, %found, "skipping frame with unsupported protocol");
                self.stats.frames_skipped += 1;
                FrameOutcome::Skipped
            }
            Err(err) => return Err(err),
        };
        Ok(Some(outcome))
    }

    fn decode_frame(&mut self) -> Result<FrameOutcome, DecodeError> {
        let frame = self.frame;
        let header = self.header.as_ref().ok_or_else(|| DecodeError::InvalidCapture {
            offset: self.reader.offset(),
            reason: "frame read before the global header".to_string(),
        })?;

        let (record, mut data) = parse_frame_record(&mut self.reader, header, frame)?;
        update_ts_bounds(&mut self.stats, record.timestamp(header));

        let ethernet = parse_ethernet(&mut data, frame)?;
        let ipv4 = parse_ipv4(&mut data, frame)?;
        let tcp = parse_tcp(&mut data, frame)?;
        let extraction = extract_payload(&mut data, &record, &ipv4, &tcp, self.config, frame)?;

        debug!(
            frame,
            src = %format!("{}:{}", ipv4.source, tcp.source_port),
            dst = %format!("{}:{}", ipv4.destination, tcp.destination_port),
            mac_dst = %ethernet.destination,
            seq = tcp.sequence,
            "frame decoded"
        );
        self.account_tail(&record, &extraction, frame);
        self.store(extraction.outcome, frame)
    }

    fn account_tail(&mut self, record: &FrameRecord, extraction: &Extraction, frame: u64) {
        match extraction.filler {
            Filler::NotExpected => {}
            Filler::Consumed(_) => self.stats.frames_padded += 1,
            Filler::Missing {
                expected,
                available,
            } => {
                self.stats.padding_unverified += 1;
                warn!(
                    frame,
                    captured_len = record.captured_len,
                    expected,
                    available,
                    "frame length is in the padding table but the filler is missing"
                );
            }
        }
        if extraction.trailer_len > 0 {
            self.stats.unaccounted_trailers += 1;
            debug!(
                frame,
                captured_len = record.captured_len,
                trailer = extraction.trailer_len,
                "frame carries bytes past the datagram that no rule accounts for"
            );
        }
    }

    fn store(&mut self, outcome: PayloadOutcome, frame: u64) -> Result<FrameOutcome, DecodeError> {
        match outcome {
            PayloadOutcome::Empty => {
                self.stats.frames_empty += 1;
                Ok(FrameOutcome::Empty)
            }
            PayloadOutcome::Filtered { len } => {
                self.stats.frames_filtered += 1;
                Ok(FrameOutcome::Filtered { len })
            }
            PayloadOutcome::Fragment(fragment) => {
                let sequence = fragment.sequence;
                let len = fragment.content.len();
                match self.assembler.insert(fragment) {
                    Ok(InsertOutcome::Stored) => {
                        self.stats.frames_stored += 1;
                        Ok(FrameOutcome::Stored { sequence, len })
                    }
                    Ok(InsertOutcome::Replaced | InsertOutcome::Ignored) => {
                        self.stats.frames_duplicate += 1;
                        debug!(frame, sequence, "duplicate sequence number");
                        Ok(FrameOutcome::Duplicate { sequence })
                    }
                    Err(dup) => Err(DecodeError::DuplicateSequence {
                        frame,
                        sequence: dup.sequence,
                    }),
                }
            }
        }
    }

    fn finish(self) -> Reassembly {
        let stream: AssembledStream = self.assembler.finalize();
        let stats = self.stats;
        let summary = CaptureSummary {
            frames_total: stats.frames_total,
            frames_stored: stats.frames_stored,
            frames_duplicate: stats.frames_duplicate,
            frames_filtered: stats.frames_filtered,
            frames_empty: stats.frames_empty,
            frames_skipped: stats.frames_skipped,
            frames_padded: stats.frames_padded,
            padding_unverified: stats.padding_unverified,
            unaccounted_trailers: stats.unaccounted_trailers,
            dangling_bytes: stats.dangling_bytes,
            fragments: stream.fragment_count() as u64,
            stream_bytes: stream.len() as u64,
            time_start: ts_to_rfc3339(stats.first_ts),
            time_end: ts_to_rfc3339(stats.last_ts),
        };
        info!(
            frames = summary.frames_total,
            fragments = summary.fragments,
            bytes = summary.stream_bytes,
            "capture walk complete"
        );
        Reassembly { stream, summary }
    }
}

/// Walk an in-memory capture.
///
/// # Examples
/// ```
/// use streamshark_core::{DecodeError, ReassemblyConfig, reassemble};
///
/// let err = reassemble(&[0u8; 8], &ReassemblyConfig::default()).unwrap_err();
/// assert!(matches!(err, DecodeError::InvalidCapture { .. }));
/// ```
///
/// # Errors
/// The first fatal decode error.
pub fn reassemble(capture: &[u8], config: &ReassemblyConfig) -> Result<Reassembly, DecodeError> {
    CaptureWalker::new(capture, config).run()
}

/// Read a capture file into memory and walk it.
///
/// # Errors
/// `DecodeError::Io` when the file cannot be read, otherwise as [`reassemble`].
pub fn reassemble_capture_file(
    path: &Path,
    config: &ReassemblyConfig,
) -> Result<Reassembly, DecodeError> {
    let capture = std::fs::read(path)?;
    debug!(path = %path.display(), bytes = capture.len(), "capture loaded");
    reassemble(&capture, config)
}

fn update_ts_bounds(stats: &mut WalkStats, ts: f64) {
    if stats.first_ts.is_none_or(|first| ts < first) {
        stats.first_ts = Some(ts);
    }
    if stats.last_ts.is_none_or(|last| ts > last) {
        stats.last_ts = Some(ts);
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}
