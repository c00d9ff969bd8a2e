use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::error::{CaptureError, FramingError};
use crate::frame::{FormatInfo, Frame};
use crate::pcap::ClassicReader;
use crate::pcapng::read_block_capture;
use crate::recover::scan_block_stream;
use crate::sniff::{sniff_format, ByteOrder, FormatKind};

/// Parsing policy knobs.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Fail on damage instead of degrading: truncated classic records are
    /// errors rather than zero-padded frames, and the scanning fallback for
    /// block-structured streams is disabled.
    pub strict: bool,
}

/// Result of parsing one capture, whichever path produced it.
#[derive(Debug)]
pub struct ParsedCapture {
    pub frames: Vec<Frame>,
    pub format: FormatInfo,
    /// Number of frames obtained through a degraded path: zero-padded
    /// classic records, or all frames when the scanning fallback ran.
    pub recovered: usize,
}

/// Format-detecting capture parser with degraded-mode fallbacks.
///
/// [`parse`] sniffs the leading magic and dispatches to the right reader.
/// Damage tolerance is layered: the classic reader zero-pads a truncated
/// trailing record, and a block-structured stream the structured reader
/// rejects is re-scanned for salvageable packet blocks. Every failure mode
/// is a typed [`CaptureError`]; malformed input never panics.
///
/// [`parse`]: CaptureParser::parse
#[derive(Clone, Copy, Debug, Default)]
pub struct CaptureParser {
    options: ParseOptions,
}

impl CaptureParser {
    pub fn new() -> CaptureParser {
        CaptureParser::default()
    }

    pub fn with_options(options: ParseOptions) -> CaptureParser {
        CaptureParser { options }
    }

    /// Read and parse a capture file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedCapture, CaptureError> {
        let data = fs::read(path)?;
        self.parse(&data)
    }

    /// Parse a capture held in memory.
    pub fn parse(&self, data: &[u8]) -> Result<ParsedCapture, CaptureError> {
        let hint = sniff_format(data);
        match hint.kind {
            FormatKind::Classic | FormatKind::ClassicNanosecond => {
                match self.parse_classic(data) {
                    Ok(parsed) => Ok(parsed),
                    Err(e) => {
                        warn!("classic reader failed: {}", e);
                        // retry with full autodetection before giving up;
                        // if that fails too, the structural error wins
                        self.parse_autodetect(data)
                            .map_err(|_| CaptureError::Structure(e))
                    }
                }
            }
            FormatKind::BlockStructured => self.parse_block(data),
            FormatKind::UnknownWireless => {
                warn!("unsupported wireless capture magic, trying autodetection");
                self.parse_autodetect(data)
            }
            FormatKind::Unrecognized => Err(CaptureError::UnknownFormat),
        }
    }

    fn parse_classic(&self, data: &[u8]) -> Result<ParsedCapture, FramingError> {
        // one in-memory pass, so the buffer can hold the whole input
        let capacity = data.len().max(1024);
        let mut reader = if self.options.strict {
            ClassicReader::new_strict(capacity, data)?
        } else {
            ClassicReader::new(capacity, data)?
        };
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame()? {
            frames.push(frame);
        }
        let header = reader.header();
        let kind = if header.is_nanosecond() {
            FormatKind::ClassicNanosecond
        } else {
            FormatKind::Classic
        };
        let format = FormatInfo {
            kind,
            byte_order: Some(if header.is_bigendian() {
                ByteOrder::Big
            } else {
                ByteOrder::Little
            }),
            magic: Some(format!("{:#010x}", header.canonical_magic())),
            version: Some(format!("{}.{}", header.version_major, header.version_minor)),
            snaplen: Some(header.snaplen),
            linktype: Some(header.network),
            interfaces: Vec::new(),
        };
        let recovered = reader.recovered();
        info!(
            "classic capture: {} frames ({} recovered)",
            frames.len(),
            recovered
        );
        Ok(ParsedCapture {
            frames,
            format,
            recovered,
        })
    }

    fn parse_block(&self, data: &[u8]) -> Result<ParsedCapture, CaptureError> {
        match read_block_capture(data) {
            Ok(cap) => {
                info!("block capture: {} frames", cap.frames.len());
                Ok(ParsedCapture {
                    frames: cap.frames,
                    format: cap.info,
                    recovered: 0,
                })
            }
            Err(e) if self.options.strict => Err(CaptureError::Structure(e)),
            Err(e) => {
                warn!(
                    "structured read failed ({}), scanning for salvageable packets",
                    e
                );
                let report = scan_block_stream(data);
                if report.frames.is_empty() {
                    return Err(CaptureError::NoRecognizableFrames);
                }
                let recovered = report.frames.len();
                info!(
                    "salvaged {} frames ({} candidates skipped)",
                    recovered, report.skipped
                );
                Ok(ParsedCapture {
                    frames: report.frames,
                    format: FormatInfo {
                        kind: FormatKind::BlockStructured,
                        ..FormatInfo::default()
                    },
                    recovered,
                })
            }
        }
    }

    // Last-resort dispatch used when the first reader choice fails: re-sniff
    // and run whatever reader the magic selects.
    fn parse_autodetect(&self, data: &[u8]) -> Result<ParsedCapture, CaptureError> {
        match sniff_format(data).kind {
            FormatKind::BlockStructured => self.parse_block(data),
            FormatKind::Classic | FormatKind::ClassicNanosecond => {
                self.parse_classic(data).map_err(CaptureError::from)
            }
            _ => Err(CaptureError::UnknownFormat),
        }
    }
}

/// Parse an in-memory capture with the default options.
pub fn parse_capture(data: &[u8]) -> Result<ParsedCapture, CaptureError> {
    CaptureParser::new().parse(data)
}

/// Parse a capture file with the default options.
pub fn parse_capture_file<P: AsRef<Path>>(path: P) -> Result<ParsedCapture, CaptureError> {
    CaptureParser::new().parse_file(path)
}
