//! Fault-tolerant parser for network capture containers.
//!
//! This crate reads the two common capture container formats, the classic
//! sequential-record format and the modern block-structured (pcapng) format,
//! and extracts their frames even when the file is damaged. The design goal
//! is that no input, however malformed, causes a panic: every failure mode
//! is a typed error, and common kinds of damage degrade instead of failing.
//!
//! # Degraded modes
//!
//! - A classic capture whose last record is cut short yields that record
//!   zero-padded to its declared length, with a `recovered` count of 1.
//! - A block-structured stream the structured reader rejects is re-scanned
//!   for salvageable packet blocks ([`scan_block_stream`]); whatever is
//!   found replaces the failed read.
//!
//! Strict mode ([`ParseOptions`]) turns both of these into hard errors.
//!
//! # Example
//!
//! ```rust
//! use pcap_salvage::{parse_capture, FormatKind};
//!
//! // classic little-endian capture with one 4-byte record
//! let mut data = vec![
//!     0xd4, 0xc3, 0xb2, 0xa1, 0x02, 0x00, 0x04, 0x00,
//!     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0xff, 0xff, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
//! ];
//! data.extend_from_slice(&[
//!     0x00, 0x94, 0x35, 0x77, 0x00, 0x00, 0x00, 0x00,
//!     0x04, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
//!     0xde, 0xad, 0xbe, 0xef,
//! ]);
//!
//! let parsed = parse_capture(&data).expect("valid capture");
//! assert_eq!(parsed.format.kind, FormatKind::Classic);
//! assert_eq!(parsed.frames.len(), 1);
//! assert_eq!(parsed.frames[0].payload, [0xde, 0xad, 0xbe, 0xef]);
//! assert_eq!(parsed.recovered, 0);
//! ```
//!
//! The lower layers are public as well: [`pcap`] and [`pcapng`] expose the
//! per-format nom parsers and readers for callers that want finer control
//! than [`CaptureParser`] offers, for example streaming a large classic file
//! through [`pcap::ClassicReader`] with a bounded buffer.

#![forbid(unsafe_code)]

mod endianness;
mod error;
mod frame;
mod linktype;
mod parser;
mod recover;
mod sniff;

pub mod pcap;
pub mod pcapng;

pub use error::{CaptureError, FramingError};
pub use frame::{FormatInfo, Frame, InterfaceInfo};
pub use linktype::Linktype;
pub use parser::{parse_capture, parse_capture_file, CaptureParser, ParseOptions, ParsedCapture};
pub use recover::{scan_block_stream, ScanReport};
pub use sniff::{sniff_format, ByteOrder, FormatHint, FormatKind};
