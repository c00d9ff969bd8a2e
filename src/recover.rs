//! Scanning recovery for damaged block-structured captures.
//!
//! When the structured reader rejects a stream, this module walks the raw
//! bytes looking for things shaped like enhanced packet blocks and pulls
//! their payloads out. It trusts as little of the framing as possible: only
//! the little-endian block type and length words, and only while the length
//! keeps the scan inside the buffer.
//!
//! Frames found this way are best-effort. Field offsets are read relative to
//! the start of the candidate block rather than its body, so timestamps and
//! lengths can be off for well-formed blocks; the value of this path is
//! extracting payload bytes from streams the structured reader cannot read
//! at all, not metadata fidelity.

use log::debug;

use crate::frame::Frame;
use crate::pcapng::EPB_MAGIC;

/// Outcome of a scanning pass over a damaged stream.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Frames salvaged from blocks that looked like enhanced packets
    pub frames: Vec<Frame>,
    /// Candidate packet blocks that could not be salvaged
    pub skipped: usize,
}

fn le_u32_at(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// Scan a byte stream for enhanced-packet-shaped blocks and salvage their
/// payloads.
///
/// The walk advances by each candidate's declared length (rounded up to the
/// 32-bit alignment the format mandates) and stops as soon as a length of
/// zero or one pointing past the end of the buffer is seen; a single corrupt
/// length ends the scan rather than sending it into garbage. An empty report
/// is not an error here; the caller decides what zero salvaged frames means.
pub fn scan_block_stream(data: &[u8]) -> ScanReport {
    let mut report = ScanReport::default();
    let mut pos = 0usize;
    while pos + 16 <= data.len() {
        let block_type = le_u32_at(data, pos);
        let block_len = le_u32_at(data, pos + 4) as usize;
        if block_len == 0 || block_len > data.len() - pos {
            debug!(
                "scan stopped at offset {}: implausible block length {}",
                pos, block_len
            );
            break;
        }
        if block_type == EPB_MAGIC && block_len >= 32 {
            match salvage_packet(data, pos) {
                Some(frame) => report.frames.push(frame),
                None => {
                    debug!("unsalvageable packet block at offset {}", pos);
                    report.skipped += 1;
                }
            }
        }
        pos += block_len;
        // blocks are 32-bit aligned
        pos = (pos + 3) & !3;
    }
    report
}

// Pull the payload out of one candidate block. Offsets are relative to the
// block start, matching the salvage heuristic rather than the block layout.
fn salvage_packet(data: &[u8], pos: usize) -> Option<Frame> {
    let ts_high = le_u32_at(data, pos + 8) as u64;
    let ts_low = le_u32_at(data, pos + 12) as u64;
    let caplen = le_u32_at(data, pos + 12) as usize;
    let start = pos + 16;
    let end = start.checked_add(caplen)?;
    if end > data.len() {
        return None;
    }
    Some(Frame {
        payload: data[start..end].to_vec(),
        timestamp: ((ts_high << 32) | ts_low) as f64 / 1e6,
        interface_id: 0,
    })
}
