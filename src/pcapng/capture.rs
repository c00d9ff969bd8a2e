use log::{debug, warn};
use nom::{Err, Offset};

use crate::error::FramingError;
use crate::frame::{FormatInfo, Frame, InterfaceInfo};
use crate::sniff::{ByteOrder, FormatKind};

use super::{parse_block_be, parse_block_le, ts_resolution_units, ts_to_f64, Block};

/// Frames and metadata extracted from a block-structured capture.
#[derive(Debug, Default)]
pub struct BlockCapture {
    pub frames: Vec<Frame>,
    pub info: FormatInfo,
}

// Per-interface timestamp decoding parameters of the current section
struct IfaceTs {
    units: u64,
    offset: u64,
}

/// Read a complete block-structured capture from memory.
///
/// The input must start with a Section Header Block; its byte-order magic
/// selects the endianness used for the rest of the section. A new SHB starts
/// a new section and resets the interface table, so multi-section files are
/// read in one pass. Unknown block types are skipped.
///
/// Any structural fault (bad length, truncated block, missing SHB) is
/// surfaced as an error; no partial result is returned. Salvaging frames
/// from a damaged stream is the job of [`crate::recover::scan_block_stream`].
pub fn read_block_capture(input: &[u8]) -> Result<BlockCapture, FramingError> {
    let mut frames = Vec::new();
    let mut info = FormatInfo {
        kind: FormatKind::BlockStructured,
        ..FormatInfo::default()
    };
    // reset at each SHB
    let mut ifaces: Vec<IfaceTs> = Vec::new();
    let mut big_endian = false;
    let mut iface_count: u32 = 0;
    let mut seen_shb = false;

    let mut rem = input;
    while !rem.is_empty() {
        let parse = if big_endian {
            parse_block_be
        } else {
            parse_block_le
        };
        let (next, block) = match parse(rem) {
            Ok(x) => x,
            // too short to even hold a section header
            Err(Err::Incomplete(_)) if !seen_shb => return Err(FramingError::UnexpectedEof),
            Err(e) => return Err(FramingError::from(e)),
        };
        match block {
            Block::SectionHeader(shb) => {
                seen_shb = true;
                big_endian = shb.big_endian();
                ifaces.clear();
                info.byte_order = Some(if big_endian {
                    ByteOrder::Big
                } else {
                    ByteOrder::Little
                });
                info.version = Some(format!("{}.{}", shb.major_version, shb.minor_version));
                debug!(
                    "section header v{}.{} ({})",
                    shb.major_version,
                    shb.minor_version,
                    if big_endian {
                        "big-endian"
                    } else {
                        "little-endian"
                    }
                );
            }
            Block::InterfaceDescription(idb) if seen_shb => {
                let units = ts_resolution_units(idb.if_tsresol).unwrap_or_else(|| {
                    warn!(
                        "interface {}: unsupported timestamp resolution {:#x}, using microseconds",
                        iface_count, idb.if_tsresol
                    );
                    1_000_000
                });
                ifaces.push(IfaceTs {
                    units,
                    offset: idb.if_tsoffset.max(0) as u64,
                });
                info.interfaces.push(InterfaceInfo {
                    id: iface_count,
                    snaplen: idb.snaplen,
                    linktype: idb.linktype,
                });
                if info.linktype.is_none() {
                    info.linktype = Some(idb.linktype);
                    info.snaplen = Some(idb.snaplen);
                }
                iface_count += 1;
            }
            Block::EnhancedPacket(epb) if seen_shb => {
                let (units, offset) = match ifaces.get(epb.if_id as usize) {
                    Some(t) => (t.units, t.offset),
                    None => {
                        debug!(
                            "packet references undeclared interface {}, assuming microseconds",
                            epb.if_id
                        );
                        (1_000_000, 0)
                    }
                };
                frames.push(Frame {
                    payload: epb.packet_data().to_vec(),
                    timestamp: ts_to_f64(epb.ts_high, epb.ts_low, offset, units),
                    interface_id: epb.if_id,
                });
            }
            Block::SimplePacket(spb) if seen_shb => {
                // no timestamp and no interface id in this block type
                frames.push(Frame {
                    payload: spb.packet_data().to_vec(),
                    timestamp: 0.0,
                    interface_id: 0,
                });
            }
            Block::Unknown(blk) if seen_shb => {
                debug!(
                    "skipping unknown block type {:#010x} ({} bytes)",
                    blk.block_type, blk.block_len1
                );
            }
            _ => return Err(FramingError::HeaderNotRecognized),
        }
        debug_assert!(input.offset(next) > input.offset(rem));
        rem = next;
    }
    if !seen_shb {
        return Err(FramingError::HeaderNotRecognized);
    }
    Ok(BlockCapture { frames, info })
}
