//! Block-structured (pcapng) capture format.
//!
//! A block-structured file is a linear sequence of typed, length-prefixed
//! blocks, organized in sections. Each section starts with a Section Header
//! Block (SHB) whose byte-order magic declares the endianness of every block
//! that follows, until the next SHB.
//!
//! Only the blocks needed for frame extraction are parsed in full: section
//! headers, interface descriptions, enhanced packets and simple packets.
//! Every other block type is captured as [`Block::Unknown`] and skipped.
//!
//! [`read_block_capture`] is the structured reading path. When it fails,
//! the orchestrator falls back to the scanning recovery in
//! [`crate::recover`].

use nom::bytes::streaming::take;
use nom::combinator::map;
use nom::error::{ErrorKind, ParseError};
use nom::multi::many0;
use nom::number::streaming::{be_u32, le_u32};
use nom::{Err, IResult, Needed};
use rusticata_macros::{align32, newtype_enum};

use crate::endianness::{BlockBE, BlockEndianness, BlockLE};
use crate::error::FramingError;

mod blocks;
mod capture;
pub use blocks::*;
pub use capture::*;

/// Section Header Block type
pub const SHB_MAGIC: u32 = 0x0A0D_0D0A;
/// Interface Description Block type
pub const IDB_MAGIC: u32 = 0x0000_0001;
/// Simple Packet Block type
pub const SPB_MAGIC: u32 = 0x0000_0003;
/// Enhanced Packet Block type
pub const EPB_MAGIC: u32 = 0x0000_0006;
/// Byte-order magic carried by the SHB
pub const BOM_MAGIC: u32 = 0x1A2B_3C4D;

#[derive(Clone, Copy, Eq, PartialEq)]
pub struct OptionCode(pub u16);

newtype_enum! {
impl debug OptionCode {
    EndOfOpt = 0,
    Comment = 1,
    IfTsresol = 9,
    IfTsoffset = 14,
}
}

/// One block option (code, declared length, padded value)
#[derive(Debug)]
pub struct BlockOption<'a> {
    pub code: OptionCode,
    pub len: u16,
    /// Raw value, including the 32-bit alignment padding
    pub value: &'a [u8],
}

/// A block from a block-structured capture file
#[derive(Debug)]
pub enum Block<'a> {
    SectionHeader(SectionHeaderBlock<'a>),
    InterfaceDescription(InterfaceDescriptionBlock<'a>),
    EnhancedPacket(EnhancedPacketBlock<'a>),
    SimplePacket(SimplePacketBlock<'a>),
    Unknown(UnknownBlock<'a>),
}

// Inner parser for one block type: the generic machinery has already checked
// the type and length and stripped the enclosing type/len1/len2 layout.
pub(crate) trait BlockParse<'a, En: BlockEndianness, O: 'a> {
    /// Minimum total block size, in bytes
    const MIN_SZ: usize;
    /// Native block type, or 0 to accept any type
    const MAGIC: u32;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], O, E>;
}

/// Build a parser for one block type, reading the common block layout
/// (type, total length, content, trailing total length).
pub(crate) fn block_parser<'a, P, En, O, E>() -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O, E>
where
    P: BlockParse<'a, En, O>,
    En: BlockEndianness,
    O: 'a,
    E: ParseError<&'a [u8]>,
{
    move |i: &[u8]| {
        if i.len() < P::MIN_SZ {
            return Err(Err::Incomplete(Needed::new(P::MIN_SZ - i.len())));
        }
        let (i, block_type) = le_u32(i)?;
        let (i, block_len1) = En::parse_u32(i)?;
        if (block_len1 as usize) < P::MIN_SZ {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
        }
        if P::MAGIC != 0 && En::native_u32(block_type) != P::MAGIC {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
        }
        // 12 = block_type (4) + leading length (4) + trailing length (4)
        let (i, content) = take(block_len1 - 12)(i)?;
        let (i, block_len2) = En::parse_u32(i)?;
        let (_, block) = P::inner_parse(block_type, block_len1, content, block_len2)?;
        Ok((i, block))
    }
}

pub(crate) fn parse_option<'i, En: BlockEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
) -> IResult<&'i [u8], BlockOption<'i>, E> {
    let (i, code) = En::parse_u16(i)?;
    let (i, len) = En::parse_u16(i)?;
    let (i, value) = take(align32!(len as u32))(i)?;
    let option = BlockOption {
        code: OptionCode(code),
        len,
        value,
    };
    Ok((i, option))
}

// Parse the option list occupying `block_len - opt_offset` bytes, if any.
pub(crate) fn parse_options<'i, En: BlockEndianness, E: ParseError<&'i [u8]>>(
    i: &'i [u8],
    block_len: usize,
    opt_offset: usize,
) -> IResult<&'i [u8], Vec<BlockOption<'i>>, E> {
    if block_len > opt_offset {
        let (i, raw) = take(block_len - opt_offset)(i)?;
        let (_, options) = many0(nom::combinator::complete(parse_option::<En, E>))(raw)?;
        Ok((i, options))
    } else {
        Ok((i, Vec::new()))
    }
}

/// Decode an interface's timestamp resolution, in units per second.
///
/// Returns `None` when the declared resolution does not fit a `u64`.
pub fn ts_resolution_units(if_tsresol: u8) -> Option<u64> {
    if if_tsresol & 0x80 == 0 {
        // 10^if_tsresol; 10^19 is the largest power of 10 fitting a u64
        if if_tsresol > 19 {
            return None;
        }
        Some(10u64.pow(if_tsresol as u32))
    } else {
        // 2^(if_tsresol & 0x7f)
        let shift = if_tsresol & 0x7f;
        if shift > 63 {
            return None;
        }
        Some(1 << shift)
    }
}

/// Decode an enhanced-packet timestamp to seconds since epoch.
///
/// `units` is the interface resolution in units per second, `offset` the
/// interface timestamp offset in seconds.
pub fn ts_to_f64(ts_high: u32, ts_low: u32, offset: u64, units: u64) -> f64 {
    let ts = ((ts_high as u64) << 32) | (ts_low as u64);
    let sec = offset + ts / units;
    let frac = ts % units;
    sec as f64 + frac as f64 / units as f64
}

/// Parse any block, little-endian.
///
/// Section Header Blocks self-describe their endianness and are accepted in
/// either byte order.
pub fn parse_block_le(i: &[u8]) -> IResult<&[u8], Block, FramingError> {
    match le_u32(i) {
        Ok((_, id)) => match id {
            SHB_MAGIC => map(parse_section_header, Block::SectionHeader)(i),
            IDB_MAGIC => map(
                block_parser::<InterfaceDescriptionBlock, BlockLE, _, _>(),
                Block::InterfaceDescription,
            )(i),
            EPB_MAGIC => map(
                block_parser::<EnhancedPacketBlock, BlockLE, _, _>(),
                Block::EnhancedPacket,
            )(i),
            SPB_MAGIC => map(
                block_parser::<SimplePacketBlock, BlockLE, _, _>(),
                Block::SimplePacket,
            )(i),
            _ => map(block_parser::<UnknownBlock, BlockLE, _, _>(), Block::Unknown)(i),
        },
        Err(e) => Err(e),
    }
}

/// Parse any block, big-endian.
pub fn parse_block_be(i: &[u8]) -> IResult<&[u8], Block, FramingError> {
    match be_u32(i) {
        Ok((_, id)) => match id {
            SHB_MAGIC => map(parse_section_header, Block::SectionHeader)(i),
            IDB_MAGIC => map(
                block_parser::<InterfaceDescriptionBlock, BlockBE, _, _>(),
                Block::InterfaceDescription,
            )(i),
            EPB_MAGIC => map(
                block_parser::<EnhancedPacketBlock, BlockBE, _, _>(),
                Block::EnhancedPacket,
            )(i),
            SPB_MAGIC => map(
                block_parser::<SimplePacketBlock, BlockBE, _, _>(),
                Block::SimplePacket,
            )(i),
            _ => map(block_parser::<UnknownBlock, BlockBE, _, _>(), Block::Unknown)(i),
        },
        Err(e) => Err(e),
    }
}
