use nom::error::{ErrorKind, ParseError};
use nom::number::streaming::{be_i64, be_u16, le_i64, le_u16, le_u32};
use nom::{Err, IResult, Needed};
use rusticata_macros::align32;

use crate::endianness::{BlockBE, BlockEndianness, BlockLE};
use crate::error::FramingError;
use crate::linktype::Linktype;

use super::{
    block_parser, parse_options, take, BlockOption, BlockParse, OptionCode, BOM_MAGIC, EPB_MAGIC,
    IDB_MAGIC, SHB_MAGIC, SPB_MAGIC,
};

/// Section Header Block: starts a section and declares its endianness.
#[derive(Debug)]
pub struct SectionHeaderBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Byte-order magic, as read little-endian
    pub bom: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// Declared section length; -1 when unspecified
    pub section_len: i64,
    pub options: Vec<BlockOption<'a>>,
    pub block_len2: u32,
}

impl<'a> SectionHeaderBlock<'a> {
    pub fn big_endian(&self) -> bool {
        self.bom != BOM_MAGIC
    }
}

impl<'a> BlockParse<'a, BlockLE, SectionHeaderBlock<'a>> for SectionHeaderBlock<'a> {
    const MIN_SZ: usize = 28;
    const MAGIC: u32 = SHB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SectionHeaderBlock<'a>, E> {
        let (i, bom) = le_u32(i)?;
        let (i, major_version) = le_u16(i)?;
        let (i, minor_version) = le_u16(i)?;
        let (i, section_len) = le_i64(i)?;
        let (i, options) = parse_options::<BlockLE, E>(i, block_len1 as usize, 28)?;
        let block = SectionHeaderBlock {
            block_type,
            block_len1,
            bom,
            major_version,
            minor_version,
            section_len,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

impl<'a> BlockParse<'a, BlockBE, SectionHeaderBlock<'a>> for SectionHeaderBlock<'a> {
    const MIN_SZ: usize = 28;
    const MAGIC: u32 = SHB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SectionHeaderBlock<'a>, E> {
        let (i, bom) = le_u32(i)?;
        let (i, major_version) = be_u16(i)?;
        let (i, minor_version) = be_u16(i)?;
        let (i, section_len) = be_i64(i)?;
        let (i, options) = parse_options::<BlockBE, E>(i, block_len1 as usize, 28)?;
        let block = SectionHeaderBlock {
            block_type,
            block_len1,
            bom,
            major_version,
            minor_version,
            section_len,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Parse a Section Header Block, resolving its endianness from the
/// byte-order magic.
pub fn parse_section_header(i: &[u8]) -> IResult<&[u8], SectionHeaderBlock, FramingError> {
    if i.len() < 12 {
        return Err(Err::Incomplete(Needed::new(12 - i.len())));
    }
    let bom = u32::from_le_bytes([i[8], i[9], i[10], i[11]]);
    if bom == BOM_MAGIC {
        block_parser::<SectionHeaderBlock, BlockLE, _, _>()(i)
    } else if bom == BOM_MAGIC.swap_bytes() {
        block_parser::<SectionHeaderBlock, BlockBE, _, _>()(i)
    } else {
        Err(Err::Error(FramingError::HeaderNotRecognized))
    }
}

/// Interface Description Block: one capture interface of the section.
#[derive(Debug)]
pub struct InterfaceDescriptionBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    pub linktype: Linktype,
    pub reserved: u16,
    pub snaplen: u32,
    pub options: Vec<BlockOption<'a>>,
    pub block_len2: u32,
    /// Raw `if_tsresol` option value (default 6: microseconds)
    pub if_tsresol: u8,
    /// Raw `if_tsoffset` option value, in seconds (default 0)
    pub if_tsoffset: i64,
}

// Timestamp parameters from the option list, with the defaults mandated by
// the format when the options are absent.
fn iface_ts_parameters(options: &[BlockOption]) -> (u8, i64) {
    let mut if_tsresol: u8 = 6;
    let mut if_tsoffset: i64 = 0;
    for opt in options {
        match opt.code {
            OptionCode::IfTsresol => {
                if let Some(&v) = opt.value.first() {
                    if_tsresol = v;
                }
            }
            OptionCode::IfTsoffset => {
                if opt.value.len() >= 8 {
                    let mut w = [0u8; 8];
                    w.copy_from_slice(&opt.value[..8]);
                    if_tsoffset = i64::from_le_bytes(w);
                }
            }
            _ => (),
        }
    }
    (if_tsresol, if_tsoffset)
}

impl<'a, En: BlockEndianness> BlockParse<'a, En, InterfaceDescriptionBlock<'a>>
    for InterfaceDescriptionBlock<'a>
{
    const MIN_SZ: usize = 20;
    const MAGIC: u32 = IDB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], InterfaceDescriptionBlock<'a>, E> {
        let (i, linktype) = En::parse_u16(i)?;
        let (i, reserved) = En::parse_u16(i)?;
        let (i, snaplen) = En::parse_u32(i)?;
        let (i, options) = parse_options::<En, E>(i, block_len1 as usize, 20)?;
        if block_len2 != block_len1 {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
        }
        let (if_tsresol, if_tsoffset) = iface_ts_parameters(&options);
        let block = InterfaceDescriptionBlock {
            block_type,
            block_len1,
            linktype: Linktype(linktype as i32),
            reserved,
            snaplen,
            options,
            block_len2,
            if_tsresol,
            if_tsoffset,
        };
        Ok((i, block))
    }
}

/// Enhanced Packet Block: the standard container for one captured frame.
#[derive(Debug)]
pub struct EnhancedPacketBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Index of the interface the frame was captured on
    pub if_id: u32,
    pub ts_high: u32,
    pub ts_low: u32,
    /// Captured length
    pub caplen: u32,
    /// Original length on the network
    pub origlen: u32,
    /// Raw packet bytes, with the 32-bit alignment padding
    pub data: &'a [u8],
    pub options: Vec<BlockOption<'a>>,
    pub block_len2: u32,
}

impl<'a> EnhancedPacketBlock<'a> {
    /// Packet bytes limited to the captured length (padding stripped)
    pub fn packet_data(&self) -> &'a [u8] {
        let caplen = self.caplen as usize;
        if caplen < self.data.len() {
            &self.data[..caplen]
        } else {
            self.data
        }
    }
}

impl<'a, En: BlockEndianness> BlockParse<'a, En, EnhancedPacketBlock<'a>>
    for EnhancedPacketBlock<'a>
{
    const MIN_SZ: usize = 32;
    const MAGIC: u32 = EPB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], EnhancedPacketBlock<'a>, E> {
        let (i, if_id) = En::parse_u32(i)?;
        let (i, ts_high) = En::parse_u32(i)?;
        let (i, ts_low) = En::parse_u32(i)?;
        let (i, caplen) = En::parse_u32(i)?;
        let (i, origlen) = En::parse_u32(i)?;
        // align32 would overflow on a corrupt length
        if caplen >= u32::MAX - 4 {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
        }
        let padded = align32!(caplen);
        let (i, data) = take(padded)(i)?;
        let (i, options) = parse_options::<En, E>(i, block_len1 as usize, 32 + padded as usize)?;
        if block_len2 != block_len1 {
            return Err(Err::Error(E::from_error_kind(i, ErrorKind::Verify)));
        }
        let block = EnhancedPacketBlock {
            block_type,
            block_len1,
            if_id,
            ts_high,
            ts_low,
            caplen,
            origlen,
            data,
            options,
            block_len2,
        };
        Ok((i, block))
    }
}

/// Simple Packet Block: a minimal packet container with no timestamp,
/// no interface id and no captured length (implied by the block length
/// and the interface snaplen).
#[derive(Debug)]
pub struct SimplePacketBlock<'a> {
    pub block_type: u32,
    pub block_len1: u32,
    /// Original length on the network
    pub origlen: u32,
    /// Raw packet bytes, with the 32-bit alignment padding
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a> SimplePacketBlock<'a> {
    /// Packet bytes limited to the original length when it is shorter than
    /// the stored data (padding stripped)
    pub fn packet_data(&self) -> &'a [u8] {
        let origlen = self.origlen as usize;
        if origlen < self.data.len() {
            &self.data[..origlen]
        } else {
            self.data
        }
    }
}

impl<'a, En: BlockEndianness> BlockParse<'a, En, SimplePacketBlock<'a>> for SimplePacketBlock<'a> {
    const MIN_SZ: usize = 16;
    const MAGIC: u32 = SPB_MAGIC;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], SimplePacketBlock<'a>, E> {
        let (data, origlen) = En::parse_u32(i)?;
        if block_len2 != block_len1 {
            return Err(Err::Error(E::from_error_kind(data, ErrorKind::Verify)));
        }
        let block = SimplePacketBlock {
            block_type,
            block_len1,
            origlen,
            data,
            block_len2,
        };
        Ok((&[], block))
    }
}

/// A block whose type is not needed for frame extraction; kept as raw bytes
/// and skipped by the readers.
#[derive(Debug)]
pub struct UnknownBlock<'a> {
    /// Block type, as read little-endian
    pub block_type: u32,
    pub block_len1: u32,
    pub data: &'a [u8],
    pub block_len2: u32,
}

impl<'a, En: BlockEndianness> BlockParse<'a, En, UnknownBlock<'a>> for UnknownBlock<'a> {
    const MIN_SZ: usize = 12;
    const MAGIC: u32 = 0;

    fn inner_parse<E: ParseError<&'a [u8]>>(
        block_type: u32,
        block_len1: u32,
        i: &'a [u8],
        block_len2: u32,
    ) -> IResult<&'a [u8], UnknownBlock<'a>, E> {
        let block = UnknownBlock {
            block_type,
            block_len1,
            data: i,
            block_len2,
        };
        Ok((i, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // minimal little-endian SHB, no options
    const SHB_LE: &[u8] = &hex!(
        "
0A 0D 0D 0A 1C 00 00 00 4D 3C 2B 1A 01 00 00 00
FF FF FF FF FF FF FF FF 1C 00 00 00"
    );

    #[test]
    fn parse_shb_le() {
        let (rem, shb) = parse_section_header(SHB_LE).expect("shb");
        assert!(rem.is_empty());
        assert!(!shb.big_endian());
        assert_eq!(shb.major_version, 1);
        assert_eq!(shb.minor_version, 0);
        assert_eq!(shb.section_len, -1);
        assert!(shb.options.is_empty());
    }

    #[test]
    fn parse_shb_be() {
        let data = hex!(
            "
0A 0D 0D 0A 00 00 00 1C 1A 2B 3C 4D 00 01 00 00
FF FF FF FF FF FF FF FF 00 00 00 1C"
        );
        let (rem, shb) = parse_section_header(&data).expect("shb");
        assert!(rem.is_empty());
        assert!(shb.big_endian());
        assert_eq!(shb.major_version, 1);
        assert_eq!(shb.section_len, -1);
    }

    #[test]
    fn parse_shb_bad_bom() {
        let data = hex!(
            "
0A 0D 0D 0A 1C 00 00 00 99 99 99 99 01 00 00 00
FF FF FF FF FF FF FF FF 1C 00 00 00"
        );
        assert!(matches!(
            parse_section_header(&data),
            Err(Err::Error(FramingError::HeaderNotRecognized))
        ));
    }

    #[test]
    fn parse_idb_with_tsresol() {
        // linktype 1, snaplen 65535, if_tsresol = 9 (nanoseconds)
        let data = hex!(
            "
01 00 00 00 1C 00 00 00 01 00 00 00 FF FF 00 00
09 00 01 00 09 00 00 00 1C 00 00 00"
        );
        let mut parser = block_parser::<InterfaceDescriptionBlock, BlockLE, _, FramingError>();
        let (rem, idb) = parser(&data).expect("idb");
        assert!(rem.is_empty());
        assert_eq!(idb.linktype, Linktype::ETHERNET);
        assert_eq!(idb.snaplen, 65_535);
        assert_eq!(idb.if_tsresol, 9);
        assert_eq!(idb.if_tsoffset, 0);
    }

    #[test]
    fn parse_epb_le() {
        // caplen 4, origlen 4, if_id 0, ts 0
        let data = hex!(
            "
06 00 00 00 24 00 00 00 00 00 00 00 00 00 00 00
00 00 00 00 04 00 00 00 04 00 00 00 DE AD BE EF
24 00 00 00"
        );
        let mut parser = block_parser::<EnhancedPacketBlock, BlockLE, _, FramingError>();
        let (rem, epb) = parser(&data).expect("epb");
        assert!(rem.is_empty());
        assert_eq!(epb.caplen, 4);
        assert_eq!(epb.packet_data(), &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn parse_epb_length_mismatch() {
        let data = hex!(
            "
06 00 00 00 24 00 00 00 00 00 00 00 00 00 00 00
00 00 00 00 04 00 00 00 04 00 00 00 DE AD BE EF
28 00 00 00"
        );
        let mut parser = block_parser::<EnhancedPacketBlock, BlockLE, _, FramingError>();
        assert!(parser(&data).is_err());
    }
}
