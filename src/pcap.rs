//! Classic (legacy) capture format.
//!
//! A classic capture file is a 24-byte global header followed by repeated
//! records, each a 16-byte header and a variable-length payload. The global
//! header magic declares the byte order and the timestamp resolution
//! (microsecond or nanosecond).
//!
//! The parsers in this module are streaming: running out of input yields
//! `Incomplete`, never a panic. [`ClassicReader`] builds the record loop on
//! top of them, including the zero-padding recovery for truncated trailing
//! records.

use nom::bytes::streaming::take;
use nom::number::streaming::{be_i32, be_u16, be_u32, le_i32, le_u16, le_u32};
use nom::{Err, IResult, Needed};

use crate::error::FramingError;
use crate::linktype::Linktype;
use crate::sniff::{CLASSIC_MAGIC, CLASSIC_NSEC_MAGIC};

mod reader;
pub use reader::ClassicReader;

/// Size of the global header, in bytes
pub const CLASSIC_HEADER_SIZE: usize = 24;
/// Size of a per-record header, in bytes
pub const RECORD_HEADER_SIZE: usize = 16;

/// Global header of a classic capture file
#[derive(Clone, Debug)]
pub struct ClassicHeader {
    /// File magic. Declares byte order and timestamp resolution.
    pub magic_number: u32,
    pub version_major: u16,
    pub version_minor: u16,
    /// GMT-to-local correction; in practice always 0
    pub thiszone: i32,
    /// Timestamp accuracy; in practice always 0
    pub sigfigs: u32,
    /// Maximum captured length per record, in octets
    pub snaplen: u32,
    /// Data link type
    pub network: Linktype,
}

impl ClassicHeader {
    /// The magic in native order, independent of the on-disk byte order
    pub fn canonical_magic(&self) -> u32 {
        if self.is_bigendian() {
            self.magic_number.swap_bytes()
        } else {
            self.magic_number
        }
    }

    pub fn is_bigendian(&self) -> bool {
        // works for both microsecond and nanosecond magics
        (self.magic_number & 0xffff) == 0xb2a1
    }

    pub fn is_nanosecond(&self) -> bool {
        self.magic_number == CLASSIC_NSEC_MAGIC || self.magic_number == 0x4d3c_b2a1
    }
}

/// One record: 16-byte header plus captured payload
#[derive(Debug)]
pub struct ClassicRecord<'a> {
    pub ts_sec: u32,
    /// Fractional timestamp part; microseconds or nanoseconds per the header
    pub ts_frac: u32,
    /// Number of payload bytes saved in the file
    pub caplen: u32,
    /// Length of the packet as seen on the network
    pub origlen: u32,
    pub data: &'a [u8],
}

/// Parse the 24-byte global header, using the byte order its magic declares.
pub fn parse_classic_header(i: &[u8]) -> IResult<&[u8], ClassicHeader, FramingError> {
    let (_, magic_number) = le_u32(i)?;
    match magic_number {
        CLASSIC_MAGIC | CLASSIC_NSEC_MAGIC => {
            let (i, _) = le_u32(i)?;
            let (i, version_major) = le_u16(i)?;
            let (i, version_minor) = le_u16(i)?;
            let (i, thiszone) = le_i32(i)?;
            let (i, sigfigs) = le_u32(i)?;
            let (i, snaplen) = le_u32(i)?;
            let (i, network) = le_i32(i)?;
            let header = ClassicHeader {
                magic_number,
                version_major,
                version_minor,
                thiszone,
                sigfigs,
                snaplen,
                network: Linktype(network),
            };
            Ok((i, header))
        }
        0xd4c3_b2a1 | 0x4d3c_b2a1 => {
            let (i, _) = le_u32(i)?;
            let (i, version_major) = be_u16(i)?;
            let (i, version_minor) = be_u16(i)?;
            let (i, thiszone) = be_i32(i)?;
            let (i, sigfigs) = be_u32(i)?;
            let (i, snaplen) = be_u32(i)?;
            let (i, network) = be_i32(i)?;
            let header = ClassicHeader {
                // keep the magic as read; accessors key off the raw value
                magic_number,
                version_major,
                version_minor,
                thiszone,
                sigfigs,
                snaplen,
                network: Linktype(network),
            };
            Ok((i, header))
        }
        _ => Err(Err::Error(FramingError::HeaderNotRecognized)),
    }
}

/// Parse one record (little-endian header fields).
pub fn parse_classic_record_le(i: &[u8]) -> IResult<&[u8], ClassicRecord, FramingError> {
    if i.len() < RECORD_HEADER_SIZE {
        return Err(Err::Incomplete(Needed::new(RECORD_HEADER_SIZE - i.len())));
    }
    let (i, ts_sec) = le_u32(i)?;
    let (i, ts_frac) = le_u32(i)?;
    let (i, caplen) = le_u32(i)?;
    let (i, origlen) = le_u32(i)?;
    let (i, data) = take(caplen as usize)(i)?;
    let record = ClassicRecord {
        ts_sec,
        ts_frac,
        caplen,
        origlen,
        data,
    };
    Ok((i, record))
}

/// Parse one record (big-endian header fields).
pub fn parse_classic_record_be(i: &[u8]) -> IResult<&[u8], ClassicRecord, FramingError> {
    if i.len() < RECORD_HEADER_SIZE {
        return Err(Err::Incomplete(Needed::new(RECORD_HEADER_SIZE - i.len())));
    }
    let (i, ts_sec) = be_u32(i)?;
    let (i, ts_frac) = be_u32(i)?;
    let (i, caplen) = be_u32(i)?;
    let (i, origlen) = be_u32(i)?;
    let (i, data) = take(caplen as usize)(i)?;
    let record = ClassicRecord {
        ts_sec,
        ts_frac,
        caplen,
        origlen,
        data,
    };
    Ok((i, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // little-endian header, v2.4, snaplen 262144, Ethernet
    const HDR_LE: &[u8] = &hex!(
        "
D4 C3 B2 A1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 04 00 01 00 00 00"
    );

    // big-endian nanosecond header, v2.4, snaplen 65535, Ethernet
    const HDR_BE_NSEC: &[u8] = &hex!(
        "
A1 B2 3C 4D 00 02 00 04 00 00 00 00 00 00 00 00
00 00 FF FF 00 00 00 01"
    );

    #[test]
    fn parse_header_le() {
        let (rem, hdr) = parse_classic_header(HDR_LE).expect("header");
        assert!(rem.is_empty());
        assert_eq!(hdr.magic_number, CLASSIC_MAGIC);
        assert_eq!(hdr.version_major, 2);
        assert_eq!(hdr.version_minor, 4);
        assert_eq!(hdr.snaplen, 262_144);
        assert_eq!(hdr.network, Linktype::ETHERNET);
        assert!(!hdr.is_bigendian());
        assert!(!hdr.is_nanosecond());
    }

    #[test]
    fn parse_header_be_nanosecond() {
        let (rem, hdr) = parse_classic_header(HDR_BE_NSEC).expect("header");
        assert!(rem.is_empty());
        assert_eq!(hdr.snaplen, 65_535);
        assert!(hdr.is_bigendian());
        assert!(hdr.is_nanosecond());
    }

    #[test]
    fn parse_header_unknown_magic() {
        let res = parse_classic_header(&hex!("00 01 02 03 04 05 06 07"));
        assert!(matches!(
            res,
            Err(Err::Error(FramingError::HeaderNotRecognized))
        ));
    }

    #[test]
    fn parse_record() {
        let mut data = hex!("34 4E 5B 5A E1 96 08 00 04 00 00 00 04 00 00 00").to_vec();
        data.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let (rem, rec) = parse_classic_record_le(&data).expect("record");
        assert!(rem.is_empty());
        assert_eq!(rec.ts_sec, 1_515_933_236);
        assert_eq!(rec.ts_frac, 562_913);
        assert_eq!(rec.caplen, 4);
        assert_eq!(rec.data, &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn parse_record_short_header_is_incomplete() {
        let data = hex!("34 4E 5B 5A E1 96 08 00");
        assert!(matches!(
            parse_classic_record_le(&data),
            Err(Err::Incomplete(_))
        ));
    }

    #[test]
    fn parse_record_short_payload_is_incomplete() {
        let mut data = hex!("34 4E 5B 5A E1 96 08 00 14 00 00 00 14 00 00 00").to_vec();
        data.extend_from_slice(&[0u8; 10]); // 10 of the declared 20 bytes
        assert!(matches!(
            parse_classic_record_le(&data),
            Err(Err::Incomplete(_))
        ));
    }
}
