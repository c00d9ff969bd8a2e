use nom::error::ParseError;
use nom::number::streaming::{be_u16, be_u32, le_u16, le_u32};
use nom::IResult;

/// Big-endian block encoding
pub(crate) struct BlockBE;
/// Little-endian block encoding
pub(crate) struct BlockLE;

/// Byte-order abstraction for block-structured parsing.
///
/// The section header decides the endianness of every block in a section, so
/// block parsers are generic over this trait instead of branching per field.
pub(crate) trait BlockEndianness {
    /// Convert a block type read as little-endian to its native value
    fn native_u32(n: u32) -> u32;

    fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E>;
    fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E>;
}

impl BlockEndianness for BlockBE {
    #[inline]
    fn native_u32(n: u32) -> u32 {
        u32::from_be(n)
    }

    #[inline]
    fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E> {
        be_u16(i)
    }

    #[inline]
    fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E> {
        be_u32(i)
    }
}

impl BlockEndianness for BlockLE {
    #[inline]
    fn native_u32(n: u32) -> u32 {
        u32::from_le(n)
    }

    #[inline]
    fn parse_u16<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u16, E> {
        le_u16(i)
    }

    #[inline]
    fn parse_u32<'a, E: ParseError<&'a [u8]>>(i: &'a [u8]) -> IResult<&'a [u8], u32, E> {
        le_u32(i)
    }
}
