//! Container format detection from the file magic.
//!
//! Sniffing only looks at the first 4 bytes of the stream and never fails:
//! inputs that match nothing (including inputs shorter than 4 bytes) are
//! classified as [`FormatKind::Unrecognized`] so that callers can distinguish
//! "nothing to extract" from a hard I/O error.

/// Classic (legacy) capture magic, microsecond timestamps
pub const CLASSIC_MAGIC: u32 = 0xa1b2_c3d4;
/// Classic capture magic, nanosecond timestamps
pub const CLASSIC_NSEC_MAGIC: u32 = 0xa1b2_3c4d;
/// Section marker of the block-structured (pcapng) format
pub const SECTION_MAGIC: u32 = 0x0a0d_0d0a;

/// Container format of a capture file
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormatKind {
    /// Legacy sequential record format, microsecond timestamps
    Classic,
    /// Legacy sequential record format, nanosecond timestamps
    ClassicNanosecond,
    /// Modern block-structured format (pcapng)
    BlockStructured,
    /// Wireless capture dialect (`FF FF` prefix); not parsed further
    UnknownWireless,
    /// No known magic matched
    Unrecognized,
}

impl Default for FormatKind {
    fn default() -> Self {
        FormatKind::Unrecognized
    }
}

/// Byte order declared by the container
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Result of sniffing the first bytes of a stream
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormatHint {
    pub kind: FormatKind,
    /// `None` when the magic does not determine the byte order (the
    /// block-structured section marker is palindromic; the section header
    /// byte-order magic decides later)
    pub byte_order: Option<ByteOrder>,
}

impl FormatHint {
    const fn new(kind: FormatKind, byte_order: Option<ByteOrder>) -> Self {
        FormatHint { kind, byte_order }
    }
}

// Magic words as read little-endian, covering both on-disk byte orders of
// each classic variant.
const MAGIC_TABLE: &[(u32, Option<ByteOrder>, FormatKind)] = &[
    (CLASSIC_MAGIC, Some(ByteOrder::Little), FormatKind::Classic),
    (0xd4c3_b2a1, Some(ByteOrder::Big), FormatKind::Classic),
    (
        CLASSIC_NSEC_MAGIC,
        Some(ByteOrder::Little),
        FormatKind::ClassicNanosecond,
    ),
    (
        0x4d3c_b2a1,
        Some(ByteOrder::Big),
        FormatKind::ClassicNanosecond,
    ),
    (SECTION_MAGIC, None, FormatKind::BlockStructured),
];

/// Classify the container format and byte order from the magic prefix.
///
/// `prefix` can be the whole input; only the first 4 bytes are examined.
pub fn sniff_format(prefix: &[u8]) -> FormatHint {
    if prefix.len() < 4 {
        return FormatHint::new(FormatKind::Unrecognized, None);
    }
    let word = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    for &(magic, byte_order, kind) in MAGIC_TABLE {
        if word == magic {
            return FormatHint::new(kind, byte_order);
        }
    }
    if prefix[..2] == [0xff, 0xff] {
        return FormatHint::new(FormatKind::UnknownWireless, None);
    }
    FormatHint::new(FormatKind::Unrecognized, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_classic_both_orders() {
        let le = sniff_format(&[0xd4, 0xc3, 0xb2, 0xa1]);
        assert_eq!(le.kind, FormatKind::Classic);
        assert_eq!(le.byte_order, Some(ByteOrder::Little));
        let be = sniff_format(&[0xa1, 0xb2, 0xc3, 0xd4]);
        assert_eq!(be.kind, FormatKind::Classic);
        assert_eq!(be.byte_order, Some(ByteOrder::Big));
    }

    #[test]
    fn sniff_nanosecond_both_orders() {
        let le = sniff_format(&[0x4d, 0x3c, 0xb2, 0xa1]);
        assert_eq!(le.kind, FormatKind::ClassicNanosecond);
        assert_eq!(le.byte_order, Some(ByteOrder::Little));
        let be = sniff_format(&[0xa1, 0xb2, 0x3c, 0x4d]);
        assert_eq!(be.kind, FormatKind::ClassicNanosecond);
        assert_eq!(be.byte_order, Some(ByteOrder::Big));
    }

    #[test]
    fn sniff_block_structured() {
        let hint = sniff_format(&[0x0a, 0x0d, 0x0d, 0x0a, 0x1c, 0x00]);
        assert_eq!(hint.kind, FormatKind::BlockStructured);
        assert_eq!(hint.byte_order, None);
    }

    #[test]
    fn sniff_wireless_prefix() {
        let hint = sniff_format(&[0xff, 0xff, 0x12, 0x34]);
        assert_eq!(hint.kind, FormatKind::UnknownWireless);
        assert_eq!(hint.byte_order, None);
    }

    #[test]
    fn sniff_short_input_is_unrecognized() {
        assert_eq!(sniff_format(&[]).kind, FormatKind::Unrecognized);
        assert_eq!(sniff_format(&[0xa1, 0xb2]).kind, FormatKind::Unrecognized);
    }
}
