use crate::linktype::Linktype;
use crate::sniff::{ByteOrder, FormatKind};

/// One captured frame, extracted from any container format.
///
/// The payload is always materialized, even when empty, and its length equals
/// the record's declared captured length (after zero-padding, if the record
/// was truncated on disk).
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Raw captured bytes
    pub payload: Vec<u8>,
    /// Seconds since epoch, fractional part at the format's resolution
    pub timestamp: f64,
    /// Capture interface; 0 when the format has no interface multiplexing
    pub interface_id: u32,
}

/// One capture interface described by a block-structured file
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterfaceInfo {
    pub id: u32,
    pub snaplen: u32,
    pub linktype: Linktype,
}

/// Descriptive metadata about the recognized container.
///
/// Which fields are populated depends on the format: classic captures fill
/// `magic`/`version`/`snaplen`/`linktype`, block-structured captures fill
/// `version` and per-interface descriptors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatInfo {
    pub kind: FormatKind,
    pub byte_order: Option<ByteOrder>,
    /// File magic, hex-formatted
    pub magic: Option<String>,
    /// Declared version, as `"major.minor"`
    pub version: Option<String>,
    /// Declared snapshot length (classic format)
    pub snaplen: Option<u32>,
    /// Declared link-layer type (classic format)
    pub linktype: Option<Linktype>,
    /// Interface descriptors (block-structured format)
    pub interfaces: Vec<InterfaceInfo>,
}
