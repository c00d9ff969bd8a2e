use rusticata_macros::newtype_enum;

/// Data link type declared by a capture file or interface.
///
/// See <https://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Linktype(pub i32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,

    RAW = 101,
    IEEE802_11 = 105,

    LINUX_SLL = 113,

    IEEE802_11_RADIOTAP = 127,

    // Raw IPv4; the packet begins with an IPv4 header.
    IPV4 = 228,
    // Raw IPv6; the packet begins with an IPv6 header.
    IPV6 = 229,

    LINUX_SLL2 = 276,
}
}
