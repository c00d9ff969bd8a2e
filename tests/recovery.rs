use pcap_salvage::{parse_capture, scan_block_stream, CaptureError, FormatKind};

// Section-header-shaped prefix with a corrupt byte-order magic: enough to be
// dispatched to the block-structured path, but unreadable by the structured
// reader.
fn broken_section_prefix(total: usize) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&0x0A0D_0D0Au32.to_le_bytes());
    v.extend_from_slice(&(total as u32).to_le_bytes());
    v.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes()); // not a valid BOM
    v.resize(total, 0x77);
    v
}

fn scan_shaped_packet(payload: &[u8]) -> Vec<u8> {
    let total = ((16 + payload.len().max(16)) + 3) & !3;
    let mut v = Vec::new();
    v.extend_from_slice(&6u32.to_le_bytes());
    v.extend_from_slice(&(total as u32).to_le_bytes());
    v.extend_from_slice(&0u32.to_le_bytes());
    v.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    v.extend_from_slice(payload);
    v.resize(total, 0);
    v
}

#[test]
fn salvages_packets_behind_a_broken_section_header() {
    let mut data = broken_section_prefix(24);
    data.extend_from_slice(&scan_shaped_packet(b"frame one"));
    data.extend_from_slice(&scan_shaped_packet(b"frame two is a bit longer"));
    let parsed = parse_capture(&data).expect("salvage");
    assert_eq!(parsed.format.kind, FormatKind::BlockStructured);
    assert_eq!(parsed.frames.len(), 2);
    assert_eq!(parsed.frames[0].payload, b"frame one");
    assert_eq!(parsed.frames[1].payload, b"frame two is a bit longer");
    assert_eq!(parsed.recovered, 2);
}

#[test]
fn nothing_salvageable_is_a_typed_error() {
    // dispatched to the block path, but the scanner finds no packet blocks
    let data = broken_section_prefix(48);
    assert!(matches!(
        parse_capture(&data),
        Err(CaptureError::NoRecognizableFrames)
    ));
}

#[test]
fn scan_is_usable_directly() {
    let mut data = scan_shaped_packet(b"standalone");
    data.extend_from_slice(&scan_shaped_packet(b"second"));
    let report = scan_block_stream(&data);
    assert_eq!(report.frames.len(), 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.frames[0].payload, b"standalone");
}

#[test]
fn scan_timestamps_share_the_length_word() {
    // the word the scanner reads as the packet length doubles as the low
    // timestamp word, so salvaged timestamps are length-derived
    let data = scan_shaped_packet(b"abcd");
    let report = scan_block_stream(&data);
    assert_eq!(report.frames.len(), 1);
    assert!((report.frames[0].timestamp - 4.0 / 1e6).abs() < 1e-12);
}
