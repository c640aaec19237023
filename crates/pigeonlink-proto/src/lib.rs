pub mod header;
pub mod dump;

pub use header::{FrameHeader, parse_frame, HEADER_LEN, MAGIC, MAX_PAYLOAD, VERSION};
pub use dump::hex_dump;

/// One's-complement sum over 16-bit big-endian words, folded and inverted.
/// An odd trailing byte is padded with zero on the right.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u64 = 0;
    let mut i = 0;
    while i + 1 < data.len() {
        let word = u16::from_be_bytes([data[i], data[i+1]]);
        sum += word as u64;
        i += 2;
    }
    if i < data.len() {
        sum += (data[i] as u64) << 8;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !sum as u16
}
