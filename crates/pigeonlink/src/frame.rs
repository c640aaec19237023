use std::io::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};

use pigeonlink_proto::{hex_dump, parse_frame, FrameHeader, MAX_PAYLOAD, VERSION};

use crate::error::FrameError;

/// Set on frames built from a hardware capture rather than decoded from wire bytes.
pub const FLAG_CAPTURED: u8 = 0x01;

static NEXT_SEQUENCE: AtomicU32 = AtomicU32::new(1);

/// One unit of payload on its way from the RX side to the TX side.
///
/// Not `Clone`: a frame has exactly one owner at a time, and handing it to
/// the queue or to a carrier is a move.
#[derive(Debug)]
pub struct Frame {
    header: FrameHeader,
    payload: Vec<u8>,
}

impl Frame {
    /// Fails with [`FrameError::TooLarge`] past [`MAX_PAYLOAD`] bytes.
    pub fn new(payload: Vec<u8>) -> Result<Self, FrameError> {
        Self::with_flags(payload, 0)
    }

    /// Wraps a buffer returned by a capture routine. The buffer is moved in,
    /// so the caller's copy is gone once this returns.
    pub fn from_capture(buffer: Vec<u8>) -> Result<Self, FrameError> {
        Self::with_flags(buffer, FLAG_CAPTURED)
    }

    fn with_flags(payload: Vec<u8>, flags: u8) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::TooLarge(payload.len()));
        }
        let seq = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let header = FrameHeader::new(seq, flags, &payload)
            .ok_or(FrameError::TooLarge(payload.len()))?;
        Ok(Self { header, payload })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (header, rest) = parse_frame(bytes).ok_or(FrameError::Truncated)?;

        if !header.has_magic() {
            return Err(FrameError::BadMagic);
        }
        if header.version != VERSION {
            return Err(FrameError::UnsupportedVersion(header.version));
        }
        if header.payload_len() != rest.len() {
            return Err(FrameError::LengthMismatch {
                declared: header.payload_len(),
                actual: rest.len(),
            });
        }
        if !header.verify_payload(rest) {
            return Err(FrameError::ChecksumMismatch);
        }

        Ok(Self {
            header: *header,
            payload: rest.to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(pigeonlink_proto::HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.header.to_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence()
    }

    pub fn flags(&self) -> u8 {
        self.header.flags
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn print_header(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "frame seq={} version={} flags={:#04x} len={} check={:#06x}",
            self.sequence(),
            self.header.version,
            self.header.flags,
            self.header.payload_len(),
            self.header.payload_checksum(),
        )
    }

    pub fn print_data(&self, out: &mut dyn Write) -> io::Result<()> {
        hex_dump(out, &self.payload)
    }
}
