pub const MAGIC: [u8; 2] = *b"PG";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = std::mem::size_of::<FrameHeader>();
/// Largest payload the length field can describe.
pub const MAX_PAYLOAD: usize = u32::MAX as usize;

/// Wire header that precedes every frame payload.
///
/// Multi-byte fields are stored big-endian; use the accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, packed)]
pub struct FrameHeader {
    pub magic: [u8; 2],
    pub version: u8,
    pub flags: u8,
    pub seq: u32,
    pub len: u32,
    pub check: u16,
    pub reserved: u16,
}

impl FrameHeader {
    /// `None` when the payload is too long for the 32-bit length field.
    pub fn new(seq: u32, flags: u8, payload: &[u8]) -> Option<Self> {
        Some(Self {
            magic: MAGIC,
            version: VERSION,
            flags,
            seq: seq.to_be(),
            len: wire_len(payload.len())?.to_be(),
            check: crate::checksum(payload).to_be(),
            reserved: 0,
        })
    }

    pub fn sequence(&self) -> u32 {
        u32::from_be(self.seq)
    }

    pub fn payload_len(&self) -> usize {
        u32::from_be(self.len) as usize
    }

    pub fn payload_checksum(&self) -> u16 {
        u16::from_be(self.check)
    }

    pub fn has_magic(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn verify_payload(&self, payload: &[u8]) -> bool {
        crate::checksum(payload) == self.payload_checksum()
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..2].copy_from_slice(&self.magic);
        out[2] = self.version;
        out[3] = self.flags;
        out[4..8].copy_from_slice(&self.sequence().to_be_bytes());
        out[8..12].copy_from_slice(&(self.payload_len() as u32).to_be_bytes());
        out[12..14].copy_from_slice(&self.payload_checksum().to_be_bytes());
        out[14..16].copy_from_slice(&u16::from_be(self.reserved).to_be_bytes());
        out
    }
}

fn wire_len(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

/// Splits `data` into a header view and everything after it.
///
/// Only the size is checked here; magic, version, length and checksum
/// are left to the caller.
pub fn parse_frame(data: &[u8]) -> Option<(&FrameHeader, &[u8])> {
    if data.len() < HEADER_LEN {
        return None;
    }

    // FrameHeader is packed, so any byte address is suitably aligned.
    let ptr = data.as_ptr() as *const FrameHeader;
    let header = unsafe { &*ptr };
    let payload = &data[HEADER_LEN..];

    Some((header, payload))
}
