use num_enum::TryFromPrimitive;
use std::fmt;
use thiserror::Error;

/// Bytes per chunk (one HID input report)
pub const CHUNK_LEN: usize = 8;

/// Chunks per frame
pub const CHUNK_COUNT: usize = 3;

/// Bytes per frame, one complete LCD snapshot
pub const FRAME_LEN: usize = CHUNK_LEN * CHUNK_COUNT;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Invalid chunk index: {0}")]
    ChunkIndex(u8),
    #[error("Chunk {got} received, expected chunk {expected}")]
    OutOfOrder { expected: usize, got: u8 },
    #[error("Chunk {chunk} has {len} bytes, expected {}", CHUNK_LEN)]
    ChunkSize { chunk: u8, len: usize },
    #[error("Frame incomplete, received {received} of {} chunks", CHUNK_COUNT)]
    Incomplete { received: usize },
    #[error("Frame has {0} bytes, expected {}", FRAME_LEN)]
    Length(usize),
}

/// Position of a chunk inside the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Chunk {
    First = 0,
    Second = 1,
    Third = 2,
}

impl Chunk {
    pub fn offset(self) -> usize {
        self as usize * CHUNK_LEN
    }
}

/// A single bit of the frame.
///
/// Bits are counted MSB first, so `bit: 0` is mask `0x80`
/// and `bit: 7` is mask `0x01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    pub byte: usize,
    pub bit: u8,
}

impl Flag {
    pub const fn new(byte: usize, bit: u8) -> Self {
        Self { byte, bit }
    }

    pub const fn mask(self) -> u8 {
        0b1000_0000 >> self.bit
    }
}

/// Raw LCD segment state of the meter
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_LEN],
}

impl Frame {
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Segment pattern of a single byte
    pub fn pattern(&self, byte: usize) -> u8 {
        self.bytes[byte]
    }

    /// Byte rendered as 8 character bit string, MSB first
    pub fn bit_pattern(&self, byte: usize) -> String {
        format!("{:08b}", self.bytes[byte])
    }

    pub fn is_set(&self, flag: Flag) -> bool {
        self.bytes[flag.byte] & flag.mask() != 0
    }
}

impl TryFrom<&[u8]> for Frame {
    type Error = FrameError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; FRAME_LEN] = value
            .try_into()
            .map_err(|_| FrameError::Length(value.len()))?;
        Ok(Self::new(bytes))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: Vec<String> = (0..FRAME_LEN).map(|n| self.bit_pattern(n)).collect();
        f.debug_tuple("Frame").field(&bits).finish()
    }
}

/// Collects the three chunks of a frame.
#[derive(Debug, Clone, Default)]
pub struct FrameAssembler {
    bytes: [u8; FRAME_LEN],
    received: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store chunk `chunk_index` at offset `8 * chunk_index`.
    ///
    /// Chunks arrive in order, each carrying exactly [`CHUNK_LEN`] bytes.
    /// A rejected chunk leaves the assembler unchanged.
    pub fn store(&mut self, chunk_index: u8, data: &[u8]) -> Result<(), FrameError> {
        let chunk = Chunk::try_from_primitive(chunk_index)
            .map_err(|_| FrameError::ChunkIndex(chunk_index))?;
        if chunk as usize != self.received {
            return Err(FrameError::OutOfOrder {
                expected: self.received,
                got: chunk_index,
            });
        }
        if data.len() != CHUNK_LEN {
            return Err(FrameError::ChunkSize {
                chunk: chunk_index,
                len: data.len(),
            });
        }
        let offset = chunk.offset();
        self.bytes[offset..offset + CHUNK_LEN].copy_from_slice(data);
        self.received += 1;
        log::trace!("Stored chunk {}: {:02x?}", chunk_index, data);
        Ok(())
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received() == CHUNK_COUNT
    }

    /// Take the assembled frame and reset for the next one.
    pub fn finish(&mut self) -> Result<Frame, FrameError> {
        if !self.is_complete() {
            return Err(FrameError::Incomplete {
                received: self.received(),
            });
        }
        let frame = Frame::new(self.bytes);
        *self = Self::default();
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_in_order() {
        let mut asm = FrameAssembler::new();
        asm.store(0, &[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        asm.store(1, &[8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
        asm.store(2, &[16, 17, 18, 19, 20, 21, 22, 23]).unwrap();
        let frame = asm.finish().unwrap();
        for n in 0..FRAME_LEN {
            assert_eq!(frame.pattern(n), n as u8);
        }
        assert_eq!(asm.received(), 0);
    }

    #[test]
    fn test_incomplete_frame() {
        let mut asm = FrameAssembler::new();
        asm.store(0, &[0; 8]).unwrap();
        asm.store(1, &[0; 8]).unwrap();
        assert_eq!(asm.finish(), Err(FrameError::Incomplete { received: 2 }));
        asm.store(2, &[0; 8]).unwrap();
        assert!(asm.finish().is_ok());
    }

    #[test]
    fn test_chunks_out_of_order() {
        let mut asm = FrameAssembler::new();
        asm.store(0, &[1; 8]).unwrap();
        assert_eq!(
            asm.store(2, &[3; 8]),
            Err(FrameError::OutOfOrder { expected: 1, got: 2 })
        );
        assert_eq!(
            asm.store(0, &[1; 8]),
            Err(FrameError::OutOfOrder { expected: 1, got: 0 })
        );
        assert_eq!(asm.received(), 1);
        asm.store(1, &[2; 8]).unwrap();
        asm.store(2, &[3; 8]).unwrap();
        let frame = asm.finish().unwrap();
        assert_eq!(frame.pattern(16), 3);
    }

    #[test]
    fn test_short_chunk_rejected() {
        let mut asm = FrameAssembler::new();
        assert_eq!(
            asm.store(0, &[0xff; 7]),
            Err(FrameError::ChunkSize { chunk: 0, len: 7 })
        );
        assert_eq!(asm.received(), 0);
    }

    #[test]
    fn test_chunk_index_out_of_range() {
        let mut asm = FrameAssembler::new();
        assert_eq!(asm.store(3, &[0; 8]), Err(FrameError::ChunkIndex(3)));
    }

    #[test]
    fn test_bit_view() {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[1] = 0b0001_0000;
        bytes[2] = 0b1000_0001;
        let frame = Frame::new(bytes);
        assert_eq!(frame.bit_pattern(1), "00010000");
        assert!(frame.is_set(Flag::new(1, 3)));
        assert!(!frame.is_set(Flag::new(1, 4)));
        assert!(frame.is_set(Flag::new(2, 0)));
        assert!(frame.is_set(Flag::new(2, 7)));
    }

    #[test]
    fn test_from_slice() {
        assert!(Frame::try_from(&[0u8; FRAME_LEN][..]).is_ok());
        assert_eq!(
            Frame::try_from(&[0u8; 16][..]),
            Err(FrameError::Length(16))
        );
    }
}
