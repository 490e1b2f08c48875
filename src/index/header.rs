use super::error::{IndexError, Result};
use std::io::{self, Read, Write};

pub const SIGNATURE: u32 = 0x44495243; // "DIRC"
pub const VERSION: u32 = 2;
pub const HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub entry_count: u32,
}

impl Header {
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&SIGNATURE.to_be_bytes())?;
        out.write_all(&VERSION.to_be_bytes())?;
        out.write_all(&self.entry_count.to_be_bytes())
    }

    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        input.read_exact(&mut buf)?;

        let signature = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        if signature != SIGNATURE {
            return Err(IndexError::CorruptIndex(format!(
                "bad signature: expected {SIGNATURE:#x}, got {signature:#x}"
            )));
        }

        let version = u32::from_be_bytes(buf[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(IndexError::CorruptIndex(format!(
                "unsupported version: {version}"
            )));
        }

        let entry_count = u32::from_be_bytes(buf[8..12].try_into().unwrap());
        Ok(Header { entry_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let header = Header { entry_count: 7 };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);

        let mut cursor = io::Cursor::new(buf);
        let parsed = Header::read_from(&mut cursor).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&0xdeadbeefu32.to_be_bytes());
        let mut cursor = io::Cursor::new(buf);
        assert!(Header::read_from(&mut cursor).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&SIGNATURE.to_be_bytes());
        buf[4..8].copy_from_slice(&3u32.to_be_bytes());
        let mut cursor = io::Cursor::new(buf);
        assert!(Header::read_from(&mut cursor).is_err());
    }
}
