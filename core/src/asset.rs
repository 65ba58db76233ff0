use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Readable, seekable view over an in-memory asset file
#[derive(Debug, Clone)]
pub struct Asset {
    name: String,
    cursor: Cursor<Arc<[u8]>>,
}

impl Asset {
    pub fn new(name: &str, data: Arc<[u8]>) -> Asset {
        Asset {
            name: name.to_owned(),
            cursor: Cursor::new(data),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn length(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    /// Bytes left between the current position and the end
    #[inline]
    pub fn remaining_length(&self) -> u64 {
        self.length().saturating_sub(self.cursor.position())
    }

    /// Read a single byte, `None` at the end of the asset
    pub fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.cursor.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    pub fn data(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl Read for Asset {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for Asset {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_and_seek() {
        let mut asset = Asset::new("fonts/a.txt", Arc::from(&b"hello world"[..]));
        assert_eq!(asset.length(), 11);
        assert_eq!(asset.read_byte(), Some(b'h'));
        assert_eq!(asset.remaining_length(), 10);

        let mut buf = [0u8; 4];
        asset.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ello");

        assert_eq!(asset.seek(SeekFrom::End(-5)).unwrap(), 6);
        let mut rest = String::new();
        asset.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "world");
        assert_eq!(asset.read_byte(), None);
        assert_eq!(asset.remaining_length(), 0);

        assert!(asset.seek(SeekFrom::Current(-100)).is_err());
    }
}
