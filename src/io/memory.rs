use super::ReadAt;
use std::io;
use std::sync::Arc;

/// Reader over an in-memory container, shared cheaply between the fingerprint
/// pass and the parser.
#[derive(Clone)]
pub struct MemoryReader {
    data: Arc<[u8]>,
}

impl MemoryReader {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ReadAt for MemoryReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
