//! Random-access byte sources for container parsing.

mod local;
mod memory;

pub use local::LocalFileReader;
pub use memory::MemoryReader;

use std::io;

/// Trait for random access reading from a data source
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer starting at `offset`, failing with
    /// [`io::ErrorKind::UnexpectedEof`] if the source ends first.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "read of {} bytes at offset {} ran past the end of the source",
                        buf.len(),
                        offset
                    ),
                ));
            }
            filled += n;
        }
        Ok(())
    }
}
