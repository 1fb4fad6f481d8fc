//! Low-level ZIP container parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all members
//! 4. For reading a member, read its Local File Header and data

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Maps a read failure on the underlying source. Running off the end of the
/// data means the container is truncated, anything else is a real I/O error.
fn read_failure(what: &str) -> impl FnOnce(io::Error) -> Error + '_ {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::corrupt(format!("truncated container while reading {what}"))
        } else {
            Error::Io(e)
        }
    }
}

/// Location and extent of the central directory.
#[derive(Debug, Clone, Copy)]
struct CentralDirectory {
    offset: u64,
    size: u64,
    entries: u64,
}

/// Low-level ZIP container parser.
///
/// Typically used through [`Archive`](super::Archive) rather than directly.
pub struct ArchiveParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the container in bytes
    size: u64,
}

impl<R: ReadAt> ArchiveParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Total size of the container in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and containers with a
    /// trailing comment by searching backwards for the signature.
    ///
    /// Returns the record and its offset in the file.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(Error::corrupt(format!(
                "{} bytes is too small to be a ZIP container",
                self.size
            )));
        }

        // Common case: no comment, EOCD sits in the last 22 bytes.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader
            .read_exact_at(offset, &mut buf)
            .map_err(read_failure("end of central directory"))?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // The EOCD could be earlier if there's a ZIP comment.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader
            .read_exact_at(search_start, &mut buf)
            .map_err(read_failure("end of central directory"))?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length field must account for the remaining bytes.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(Error::corrupt("end of central directory not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD has fields saturated at 0xFFFF or
    /// 0xFFFFFFFF.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The locator sits immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| Error::corrupt("ZIP64 locator would start before the file"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .map_err(read_failure("ZIP64 locator"))?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .map_err(read_failure("ZIP64 end of central directory"))?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    fn central_directory(&self) -> Result<(CentralDirectory, u64)> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let cd = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            CentralDirectory {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                entries: eocd64.total_entries,
            }
        } else {
            CentralDirectory {
                offset: eocd.cd_offset as u64,
                size: eocd.cd_size as u64,
                entries: eocd.total_entries as u64,
            }
        };

        match cd.offset.checked_add(cd.size) {
            Some(end) if end <= eocd_offset => Ok((cd, eocd_offset)),
            _ => Err(Error::corrupt(format!(
                "central directory ({} bytes at offset {}) overlaps the end record at {}",
                cd.size, cd.offset, eocd_offset
            ))),
        }
    }

    /// List all members of the container from the Central Directory.
    pub fn list_members(&self) -> Result<Vec<ZipMember>> {
        let (cd, _) = self.central_directory()?;

        // Read the entire Central Directory at once
        let mut cd_data = vec![0u8; cd.size as usize];
        self.reader
            .read_exact_at(cd.offset, &mut cd_data)
            .map_err(read_failure("central directory"))?;

        // A lying entry count must not drive the allocation.
        let capacity = cd.entries.min(cd.size / CDFH_MIN_SIZE as u64) as usize;
        let mut members = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..cd.entries {
            let member = parse_cdfh(&mut cursor).map_err(|e| {
                Error::corrupt(format!("central directory entry {index}: {e}"))
            })?;
            if member.lfh_offset >= cd.offset {
                return Err(Error::corrupt(format!(
                    "member {} points past the start of the central directory",
                    member.name
                )));
            }
            members.push(member);
        }

        Ok(members)
    }

    /// Get the offset where a member's (possibly compressed) data begins.
    ///
    /// The Local File Header carries its own name and extra field lengths,
    /// which may differ from the Central Directory copy.
    pub fn data_offset(&self, member: &ZipMember) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader
            .read_exact_at(member.lfh_offset, &mut lfh_buf)
            .map_err(read_failure("local file header"))?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(Error::corrupt(format!(
                "invalid local file header for {}",
                member.name
            )));
        }

        // Offset 26: file name length, then extra field length
        let file_name_length = u16::from_le_bytes([lfh_buf[26], lfh_buf[27]]) as u64;
        let extra_field_length = u16::from_le_bytes([lfh_buf[28], lfh_buf[29]]) as u64;

        Ok(member.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Parse one Central Directory File Header.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> io::Result<ZipMember> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "bad central directory header signature",
        ));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Non-UTF8 names are replaced rather than rejected
    let name = String::from_utf8_lossy(&file_name_bytes).into_owned();
    let is_directory = name.ends_with('/');

    let extra_field_end = cursor.position() + extra_field_length as u64;
    if extra_field_end > cursor.get_ref().len() as u64 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == 0x0001 {
            // ZIP64 extended information: present only for saturated fields
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end.min(extra_field_end));
    }

    cursor.set_position(extra_field_end + file_comment_length as u64);
    if cursor.position() > cursor.get_ref().len() as u64 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }

    Ok(ZipMember {
        name,
        compression_method: CompressionMethod::from_u16(compression_method),
        flags,
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        last_mod_time,
        last_mod_date,
        is_directory,
    })
}
