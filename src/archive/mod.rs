//! Container access: the ZIP layer underneath every workbook.
//!
//! A workbook is an ordinary ZIP archive. This module locates its central
//! directory, lists its members and decompresses individual members on
//! demand, verifying each one's CRC-32.
//!
//! ## Architecture
//!
//! - [`structures`]: ZIP format records (EOCD, ZIP64 records, member headers)
//! - [`parser`]: low-level parsing of those records from any [`ReadAt`] source
//! - [`Archive`]: validated container handle used by the rest of the pipeline
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions
//! - STORED and DEFLATE members
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod parser;
mod structures;

pub use parser::ArchiveParser;
pub use structures::*;

use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, MemoryReader, ReadAt};

/// Member holding the object-notation outline (XMind Zen and later).
pub const JSON_CONTENT: &str = "content.json";
/// Member holding the legacy markup outline (XMind 8 and earlier).
pub const XML_CONTENT: &str = "content.xml";

/// Members that make a ZIP archive a workbook.
pub const CONTENT_MEMBERS: [&str; 2] = [JSON_CONTENT, XML_CONTENT];

/// Upper bound on a single decompressed member.
const MAX_MEMBER_SIZE: u64 = 256 * 1024 * 1024;

/// A validated workbook container.
pub struct Archive<R: ReadAt> {
    parser: ArchiveParser<R>,
    members: Vec<ZipMember>,
}

impl Archive<MemoryReader> {
    /// Open a container held in memory.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self> {
        Self::open(Arc::new(MemoryReader::new(bytes)))
    }
}

impl Archive<LocalFileReader> {
    /// Open a container on the local filesystem without reading it whole.
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Arc::new(LocalFileReader::new(path)?))
    }
}

impl<R: ReadAt> Archive<R> {
    /// Parse the central directory and check that the container carries a
    /// content member.
    pub fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ArchiveParser::new(reader);
        let members = parser.list_members()?;

        tracing::debug!(
            size = parser.size(),
            members = members.len(),
            "parsed container central directory"
        );

        let archive = Self { parser, members };
        if !CONTENT_MEMBERS.iter().any(|name| archive.contains(name)) {
            return Err(Error::UnsupportedFormat(format!(
                "container has neither {JSON_CONTENT} nor {XML_CONTENT}"
            )));
        }
        Ok(archive)
    }

    /// All members in central directory order.
    pub fn members(&self) -> &[ZipMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&ZipMember> {
        self.members
            .iter()
            .find(|m| !m.is_directory && m.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.member(name).is_some()
    }

    /// Read and decompress a member, checking its size and CRC-32.
    pub fn read_member(&self, name: &str) -> Result<Vec<u8>> {
        let member = self
            .member(name)
            .ok_or_else(|| Error::MissingMember(name.to_string()))?;

        if member.is_encrypted() {
            return Err(Error::UnsupportedFormat(format!(
                "member {name} is encrypted"
            )));
        }
        if member.uncompressed_size > MAX_MEMBER_SIZE {
            return Err(Error::corrupt(format!(
                "member {name} declares {} bytes, above the {MAX_MEMBER_SIZE} byte limit",
                member.uncompressed_size
            )));
        }

        let data_offset = self.parser.data_offset(member)?;
        let in_bounds = data_offset
            .checked_add(member.compressed_size)
            .is_some_and(|end| end <= self.parser.size());
        if !in_bounds {
            return Err(Error::corrupt(format!(
                "member {name} runs past the end of the container"
            )));
        }

        let mut raw = vec![0u8; member.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .map_err(|e| Error::corrupt(format!("reading member {name}: {e}")))?;

        let data = match member.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => inflate(name, &raw, member.uncompressed_size)?,
            CompressionMethod::Unknown(method) => {
                return Err(Error::UnsupportedFormat(format!(
                    "member {name} uses compression method {method}"
                )));
            }
        };

        if data.len() as u64 != member.uncompressed_size {
            return Err(Error::corrupt(format!(
                "member {name} decompressed to {} bytes, expected {}",
                data.len(),
                member.uncompressed_size
            )));
        }

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != member.crc32 {
            return Err(Error::corrupt(format!(
                "CRC mismatch in member {name}: stored {:08x}, computed {:08x}",
                member.crc32,
                crc.sum()
            )));
        }

        Ok(data)
    }
}

fn inflate(name: &str, raw: &[u8], expected: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected as usize);
    // One byte of slack so an oversized stream shows up as a size mismatch.
    DeflateDecoder::new(raw)
        .take(expected + 1)
        .read_to_end(&mut out)
        .map_err(|e| Error::corrupt(format!("inflating member {name}: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    /// Minimal single-pass ZIP writer for parser tests.
    fn build_zip(members: &[(&str, &[u8], bool)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for (name, data, deflate) in members {
            let mut crc = flate2::Crc::new();
            crc.update(data);
            let payload = if *deflate {
                let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
                enc.write_all(data).unwrap();
                enc.finish().unwrap()
            } else {
                data.to_vec()
            };
            let method: u16 = if *deflate { 8 } else { 0 };
            let offset = out.len() as u32;

            out.extend_from_slice(LFH_SIGNATURE);
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&method.to_le_bytes());
            out.extend_from_slice(&[0; 4]);
            out.extend_from_slice(&crc.sum().to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(&payload);

            central.extend_from_slice(CDFH_SIGNATURE);
            central.extend_from_slice(&20u16.to_le_bytes());
            central.extend_from_slice(&20u16.to_le_bytes());
            central.extend_from_slice(&0u16.to_le_bytes());
            central.extend_from_slice(&method.to_le_bytes());
            central.extend_from_slice(&[0; 4]);
            central.extend_from_slice(&crc.sum().to_le_bytes());
            central.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            central.extend_from_slice(&(data.len() as u32).to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&[0; 12]);
            central.extend_from_slice(&offset.to_le_bytes());
            central.extend_from_slice(name.as_bytes());
        }

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(members.len() as u16).to_le_bytes());
        out.extend_from_slice(&(members.len() as u16).to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    /// Rewrite the end records of `bytes` the way ZIP64 writers do: the
    /// classic EOCD fields saturate and the real values move into a ZIP64
    /// record found through the locator.
    fn into_zip64(mut bytes: Vec<u8>) -> Vec<u8> {
        let eocd = bytes.split_off(bytes.len() - EndOfCentralDirectory::SIZE);
        let entries = u16::from_le_bytes([eocd[10], eocd[11]]) as u64;
        let cd_size = u32::from_le_bytes([eocd[12], eocd[13], eocd[14], eocd[15]]) as u64;
        let cd_offset = u32::from_le_bytes([eocd[16], eocd[17], eocd[18], eocd[19]]) as u64;

        let eocd64_offset = bytes.len() as u64;
        bytes.extend_from_slice(Zip64EOCD::SIGNATURE);
        bytes.extend_from_slice(&(Zip64EOCD::MIN_SIZE as u64 - 12).to_le_bytes());
        bytes.extend_from_slice(&45u16.to_le_bytes());
        bytes.extend_from_slice(&45u16.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes.extend_from_slice(&cd_size.to_le_bytes());
        bytes.extend_from_slice(&cd_offset.to_le_bytes());

        bytes.extend_from_slice(Zip64EOCDLocator::SIGNATURE);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&eocd64_offset.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());

        bytes.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        bytes.extend_from_slice(&[0; 4]);
        bytes.extend_from_slice(&[0xFF; 12]);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes
    }

    #[test]
    fn reads_stored_and_deflated_members() {
        let json = br#"[{"rootTopic":{"title":"App"}}]"#;
        let bytes = build_zip(&[
            ("content.json", json, true),
            ("metadata.json", b"{}", false),
        ]);

        let archive = Archive::from_bytes(bytes).unwrap();
        assert_eq!(archive.members().len(), 2);
        assert_eq!(archive.read_member("content.json").unwrap(), json);
        assert_eq!(archive.read_member("metadata.json").unwrap(), b"{}");
        assert!(matches!(
            archive.read_member("manifest.json"),
            Err(Error::MissingMember(name)) if name == "manifest.json"
        ));
    }

    #[test]
    fn finds_eocd_behind_a_comment() {
        let mut bytes = build_zip(&[("content.xml", b"<xmap-content/>", false)]);
        let comment = b"written by a mind-map editor";
        let len = bytes.len();
        bytes[len - 2..].copy_from_slice(&(comment.len() as u16).to_le_bytes());
        bytes.extend_from_slice(comment);

        let archive = Archive::from_bytes(bytes).unwrap();
        assert!(archive.contains(XML_CONTENT));
    }

    #[test]
    fn requires_a_content_member() {
        let bytes = build_zip(&[("Thumbnails/thumbnail.png", b"\x89PNG", false)]);
        assert!(matches!(
            Archive::from_bytes(bytes),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn rejects_garbage_and_truncation() {
        assert!(matches!(
            Archive::from_bytes(b"definitely not a zip file at all, just text".to_vec()),
            Err(Error::CorruptContainer(_))
        ));
        assert!(matches!(
            Archive::from_bytes(Vec::new()),
            Err(Error::CorruptContainer(_))
        ));

        let bytes = build_zip(&[("content.json", b"[]", false)]);
        let truncated = bytes[10..].to_vec();
        assert!(matches!(
            Archive::from_bytes(truncated),
            Err(Error::CorruptContainer(_))
        ));
    }

    #[test]
    fn detects_crc_mismatch() {
        let mut bytes = build_zip(&[("content.json", b"[{\"title\":\"x\"}]", false)]);
        // Flip a byte inside the stored payload (after the 30 byte header + name).
        bytes[30 + "content.json".len() + 3] ^= 0xFF;
        let archive = Archive::from_bytes(bytes).unwrap();
        assert!(matches!(
            archive.read_member("content.json"),
            Err(Error::CorruptContainer(msg)) if msg.contains("CRC")
        ));
    }

    #[test]
    fn refuses_encrypted_and_unknown_methods() {
        let data = b"[]";
        let cd = 30 + "content.json".len() + data.len();

        let mut encrypted = build_zip(&[("content.json", data, false)]);
        encrypted[cd + 8] |= 0x01;
        let archive = Archive::from_bytes(encrypted).unwrap();
        assert!(matches!(
            archive.read_member("content.json"),
            Err(Error::UnsupportedFormat(msg)) if msg.contains("encrypted")
        ));

        let mut bzip2 = build_zip(&[("content.json", data, false)]);
        bzip2[cd + 10..cd + 12].copy_from_slice(&12u16.to_le_bytes());
        let archive = Archive::from_bytes(bzip2).unwrap();
        assert!(matches!(
            archive.read_member("content.json"),
            Err(Error::UnsupportedFormat(msg)) if msg.contains("method 12")
        ));
    }

    #[test]
    fn follows_zip64_end_records() {
        let json = br#"[{"rootTopic":{"title":"App"}}]"#;
        let bytes = into_zip64(build_zip(&[
            ("metadata.json", b"{}", false),
            ("content.json", json, true),
        ]));

        let parser = ArchiveParser::new(Arc::new(MemoryReader::new(bytes.clone())));
        let (eocd, eocd_offset) = parser.find_eocd().unwrap();
        assert!(eocd.is_zip64());
        let eocd64 = parser.read_zip64_eocd(eocd_offset).unwrap();
        assert_eq!(eocd64.total_entries, 2);

        let archive = Archive::from_bytes(bytes).unwrap();
        assert_eq!(archive.members().len(), 2);
        assert_eq!(archive.read_member(JSON_CONTENT).unwrap(), json);
    }

    #[test]
    fn saturated_eocd_without_locator_is_corrupt() {
        let mut bytes = into_zip64(build_zip(&[("content.json", b"[]", false)]));
        let locator = bytes.len() - EndOfCentralDirectory::SIZE - Zip64EOCDLocator::SIZE;
        bytes[locator] = b'X';
        assert!(matches!(
            Archive::from_bytes(bytes),
            Err(Error::CorruptContainer(_))
        ));
    }
}
