//! Decoding of the outline stored inside a container.
//!
//! Workbooks come in two historical encodings: the object-notation
//! `content.json` written by current editors and the legacy markup
//! `content.xml`. [`ContentDecoder`] picks one by probing the container (JSON
//! first) and both variants produce the same [`GenericNodeTree`], so nothing
//! downstream needs to know which one was read.
//!
//! ## Text sanitization
//!
//! Member bytes are decoded lossily: invalid UTF-8 sequences become U+FFFD and
//! a leading byte-order mark is dropped. Every text field (titles, labels,
//! notes, marker ids) then has ASCII control characters other than tab, line
//! feed and carriage return removed. Decoding never fails because of text content.

mod json;
mod xml;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::archive::{Archive, JSON_CONTENT, XML_CONTENT};
use crate::error::Result;
use crate::io::ReadAt;

/// Which encoding a tree was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    Json,
    Xml,
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentFormat::Json => "json",
            ContentFormat::Xml => "xml",
        })
    }
}

/// Format-neutral outline node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericNode {
    pub title: String,
    /// Position among siblings as authored.
    pub ordinal: usize,
    pub children: Vec<GenericNode>,
    pub markers: Vec<String>,
    pub labels: Vec<String>,
    pub note: Option<String>,
    pub link: Option<String>,
    /// Scalar metadata we do not interpret (ids, structure class, comments).
    pub attributes: BTreeMap<String, String>,
}

/// One diagram page. `root` is `None` for a sheet without a central topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericSheet {
    pub title: String,
    pub root: Option<GenericNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericNodeTree {
    pub format: ContentFormat,
    pub sheets: Vec<GenericSheet>,
}

impl GenericNodeTree {
    /// Number of nodes across all sheets.
    pub fn node_count(&self) -> usize {
        fn count(node: &GenericNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        self.sheets
            .iter()
            .filter_map(|s| s.root.as_ref())
            .map(count)
            .sum()
    }
}

/// The two content decoders, selected by [`ContentDecoder::detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDecoder {
    Json,
    Xml,
}

impl ContentDecoder {
    /// Probe the container: the JSON member wins when both are present.
    pub fn detect<R: ReadAt>(archive: &Archive<R>) -> Option<Self> {
        if archive.contains(JSON_CONTENT) {
            Some(ContentDecoder::Json)
        } else if archive.contains(XML_CONTENT) {
            Some(ContentDecoder::Xml)
        } else {
            None
        }
    }

    pub fn member_name(self) -> &'static str {
        match self {
            ContentDecoder::Json => JSON_CONTENT,
            ContentDecoder::Xml => XML_CONTENT,
        }
    }

    pub fn format(self) -> ContentFormat {
        match self {
            ContentDecoder::Json => ContentFormat::Json,
            ContentDecoder::Xml => ContentFormat::Xml,
        }
    }

    /// Parse raw member bytes.
    pub fn parse(self, bytes: &[u8]) -> Result<GenericNodeTree> {
        let text = decode_text(bytes);
        let sheets = match self {
            ContentDecoder::Json => json::parse(&text)?,
            ContentDecoder::Xml => xml::parse(&text)?,
        };
        Ok(GenericNodeTree {
            format: self.format(),
            sheets,
        })
    }
}

/// Detect the encoding, read the matching member and parse it.
pub fn decode<R: ReadAt>(archive: &Archive<R>) -> Result<GenericNodeTree> {
    let decoder = ContentDecoder::detect(archive).ok_or_else(|| {
        crate::Error::UnsupportedFormat(format!(
            "container has neither {JSON_CONTENT} nor {XML_CONTENT}"
        ))
    })?;
    let bytes = archive.read_member(decoder.member_name())?;
    let tree = decoder.parse(&bytes)?;

    tracing::debug!(
        format = %tree.format,
        sheets = tree.sheets.len(),
        nodes = tree.node_count(),
        "decoded content member"
    );
    Ok(tree)
}

fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

/// Strip control characters that have no place in outline text.
pub(crate) fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_ascii_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}
