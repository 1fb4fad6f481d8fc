use thiserror::Error;

/// Result alias used throughout the conversion pipeline.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structural failures that abort the conversion of a container.
///
/// Semantic problems inside a well-formed outline never surface here; the
/// extractor reports those as [`Warning`](crate::extract::Warning)s instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is not a readable ZIP container (bad signatures, truncated
    /// records, CRC mismatch).
    #[error("corrupt container: {0}")]
    CorruptContainer(String),

    /// A member was requested that the central directory does not list.
    #[error("missing member: {0}")]
    MissingMember(String),

    /// The container holds no content encoding we understand, or a member uses
    /// a compression method we cannot decode.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A content member exists but does not parse as structured data.
    #[error("malformed {member}: {message}{}", position(.line, .column))]
    MalformedContent {
        member: String,
        message: String,
        line: Option<u32>,
        column: Option<u32>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Error::CorruptContainer(message.into())
    }

    pub(crate) fn malformed(member: &str, message: impl Into<String>) -> Self {
        Error::MalformedContent {
            member: member.to_string(),
            message: message.into(),
            line: None,
            column: None,
        }
    }
}

fn position(line: &Option<u32>, column: &Option<u32>) -> String {
    match (*line, *column) {
        (Some(line), Some(column)) => format!(" (line {line}, column {column})"),
        (Some(line), None) => format!(" (line {line})"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_content_reports_position() {
        let err = Error::MalformedContent {
            member: "content.json".into(),
            message: "expected value".into(),
            line: Some(3),
            column: Some(14),
        };
        assert_eq!(
            err.to_string(),
            "malformed content.json: expected value (line 3, column 14)"
        );
        assert_eq!(
            Error::malformed("content.xml", "no sheets").to_string(),
            "malformed content.xml: no sheets"
        );
    }
}
