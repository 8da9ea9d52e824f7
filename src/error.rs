//! Error types

use crate::binary::read::ReadEof;
use std::fmt;

/// Errors that originate when parsing binary data
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    BadEof,
    BadValue,
    BadVersion,
    BadOffset,
    BadIndex,
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::BadEof
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadEof => write!(f, "end of data reached unexpectedly"),
            ParseError::BadValue => write!(f, "invalid value"),
            ParseError::BadVersion => write!(f, "unexpected data version"),
            ParseError::BadOffset => write!(f, "invalid data offset"),
            ParseError::BadIndex => write!(f, "invalid data index"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that originate when reading a layout document
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum DocumentError {
    /// The document text could not be parsed, or a collection had the wrong shape.
    Json(String),
    /// One of `languages`, `features` or `lookups` was absent or not an object.
    MissingCollection(&'static str),
    /// The font document has no object under the requested table tag.
    MissingTable(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(error: serde_json::Error) -> Self {
        DocumentError::Json(error.to_string())
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::Json(msg) => write!(f, "invalid document: {}", msg),
            DocumentError::MissingCollection(name) => {
                write!(f, "document is missing the '{}' object", name)
            }
            DocumentError::MissingTable(tag) => write!(f, "document has no '{}' table", tag),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Error returned when decoding a layout table from binary data or from a document.
///
/// Either kind is fatal to the call that produced it: no partially built table is returned.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum LayoutError {
    MalformedTable(ParseError),
    MalformedDocument(DocumentError),
}

impl From<ParseError> for LayoutError {
    fn from(error: ParseError) -> Self {
        LayoutError::MalformedTable(error)
    }
}

impl From<ReadEof> for LayoutError {
    fn from(error: ReadEof) -> Self {
        LayoutError::MalformedTable(ParseError::from(error))
    }
}

impl From<DocumentError> for LayoutError {
    fn from(error: DocumentError) -> Self {
        LayoutError::MalformedDocument(error)
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(error: serde_json::Error) -> Self {
        LayoutError::MalformedDocument(DocumentError::from(error))
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::MalformedTable(err) => write!(f, "malformed layout table: {}", err),
            LayoutError::MalformedDocument(err) => {
                write!(f, "malformed layout document: {}", err)
            }
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayoutError::MalformedTable(err) => Some(err),
            LayoutError::MalformedDocument(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_error_display() {
        let err = LayoutError::from(ParseError::BadEof);
        assert_eq!(
            err.to_string(),
            "malformed layout table: end of data reached unexpectedly"
        );

        let err = LayoutError::from(DocumentError::MissingCollection("lookups"));
        assert_eq!(
            err.to_string(),
            "malformed layout document: document is missing the 'lookups' object"
        );
    }

    #[test]
    fn test_read_eof_is_malformed_table() {
        assert_eq!(
            LayoutError::from(ReadEof {}),
            LayoutError::MalformedTable(ParseError::BadEof)
        );
    }
}
