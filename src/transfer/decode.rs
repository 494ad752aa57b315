//! Text decoding of assembled downloads.

use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid UTF-8 at byte {valid_up_to}")]
    InvalidUtf8 { valid_up_to: usize },
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),
}

/// Encodings the viewer can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    /// Pick the encoding declared by a `Content-Type` header value.
    ///
    /// No header or no `charset` parameter means UTF-8.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, DecodeError> {
        let Some(charset) = content_type.and_then(charset_param) else {
            return Ok(TextEncoding::Utf8);
        };

        match charset.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" | "us-ascii" | "ascii" => {
                Ok(TextEncoding::Latin1)
            }
            other => Err(DecodeError::UnsupportedCharset(other.to_string())),
        }
    }

    /// Decode a complete buffer.
    pub fn decode(self, bytes: Vec<u8>) -> Result<String, DecodeError> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = if bytes.starts_with(UTF8_BOM) {
                    bytes[UTF8_BOM.len()..].to_vec()
                } else {
                    bytes
                };
                String::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8 {
                    valid_up_to: e.utf8_error().valid_up_to(),
                })
            }
            TextEncoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

/// Extract the `charset` parameter from a media type.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then_some(value)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_utf8() {
        assert_eq!(TextEncoding::from_content_type(None), Ok(TextEncoding::Utf8));
        assert_eq!(
            TextEncoding::from_content_type(Some("text/csv")),
            Ok(TextEncoding::Utf8)
        );
    }

    #[test]
    fn test_charset_param_parsing() {
        assert_eq!(
            TextEncoding::from_content_type(Some("text/csv; charset=\"ISO-8859-1\"")),
            Ok(TextEncoding::Latin1)
        );
        assert_eq!(
            TextEncoding::from_content_type(Some("text/plain;Charset=UTF-8")),
            Ok(TextEncoding::Utf8)
        );
        assert_eq!(
            TextEncoding::from_content_type(Some("text/plain; charset=shift_jis")),
            Err(DecodeError::UnsupportedCharset("shift_jis".to_string()))
        );
    }

    #[test]
    fn test_utf8_decode_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("ORIGIN,DEST\n".as_bytes());
        assert_eq!(TextEncoding::Utf8.decode(bytes).unwrap(), "ORIGIN,DEST\n");
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = vec![b'o', b'k', 0xFF, b'x'];
        assert_eq!(
            TextEncoding::Utf8.decode(bytes),
            Err(DecodeError::InvalidUtf8 { valid_up_to: 2 })
        );
    }

    #[test]
    fn test_latin1_decode() {
        let bytes = vec![b'S', 0xE3, b'o'];
        assert_eq!(TextEncoding::Latin1.decode(bytes).unwrap(), "São");
    }
}
