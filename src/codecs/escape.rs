use crate::codecs::Encode;
use crate::error::{ProxyError, Result};

/// Escapes `\` to `\\`, LF to `\n` and CR to `\r`, so a message containing
/// newlines survives a line-oriented framing downstream.
pub struct EscapeNewlines;

impl Encode for EscapeNewlines {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let mut escaped = Vec::with_capacity(message.len());
        for &byte in message {
            match byte {
                b'\\' => escaped.extend_from_slice(b"\\\\"),
                b'\n' => escaped.extend_from_slice(b"\\n"),
                b'\r' => escaped.extend_from_slice(b"\\r"),
                _ => escaped.push(byte),
            }
        }
        Ok(escaped)
    }
}

/// Reverses [`EscapeNewlines`]. A dangling backslash or an unknown escape
/// means the stream was not produced by the matching encoder.
pub struct UnescapeNewlines;

impl Encode for UnescapeNewlines {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let mut unescaped = Vec::with_capacity(message.len());
        let mut bytes = message.iter().copied();
        while let Some(byte) = bytes.next() {
            if byte != b'\\' {
                unescaped.push(byte);
                continue;
            }
            match bytes.next() {
                Some(b'\\') => unescaped.push(b'\\'),
                Some(b'n') => unescaped.push(b'\n'),
                Some(b'r') => unescaped.push(b'\r'),
                Some(other) => {
                    return Err(ProxyError::InvalidData(format!(
                        "unknown escape sequence '\\{}'",
                        other as char
                    )));
                }
                None => {
                    return Err(ProxyError::InvalidData(
                        "dangling backslash at end of message".into(),
                    ));
                }
            }
        }
        Ok(unescaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_covers_backslash_and_newlines() {
        assert_eq!(
            EscapeNewlines.encode(b"a\\b\nc\rd").unwrap(),
            b"a\\\\b\\nc\\rd"
        );
    }

    #[test]
    fn test_unescape_is_the_inverse() {
        let original = b"line one\nline two\r\\end";
        let escaped = EscapeNewlines.encode(original).unwrap();
        assert_eq!(UnescapeNewlines.encode(&escaped).unwrap(), original);
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(EscapeNewlines.encode(b"plain").unwrap(), b"plain");
        assert_eq!(UnescapeNewlines.encode(b"plain").unwrap(), b"plain");
    }

    #[test]
    fn test_unescape_rejects_unknown_sequence() {
        assert!(matches!(
            UnescapeNewlines.encode(b"\\t"),
            Err(ProxyError::InvalidData(_))
        ));
    }

    #[test]
    fn test_unescape_rejects_dangling_backslash() {
        assert!(matches!(
            UnescapeNewlines.encode(b"abc\\"),
            Err(ProxyError::InvalidData(_))
        ));
    }
}
