use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::codecs::Encode;
use crate::error::{ProxyError, Result};

/// Everything outside the URL-unreserved set gets percent-encoded.
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes each message. One-shot: always consumes the whole input.
pub struct UrlEncode;

impl Encode for UrlEncode {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(message)
            .map_err(|e| ProxyError::InvalidData(format!("url encode needs UTF-8 input: {e}")))?;
        Ok(utf8_percent_encode(text, URL_ENCODE_SET)
            .to_string()
            .into_bytes())
    }
}

/// Reverses [`UrlEncode`]. Malformed percent escapes are invalid data, not
/// something to pass through silently.
pub struct UrlDecode;

impl Encode for UrlDecode {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let mut decoded = Vec::with_capacity(message.len());
        let mut bytes = message.iter().copied().enumerate();
        while let Some((at, byte)) = bytes.next() {
            if byte != b'%' {
                decoded.push(byte);
                continue;
            }
            let (high, low) = match (bytes.next(), bytes.next()) {
                (Some((_, high)), Some((_, low))) => (hex_value(high), hex_value(low)),
                _ => (None, None),
            };
            match (high, low) {
                (Some(high), Some(low)) => decoded.push(high << 4 | low),
                _ => {
                    return Err(ProxyError::InvalidData(format!(
                        "malformed percent escape at byte {at}"
                    )));
                }
            }
        }
        Ok(decoded)
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_reserved_characters() {
        assert_eq!(UrlEncode.encode(b"a b&c").unwrap(), b"a%20b%26c");
    }

    #[test]
    fn test_encode_leaves_unreserved_untouched() {
        assert_eq!(UrlEncode.encode(b"AZaz09-_.~").unwrap(), b"AZaz09-_.~");
    }

    #[test]
    fn test_decode_reverses_encode() {
        let encoded = UrlEncode.encode("caf\u{e9} & crème".as_bytes()).unwrap();
        assert_eq!(
            UrlDecode.encode(&encoded).unwrap(),
            "caf\u{e9} & crème".as_bytes()
        );
    }

    #[test]
    fn test_decode_rejects_truncated_escape() {
        assert!(matches!(
            UrlDecode.encode(b"abc%2"),
            Err(ProxyError::InvalidData(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_hex_escape() {
        assert!(matches!(
            UrlDecode.encode(b"%zz"),
            Err(ProxyError::InvalidData(_))
        ));
    }
}
