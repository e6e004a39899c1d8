use crate::codecs::{Decode, Decoded, Encode};
use crate::engine::StreamState;
use crate::error::Result;

/// Joins messages with a delimiter, emitted only *between* messages: the
/// first message is written bare, every later one gets the delimiter
/// prepended. This way the delimited stream never ends with a dangling
/// delimiter.
pub struct DelimEncode {
    delimiter: Vec<u8>,
    first: bool,
}

impl DelimEncode {
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Self {
        Self {
            delimiter: delimiter.into(),
            first: true,
        }
    }
}

impl Encode for DelimEncode {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        if self.first {
            self.first = false;
            return Ok(message.to_vec());
        }

        let mut framed = Vec::with_capacity(self.delimiter.len() + message.len());
        framed.extend_from_slice(&self.delimiter);
        framed.extend_from_slice(message);
        Ok(framed)
    }
}

/// Splits the stream on a delimiter, one message per call. Without a
/// delimiter in sight the input waits for more bytes, except at end of
/// stream, where the tail is flushed as the final message.
pub struct DelimDecode {
    delimiter: Vec<u8>,
}

impl DelimDecode {
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }

    fn find(&self, input: &[u8]) -> Option<usize> {
        input
            .windows(self.delimiter.len())
            .position(|window| window == self.delimiter)
    }
}

impl Decode for DelimDecode {
    fn decode(&mut self, state: StreamState, input: &[u8]) -> Result<Decoded> {
        match self.find(input) {
            Some(at) => {
                let message = input[..at].to_vec();
                let rest = input[at + self.delimiter.len()..].to_vec();
                if rest.is_empty() {
                    Ok(Decoded::message(message))
                } else {
                    Ok(Decoded::split(message, rest))
                }
            }
            None if state == StreamState::End => Ok(Decoded::message(input.to_vec())),
            None => Ok(Decoded::incomplete(input)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_delimiter_only_between_messages() {
        let mut codec = DelimEncode::new(*b"|");
        assert_eq!(codec.encode(b"one").unwrap(), b"one");
        assert_eq!(codec.encode(b"two").unwrap(), b"|two");
        assert_eq!(codec.encode(b"three").unwrap(), b"|three");
    }

    #[test]
    fn test_decode_splits_on_first_occurrence() {
        let mut codec = DelimDecode::new(*b"|");
        assert_eq!(
            codec.decode(StreamState::Active, b"a|b|c").unwrap(),
            Decoded::split(b"a".to_vec(), b"b|c".to_vec())
        );
    }

    #[test]
    fn test_decode_without_delimiter_waits_while_active() {
        let mut codec = DelimDecode::new(*b"|");
        assert_eq!(
            codec.decode(StreamState::Active, b"abc").unwrap(),
            Decoded::incomplete(b"abc")
        );
    }

    #[test]
    fn test_decode_without_delimiter_flushes_at_end() {
        let mut codec = DelimDecode::new(*b"|");
        assert_eq!(
            codec.decode(StreamState::End, b"abc").unwrap(),
            Decoded::message(b"abc".to_vec())
        );
    }

    #[test]
    fn test_decode_multibyte_delimiter() {
        let mut codec = DelimDecode::new(*b"\r\n");
        assert_eq!(
            codec.decode(StreamState::Active, b"msg\r\nrest").unwrap(),
            Decoded::split(b"msg".to_vec(), b"rest".to_vec())
        );
    }

    #[test]
    fn test_round_trip_preserves_messages() {
        let mut encode = DelimEncode::new(*b"|");
        let mut stream = Vec::new();
        for message in [b"m1".as_slice(), b"m2", b"m3"] {
            stream.extend_from_slice(&encode.encode(message).unwrap());
        }
        assert_eq!(stream, b"m1|m2|m3");

        let mut decode = DelimDecode::new(*b"|");
        let mut messages = Vec::new();
        let mut rest = stream;
        loop {
            let decoded = decode.decode(StreamState::End, &rest).unwrap();
            if let Some(message) = decoded.message {
                messages.push(message);
            }
            match decoded.remainder {
                Some(remainder) if !remainder.is_empty() => rest = remainder,
                _ => break,
            }
        }
        assert_eq!(messages, vec![b"m1".to_vec(), b"m2".to_vec(), b"m3".to_vec()]);
    }
}
