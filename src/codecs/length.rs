use crate::codecs::{Decode, Decoded, Encode};
use crate::engine::StreamState;
use crate::error::{ProxyError, Result};

/// Width of the length header in bytes. The length itself is an unsigned
/// 32-bit little-endian integer.
const HEADER_LEN: usize = 4;

/// Prepends a 4-byte little-endian length to each message.
pub struct LengthEncode;

impl Encode for LengthEncode {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let length = u32::try_from(message.len()).map_err(|_| {
            ProxyError::InvalidData(format!(
                "message of {} bytes exceeds the 32-bit length header",
                message.len()
            ))
        })?;

        let mut framed = Vec::with_capacity(HEADER_LEN + message.len());
        framed.extend_from_slice(&length.to_le_bytes());
        framed.extend_from_slice(message);
        Ok(framed)
    }
}

/// Strips a 4-byte little-endian length header and yields exactly that many
/// payload bytes. Until a whole frame is available the entire input is handed
/// back as remainder, so half a header or half a payload simply waits for the
/// next chunk.
pub struct LengthDecode;

impl Decode for LengthDecode {
    fn decode(&mut self, _state: StreamState, input: &[u8]) -> Result<Decoded> {
        if input.len() < HEADER_LEN {
            return Ok(Decoded::incomplete(input));
        }

        let length = u32::from_le_bytes([input[0], input[1], input[2], input[3]]) as usize;
        let end = HEADER_LEN + length;
        if input.len() < end {
            return Ok(Decoded::incomplete(input));
        }

        let message = input[HEADER_LEN..end].to_vec();
        if input.len() == end {
            Ok(Decoded::message(message))
        } else {
            Ok(Decoded::split(message, input[end..].to_vec()))
        }
    }
}
