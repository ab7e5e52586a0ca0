//! Run-length bitmap decompression
//!
//! Director stores `BITD` bitmap payloads with a PackBits-style scheme:
//!
//! ```text
//! control & 0x80 != 0  -> repeat run: next byte emitted ((control ^ 0xFF) + 2) times
//! control & 0x80 == 0  -> literal run: next (control & 0x7F) + 1 bytes copied
//! ```
//!
//! There is no end marker. The stream ends when the input does, and a control
//! byte that promises more data than remains is an error.

use crate::{CodecError, Result};

/// Decompress an RLE bitmap stream
///
/// # Errors
/// Returns [`CodecError::Truncated`] if a control byte's payload runs past the
/// end of `buffer`.
pub fn decompress(buffer: &[u8]) -> Result<Vec<u8>> {
    // Literal runs never shrink, repeat runs at least double
    let mut output = Vec::with_capacity(buffer.len() * 2);
    let mut pos = 0;

    while pos < buffer.len() {
        let control = buffer[pos];
        pos += 1;

        if control & 0x80 != 0 {
            let repeat = ((control ^ 0xFF) & 0xFF) as usize + 2;
            let Some(&value) = buffer.get(pos) else {
                return Err(CodecError::Truncated {
                    offset: pos - 1,
                    need: 1,
                    have: 0,
                });
            };
            output.resize(output.len() + repeat, value);
            pos += 1;
        } else {
            let length = (control & 0x7F) as usize + 1;
            let have = buffer.len() - pos;
            if length > have {
                return Err(CodecError::Truncated {
                    offset: pos - 1,
                    need: length,
                    have,
                });
            }
            output.extend_from_slice(&buffer[pos..pos + length]);
            pos += length;
        }
    }

    Ok(output)
}
