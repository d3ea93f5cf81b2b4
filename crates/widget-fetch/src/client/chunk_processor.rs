use super::util::{add_base16_digit, hex_digit_to_value};
use crate::{FetchError, Result};

/// An incremental decoder for `Transfer-Encoding: chunked` HTTP bodies.
///
/// Can be fed arbitrary slices of the body as they arrive from the socket.
pub struct ChunkProcessor {
    state: ChunkProcessorState,
}

impl ChunkProcessor {
    pub fn new() -> Self {
        ChunkProcessor {
            state: ChunkProcessorState::ChunkSize(0),
        }
    }

    /// Processes the data available in the provided source buffer and writes decoded bytes to the destination buffer.
    ///
    /// Returns `true` if there is more data to be read.
    pub fn process_available_data(&mut self, mut src: &[u8], dst: &mut Vec<u8>) -> Result<bool> {
        while !src.is_empty() && !self.state.is_done() {
            let consumed = self.state.advance(src, dst)?;
            src = &src[consumed..];
        }

        Ok(!self.state.is_done())
    }
}

/// The inner state machine of the [ChunkProcessor].
enum ChunkProcessorState {
    /// Parsing the hex chunk size
    ChunkSize(usize),
    /// Skipping a chunk extension until the end of the size line
    ChunkExtension(usize),
    /// Expecting the LF that terminates the size line
    ChunkSizeEnd(usize),
    /// Copying the chunk's data
    RemainingChunkSize(usize),
    /// Expecting the CR after the chunk's data
    ChunkDataCr,
    /// Expecting the LF after the chunk's data
    ChunkDataLf,
    /// Encountered the zero-length chunk
    Done,
}

impl ChunkProcessorState {
    /// Advances the state machine using the provided non-empty source buffer.
    ///
    /// Returns the number of consumed bytes.
    fn advance(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize> {
        let byte = src[0];
        match *self {
            Self::ChunkSize(size) => {
                *self = match byte {
                    b'\r' => Self::ChunkSizeEnd(size),
                    b';' => Self::ChunkExtension(size),
                    _ => {
                        let digit = hex_digit_to_value(byte)
                            .ok_or(FetchError::Other("got an invalid digit in HTTP chunk size".into()))?;
                        Self::ChunkSize(add_base16_digit(size, digit))
                    }
                };
                Ok(1)
            }
            Self::ChunkExtension(size) => {
                if byte == b'\r' {
                    *self = Self::ChunkSizeEnd(size);
                }
                Ok(1)
            }
            Self::ChunkSizeEnd(size) => {
                expect_byte(byte, b'\n')?;
                *self = if size == 0 { Self::Done } else { Self::RemainingChunkSize(size) };
                Ok(1)
            }
            Self::RemainingChunkSize(size) => {
                let present_chunk_bytes = size.min(src.len());
                dst.extend_from_slice(&src[..present_chunk_bytes]);

                let remaining_chunk_size = size - present_chunk_bytes;
                *self = if remaining_chunk_size == 0 {
                    Self::ChunkDataCr
                } else {
                    Self::RemainingChunkSize(remaining_chunk_size)
                };
                Ok(present_chunk_bytes)
            }
            Self::ChunkDataCr => {
                expect_byte(byte, b'\r')?;
                *self = Self::ChunkDataLf;
                Ok(1)
            }
            Self::ChunkDataLf => {
                expect_byte(byte, b'\n')?;
                *self = Self::ChunkSize(0);
                Ok(1)
            }
            // Trailers are ignored
            Self::Done => Ok(src.len()),
        }
    }

    #[inline]
    fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

fn expect_byte(actual: u8, expected: u8) -> Result<()> {
    if actual != expected {
        return Err(FetchError::Other("malformed HTTP chunk delimiter".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decodes_a_complete_body() {
        let mut processor = ChunkProcessor::new();
        let mut dst = Vec::new();

        let more = processor
            .process_available_data(b"4\r\n[1, \r\nB;ext=1\r\n2, 3, 4, 5]\r\n0\r\n\r\n", &mut dst)
            .unwrap();

        assert!(!more);
        assert_eq!(dst, b"[1, 2, 3, 4, 5]");
    }

    #[test]
    fn decodes_a_body_split_at_arbitrary_points() {
        let body = b"6\r\n{\"a\":1\r\n1\r\n}\r\n0\r\n\r\n";
        for split in 1..body.len() {
            let mut processor = ChunkProcessor::new();
            let mut dst = Vec::new();

            processor.process_available_data(&body[..split], &mut dst).unwrap();
            let more = processor.process_available_data(&body[split..], &mut dst).unwrap();

            assert!(!more, "split at {split}");
            assert_eq!(dst, b"{\"a\":1}", "split at {split}");
        }
    }

    #[test]
    fn rejects_invalid_chunk_sizes() {
        let mut processor = ChunkProcessor::new();
        assert!(processor.process_available_data(b"zz\r\n", &mut Vec::new()).is_err());
    }
}
