//! Incremental UTF-8 decoding for streamed reply bodies.
//!
//! The answering service streams plain text in arbitrary byte chunks, so a multi-byte character
//! can straddle two chunks.  [`Utf8Decoder`] carries the incomplete tail of one chunk over to
//! the next; [`decode_text`] applies it to a byte stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::Result;

const REPLACEMENT: char = '\u{FFFD}';

/// A stateful UTF-8 decoder.
///
/// Invalid sequences decode to U+FFFD rather than failing, matching how browsers decode
/// streamed text.  Incomplete sequences at the end of a chunk are held back until the next
/// chunk or [`Utf8Decoder::finish`].
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder with no carried-over bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);
        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` marks a prefix that is known to be UTF-8.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flushes the decoder at end of input.
    ///
    /// A truncated trailing sequence becomes a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }

    /// Returns true if bytes are being held for the next chunk.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Decodes a byte stream into a stream of text pieces.
///
/// Pieces are yielded in arrival order; chunks that only complete part of a character yield
/// nothing until the character is complete.  The first transport error is passed through and
/// ends the stream.
///
/// ```
/// # tokio_test::block_on(async {
/// use bytes::Bytes;
/// use futures::{StreamExt, stream};
///
/// let check = "✓".as_bytes();
/// let chunks = vec![
///     Ok::<_, chatterbox::Error>(Bytes::copy_from_slice(&check[..1])),
///     Ok(Bytes::copy_from_slice(&check[1..])),
/// ];
/// let pieces: Vec<String> = chatterbox::decode_text(stream::iter(chunks))
///     .map(|piece| piece.unwrap())
///     .collect()
///     .await;
/// assert_eq!(pieces, vec!["✓".to_string()]);
/// # });
/// ```
pub fn decode_text<S>(byte_stream: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    stream::unfold(
        (byte_stream, Utf8Decoder::new(), false),
        |(mut stream, mut decoder, done)| async move {
            if done {
                return None;
            }
            loop {
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        let text = decoder.decode(&bytes);
                        if !text.is_empty() {
                            return Some((Ok(text), (stream, decoder, false)));
                        }
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, decoder, true)));
                    }
                    None => {
                        let tail = decoder.finish();
                        if tail.is_empty() {
                            return None;
                        }
                        return Some((Ok(tail), (stream, decoder, true)));
                    }
                }
            }
        },
    )
}
