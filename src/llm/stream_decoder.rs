use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use encoding_rs::{CoderResult, Decoder, UTF_8};
use futures_util::stream::{Stream, StreamExt};

use crate::error::ChatError;

/// Pull-based source of body chunks. `Ok(None)` means end of stream.
#[async_trait]
pub trait ByteSource: Send {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

#[async_trait]
impl<S> ByteSource for S
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.next().await.transpose()
    }
}

/// Incremental UTF-8 text accumulator.
///
/// Always UTF-8: a leading UTF-8 BOM is dropped, but a UTF-16 BOM does not
/// switch encodings and decodes to replacement characters.
///
/// A multi-byte character split across two chunks is held in the decoder
/// until its remaining bytes arrive, so chunk boundaries never corrupt text.
pub struct Utf8Accumulator {
    decoder: Decoder,
    text: String,
}

impl Default for Utf8Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8Accumulator {
    pub fn new() -> Self {
        Self {
            decoder: UTF_8.new_decoder_with_bom_removal(),
            text: String::new(),
        }
    }

    /// Decode one chunk and append it to the accumulated text.
    pub fn push(&mut self, chunk: &[u8]) {
        self.decode_into(chunk, false);
    }

    /// Text decoded so far, excluding any incomplete trailing character.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Flush the decoder and return everything. An incomplete trailing
    /// sequence becomes U+FFFD.
    pub fn finish(mut self) -> String {
        self.decode_into(&[], true);
        self.text
    }

    fn decode_into(&mut self, mut input: &[u8], last: bool) {
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length(input.len())
                .unwrap_or(input.len().saturating_mul(3).saturating_add(4));
            self.text.reserve(needed);
            let (result, read, _had_replacements) =
                self.decoder.decode_to_string(input, &mut self.text, last);
            input = &input[read..];
            match result {
                CoderResult::InputEmpty => break,
                CoderResult::OutputFull => continue,
            }
        }
    }
}

/// Drain `source` to the end and return the decoded text.
///
/// Takes the source by value: a body can only be consumed once. On a read
/// error the text decoded so far is returned inside
/// [`ChatError::StreamReadFailed`].
pub async fn decode<S: ByteSource>(mut source: S) -> Result<String, ChatError> {
    let mut acc = Utf8Accumulator::new();
    let mut chunks = 0usize;

    loop {
        match source.next_chunk().await {
            Ok(Some(chunk)) => {
                chunks += 1;
                acc.push(&chunk);
            }
            Ok(None) => break,
            Err(e) => {
                let partial = acc.finish();
                tracing::warn!(
                    "Stream read failed after {chunks} chunks ({} chars decoded): {e:#}",
                    partial.chars().count()
                );
                return Err(ChatError::StreamReadFailed {
                    message: format!("{e:#}"),
                    partial,
                });
            }
        }
    }

    tracing::debug!("Decoded {chunks} chunks");
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn chunks(parts: Vec<Vec<u8>>) -> impl ByteSource {
        stream::iter(
            parts
                .into_iter()
                .map(|p| Ok::<_, anyhow::Error>(Bytes::from(p))),
        )
    }

    fn text_chunks(parts: &[&str]) -> impl ByteSource {
        chunks(parts.iter().map(|p| p.as_bytes().to_vec()).collect())
    }

    #[tokio::test]
    async fn test_concatenates_chunks_in_order() {
        let text = decode(text_chunks(&["Hel", "lo, wor", "ld"])).await.unwrap();
        assert_eq!(text, "Hello, world");
    }

    #[tokio::test]
    async fn test_empty_stream() {
        assert_eq!(decode(text_chunks(&[])).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        let globe = "🌍".as_bytes();
        assert_eq!(globe.len(), 4);
        for split in 1..globe.len() {
            let parts = vec![
                [b"Hello ".as_slice(), &globe[..split]].concat(),
                [&globe[split..], b" world".as_slice()].concat(),
            ];
            let text = decode(chunks(parts)).await.unwrap();
            assert_eq!(text, "Hello 🌍 world", "split at byte {split}");
        }
    }

    #[tokio::test]
    async fn test_char_spread_over_three_chunks() {
        let bytes = "€".as_bytes().to_vec();
        let parts = bytes.iter().map(|b| vec![*b]).collect();
        assert_eq!(decode(chunks(parts)).await.unwrap(), "€");
    }

    #[tokio::test]
    async fn test_truncated_tail_becomes_replacement_char() {
        let globe = "🌍".as_bytes();
        let parts = vec![b"ok ".to_vec(), globe[..2].to_vec()];
        assert_eq!(decode(chunks(parts)).await.unwrap(), "ok \u{FFFD}");
    }

    #[tokio::test]
    async fn test_leading_bom_is_stripped() {
        let parts = vec![vec![0xEF, 0xBB], vec![0xBF, b'h', b'i']];
        assert_eq!(decode(chunks(parts)).await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn test_utf16_bom_does_not_switch_encoding() {
        let parts = vec![vec![0xFF, 0xFE, b'h', 0, b'i', 0]];
        assert_eq!(
            decode(chunks(parts)).await.unwrap(),
            "\u{FFFD}\u{FFFD}h\0i\0"
        );

        let parts = vec![vec![0xFE], vec![0xFF, b'o', b'k']];
        assert_eq!(decode(chunks(parts)).await.unwrap(), "\u{FFFD}\u{FFFD}ok");
    }

    #[tokio::test]
    async fn test_read_error_carries_partial_text() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"Exercise ")),
            Err(anyhow::anyhow!("connection reset")),
            Ok(Bytes::from_static(b"never read")),
        ]);
        let err = decode(source).await.unwrap_err();
        match err {
            ChatError::StreamReadFailed { message, partial } => {
                assert_eq!(message, "connection reset");
                assert_eq!(partial, "Exercise ");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_accumulator_holds_incomplete_char() {
        let mut acc = Utf8Accumulator::new();
        let bytes = "é".as_bytes();
        acc.push(&bytes[..1]);
        assert_eq!(acc.text(), "");
        acc.push(&bytes[1..]);
        assert_eq!(acc.text(), "é");
        assert_eq!(acc.finish(), "é");
    }
}
