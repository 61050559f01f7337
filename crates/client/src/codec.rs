//! Text codec for the legacy single-byte code page spoken by the peer.
//!
//! Both ends must agree on the code page. A mismatch does not fail: the
//! bytes decode to a different, deterministic string.

use std::fmt;

use encoding_rs::{Decoder, Encoding, IBM866};

use crate::error::LinkError;

/// Encoding used to turn outbound text into bytes and inbound bytes into text.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextCodec {
    encoding: &'static Encoding,
}

impl TextCodec {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { encoding }
    }

    /// Looks up a codec by WHATWG label, e.g. `cp866`, `windows-1251`, `utf-8`.
    ///
    /// Labels whose encoder writes a different encoding (UTF-16 and
    /// `replacement` encode as UTF-8) are rejected, since text would not
    /// survive a round trip through them.
    pub fn for_label(label: &str) -> Result<Self, LinkError> {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) if encoding.output_encoding() == encoding => Ok(Self::new(encoding)),
            _ => Err(LinkError::UnknownEncoding(label.to_string())),
        }
    }

    /// Canonical name of the encoding.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Encodes outbound text. Characters the code page cannot represent are
    /// written as HTML numeric character references.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, unmappable) = self.encoding.encode(text);
        if unmappable {
            tracing::debug!(
                encoding = self.name(),
                "outbound text contains characters outside the code page"
            );
        }
        bytes.into_owned()
    }

    /// Decodes a complete payload, replacing malformed sequences.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Streaming decoder for the read loop.
    pub(crate) fn chunk_decoder(&self) -> ChunkDecoder {
        ChunkDecoder {
            decoder: self.encoding.new_decoder_without_bom_handling(),
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new(IBM866)
    }
}

impl fmt::Debug for TextCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextCodec").field(&self.name()).finish()
    }
}

/// Decodes successive reads of one session. A multi-byte sequence split
/// across reads is held back until the rest arrives.
pub(crate) struct ChunkDecoder {
    decoder: Decoder,
}

impl ChunkDecoder {
    pub(crate) fn decode_chunk(&mut self, bytes: &[u8]) -> String {
        let capacity = self
            .decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len().saturating_mul(3) + 4);
        let mut out = String::with_capacity(capacity);
        let (_, _, _) = self.decoder.decode_to_string(bytes, &mut out, false);
        out
    }

    /// Flushes a sequence left incomplete by the end of the stream as U+FFFD.
    pub(crate) fn finish(&mut self) -> String {
        let capacity = self.decoder.max_utf8_buffer_length(0).unwrap_or(16);
        let mut out = String::with_capacity(capacity);
        let (_, _, _) = self.decoder.decode_to_string(&[], &mut out, true);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_cp866() {
        assert_eq!(TextCodec::default().name(), "IBM866");
        assert_eq!(TextCodec::for_label("CP866").unwrap(), TextCodec::default());
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = TextCodec::for_label("klingon-1").unwrap_err();
        assert!(matches!(err, LinkError::UnknownEncoding(ref l) if l == "klingon-1"));
    }

    #[test]
    fn encodings_without_own_encoder_are_rejected() {
        for label in ["utf-16le", "UTF-16BE", "replacement"] {
            let err = TextCodec::for_label(label).unwrap_err();
            assert!(matches!(err, LinkError::UnknownEncoding(ref l) if l == label));
        }
        assert!(TextCodec::for_label("utf-8").is_ok());
    }

    #[test]
    fn cyrillic_round_trips_through_cp866() {
        let codec = TextCodec::default();
        let bytes = codec.encode("Привет сервер!");
        // One byte per character in a single-byte code page.
        assert_eq!(bytes.len(), "Привет сервер!".chars().count());
        assert_eq!(codec.decode(&bytes), "Привет сервер!");
    }

    #[test]
    fn cp866_bytes_match_code_page() {
        // 'П' is 0x8F and 'р' is 0xE0 in CP866.
        assert_eq!(TextCodec::default().encode("Пр"), vec![0x8F, 0xE0]);
    }

    #[test]
    fn mismatched_code_pages_decode_deterministically() {
        let sender = TextCodec::default();
        let receiver = TextCodec::for_label("windows-1251").unwrap();
        let bytes = sender.encode("Привет");

        let first = receiver.decode(&bytes);
        let second = receiver.decode(&bytes);
        assert_ne!(first, "Привет");
        assert_eq!(first, second);
        assert_eq!(first.chars().count(), 6);
    }

    #[test]
    fn ascii_is_identical_across_code_pages() {
        let bytes = TextCodec::default().encode("ping");
        assert_eq!(bytes, b"ping");
        assert_eq!(TextCodec::for_label("windows-1251").unwrap().decode(&bytes), "ping");
    }

    #[test]
    fn unmappable_characters_become_references() {
        let bytes = TextCodec::default().encode("€");
        assert_eq!(bytes, b"&#8364;");
    }

    #[test]
    fn chunk_decoder_joins_split_utf8() {
        let codec = TextCodec::for_label("utf-8").unwrap();
        let mut decoder = codec.chunk_decoder();
        let bytes = "ж".as_bytes();
        assert_eq!(decoder.decode_chunk(&bytes[..1]), "");
        assert_eq!(decoder.decode_chunk(&bytes[1..]), "ж");
    }

    #[test]
    fn finish_flushes_truncated_sequence() {
        let codec = TextCodec::for_label("utf-8").unwrap();
        let mut decoder = codec.chunk_decoder();
        assert_eq!(decoder.decode_chunk(&"ж".as_bytes()[..1]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(codec.chunk_decoder().finish(), "");
    }

    #[test]
    fn chunk_decoder_single_byte_is_immediate() {
        let codec = TextCodec::default();
        let mut decoder = codec.chunk_decoder();
        assert_eq!(decoder.decode_chunk(&[0x8F]), "П");
    }
}
