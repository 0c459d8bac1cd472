//! Bottle codec
//!
//! The decoder understands every layout a nameserver or port may send back,
//! including nested lists. The encoder only produces the flat word list used
//! for commands.
//!
//! Decoding never fails outright. An element the decoder cannot interpret is
//! returned as [`Value::Error`] and stops the enclosing lists, since nothing
//! past an element of unknown width can be located.

use tracing::{debug, warn};

use crate::cursor::ByteCursor;
use crate::errors::DecodeFault;
use crate::tag::Tag;
use crate::value::Value;
use crate::{BottleError, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Longest word `encode_words` accepts. Peers that only read the low byte of
/// the length field still see the right length.
pub const MAX_WORD_LEN: usize = 254;

/// Nesting limit for recursive lists
pub const MAX_DEPTH: usize = 64;

// ----------------------------------------------------------------------------
// Decoder
// ----------------------------------------------------------------------------

/// A decoded element and the number of bytes it occupied
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub value: Value,
    /// Bytes read by this call, including the element's own tag when it was
    /// read from the buffer rather than implied
    pub consumed: usize,
}

/// Decode a whole received buffer from offset 0
pub fn decode(buf: &[u8]) -> Value {
    decode_at(buf, 0, None).value
}

/// Decode one element at `offset`
///
/// With `implied` set, no tag is read and the element is decoded as that
/// type. This is how the untagged elements of a compact string list are laid
/// out, and how a caller that already consumed a tag continues.
pub fn decode_at(buf: &[u8], offset: usize, implied: Option<Tag>) -> Decoded {
    let mut decoder = Decoder {
        cursor: ByteCursor::at(buf, offset),
        faulted: false,
    };
    let start = decoder.cursor.position();
    let value = decoder.element(implied, 0);
    Decoded {
        value,
        consumed: decoder.cursor.position() - start,
    }
}

struct Decoder<'a> {
    cursor: ByteCursor<'a>,
    faulted: bool,
}

impl<'a> Decoder<'a> {
    fn fail(&mut self, fault: DecodeFault) -> Value {
        warn!(offset = self.cursor.position(), "bottle decode fault: {}", fault);
        self.faulted = true;
        Value::Error(fault)
    }

    fn element(&mut self, implied: Option<Tag>, depth: usize) -> Value {
        let tag = match implied {
            Some(tag) => tag,
            None => match self.cursor.read_i32().and_then(Tag::from_code) {
                Ok(tag) => tag,
                Err(fault) => return self.fail(fault),
            },
        };

        let result = match tag {
            Tag::Int8 => self.cursor.read_i8().map(Value::Int8),
            Tag::Int16 => self.cursor.read_i16().map(Value::Int16),
            Tag::Int32 => self.cursor.read_i32().map(Value::Int32),
            Tag::Vocab32 => self.cursor.read_i32().map(Value::Vocab32),
            Tag::Float32 => self.cursor.read_f32().map(Value::Float32),
            Tag::Float64 => self.cursor.read_f64().map(Value::Float64),
            Tag::String => self.sized().map(|bytes| Value::String(latin1(bytes))),
            Tag::Blob => self.sized().map(|bytes| Value::Blob(bytes.to_vec())),
            Tag::List | Tag::CompactStringList => return self.list(tag, depth),
            Tag::Int64 | Tag::Dict => Err(DecodeFault::UnsupportedTag { tag: tag.code() }),
        };

        result.unwrap_or_else(|fault| self.fail(fault))
    }

    fn sized(&mut self) -> core::result::Result<&'a [u8], DecodeFault> {
        let len = self.cursor.read_len()?;
        self.cursor.take(len)
    }

    fn list(&mut self, tag: Tag, depth: usize) -> Value {
        if depth >= MAX_DEPTH {
            return self.fail(DecodeFault::NestingTooDeep { max_depth: MAX_DEPTH });
        }
        let count = match self.cursor.read_len() {
            Ok(count) => count,
            Err(fault) => return self.fail(fault),
        };
        let element_tag = match tag {
            Tag::CompactStringList => Some(Tag::String),
            _ => None,
        };

        // Every element occupies at least four bytes
        let mut items = Vec::with_capacity(count.min(self.cursor.remaining() / 4));
        for _ in 0..count {
            items.push(self.element(element_tag, depth + 1));
            if self.faulted {
                break;
            }
        }
        debug!(tag = tag.name(), count, decoded = items.len(), "decoded bottle list");

        match tag {
            Tag::CompactStringList => Value::CompactStringList(items),
            _ => Value::List(items),
        }
    }
}

/// Word count as written in the `int32` count field
fn word_count(count: usize) -> Result<i32> {
    i32::try_from(count).map_err(|_| BottleError::TooManyWords { count })
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

// ----------------------------------------------------------------------------
// Encoder
// ----------------------------------------------------------------------------

/// Split a command line into words on single spaces
///
/// Consecutive spaces yield empty words, as the nameserver expects.
pub fn split_command(text: &str) -> Vec<&str> {
    text.split(' ').collect()
}

/// Encode words as the body of a compact string list
///
/// The output is `int32 count | (int32 length | bytes)*` with no leading tag;
/// it decodes with `implied = Some(Tag::CompactStringList)`. Each character
/// is written as one Latin-1 byte.
pub fn encode_words<S: AsRef<str>>(words: &[S]) -> Result<Vec<u8>> {
    let count = word_count(words.len())?;
    let capacity = 4 + words.iter().map(|w| 4 + w.as_ref().len()).sum::<usize>();
    let mut bytes = Vec::with_capacity(capacity);
    bytes.extend_from_slice(&count.to_le_bytes());

    for (index, word) in words.iter().enumerate() {
        let encoded = word
            .as_ref()
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| BottleError::NotLatin1 { index }))
            .collect::<Result<Vec<u8>>>()?;
        if encoded.len() > MAX_WORD_LEN {
            return Err(BottleError::WordTooLong {
                index,
                len: encoded.len(),
                max: MAX_WORD_LEN,
            });
        }
        // Bounded by MAX_WORD_LEN
        bytes.extend_from_slice(&(encoded.len() as i32).to_le_bytes());
        bytes.extend_from_slice(&encoded);
    }

    Ok(bytes)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{
        TAG_BLOB, TAG_DICT, TAG_FLOAT32, TAG_FLOAT64, TAG_INT16, TAG_INT64, TAG_INT8, TAG_LIST,
        TAG_STRING, TAG_VOCAB32,
    };

    fn tagged_string(s: &str) -> Vec<u8> {
        let mut buf = TAG_STRING.to_le_bytes().to_vec();
        buf.extend_from_slice(&(s.len() as i32).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
        buf
    }

    #[test]
    fn test_decode_string() {
        let buf = tagged_string("hello");
        let decoded = decode_at(&buf, 0, None);
        assert_eq!(decoded.value, Value::String("hello".into()));
        assert_eq!(decoded.consumed, 13);
    }

    #[test]
    fn test_decode_string_is_latin1() {
        let mut buf = TAG_STRING.to_le_bytes().to_vec();
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&[0xe9, 0x41]);
        assert_eq!(decode(&buf), Value::String("\u{e9}A".into()));
    }

    #[test]
    fn test_decode_small_ints() {
        let mut buf = TAG_INT8.to_le_bytes().to_vec();
        buf.push(0xfe);
        assert_eq!(decode_at(&buf, 0, None), Decoded { value: Value::Int8(-2), consumed: 5 });

        let mut buf = TAG_INT16.to_le_bytes().to_vec();
        buf.extend_from_slice(&(-300i16).to_le_bytes());
        assert_eq!(decode_at(&buf, 0, None), Decoded { value: Value::Int16(-300), consumed: 6 });
    }

    #[test]
    fn test_float64_consumes_eight_bytes() {
        let mut buf = TAG_FLOAT64.to_le_bytes().to_vec();
        buf.extend_from_slice(&1.5f64.to_le_bytes());
        let decoded = decode_at(&buf, 0, None);
        assert_eq!(decoded.value, Value::Float64(1.5));
        assert_eq!(decoded.consumed, 12);
    }

    #[test]
    fn test_decode_vocab32() {
        let vocab = i32::from_le_bytes(*b"ok\0\0");
        let mut buf = TAG_VOCAB32.to_le_bytes().to_vec();
        buf.extend_from_slice(&vocab.to_le_bytes());
        assert_eq!(
            decode_at(&buf, 0, None),
            Decoded { value: Value::Vocab32(vocab), consumed: 8 }
        );
    }

    #[test]
    fn test_decode_float32() {
        let mut buf = TAG_FLOAT32.to_le_bytes().to_vec();
        buf.extend_from_slice(&2.5f32.to_le_bytes());
        buf.extend_from_slice(&[0xaa; 4]);
        assert_eq!(
            decode_at(&buf, 0, None),
            Decoded { value: Value::Float32(2.5), consumed: 8 }
        );
    }

    #[test]
    fn test_decode_blob_keeps_raw_bytes() {
        let mut buf = TAG_BLOB.to_le_bytes().to_vec();
        buf.extend_from_slice(&3i32.to_le_bytes());
        buf.extend_from_slice(&[0xff, 0x00, 0x07]);
        buf.push(0x55);
        assert_eq!(
            decode_at(&buf, 0, None),
            Decoded { value: Value::Blob(vec![0xff, 0x00, 0x07]), consumed: 11 }
        );
    }

    #[test]
    fn test_negative_string_length() {
        let mut buf = TAG_STRING.to_le_bytes().to_vec();
        buf.extend_from_slice(&(-1i32).to_le_bytes());
        let decoded = decode_at(&buf, 0, None);
        assert_eq!(
            decoded.value,
            Value::Error(DecodeFault::NegativeLength { offset: 4, length: -1 })
        );
        assert_eq!(decoded.consumed, 4);
    }

    #[test]
    fn test_implied_tag_reads_no_tag_field() {
        let buf = tagged_string("abc");
        let decoded = decode_at(&buf, 4, Some(Tag::String));
        assert_eq!(decoded.value, Value::String("abc".into()));
        assert_eq!(decoded.consumed, 7);
    }

    #[test]
    fn test_nested_list_consumed() {
        let mut inner = TAG_LIST.to_le_bytes().to_vec();
        inner.extend_from_slice(&1i32.to_le_bytes());
        inner.extend(tagged_string("x"));

        let mut buf = TAG_LIST.to_le_bytes().to_vec();
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend(tagged_string("ok"));
        buf.extend(&inner);

        let decoded = decode_at(&buf, 0, None);
        assert_eq!(decoded.consumed, buf.len());
        assert_eq!(
            decoded.value,
            Value::List(vec![
                Value::String("ok".into()),
                Value::List(vec![Value::String("x".into())]),
            ])
        );
    }

    #[test]
    fn test_unsupported_tags_become_markers() {
        for tag in [TAG_INT64, TAG_DICT] {
            let mut buf = tag.to_le_bytes().to_vec();
            buf.extend_from_slice(&[0u8; 8]);
            let decoded = decode_at(&buf, 0, None);
            assert_eq!(decoded.value, Value::Error(DecodeFault::UnsupportedTag { tag }));
            assert_eq!(decoded.consumed, 4);
        }
    }

    #[test]
    fn test_list_stops_at_first_fault() {
        let mut buf = TAG_LIST.to_le_bytes().to_vec();
        buf.extend_from_slice(&3i32.to_le_bytes());
        buf.extend(tagged_string("a"));
        buf.extend_from_slice(&TAG_INT64.to_le_bytes());
        buf.extend(tagged_string("never read"));

        let decoded = decode_at(&buf, 0, None);
        assert_eq!(
            decoded.value,
            Value::List(vec![
                Value::String("a".into()),
                Value::Error(DecodeFault::UnsupportedTag { tag: TAG_INT64 }),
            ])
        );
        assert_eq!(decoded.consumed, 4 + 4 + 9 + 4);
    }

    #[test]
    fn test_fault_in_sublist_stops_parent() {
        let mut buf = TAG_LIST.to_le_bytes().to_vec();
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&TAG_LIST.to_le_bytes());
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&7i32.to_le_bytes());
        buf.extend(tagged_string("sibling"));

        let value = decode(&buf);
        let items = value.elements().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(value.first_fault(), Some(&DecodeFault::UnknownTag { tag: 7 }));
    }

    #[test]
    fn test_truncated_string_does_not_panic() {
        let mut buf = TAG_STRING.to_le_bytes().to_vec();
        buf.extend_from_slice(&100i32.to_le_bytes());
        buf.extend_from_slice(b"short");
        let decoded = decode_at(&buf, 0, None);
        assert_eq!(
            decoded.value,
            Value::Error(DecodeFault::Truncated { offset: 8, needed: 100, available: 5 })
        );
        assert_eq!(decoded.consumed, 8);
    }

    #[test]
    fn test_empty_buffer() {
        let decoded = decode_at(&[], 0, None);
        assert!(decoded.value.is_error());
        assert_eq!(decoded.consumed, 0);
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let mut buf = Vec::new();
        for _ in 0..(MAX_DEPTH + 4) {
            buf.extend_from_slice(&TAG_LIST.to_le_bytes());
            buf.extend_from_slice(&1i32.to_le_bytes());
        }
        let value = decode(&buf);
        assert_eq!(
            value.first_fault(),
            Some(&DecodeFault::NestingTooDeep { max_depth: MAX_DEPTH })
        );
    }

    #[test]
    fn test_encode_words_layout() {
        let body = encode_words(&["bot", "query", "/port"]).unwrap();
        let mut expected = 3i32.to_le_bytes().to_vec();
        for word in ["bot", "query", "/port"] {
            expected.extend_from_slice(&(word.len() as i32).to_le_bytes());
            expected.extend_from_slice(word.as_bytes());
        }
        assert_eq!(body, expected);
    }

    #[test]
    fn test_encode_then_decode_compact_list() {
        let body = encode_words(&["bot", "query", "/camera/left"]).unwrap();
        let decoded = decode_at(&body, 0, Some(Tag::CompactStringList));
        assert_eq!(decoded.consumed, body.len());
        assert_eq!(
            decoded.value,
            Value::CompactStringList(vec![
                Value::String("bot".into()),
                Value::String("query".into()),
                Value::String("/camera/left".into()),
            ])
        );
    }

    #[test]
    fn test_oversized_word_is_rejected() {
        let long = "x".repeat(260);
        let err = encode_words(&["ok", long.as_str()]).unwrap_err();
        assert_eq!(err, BottleError::WordTooLong { index: 1, len: 260, max: MAX_WORD_LEN });

        let edge = "y".repeat(MAX_WORD_LEN);
        assert!(encode_words(&[edge.as_str()]).is_ok());
        let over = "y".repeat(MAX_WORD_LEN + 1);
        assert!(encode_words(&[over.as_str()]).is_err());
    }

    #[test]
    fn test_word_count_must_fit_int32() {
        assert_eq!(word_count(3), Ok(3));
        assert_eq!(word_count(i32::MAX as usize), Ok(i32::MAX));
        let over = i32::MAX as usize + 1;
        assert_eq!(word_count(over), Err(BottleError::TooManyWords { count: over }));
    }

    #[test]
    fn test_non_latin1_word_is_rejected() {
        let err = encode_words(&["caf\u{e9}", "\u{1f600}"]).unwrap_err();
        assert_eq!(err, BottleError::NotLatin1 { index: 1 });
    }

    #[test]
    fn test_split_command_keeps_empty_words() {
        assert_eq!(split_command("bot query /a"), vec!["bot", "query", "/a"]);
        assert_eq!(split_command("a  b"), vec!["a", "", "b"]);
    }
}
