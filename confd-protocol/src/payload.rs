//! Self-describing payload codec.
//!
//! Payloads are flat maps with string keys and scalar values, encoded as a
//! strict subset of CBOR (RFC 8949): definite lengths throughout, unsigned
//! integers at the narrowest width that fits, reals at 64-bit precision
//! unless the encoder is asked for single precision, and no arrays, tags, or
//! nesting. The decoder accepts any integer or float width and widens to 64
//! bits, and skips unrecognized keys so newer peers can add fields.

use crate::error::ProtocolError;
use crate::value::Value;
use bytes::{BufMut, BytesMut};

const MAJOR_UINT: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

const SIMPLE_FALSE: u8 = 20;
const SIMPLE_TRUE: u8 = 21;
const SIMPLE_NULL: u8 = 22;
const AI_U8: u8 = 24;
const AI_U16: u8 = 25;
const AI_U32: u8 = 26;
const AI_U64: u8 = 27;
const AI_INDEFINITE: u8 = 31;

/// Options applied while encoding a payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Encode real values at 32-bit precision. Used for replies when the
    /// request carried the `forceFloat` flag.
    pub single_precision_real: bool,
}

/// A decoded (or under-construction) payload map.
///
/// Insertion order is preserved on encode. Duplicate keys in an incoming
/// payload resolve to the last occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadMap {
    entries: Vec<(String, Value)>,
}

impl PayloadMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing any previous value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetches a required string field.
    pub fn require_text(&self, field: &'static str) -> Result<&str, ProtocolError> {
        match self.get(field) {
            Some(Value::Text(s)) => Ok(s),
            Some(_) => Err(ProtocolError::FieldType {
                field,
                expected: "string",
            }),
            None => Err(ProtocolError::MissingField(field)),
        }
    }

    /// Fetches a required field of any type.
    pub fn require_value(&self, field: &'static str) -> Result<&Value, ProtocolError> {
        self.get(field).ok_or(ProtocolError::MissingField(field))
    }

    /// Fetches an optional boolean field. A present field of another type is
    /// an error; an absent field is `None`, never conflated with null.
    pub fn get_bool(&self, field: &'static str) -> Result<Option<bool>, ProtocolError> {
        match self.get(field) {
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ProtocolError::FieldType {
                field,
                expected: "bool",
            }),
            None => Ok(None),
        }
    }

    /// Encodes the map with default options.
    pub fn encode(&self) -> BytesMut {
        self.encode_with(EncodeOptions::default())
    }

    /// Encodes the map.
    pub fn encode_with(&self, opts: EncodeOptions) -> BytesMut {
        let mut buf = BytesMut::with_capacity(64);
        put_head(&mut buf, MAJOR_MAP, self.entries.len() as u64);
        for (name, value) in &self.entries {
            put_head(&mut buf, MAJOR_TEXT, name.len() as u64);
            buf.put_slice(name.as_bytes());
            put_value(&mut buf, value, opts);
        }
        buf
    }

    /// Decodes a payload from `data`, which must contain exactly one map.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(data);

        let (major, ai) = reader.head()?;
        if major != MAJOR_MAP {
            return Err(ProtocolError::NotAMap);
        }
        let pairs = reader.argument(ai)?;

        let mut map = Self::new();
        for _ in 0..pairs {
            let (key_major, key_ai) = reader.head()?;
            if key_major != MAJOR_TEXT {
                return Err(ProtocolError::NonStringKey);
            }
            let key_len = reader.argument(key_ai)?;
            let key_bytes = reader.take(key_len)?;
            let key = std::str::from_utf8(key_bytes)
                .map_err(|_| ProtocolError::InvalidUtf8)?
                .to_owned();

            let value = decode_value(&mut reader)?;
            map.insert(key, value);
        }

        if !reader.at_end() {
            return Err(ProtocolError::TrailingData);
        }
        Ok(map)
    }
}

/// Writes a major type with its argument at the narrowest width that fits.
fn put_head(buf: &mut BytesMut, major: u8, argument: u64) {
    let major = major << 5;
    if argument < 24 {
        buf.put_u8(major | argument as u8);
    } else if argument <= u8::MAX as u64 {
        buf.put_u8(major | AI_U8);
        buf.put_u8(argument as u8);
    } else if argument <= u16::MAX as u64 {
        buf.put_u8(major | AI_U16);
        buf.put_u16(argument as u16);
    } else if argument <= u32::MAX as u64 {
        buf.put_u8(major | AI_U32);
        buf.put_u32(argument as u32);
    } else {
        buf.put_u8(major | AI_U64);
        buf.put_u64(argument);
    }
}

fn put_value(buf: &mut BytesMut, value: &Value, opts: EncodeOptions) {
    match value {
        Value::Null => buf.put_u8(MAJOR_SIMPLE << 5 | SIMPLE_NULL),
        Value::Bool(false) => buf.put_u8(MAJOR_SIMPLE << 5 | SIMPLE_FALSE),
        Value::Bool(true) => buf.put_u8(MAJOR_SIMPLE << 5 | SIMPLE_TRUE),
        Value::UInt(v) => put_head(buf, MAJOR_UINT, *v),
        Value::Real(r) => {
            if opts.single_precision_real {
                buf.put_u8(MAJOR_SIMPLE << 5 | AI_U32);
                buf.put_f32(*r as f32);
            } else {
                buf.put_u8(MAJOR_SIMPLE << 5 | AI_U64);
                buf.put_f64(*r);
            }
        }
        Value::Text(s) => {
            put_head(buf, MAJOR_TEXT, s.len() as u64);
            buf.put_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            put_head(buf, MAJOR_BYTES, b.len() as u64);
            buf.put_slice(b);
        }
    }
}

fn decode_value(reader: &mut Reader<'_>) -> Result<Value, ProtocolError> {
    let (major, ai) = reader.head()?;
    match major {
        MAJOR_UINT => Ok(Value::UInt(reader.argument(ai)?)),
        1 => Err(ProtocolError::NegativeInteger),
        MAJOR_BYTES => {
            let len = reader.argument(ai)?;
            Ok(Value::Bytes(reader.take(len)?.to_vec()))
        }
        MAJOR_TEXT => {
            let len = reader.argument(ai)?;
            let bytes = reader.take(len)?;
            let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
            Ok(Value::Text(text.to_owned()))
        }
        MAJOR_SIMPLE => match ai {
            SIMPLE_FALSE => Ok(Value::Bool(false)),
            SIMPLE_TRUE => Ok(Value::Bool(true)),
            SIMPLE_NULL => Ok(Value::Null),
            AI_U16 => {
                let bytes = reader.take(2)?;
                let half = u16::from_be_bytes([bytes[0], bytes[1]]);
                Ok(Value::Real(half_to_f64(half)))
            }
            AI_U32 => {
                let bytes = reader.take(4)?;
                let raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                Ok(Value::Real(f32::from_bits(raw) as f64))
            }
            AI_U64 => {
                let bytes = reader.take(8)?;
                let raw = u64::from_be_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
                ]);
                Ok(Value::Real(f64::from_bits(raw)))
            }
            AI_INDEFINITE => Err(ProtocolError::IndefiniteLength),
            AI_U8 => {
                let simple = reader.take(1)?[0];
                Err(ProtocolError::InvalidSimple(simple))
            }
            other => Err(ProtocolError::InvalidSimple(other)),
        },
        MAJOR_ARRAY | MAJOR_MAP | MAJOR_TAG => Err(ProtocolError::UnsupportedType(major)),
        other => Err(ProtocolError::UnsupportedType(other)),
    }
}

/// Converts an IEEE 754 half-precision value to f64 (RFC 8949 appendix D).
fn half_to_f64(half: u16) -> f64 {
    let exponent = (half >> 10) & 0x1f;
    let mantissa = (half & 0x3ff) as f64;
    let magnitude = if exponent == 0 {
        mantissa * 2f64.powi(-24)
    } else if exponent != 31 {
        (mantissa + 1024.0) * 2f64.powi(exponent as i32 - 25)
    } else if mantissa == 0.0 {
        f64::INFINITY
    } else {
        f64::NAN
    };
    if half & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Bounds-checked cursor over the raw payload bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8], ProtocolError> {
        let len = usize::try_from(len).map_err(|_| ProtocolError::Truncated)?;
        let end = self.pos.checked_add(len).ok_or(ProtocolError::Truncated)?;
        if end > self.data.len() {
            return Err(ProtocolError::Truncated);
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads an item head, returning (major type, additional info).
    fn head(&mut self) -> Result<(u8, u8), ProtocolError> {
        let byte = self.take(1)?[0];
        Ok((byte >> 5, byte & 0x1f))
    }

    /// Reads the length/value argument following an item head.
    fn argument(&mut self, ai: u8) -> Result<u64, ProtocolError> {
        match ai {
            0..=23 => Ok(ai as u64),
            AI_U8 => Ok(self.take(1)?[0] as u64),
            AI_U16 => {
                let b = self.take(2)?;
                Ok(u16::from_be_bytes([b[0], b[1]]) as u64)
            }
            AI_U32 => {
                let b = self.take(4)?;
                Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
            }
            AI_U64 => {
                let b = self.take(8)?;
                Ok(u64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))
            }
            AI_INDEFINITE => Err(ProtocolError::IndefiniteLength),
            _ => Err(ProtocolError::ReservedLength),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    fn roundtrip(map: &PayloadMap) -> PayloadMap {
        PayloadMap::decode(&map.encode()).unwrap()
    }

    #[test]
    fn test_empty_map() {
        let map = PayloadMap::new();
        let encoded = map.encode();
        assert_eq!(encoded.as_ref(), b"\xa0");
        assert!(roundtrip(&map).is_empty());
    }

    #[test]
    fn test_scalar_roundtrips() {
        let mut map = PayloadMap::new();
        map.insert(fields::KEY, Value::Text("net.hostname".into()));
        map.insert("n", Value::Null);
        map.insert("b", Value::Bool(true));
        map.insert("u", Value::UInt(42));
        map.insert("r", Value::Real(2.5));
        map.insert("d", Value::Bytes(vec![0x00, 0xff, 0x7f]));

        let decoded = roundtrip(&map);
        assert_eq!(decoded.get(fields::KEY), Some(&Value::Text("net.hostname".into())));
        assert_eq!(decoded.get("n"), Some(&Value::Null));
        assert_eq!(decoded.get("b"), Some(&Value::Bool(true)));
        assert_eq!(decoded.get("u"), Some(&Value::UInt(42)));
        assert_eq!(decoded.get("r"), Some(&Value::Real(2.5)));
        assert_eq!(decoded.get("d"), Some(&Value::Bytes(vec![0x00, 0xff, 0x7f])));
    }

    #[test]
    fn test_narrowest_integer_width() {
        // (value, encoded size of the integer item)
        let widths = [
            (5u64, 1usize),
            (200, 2),
            (40_000, 3),
            (70_000, 5),
            (u64::MAX, 9),
        ];
        for (value, item_len) in widths {
            let mut map = PayloadMap::new();
            map.insert("v", Value::UInt(value));
            // 1 byte map head + 2 bytes for the "v" key, then the item.
            assert_eq!(map.encode().len(), 3 + item_len, "value {value}");
            assert_eq!(roundtrip(&map).get("v"), Some(&Value::UInt(value)));
        }
    }

    #[test]
    fn test_real_default_is_double() {
        let mut map = PayloadMap::new();
        map.insert("r", Value::Real(1.1));
        let encoded = map.encode();
        // map head + "r" key (2 bytes) + 0xfb + 8 bytes
        assert_eq!(encoded.len(), 1 + 2 + 1 + 8);
        assert_eq!(encoded[3], 0xfb);
        assert_eq!(roundtrip(&map).get("r"), Some(&Value::Real(1.1)));
    }

    #[test]
    fn test_real_single_precision_option() {
        let mut map = PayloadMap::new();
        map.insert("r", Value::Real(1.5));
        let encoded = map.encode_with(EncodeOptions {
            single_precision_real: true,
        });
        assert_eq!(encoded[3], 0xfa);
        assert_eq!(encoded.len(), 1 + 2 + 1 + 4);

        let decoded = PayloadMap::decode(&encoded).unwrap();
        assert_eq!(decoded.get("r"), Some(&Value::Real(1.5)));
    }

    #[test]
    fn test_decode_half_float() {
        // {"r": 1.0} with a half-precision real (0xf9 0x3c 0x00)
        let data = b"\xa1\x61\x72\xf9\x3c\x00";
        let map = PayloadMap::decode(data).unwrap();
        assert_eq!(map.get("r"), Some(&Value::Real(1.0)));
    }

    #[test]
    fn test_decode_widens_any_integer_width() {
        // {"v": 42} encoded wastefully as a 64-bit argument
        let data = b"\xa1\x61\x76\x1b\x00\x00\x00\x00\x00\x00\x00\x2a";
        let map = PayloadMap::decode(data).unwrap();
        assert_eq!(map.get("v"), Some(&Value::UInt(42)));
    }

    #[test]
    fn test_reject_indefinite_text() {
        // {"key": <indefinite text>}
        let data = b"\xa1\x63key\x7f\x61a\xff";
        assert!(matches!(
            PayloadMap::decode(data),
            Err(ProtocolError::IndefiniteLength)
        ));
    }

    #[test]
    fn test_reject_indefinite_map() {
        let data = b"\xbf\xff";
        assert!(matches!(
            PayloadMap::decode(data),
            Err(ProtocolError::IndefiniteLength)
        ));
    }

    #[test]
    fn test_reject_negative_integer() {
        // {"v": -5}
        let data = b"\xa1\x61\x76\x24";
        assert!(matches!(
            PayloadMap::decode(data),
            Err(ProtocolError::NegativeInteger)
        ));
    }

    #[test]
    fn test_reject_nested_containers() {
        // {"v": []}
        let data = b"\xa1\x61\x76\x80";
        assert!(matches!(
            PayloadMap::decode(data),
            Err(ProtocolError::UnsupportedType(4))
        ));

        // {"v": {}}
        let data = b"\xa1\x61\x76\xa0";
        assert!(matches!(
            PayloadMap::decode(data),
            Err(ProtocolError::UnsupportedType(5))
        ));
    }

    #[test]
    fn test_reject_non_string_key() {
        // {1: 2}
        let data = b"\xa1\x01\x02";
        assert!(matches!(
            PayloadMap::decode(data),
            Err(ProtocolError::NonStringKey)
        ));
    }

    #[test]
    fn test_reject_truncated() {
        let mut map = PayloadMap::new();
        map.insert("key", Value::Text("a.b".into()));
        let encoded = map.encode();
        let result = PayloadMap::decode(&encoded[..encoded.len() - 1]);
        assert!(matches!(result, Err(ProtocolError::Truncated)));
    }

    #[test]
    fn test_reject_trailing_bytes() {
        let mut data = PayloadMap::new().encode().to_vec();
        data.push(0x00);
        assert!(matches!(
            PayloadMap::decode(&data),
            Err(ProtocolError::TrailingData)
        ));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        // {"v": 1, "v": 2}
        let data = b"\xa2\x61\x76\x01\x61\x76\x02";
        let map = PayloadMap::decode(data).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("v"), Some(&Value::UInt(2)));
    }

    #[test]
    fn test_unknown_scalar_fields_are_kept() {
        // Unknown keys with scalar values decode fine; callers simply ignore
        // names they do not recognize.
        let mut map = PayloadMap::new();
        map.insert("key", Value::Text("a".into()));
        map.insert("futureFlag", Value::Bool(false));
        let decoded = roundtrip(&map);
        assert_eq!(decoded.require_text("key").unwrap(), "a");
    }

    #[test]
    fn test_require_text() {
        let mut map = PayloadMap::new();
        map.insert("key", Value::UInt(1));

        assert!(matches!(
            map.require_text("key"),
            Err(ProtocolError::FieldType { field: "key", .. })
        ));
        assert!(matches!(
            map.require_text("missing"),
            Err(ProtocolError::MissingField("missing"))
        ));
    }

    #[test]
    fn test_optional_bool() {
        let mut map = PayloadMap::new();
        map.insert(fields::FORCE_FLOAT, Value::Bool(true));
        assert_eq!(map.get_bool(fields::FORCE_FLOAT).unwrap(), Some(true));
        assert_eq!(map.get_bool("absent").unwrap(), None);

        map.insert("bad", Value::UInt(1));
        assert!(map.get_bool("bad").is_err());
    }

    #[test]
    fn test_absent_distinct_from_null() {
        let mut map = PayloadMap::new();
        map.insert("present", Value::Null);
        let decoded = roundtrip(&map);
        assert_eq!(decoded.get("present"), Some(&Value::Null));
        assert_eq!(decoded.get("absent"), None);
    }
}
