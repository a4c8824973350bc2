//! The six scalar/string variants a blob may hold, and their wire encoding.
//!
//! Each value is stored as a single blob: one tag byte followed by a
//! fixed or variable-length payload. Tags `6` and `7` are reserved by
//! [`comexe_protocol`] for its own `START`/`END` framing blobs and are never
//! produced or consumed here.

/// A typed scalar or string value, matching the six argument variants the
/// event protocol understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Nil,
    /// An opaque handle passed by value; the store never interprets it.
    Opaque(u64),
    String(Vec<u8>),
}

const TAG_INTEGER: u8 = 0;
const TAG_DOUBLE: u8 = 1;
const TAG_BOOLEAN: u8 = 2;
const TAG_NIL: u8 = 3;
const TAG_OPAQUE: u8 = 4;
const TAG_STRING: u8 = 5;

impl Value {
    /// The type tag a host would report for this value ahead of a typed
    /// pull, collapsing `Integer`/`Double` into one "number" category the
    /// way a host whose numbers carry no static int/float distinction
    /// would: integer-vs-double is a separate question, answered by
    /// `ScriptHost::is_integer_at`, not by the type tag itself.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) | Value::Double(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Nil => "nil",
            Value::Opaque(_) => "userdata",
            Value::String(_) => "string",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Value::Integer(v) => {
                let mut out = Vec::with_capacity(9);
                out.push(TAG_INTEGER);
                out.extend_from_slice(&v.to_le_bytes());
                out
            }
            Value::Double(v) => {
                let mut out = Vec::with_capacity(9);
                out.push(TAG_DOUBLE);
                out.extend_from_slice(&v.to_le_bytes());
                out
            }
            Value::Boolean(v) => vec![TAG_BOOLEAN, u8::from(*v)],
            Value::Nil => vec![TAG_NIL],
            Value::Opaque(v) => {
                let mut out = Vec::with_capacity(9);
                out.push(TAG_OPAQUE);
                out.extend_from_slice(&v.to_le_bytes());
                out
            }
            Value::String(bytes) => {
                // length, inline bytes, NUL terminator.
                let mut out = Vec::with_capacity(1 + 4 + bytes.len() + 1);
                out.push(TAG_STRING);
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(bytes);
                out.push(0);
                out
            }
        }
    }

    /// Decodes a value previously produced by [`Value::encode`]. Returns
    /// `None` for tags this type does not own (e.g. the protocol's
    /// `START`/`END` framing tags) or malformed payloads.
    pub fn decode(bytes: &[u8]) -> Option<Value> {
        let (&tag, rest) = bytes.split_first()?;
        match tag {
            TAG_INTEGER => Some(Value::Integer(i64::from_le_bytes(rest.try_into().ok()?))),
            TAG_DOUBLE => Some(Value::Double(f64::from_le_bytes(rest.try_into().ok()?))),
            TAG_BOOLEAN => Some(Value::Boolean(*rest.first()? != 0)),
            TAG_NIL => Some(Value::Nil),
            TAG_OPAQUE => Some(Value::Opaque(u64::from_le_bytes(rest.try_into().ok()?))),
            TAG_STRING => {
                if rest.len() < 4 {
                    return None;
                }
                let (len_bytes, tail) = rest.split_at(4);
                let len = u32::from_le_bytes(len_bytes.try_into().ok()?) as usize;
                if tail.len() != len + 1 || tail[len] != 0 {
                    return None;
                }
                Some(Value::String(tail[..len].to_vec()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let values = vec![
            Value::Integer(-7),
            Value::Double(3.5),
            Value::Boolean(true),
            Value::Boolean(false),
            Value::Nil,
            Value::Opaque(0xdead_beef),
            Value::String(b"hi".to_vec()),
            Value::String(vec![]),
        ];
        for value in values {
            let encoded = value.encode();
            assert_eq!(Value::decode(&encoded), Some(value));
        }
    }

    #[test]
    fn string_with_embedded_nul_round_trips_exactly() {
        let bytes = b"abc\0defghi".to_vec();
        let value = Value::String(bytes.clone());
        let encoded = value.encode();
        assert_eq!(Value::decode(&encoded), Some(Value::String(bytes)));
    }

    #[test]
    fn unknown_tag_decodes_to_none() {
        assert_eq!(Value::decode(&[200, 1, 2, 3]), None);
    }
}
