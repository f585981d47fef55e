//! Conversions between msgpack values and `serde_json` documents.

use mpack_types::timestamp::TIMESTAMP_TYPE;
use mpack_types::{Timestamp, Value};
use mpack_zone::{Zone, ZoneError};
use serde_json::{Map, Number, Value as Json, json};

/// Render a value as JSON.
///
/// ```text
/// ┌───────────────┬──────────────────────────────────────────────┐
/// │ msgpack       │ JSON                                         │
/// ├───────────────┼──────────────────────────────────────────────┤
/// │ nil           │ null                                         │
/// │ int / float   │ number (NaN and infinities become null)      │
/// │ str           │ string (invalid UTF-8 replaced)              │
/// │ bin           │ array of byte values                         │
/// │ ext -1        │ {"timestamp": {"seconds": s, "nanos": n}}    │
/// │ ext           │ {"ext": type, "data": [bytes]}               │
/// │ map           │ object; non-string keys use their text form  │
/// └───────────────┴──────────────────────────────────────────────┘
/// ```
pub fn to_json(value: &Value<'_>) -> Json {
    match *value {
        Value::Nil => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::UInt(n) => Json::from(n),
        Value::Int(n) => Json::from(n),
        Value::F32(f) => float(f64::from(f)),
        Value::F64(f) => float(f),
        Value::Str(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
        Value::Bin(bytes) => Json::from(bytes.to_vec()),
        Value::Ext(ext) if ext.type_tag == TIMESTAMP_TYPE => match Timestamp::from_payload(ext.data) {
            Ok(ts) => json!({ "timestamp": { "seconds": ts.seconds, "nanos": ts.nanos } }),
            Err(_) => json!({ "ext": ext.type_tag, "data": ext.data }),
        },
        Value::Ext(ext) => json!({ "ext": ext.type_tag, "data": ext.data }),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => Json::Object(
            pairs
                .iter()
                .map(|(k, v)| (key_text(k), to_json(v)))
                .collect::<Map<String, Json>>(),
        ),
    }
}

fn float(f: f64) -> Json {
    Number::from_f64(f).map_or(Json::Null, Json::Number)
}

fn key_text(key: &Value<'_>) -> String {
    match key {
        Value::Str(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => other.to_string(),
    }
}

/// Build a value for `json` inside `zone`.
///
/// Integers take the narrowest signedness that holds them; every other
/// number becomes a float64.
pub fn from_json<'z>(json: &Json, zone: &'z Zone) -> Result<Value<'z>, ZoneError> {
    match json {
        Json::Null => Ok(Value::Nil),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => Ok(if let Some(u) = n.as_u64() {
            Value::UInt(u)
        } else if let Some(i) = n.as_i64() {
            Value::Int(i)
        } else {
            n.as_f64().map_or(Value::Nil, Value::F64)
        }),
        Json::String(s) => Value::str_in(zone, s),
        Json::Array(items) => {
            let values = items
                .iter()
                .map(|item| from_json(item, zone))
                .collect::<Result<Vec<_>, _>>()?;
            Value::array_in(zone, &values)
        }
        Json::Object(map) => {
            let pairs = map
                .iter()
                .map(|(k, v)| Ok((Value::str_in(zone, k)?, from_json(v, zone)?)))
                .collect::<Result<Vec<_>, ZoneError>>()?;
            Value::map_in(zone, &pairs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_value_and_back() {
        let doc = json!({ "name": "mpack", "tags": [1, -2, 2.5, null, true] });
        let zone = Zone::new();
        let value = from_json(&doc, &zone).unwrap();
        assert_eq!(value.to_string(), r#"{"name":"mpack","tags":[1,-2,2.5,null,true]}"#);
        assert_eq!(to_json(&value), doc);
    }

    #[test]
    fn binary_and_ext_render_as_objects() {
        let ext = mpack_types::Ext::new(5, &[1, 2]);
        assert_eq!(to_json(&Value::Bin(&[7, 8])), json!([7, 8]));
        assert_eq!(to_json(&Value::Ext(ext)), json!({ "ext": 5, "data": [1, 2] }));
    }

    #[test]
    fn timestamp_ext_is_decoded() {
        let ext = mpack_types::Ext::new(-1, &[0, 0, 0, 60]);
        assert_eq!(
            to_json(&Value::Ext(ext)),
            json!({ "timestamp": { "seconds": 60, "nanos": 0 } })
        );
    }

    #[test]
    fn non_string_keys_use_text_form() {
        let pairs = [(Value::UInt(1), Value::Nil)];
        assert_eq!(to_json(&Value::Map(&pairs)), json!({ "1": null }));
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(to_json(&Value::F64(f64::NAN)), Json::Null);
    }
}
