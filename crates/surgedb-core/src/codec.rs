//! JSON codec for the surgedb wire protocol.
//!
//! Encoding is deterministic: struct field order is fixed and every request
//! field is present in the output. Decoding accepts either a single response
//! object or a batch array (the server coalesces queued notifications into
//! `[a,b,...]` when its write channel backs up) and preserves array order.

use serde_json::Value;

use crate::errors::DecodeError;
use crate::protocol::{Request, Response};

/// Encode a request to its JSON text frame.
pub fn encode(request: &Request) -> Result<String, DecodeError> {
    Ok(serde_json::to_string(request)?)
}

/// Decode an inbound text frame into one or more responses.
///
/// A single object yields one response; an array yields one response per
/// element, in array order.
pub fn decode(frame: &str) -> Result<Vec<Response>, DecodeError> {
    let value: Value = serde_json::from_str(frame)?;
    match value {
        Value::Object(_) => {
            let response: Response = serde_json::from_value(value)?;
            Ok(vec![response])
        }
        Value::Array(elements) => elements
            .into_iter()
            .map(|element| Ok(serde_json::from_value(element)?))
            .collect(),
        other => Err(DecodeError::UnexpectedShape {
            kind: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Operation, Scope};
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn encode_decode_roundtrip_preserves_fields() {
        let request = Request::watch("users", Operation::Insert)
            .with_key("k1")
            .deferred();
        let frame = encode(&request).unwrap();

        // A request echoed back as a response-shaped frame is not the real
        // protocol, so round-trip through the Request type directly.
        let back: Request = serde_json::from_str(&frame).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.collection, "users");
        assert_eq!(back.scope, Scope::Watch);
        assert_eq!(back.operation, Some(Operation::Insert));
        assert_eq!(back.query["_id"], "k1");
        assert!(back.on_disconnect);
    }

    #[test]
    fn decode_single_object() {
        let responses = decode(r#"{"_uid": "a", "value": {"x": 1}}"#).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].uid.as_str(), "a");
        assert_eq!(responses[0].value["x"], 1);
    }

    #[test]
    fn decode_batch_preserves_order() {
        let frame = r#"[{"_uid":"a","value":{"x":1}},{"_uid":"b","value":{"x":2}}]"#;
        let responses = decode(frame).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].uid.as_str(), "a");
        assert_eq!(responses[1].uid.as_str(), "b");
    }

    #[test]
    fn decode_empty_batch() {
        let responses = decode("[]").unwrap();
        assert!(responses.is_empty());
    }

    #[test]
    fn decode_malformed_json_fails() {
        assert_matches!(decode("{not json"), Err(DecodeError::Json(_)));
    }

    #[test]
    fn decode_scalar_frame_fails() {
        assert_matches!(
            decode("42"),
            Err(DecodeError::UnexpectedShape { kind: "number" })
        );
    }

    #[test]
    fn decode_batch_with_bad_element_fails() {
        let frame = r#"[{"_uid":"a","value":{}}, 7]"#;
        assert_matches!(decode(frame), Err(DecodeError::Json(_)));
    }

    #[test]
    fn decode_object_missing_uid_fails() {
        assert_matches!(decode(r#"{"value": {}}"#), Err(DecodeError::Json(_)));
    }

    #[test]
    fn encoded_request_has_fixed_shape() {
        let frame = encode(&Request::find("users")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(v["scope"], "find");
        assert_eq!(v["operation"], json!(null));
        assert_eq!(v["query"], json!({}));
        assert_eq!(v["value"], json!({}));
    }
}
