//! Pure decoding: XML-RPC response body + call context → RpcResponse.
//!
//! No I/O, no side effects. The `call` parameter tells us what value to
//! expect: fldigi answers every method with a single scalar, and only the
//! call that produced it says whether that scalar is a status, TX data or
//! an ignorable return value.

use base64::{engine::general_purpose, Engine as _};

use crate::domain::{FldigiError, FldigiResult, TxPayload};

use super::{RpcCall, RpcResponse, RpcValue};

/// Decode a raw response body from fldigi into a typed RpcResponse.
///
/// Returns `Err` for an XML-RPC fault or a body that cannot be parsed.
pub fn decode(body: &str, call: &RpcCall) -> FldigiResult<RpcResponse> {
    use RpcCall::*;

    let value = parse_response(body)?;
    match call {
        Name => expect_string(value, call).map(RpcResponse::Name),
        GetTrxStatus => expect_string(value, call).map(RpcResponse::TrxStatus),
        GetTxData => tx_data(value, call),
        Tx | Rx | Abort | AddTx(_) | AddTxBytes(_) | ClearTx => Ok(RpcResponse::Ack),
    }
}

/// Extract the single return value of a `<methodResponse>`.
///
/// An empty `<params/>` is treated as `Nil`.
pub fn parse_response(body: &str) -> FldigiResult<RpcValue> {
    if !body.contains("<methodResponse") {
        return Err(FldigiError::Rpc(format!(
            "Not an XML-RPC response: '{}'",
            preview(body)
        )));
    }

    if let Some(fault) = section(body, "fault") {
        return Err(FldigiError::Rpc(format!("Fault: {}", fault_string(fault))));
    }

    let Some(param) = section(body, "param") else {
        return Ok(RpcValue::Nil);
    };
    let value = section(param, "value")
        .ok_or_else(|| FldigiError::Rpc(format!("Missing <value> in '{}'", preview(body))))?;
    parse_value(value)
}

/// Parse the content of a `<value>` element.
pub fn parse_value(inner: &str) -> FldigiResult<RpcValue> {
    let trimmed = inner.trim();

    // Untyped values are strings; their whitespace is significant.
    if !trimmed.starts_with('<') {
        return Ok(RpcValue::Str(unescape(inner)));
    }

    let tag_end = trimmed
        .find('>')
        .ok_or_else(|| FldigiError::Rpc(format!("Malformed value: '{}'", preview(inner))))?;
    let tag = &trimmed[1..tag_end];

    // Self-closing: <nil/>, <string/>
    if let Some(name) = tag.strip_suffix('/') {
        return match name.trim() {
            "nil" => Ok(RpcValue::Nil),
            "string" => Ok(RpcValue::Str(String::new())),
            "base64" => Ok(RpcValue::Bytes(Vec::new())),
            other => Err(FldigiError::Rpc(format!("Unsupported empty value <{other}/>"))),
        };
    }

    let content = section(trimmed, tag)
        .ok_or_else(|| FldigiError::Rpc(format!("Unterminated <{tag}> in '{}'", preview(inner))))?;

    match tag {
        "string" => Ok(RpcValue::Str(unescape(content))),
        "base64" => {
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            general_purpose::STANDARD
                .decode(compact)
                .map(RpcValue::Bytes)
                .map_err(|e| FldigiError::Rpc(format!("Invalid base64 value: {e}")))
        }
        "int" | "i4" | "i8" => content
            .trim()
            .parse::<i64>()
            .map(RpcValue::Int)
            .map_err(|e| FldigiError::Rpc(format!("Invalid integer '{content}': {e}"))),
        "boolean" => match content.trim() {
            "1" => Ok(RpcValue::Bool(true)),
            "0" => Ok(RpcValue::Bool(false)),
            other => Err(FldigiError::Rpc(format!("Invalid boolean '{other}'"))),
        },
        "double" => content
            .trim()
            .parse::<f64>()
            .map(RpcValue::Double)
            .map_err(|e| FldigiError::Rpc(format!("Invalid double '{content}': {e}"))),
        other => Err(FldigiError::Rpc(format!("Unsupported value type <{other}>"))),
    }
}

/// Replace XML entities (named and numeric) with their characters.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let Some(semi) = after.find(';') else {
            out.push_str(after);
            return out;
        };
        let entity = &after[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                // Not an entity we know; keep the ampersand literally
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Content between the first `<tag>` and the following `</tag>`.
fn section<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let end = text[start..].find(&close)? + start;
    Some(&text[start..end])
}

/// Pull `faultString` out of a fault struct, falling back to the raw text.
fn fault_string(fault: &str) -> String {
    fault
        .find("<name>faultString</name>")
        .and_then(|at| section(&fault[at..], "value"))
        .and_then(|value| parse_value(value).ok())
        .map(|value| match value {
            RpcValue::Str(s) => s,
            other => format!("{other:?}"),
        })
        .unwrap_or_else(|| preview(fault))
}

fn expect_string(value: RpcValue, call: &RpcCall) -> FldigiResult<String> {
    match value {
        RpcValue::Str(s) => Ok(s),
        other => Err(FldigiError::Rpc(format!(
            "Expected string for {}, got {other:?}",
            call.method_name()
        ))),
    }
}

fn tx_data(value: RpcValue, call: &RpcCall) -> FldigiResult<RpcResponse> {
    let payload = match value {
        RpcValue::Nil => None,
        RpcValue::Bytes(bytes) if bytes.is_empty() => None,
        RpcValue::Bytes(bytes) => Some(TxPayload::Bytes(bytes)),
        RpcValue::Str(text) if text.is_empty() => None,
        RpcValue::Str(text) => Some(TxPayload::Text(text)),
        other => {
            return Err(FldigiError::Rpc(format!(
                "Expected base64 or string for {}, got {other:?}",
                call.method_name()
            )))
        }
    };
    Ok(RpcResponse::TxData(payload))
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use RpcCall::*;

    fn response(value: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?>\n<methodResponse><params><param>\n\
             <value>{value}</value>\n</param></params></methodResponse>\n"
        )
    }

    // --- Fault ---

    #[test]
    fn fault_returns_err_with_message() {
        let body = "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
                    <member><name>faultCode</name><value><int>-1</int></value></member>\
                    <member><name>faultString</name><value><string>No such method</string></value></member>\
                    </struct></value></fault></methodResponse>";
        let err = decode(body, &GetTrxStatus).unwrap_err();
        assert!(err.to_string().contains("No such method"), "got: {err}");
    }

    #[test]
    fn non_xmlrpc_body_is_err() {
        assert!(decode("<html>502 Bad Gateway</html>", &GetTrxStatus).is_err());
        assert!(decode("", &Tx).is_err());
    }

    // --- GetTrxStatus ---

    #[test]
    fn decode_trx_status_typed_string() {
        assert_eq!(
            decode(&response("<string>tx</string>"), &GetTrxStatus).unwrap(),
            RpcResponse::TrxStatus("tx".into())
        );
    }

    #[test]
    fn decode_trx_status_untyped_string() {
        assert_eq!(
            decode(&response("rx"), &GetTrxStatus).unwrap(),
            RpcResponse::TrxStatus("rx".into())
        );
    }

    #[test]
    fn decode_trx_status_rejects_non_string() {
        assert!(decode(&response("<int>1</int>"), &GetTrxStatus).is_err());
    }

    // --- GetTxData ---

    #[test]
    fn decode_tx_data_base64() {
        assert_eq!(
            decode(&response("<base64>Q1EgQ1E=</base64>"), &GetTxData).unwrap(),
            RpcResponse::TxData(Some(TxPayload::Bytes(b"CQ CQ".to_vec())))
        );
    }

    #[test]
    fn decode_tx_data_base64_with_line_breaks() {
        assert_eq!(
            decode(&response("<base64>Q1Eg\nQ1E=\n</base64>"), &GetTxData).unwrap(),
            RpcResponse::TxData(Some(TxPayload::Bytes(b"CQ CQ".to_vec())))
        );
    }

    #[test]
    fn decode_tx_data_empty_is_none() {
        assert_eq!(
            decode(&response("<base64></base64>"), &GetTxData).unwrap(),
            RpcResponse::TxData(None)
        );
        assert_eq!(
            decode(&response("<base64/>"), &GetTxData).unwrap(),
            RpcResponse::TxData(None)
        );
        assert_eq!(
            decode(&response(""), &GetTxData).unwrap(),
            RpcResponse::TxData(None)
        );
    }

    #[test]
    fn decode_tx_data_string() {
        assert_eq!(
            decode(&response("<string>73</string>"), &GetTxData).unwrap(),
            RpcResponse::TxData(Some(TxPayload::Text("73".into())))
        );
    }

    #[test]
    fn decode_tx_data_invalid_base64_is_err() {
        assert!(decode(&response("<base64>!!!</base64>"), &GetTxData).is_err());
    }

    // --- Actions ---

    #[test]
    fn decode_action_with_empty_params_is_ack() {
        let body = "<?xml version=\"1.0\"?><methodResponse><params/></methodResponse>";
        assert_eq!(decode(body, &Tx).unwrap(), RpcResponse::Ack);
        assert_eq!(decode(body, &ClearTx).unwrap(), RpcResponse::Ack);
    }

    #[test]
    fn decode_action_ignores_return_value() {
        assert_eq!(
            decode(&response("<nil/>"), &Rx).unwrap(),
            RpcResponse::Ack
        );
        assert_eq!(
            decode(&response("<string>ok</string>"), &AddTx("x".into())).unwrap(),
            RpcResponse::Ack
        );
    }

    // --- Name ---

    #[test]
    fn decode_name() {
        assert_eq!(
            decode(&response("<string>fldigi</string>"), &Name).unwrap(),
            RpcResponse::Name("fldigi".into())
        );
    }

    // --- Scalars ---

    #[test]
    fn parse_scalar_values() {
        assert_eq!(parse_value("<int>42</int>").unwrap(), RpcValue::Int(42));
        assert_eq!(parse_value("<i4>-7</i4>").unwrap(), RpcValue::Int(-7));
        assert_eq!(parse_value("<boolean>1</boolean>").unwrap(), RpcValue::Bool(true));
        assert_eq!(parse_value("<double>1.5</double>").unwrap(), RpcValue::Double(1.5));
        assert_eq!(parse_value("<nil/>").unwrap(), RpcValue::Nil);
        assert!(parse_value("<struct></struct>").is_err());
        assert!(parse_value("<boolean>yes</boolean>").is_err());
    }

    #[test]
    fn unescape_entities() {
        assert_eq!(unescape("RST &lt;599&gt; &amp; 73"), "RST <599> & 73");
        assert_eq!(unescape("&#65;&#x42;"), "AB");
        assert_eq!(unescape("&amp;lt;"), "&lt;");
        assert_eq!(unescape("AT&T"), "AT&T");
        assert_eq!(unescape("a & b; c"), "a & b; c");
    }

    #[test]
    fn string_roundtrip_through_escape() {
        let original = "<CQ> & \"DX\" 'de' W1AW";
        let escaped = super::super::encode::escape(original);
        assert_eq!(unescape(&escaped), original);
    }
}
