//! Pure encoding: RpcCall → XML-RPC `<methodCall>` body.
//!
//! No I/O, no side effects. Easy to unit-test without any transport.

use base64::{engine::general_purpose, Engine as _};

use super::{RpcCall, RpcValue};

/// Encode an RpcCall into a complete XML-RPC request body.
pub fn encode(call: &RpcCall) -> String {
    use RpcCall::*;
    let params: Vec<RpcValue> = match call {
        AddTx(text) => vec![RpcValue::Str(text.clone())],
        AddTxBytes(bytes) => vec![RpcValue::Bytes(bytes.clone())],
        Name | GetTrxStatus | GetTxData | Tx | Rx | Abort | ClearTx => Vec::new(),
    };

    let mut body = String::from("<?xml version=\"1.0\"?>");
    body.push_str("<methodCall><methodName>");
    body.push_str(call.method_name());
    body.push_str("</methodName><params>");
    for param in &params {
        body.push_str("<param>");
        body.push_str(&encode_value(param));
        body.push_str("</param>");
    }
    body.push_str("</params></methodCall>");
    body
}

/// Encode a single `<value>` element.
///
/// Covers the full scalar set on purpose: `RpcValue` is shared with the
/// decoder, so anything fldigi can send back can also be written. The
/// calls in `RpcCall` only pass strings and base64.
pub fn encode_value(value: &RpcValue) -> String {
    match value {
        RpcValue::Nil => "<value><nil/></value>".into(),
        RpcValue::Bool(b) => format!("<value><boolean>{}</boolean></value>", u8::from(*b)),
        RpcValue::Int(i) => format!("<value><int>{i}</int></value>"),
        RpcValue::Double(d) => format!("<value><double>{d}</double></value>"),
        RpcValue::Str(s) => format!("<value><string>{}</string></value>", escape(s)),
        RpcValue::Bytes(bytes) => format!(
            "<value><base64>{}</base64></value>",
            general_purpose::STANDARD.encode(bytes)
        ),
    }
}

/// Escape the characters XML reserves in text content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
