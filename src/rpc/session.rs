//! RpcSession: owns a transport and drives XML-RPC request/response.
//!
//! Pure translation lives in `encode` / `decode`. RpcSession only handles
//! I/O and logging.

use crate::domain::{FldigiError, FldigiResult};
use crate::ports::RpcTransport;

use super::{decode, encode, RpcCall, RpcResponse};

/// Owns a transport and executes XML-RPC calls against fldigi.
pub struct RpcSession {
    transport: Box<dyn RpcTransport>,
}

impl RpcSession {
    pub fn new(transport: Box<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Send a call and return the parsed response.
    ///
    /// Transport failures keep their `Transport` classification so callers
    /// can tell an unreachable fldigi from one that answered nonsense.
    pub fn execute(&mut self, call: &RpcCall) -> FldigiResult<RpcResponse> {
        let body = encode(call);
        log::debug!("RPC TX: {} -> {}", call.method_name(), self.transport.endpoint());

        let reply = self.transport.post(&body).map_err(|e| match e {
            FldigiError::Transport(msg) => {
                FldigiError::Transport(format!("{} failed: {msg}", call.method_name()))
            }
            other => other,
        })?;

        log::trace!("RPC RX: {reply}");

        decode(&reply, call).map_err(|e| match e {
            FldigiError::Rpc(msg) => FldigiError::Rpc(format!("{}: {msg}", call.method_name())),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxPayload;
    use std::sync::{Arc, Mutex};

    // ---------------------------------------------------------------------------
    // MockTransport for RpcSession tests
    // ---------------------------------------------------------------------------

    struct MockTransport {
        log: Arc<Mutex<Vec<String>>>,
        response: FldigiResult<String>,
    }

    impl RpcTransport for MockTransport {
        fn post(&mut self, body: &str) -> FldigiResult<String> {
            self.log.lock().unwrap().push(body.to_string());
            match &self.response {
                Ok(reply) => Ok(reply.clone()),
                Err(e) => Err(FldigiError::Transport(e.to_string())),
            }
        }
        fn endpoint(&self) -> String {
            "mock".into()
        }
    }

    fn make_session(response: FldigiResult<String>) -> (RpcSession, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mock = MockTransport {
            log: Arc::clone(&log),
            response,
        };
        (RpcSession::new(Box::new(mock)), log)
    }

    fn reply(value: &str) -> FldigiResult<String> {
        Ok(format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value>{value}</value>\
             </param></params></methodResponse>"
        ))
    }

    #[test]
    fn execute_sends_method_call() {
        let (mut session, log) = make_session(reply("<string>rx</string>"));
        session.execute(&RpcCall::GetTrxStatus).unwrap();
        assert!(log.lock().unwrap()[0].contains("<methodName>main.get_trx_status</methodName>"));
    }

    #[test]
    fn execute_returns_decoded_status() {
        let (mut session, _) = make_session(reply("<string>tune</string>"));
        let resp = session.execute(&RpcCall::GetTrxStatus).unwrap();
        assert_eq!(resp, RpcResponse::TrxStatus("tune".into()));
    }

    #[test]
    fn execute_returns_tx_data() {
        let (mut session, _) = make_session(reply("<base64>SEk=</base64>"));
        let resp = session.execute(&RpcCall::GetTxData).unwrap();
        assert_eq!(resp, RpcResponse::TxData(Some(TxPayload::Bytes(b"HI".to_vec()))));
    }

    #[test]
    fn transport_failure_stays_transport_error() {
        let (mut session, _) =
            make_session(Err(FldigiError::Transport("connection refused".into())));
        let err = session.execute(&RpcCall::Tx).unwrap_err();
        match err {
            FldigiError::Transport(msg) => {
                assert!(msg.contains("main.tx"), "got: {msg}");
                assert!(msg.contains("connection refused"), "got: {msg}");
            }
            other => panic!("expected Transport error, got {other:?}"),
        }
    }

    #[test]
    fn decode_failure_names_the_method() {
        let (mut session, _) = make_session(Ok("garbage".into()));
        let err = session.execute(&RpcCall::GetTrxStatus).unwrap_err();
        assert!(matches!(err, FldigiError::Rpc(ref m) if m.contains("main.get_trx_status")));
    }
}
