//! HTTP transport adapter using `reqwest`'s blocking client
//!
//! fldigi's XML-RPC server speaks plain HTTP/1.1 on port 7362 and expects
//! every call as a `text/xml` POST to `/RPC2`.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::domain::{FldigiError, FldigiResult};
use crate::ports::RpcTransport;

const RPC_PATH: &str = "RPC2";

/// An HTTP connection to one fldigi XML-RPC server.
pub struct HttpTransport {
    client: Client,
    url: String,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16, timeout: Duration) -> FldigiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FldigiError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("http://{host}:{port}/{RPC_PATH}"),
        })
    }
}

impl RpcTransport for HttpTransport {
    fn post(&mut self, body: &str) -> FldigiResult<String> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body.to_owned())
            .send()
            .map_err(|e| FldigiError::Transport(format!("POST {} failed: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FldigiError::Transport(format!(
                "POST {} returned HTTP {status}",
                self.url
            )));
        }

        response
            .text()
            .map_err(|e| FldigiError::Transport(format!("Reading response from {} failed: {e}", self.url)))
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}
