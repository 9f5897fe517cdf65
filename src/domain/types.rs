//! Core domain types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{FldigiError, FldigiResult};

/// Number of characters shown before a payload is truncated in diagnostics
const DISPLAY_TRUNCATE_CHARS: usize = 25;

/// Transmit/receive state of the remote modem.
///
/// `Error` is what any unreachable or unrecognised status collapses to.
/// Once the supervisor observes it, automatic return to receive stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrxState {
    Tx,
    Rx,
    Tune,
    Error,
}

impl TrxState {
    /// Normalize a raw status string reported by fldigi.
    ///
    /// fldigi answers `main.get_trx_status` with `"tx"`, `"rx"` or `"tune"`.
    /// Anything else (including garbage) maps to `Error` instead of being
    /// passed further into the system.
    pub fn from_remote(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tx" => TrxState::Tx,
            "rx" => TrxState::Rx,
            "tune" => TrxState::Tune,
            _ => TrxState::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrxState::Tx => "TX",
            TrxState::Rx => "RX",
            TrxState::Tune => "TUNE",
            TrxState::Error => "ERROR",
        }
    }
}

impl fmt::Display for TrxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing: a name outside `TX`/`RX`/`TUNE`/`ERROR` is a contract
/// violation, not something to normalize.
impl FromStr for TrxState {
    type Err = FldigiError;

    fn from_str(s: &str) -> FldigiResult<Self> {
        match s {
            "TX" => Ok(TrxState::Tx),
            "RX" => Ok(TrxState::Rx),
            "TUNE" => Ok(TrxState::Tune),
            "ERROR" => Ok(TrxState::Error),
            other => Err(FldigiError::InvalidState(format!(
                "'{other}' must be one of TX, RX, TUNE, ERROR"
            ))),
        }
    }
}

/// Text handed to fldigi for transmission, or data it reports as sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl TxPayload {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length in characters for text, in bytes for raw data.
    pub fn len(&self) -> usize {
        match self {
            TxPayload::Text(text) => text.chars().count(),
            TxPayload::Bytes(bytes) => bytes.len(),
        }
    }

    /// Lossless text view. Bytes are read as ISO-8859-1, which is what
    /// fldigi's TX buffer holds.
    pub fn to_text(&self) -> String {
        match self {
            TxPayload::Text(text) => text.clone(),
            TxPayload::Bytes(bytes) => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    /// Quoted form for logs, cut after 25 characters:
    /// `'CQ CQ CQ DE W1AW W1AW W1A'... (length=40)`
    pub fn display_truncated(&self) -> String {
        let text = self.to_text();
        let length = text.chars().count();
        if length > DISPLAY_TRUNCATE_CHARS {
            let head: String = text.chars().take(DISPLAY_TRUNCATE_CHARS).collect();
            format!("'{head}'... (length={length})")
        } else {
            format!("'{text}'")
        }
    }
}

impl From<&str> for TxPayload {
    fn from(text: &str) -> Self {
        TxPayload::Text(text.to_string())
    }
}

impl From<String> for TxPayload {
    fn from(text: String) -> Self {
        TxPayload::Text(text)
    }
}

impl From<Vec<u8>> for TxPayload {
    fn from(bytes: Vec<u8>) -> Self {
        TxPayload::Bytes(bytes)
    }
}

impl From<&[u8]> for TxPayload {
    fn from(bytes: &[u8]) -> Self {
        TxPayload::Bytes(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_remote_accepts_fldigi_status_strings() {
        assert_eq!(TrxState::from_remote("tx"), TrxState::Tx);
        assert_eq!(TrxState::from_remote("rx"), TrxState::Rx);
        assert_eq!(TrxState::from_remote("tune"), TrxState::Tune);
        // main.get_trx_state answers in upper case
        assert_eq!(TrxState::from_remote("TX"), TrxState::Tx);
        assert_eq!(TrxState::from_remote(" RX\n"), TrxState::Rx);
    }

    #[test]
    fn from_remote_maps_garbage_to_error() {
        assert_eq!(TrxState::from_remote(""), TrxState::Error);
        assert_eq!(TrxState::from_remote("transmitting"), TrxState::Error);
        assert_eq!(TrxState::from_remote("42"), TrxState::Error);
    }

    #[test]
    fn strict_parse_rejects_unknown_names() {
        assert_eq!("TUNE".parse::<TrxState>().unwrap(), TrxState::Tune);
        let err = "IDLE".parse::<TrxState>().unwrap_err();
        assert!(matches!(err, FldigiError::InvalidState(_)));
    }

    #[test]
    fn display_matches_strict_parse() {
        for state in [TrxState::Tx, TrxState::Rx, TrxState::Tune, TrxState::Error] {
            assert_eq!(state.to_string().parse::<TrxState>().unwrap(), state);
        }
    }

    #[test]
    fn state_serializes_upper_case() {
        let json = serde_json::to_string(&TrxState::Tune).unwrap();
        assert_eq!(json, "\"TUNE\"");
    }

    #[test]
    fn short_payload_displays_in_full() {
        assert_eq!(TxPayload::from("CQ").display_truncated(), "'CQ'");
    }

    #[test]
    fn long_payload_is_truncated_with_length() {
        let payload = TxPayload::from("CQ CQ CQ DE W1AW W1AW W1AW K");
        assert_eq!(
            payload.display_truncated(),
            "'CQ CQ CQ DE W1AW W1AW W1A'... (length=28)"
        );
    }

    #[test]
    fn bytes_display_as_latin1() {
        let payload = TxPayload::Bytes(vec![b'7', b'3', 0xB0]);
        assert_eq!(payload.to_text(), "73\u{b0}");
        assert_eq!(payload.len(), 3);
    }

    #[test]
    fn empty_payloads() {
        assert!(TxPayload::from("").is_empty());
        assert!(TxPayload::Bytes(Vec::new()).is_empty());
        assert!(!TxPayload::from("K").is_empty());
    }
}
