//! Negotiation payloads carried inside `signal` messages.
//!
//! The server relays these as opaque JSON. Clients run every inbound payload
//! through [`validate_signal`], which accepts exactly one of a session
//! description or a single connectivity candidate.

use crate::error::{PairError, PairResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session description kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// An offer or answer produced by a negotiation object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A single ICE-style connectivity candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

/// A validated negotiation payload.
///
/// Serializes as `{"sdp": {...}}` or `{"candidate": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalPayload {
    Sdp(SessionDescription),
    Candidate(IceCandidate),
}

impl SignalPayload {
    /// Convert into the opaque JSON form carried by `signal` messages.
    pub fn to_value(&self) -> PairResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Validate the shape of a relayed payload.
///
/// Exactly one of `sdp` or `candidate` must be present (a `null` field counts
/// as absent). `sdp.type` must be `offer` or `answer`, `sdp.sdp` and
/// `candidate.candidate` must be strings.
pub fn validate_signal(value: &Value) -> PairResult<SignalPayload> {
    let obj = value
        .as_object()
        .ok_or_else(|| PairError::InvalidMessage("signal must be an object".into()))?;

    let sdp = obj.get("sdp").filter(|v| !v.is_null());
    let candidate = obj.get("candidate").filter(|v| !v.is_null());

    match (sdp, candidate) {
        (Some(_), Some(_)) => Err(PairError::InvalidMessage(
            "signal carries both sdp and candidate".into(),
        )),
        (None, None) => Err(PairError::InvalidMessage(
            "signal carries neither sdp nor candidate".into(),
        )),
        (Some(sdp), None) => {
            let desc: SessionDescription = serde_json::from_value(sdp.clone())
                .map_err(|e| PairError::InvalidMessage(format!("malformed sdp: {e}")))?;
            Ok(SignalPayload::Sdp(desc))
        }
        (None, Some(candidate)) => {
            let cand: IceCandidate = serde_json::from_value(candidate.clone())
                .map_err(|e| PairError::InvalidMessage(format!("malformed candidate: {e}")))?;
            Ok(SignalPayload::Candidate(cand))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_offer() {
        let payload = validate_signal(&json!({"sdp": {"type": "offer", "sdp": "v=0"}})).unwrap();
        assert_eq!(payload, SignalPayload::Sdp(SessionDescription::offer("v=0")));
    }

    #[test]
    fn accepts_candidate_with_extra_fields() {
        let payload = validate_signal(&json!({
            "candidate": {
                "candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54321 typ host",
                "sdpMid": "0",
                "sdpMLineIndex": 0
            }
        }))
        .unwrap();
        match payload {
            SignalPayload::Candidate(c) => {
                assert_eq!(c.sdp_mid.as_deref(), Some("0"));
                assert_eq!(c.sdp_mline_index, Some(0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn rejects_both() {
        let result = validate_signal(&json!({
            "sdp": {"type": "offer", "sdp": "v=0"},
            "candidate": {"candidate": "c"}
        }));
        assert!(matches!(result, Err(PairError::InvalidMessage(_))));
    }

    #[test]
    fn rejects_neither() {
        assert!(validate_signal(&json!({})).is_err());
        assert!(validate_signal(&json!({"sdp": null, "candidate": null})).is_err());
    }

    #[test]
    fn null_field_counts_as_absent() {
        let payload = validate_signal(&json!({"sdp": null, "candidate": {"candidate": "c"}})).unwrap();
        assert_eq!(payload, SignalPayload::Candidate(IceCandidate::new("c")));
    }

    #[test]
    fn rejects_unknown_sdp_type() {
        assert!(validate_signal(&json!({"sdp": {"type": "pranswer", "sdp": "v=0"}})).is_err());
    }

    #[test]
    fn rejects_non_string_fields() {
        assert!(validate_signal(&json!({"sdp": {"type": "offer", "sdp": 5}})).is_err());
        assert!(validate_signal(&json!({"candidate": {"candidate": false}})).is_err());
        assert!(validate_signal(&json!("offer")).is_err());
    }

    #[test]
    fn payload_wire_shape() {
        let value = SignalPayload::Sdp(SessionDescription::answer("v=0")).to_value().unwrap();
        assert_eq!(value, json!({"sdp": {"type": "answer", "sdp": "v=0"}}));

        let value = SignalPayload::Candidate(IceCandidate::new("c")).to_value().unwrap();
        assert_eq!(value, json!({"candidate": {"candidate": "c"}}));
    }
}
