//! Wire envelope types.
//!
//! Every message on the wire is one `Envelope`, an internally tagged map
//! (`"type"` key) serialized as named `MsgPack`. Field names are camelCase.
//! The body type is generic so requests can be encoded straight from the
//! caller's payload while decoding goes through an `rmpv::Value` tree first.

use serde::{Deserialize, Serialize};

/// Envelope with an untyped body, as read off the wire before the body is
/// matched against a response type.
pub type RawEnvelope = Envelope<rmpv::Value>;

/// Top-level wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope<B> {
    #[serde(rename = "REQUEST")]
    Request(RequestEnvelope<B>),
    #[serde(rename = "REPLY")]
    Reply(ReplyEnvelope<B>),
    #[serde(rename = "FAULT")]
    Fault(FaultEnvelope),
}

impl<B> Envelope<B> {
    /// Variant name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "REQUEST",
            Self::Reply(_) => "REPLY",
            Self::Fault(_) => "FAULT",
        }
    }
}

/// An operation invocation addressed to an action URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope<B> {
    pub action: String,
    pub message_id: String,
    pub operation: String,
    pub body: B,
}

/// A successful reply. `action` is the request action with the `Response`
/// suffix; `relates_to` echoes the request's message id when the peer
/// supports correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyEnvelope<B> {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub relates_to: Option<String>,
    pub body: B,
}

/// A failed call as reported by the remote service.
///
/// Transient: lives only while one failed call is being mapped to a typed
/// fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultEnvelope {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subcode: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<rmpv::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub relates_to: Option<String>,
}

impl FaultEnvelope {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            subcode: None,
            message: message.into(),
            detail: None,
            relates_to: None,
        }
    }

    #[must_use]
    pub fn with_subcode(mut self, subcode: impl Into<String>) -> Self {
        self.subcode = Some(subcode.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: rmpv::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    #[must_use]
    pub fn relating_to(mut self, message_id: impl Into<String>) -> Self {
        self.relates_to = Some(message_id.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_envelope_uses_type_tag_and_camel_case() {
        let env: Envelope<rmpv::Value> = Envelope::Request(RequestEnvelope {
            action: "urn:test/Ping".into(),
            message_id: "urn:uuid:1".into(),
            operation: "Ping".into(),
            body: rmpv::Value::Nil,
        });

        let bytes = rmp_serde::to_vec_named(&env).expect("serialize");
        let tree: rmpv::Value = rmp_serde::from_slice(&bytes).expect("parse as tree");
        let map = tree.as_map().expect("envelope is a map");
        let keys: Vec<&str> = map.iter().filter_map(|(k, _)| k.as_str()).collect();

        assert_eq!(keys, vec!["type", "action", "messageId", "operation", "body"]);
        assert_eq!(map[0].1.as_str(), Some("REQUEST"));
    }

    #[test]
    fn fault_envelope_omits_absent_optionals() {
        let env: RawEnvelope = Envelope::Fault(FaultEnvelope::new("AuthFailure", "denied"));
        let bytes = rmp_serde::to_vec_named(&env).expect("serialize");
        let tree: rmpv::Value = rmp_serde::from_slice(&bytes).expect("parse as tree");
        let keys: Vec<&str> = tree
            .as_map()
            .expect("map")
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["type", "code", "message"]);
    }

    #[test]
    fn fault_envelope_roundtrips_with_detail() {
        let fault = FaultEnvelope::new("Client", "bad value")
            .with_subcode("InvalidParameterValue")
            .with_detail(rmpv::Value::Map(vec![(
                rmpv::Value::from("parameter"),
                rmpv::Value::from("RegionName"),
            )]))
            .relating_to("urn:uuid:42");
        let env: RawEnvelope = Envelope::Fault(fault);

        let bytes = rmp_serde::to_vec_named(&env).expect("serialize");
        let decoded: RawEnvelope = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(env, decoded);
        assert_eq!(decoded.kind(), "FAULT");
    }
}
