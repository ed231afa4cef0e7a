//! Wire codec: typed payloads to and from named `MsgPack` envelopes.
//!
//! Encoding is pure and deterministic: struct fields are written in
//! declaration order and `None` optionals are skipped. Decoding reads the
//! envelope into an `rmpv::Value` tree first, then matches the body against
//! the expected response type.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::descriptor::{OperationDescriptor, REPLY_ACTION_SUFFIX};
use crate::envelope::{Envelope, FaultEnvelope, RawEnvelope, ReplyEnvelope, RequestEnvelope};

/// Content type of every encoded envelope.
pub const CONTENT_TYPE: &str = "application/msgpack";

// ---------------------------------------------------------------------------
// Errors / outcomes
// ---------------------------------------------------------------------------

/// Errors produced by the wire codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode {operation} envelope: {source}")]
    Encode {
        operation: String,
        #[source]
        source: rmp_serde::encode::Error,
    },
    #[error("malformed response for {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },
}

/// A decoded response envelope: either the typed reply body or a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<R> {
    Reply { body: R, relates_to: Option<String> },
    Fault(FaultEnvelope),
}

impl<R> Decoded<R> {
    /// Message id the peer says this envelope answers, if any.
    #[must_use]
    pub fn relates_to(&self) -> Option<&str> {
        match self {
            Self::Reply { relates_to, .. } => relates_to.as_deref(),
            Self::Fault(fault) => fault.relates_to.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// WireCodec
// ---------------------------------------------------------------------------

/// Stateless `MsgPack` envelope codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCodec;

impl WireCodec {
    /// Encodes a request envelope addressed to the operation's action URI.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the request cannot be serialized.
    pub fn encode_request<R: Serialize>(
        &self,
        descriptor: &OperationDescriptor,
        message_id: &str,
        request: &R,
    ) -> Result<Bytes, CodecError> {
        let envelope = Envelope::Request(RequestEnvelope {
            action: descriptor.action().to_string(),
            message_id: message_id.to_string(),
            operation: descriptor.name().to_string(),
            body: request,
        });
        to_bytes(descriptor.name(), &envelope)
    }

    /// Decodes a response envelope for the given operation.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::MalformedResponse` when the bytes are not an
    /// envelope, are a request envelope, are a reply addressed to another
    /// action, or carry a body that does not fit `R`.
    pub fn decode_response<R: DeserializeOwned>(
        &self,
        descriptor: &OperationDescriptor,
        bytes: &[u8],
    ) -> Result<Decoded<R>, CodecError> {
        let malformed = |reason: String| CodecError::MalformedResponse {
            operation: descriptor.name().to_string(),
            reason,
        };

        let envelope: RawEnvelope = rmp_serde::from_slice(bytes)
            .map_err(|err| malformed(format!("not an envelope: {err}")))?;

        match envelope {
            Envelope::Reply(reply) => {
                let expected = descriptor.reply_action();
                if reply.action != expected {
                    return Err(malformed(format!(
                        "reply addressed to {}, expected {expected}",
                        reply.action
                    )));
                }
                let body = rmpv::ext::from_value(reply.body)
                    .map_err(|err| malformed(format!("reply body does not match response type: {err}")))?;
                Ok(Decoded::Reply {
                    body,
                    relates_to: reply.relates_to,
                })
            }
            Envelope::Fault(fault) => Ok(Decoded::Fault(fault)),
            Envelope::Request(_) => Err(malformed("received a REQUEST envelope".to_string())),
        }
    }

    /// Whether `bytes` parse as an envelope of any kind.
    #[must_use]
    pub fn is_envelope(&self, bytes: &[u8]) -> bool {
        rmp_serde::from_slice::<RawEnvelope>(bytes).is_ok()
    }

    /// Decodes an incoming request envelope, leaving the body untyped.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::MalformedRequest` for anything that is not a
    /// request envelope.
    pub fn decode_request(&self, bytes: &[u8]) -> Result<RequestEnvelope<rmpv::Value>, CodecError> {
        let envelope: RawEnvelope =
            rmp_serde::from_slice(bytes).map_err(|err| CodecError::MalformedRequest {
                reason: format!("not an envelope: {err}"),
            })?;
        match envelope {
            Envelope::Request(request) => Ok(request),
            other => Err(CodecError::MalformedRequest {
                reason: format!("expected REQUEST envelope, got {}", other.kind()),
            }),
        }
    }

    /// Encodes a reply to the given operation.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the body cannot be serialized.
    pub fn encode_reply<R: Serialize>(
        &self,
        descriptor: &OperationDescriptor,
        relates_to: Option<&str>,
        body: &R,
    ) -> Result<Bytes, CodecError> {
        let envelope = Envelope::Reply(ReplyEnvelope {
            action: descriptor.reply_action(),
            relates_to: relates_to.map(str::to_string),
            body,
        });
        to_bytes(descriptor.name(), &envelope)
    }

    /// Encodes a reply to a decoded request, addressed to the request's
    /// action with the reply suffix and correlated by its message id.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the body cannot be serialized.
    pub fn reply_to<B, R: Serialize>(
        &self,
        request: &RequestEnvelope<B>,
        body: &R,
    ) -> Result<Bytes, CodecError> {
        let envelope = Envelope::Reply(ReplyEnvelope {
            action: format!("{}{REPLY_ACTION_SUFFIX}", request.action),
            relates_to: Some(request.message_id.clone()),
            body,
        });
        to_bytes(&request.operation, &envelope)
    }

    /// Encodes a fault answering a decoded request.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the detail tree cannot be serialized.
    pub fn fault_to<B>(
        &self,
        request: &RequestEnvelope<B>,
        fault: FaultEnvelope,
    ) -> Result<Bytes, CodecError> {
        self.encode_fault(fault.relating_to(request.message_id.clone()))
    }

    /// Encodes a fault envelope.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the detail tree cannot be serialized.
    pub fn encode_fault(&self, fault: FaultEnvelope) -> Result<Bytes, CodecError> {
        let operation = fault.code.clone();
        let envelope: Envelope<()> = Envelope::Fault(fault);
        to_bytes(&operation, &envelope)
    }

    /// Builds a named value tree for a fault detail payload.
    ///
    /// Goes through named `MsgPack` bytes so struct fields keep their names
    /// (a direct `rmpv::ext::to_value` writes structs positionally).
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if `detail` cannot be serialized.
    pub fn detail<T: Serialize>(&self, detail: &T) -> Result<rmpv::Value, CodecError> {
        let bytes = to_bytes("fault detail", detail)?;
        rmpv::decode::read_value(&mut bytes.as_ref()).map_err(|err| CodecError::Encode {
            operation: "fault detail".to_string(),
            source: rmp_serde::encode::Error::Syntax(err.to_string()),
        })
    }

    /// Converts an untyped body into a concrete payload type.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::MalformedRequest` if the body does not fit `T`.
    pub fn body<T: DeserializeOwned>(&self, body: rmpv::Value) -> Result<T, CodecError> {
        rmpv::ext::from_value(body).map_err(|err| CodecError::MalformedRequest {
            reason: format!("body does not match payload type: {err}"),
        })
    }
}

fn to_bytes<T: Serialize>(operation: &str, value: &T) -> Result<Bytes, CodecError> {
    rmp_serde::to_vec_named(value)
        .map(Bytes::from)
        .map_err(|source| CodecError::Encode {
            operation: operation.to_string(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde::Deserialize;

    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::fault::FaultTable;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Tagging {
        resource_id: String,
        count: u32,
        tags: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        note: Option<String>,
        dry_run: bool,
    }

    fn descriptor() -> OperationDescriptor {
        OperationDescriptor::new(
            "CreateTags",
            "urn:test/CreateTags",
            TypeDescriptor::of::<Tagging>(),
            TypeDescriptor::of::<Tagging>(),
            FaultTable::new(),
        )
    }

    /// Turns an encoded request into a reply carrying the same body.
    fn echo(codec: WireCodec, desc: &OperationDescriptor, request: &[u8]) -> Bytes {
        let envelope = codec.decode_request(request).expect("request envelope");
        codec
            .encode_reply(desc, Some(&envelope.message_id), &envelope.body)
            .expect("encode reply")
    }

    fn sample() -> Tagging {
        Tagging {
            resource_id: "i-0abc".into(),
            count: 3,
            tags: vec!["env=prod".into(), "team=core".into()],
            note: None,
            dry_run: false,
        }
    }

    #[test]
    fn request_is_addressed_to_action() {
        let codec = WireCodec;
        let bytes = codec
            .encode_request(&descriptor(), "urn:uuid:7", &sample())
            .unwrap();
        let request = codec.decode_request(&bytes).unwrap();
        assert_eq!(request.action, "urn:test/CreateTags");
        assert_eq!(request.operation, "CreateTags");
        assert_eq!(request.message_id, "urn:uuid:7");
    }

    #[test]
    fn encoding_is_deterministic() {
        let codec = WireCodec;
        let a = codec.encode_request(&descriptor(), "m", &sample()).unwrap();
        let b = codec.encode_request(&descriptor(), "m", &sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn absent_optional_fields_are_omitted() {
        let codec = WireCodec;
        let bytes = codec.encode_request(&descriptor(), "m", &sample()).unwrap();
        let request = codec.decode_request(&bytes).unwrap();
        let keys: Vec<&str> = request
            .body
            .as_map()
            .unwrap()
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["resourceId", "count", "tags", "dryRun"]);
    }

    #[test]
    fn echoed_request_decodes_as_reply() {
        let codec = WireCodec;
        let desc = descriptor();
        let bytes = codec.encode_request(&desc, "urn:uuid:9", &sample()).unwrap();

        let decoded: Decoded<Tagging> = codec.decode_response(&desc, &echo(codec, &desc, &bytes)).unwrap();
        assert_eq!(decoded.relates_to(), Some("urn:uuid:9"));
        assert_eq!(
            decoded,
            Decoded::Reply {
                body: sample(),
                relates_to: Some("urn:uuid:9".into())
            }
        );
    }

    #[test]
    fn reply_to_request_matches_descriptor_addressing() {
        let codec = WireCodec;
        let desc = descriptor();
        let bytes = codec.encode_request(&desc, "urn:uuid:3", &sample()).unwrap();
        let request = codec.decode_request(&bytes).unwrap();

        let reply = codec.reply_to(&request, &request.body).unwrap();
        let decoded: Decoded<Tagging> = codec.decode_response(&desc, &reply).unwrap();
        assert_eq!(decoded.relates_to(), Some("urn:uuid:3"));

        let fault = codec
            .fault_to(&request, FaultEnvelope::new("Throttled", "later"))
            .unwrap();
        let decoded: Decoded<Tagging> = codec.decode_response(&desc, &fault).unwrap();
        assert!(matches!(decoded, Decoded::Fault(ref f) if f.relates_to.as_deref() == Some("urn:uuid:3")));
    }

    #[test]
    fn fault_envelope_decodes_as_fault() {
        let codec = WireCodec;
        let bytes = codec
            .encode_fault(FaultEnvelope::new("AuthFailure", "denied").relating_to("urn:uuid:1"))
            .unwrap();
        let decoded: Decoded<Tagging> = codec.decode_response(&descriptor(), &bytes).unwrap();
        match decoded {
            Decoded::Fault(fault) => {
                assert_eq!(fault.code, "AuthFailure");
                assert_eq!(fault.message, "denied");
                assert_eq!(fault.relates_to.as_deref(), Some("urn:uuid:1"));
            }
            Decoded::Reply { .. } => panic!("expected fault"),
        }
    }

    #[test]
    fn garbage_is_malformed() {
        let err = WireCodec
            .decode_response::<Tagging>(&descriptor(), b"\xc1not msgpack")
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedResponse { .. }));
    }

    #[test]
    fn envelope_sniffing() {
        let codec = WireCodec;
        let fault = codec
            .encode_fault(FaultEnvelope::new("Throttled", "slow down"))
            .unwrap();
        assert!(codec.is_envelope(&fault));
        assert!(!codec.is_envelope(b"<html>upstream down</html>"));
        assert!(!codec.is_envelope(b""));
    }

    #[test]
    fn request_envelope_as_response_is_malformed() {
        let codec = WireCodec;
        let bytes = codec.encode_request(&descriptor(), "m", &sample()).unwrap();
        let err = codec.decode_response::<Tagging>(&descriptor(), &bytes).unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedResponse { ref reason, .. } if reason.contains("REQUEST")
        ));
    }

    #[test]
    fn reply_for_another_action_is_malformed() {
        let codec = WireCodec;
        let other = OperationDescriptor::new(
            "DeleteTags",
            "urn:test/DeleteTags",
            TypeDescriptor::of::<Tagging>(),
            TypeDescriptor::of::<Tagging>(),
            FaultTable::new(),
        );
        let bytes = codec.encode_reply(&other, None, &sample()).unwrap();
        let err = codec.decode_response::<Tagging>(&descriptor(), &bytes).unwrap_err();
        assert!(matches!(err, CodecError::MalformedResponse { .. }));
    }

    #[test]
    fn reply_body_of_wrong_shape_is_malformed() {
        #[derive(Serialize)]
        struct Unrelated {
            flavour: &'static str,
        }

        let codec = WireCodec;
        let desc = descriptor();
        let bytes = codec
            .encode_reply(&desc, None, &Unrelated { flavour: "mint" })
            .unwrap();
        let err = codec.decode_response::<Tagging>(&desc, &bytes).unwrap_err();
        assert!(matches!(err, CodecError::MalformedResponse { .. }));
    }

    #[test]
    fn reply_as_request_is_malformed_request() {
        let codec = WireCodec;
        let bytes = codec.encode_reply(&descriptor(), None, &sample()).unwrap();
        assert!(matches!(
            codec.decode_request(&bytes),
            Err(CodecError::MalformedRequest { .. })
        ));
    }

    proptest! {
        #[test]
        fn echo_roundtrip_preserves_request(
            resource_id in "[a-z0-9-]{0,24}",
            count in any::<u32>(),
            tags in proptest::collection::vec("[ -~]{0,16}", 0..6),
            note in proptest::option::of("[ -~]{0,32}"),
            dry_run in any::<bool>(),
        ) {
            let codec = WireCodec;
            let desc = descriptor();
            let request = Tagging { resource_id, count, tags, note, dry_run };

            let bytes = codec.encode_request(&desc, "urn:uuid:p", &request).unwrap();
            let decoded: Decoded<Tagging> =
                codec.decode_response(&desc, &echo(codec, &desc, &bytes)).unwrap();

            prop_assert_eq!(
                decoded,
                Decoded::Reply { body: request, relates_to: Some("urn:uuid:p".to_string()) }
            );
        }
    }
}
