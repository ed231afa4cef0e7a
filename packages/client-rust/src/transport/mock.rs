//! In-process transports for host-application tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::Url;
use wirecall_core::WireCodec;

use super::{OutboundCall, Transport, TransportError};

// ---------------------------------------------------------------------------
// EchoTransport
// ---------------------------------------------------------------------------

/// Answers every request with a reply carrying the request's own body.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn send(
        &self,
        _endpoint: &Url,
        call: OutboundCall,
        _timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        let codec = WireCodec;
        let request = codec
            .decode_request(&call.body)
            .map_err(TransportError::connect)?;
        codec
            .reply_to(&request, &request.body)
            .map_err(TransportError::connect)
    }
}

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

type Responder = dyn Fn(&OutboundCall) -> Result<Bytes, TransportError> + Send + Sync;

/// Replies with whatever the responder closure returns, optionally after a
/// fixed delay. Every call is recorded.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: Mutex<Vec<OutboundCall>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&OutboundCall) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always replies with the same bytes.
    #[must_use]
    pub fn fixed(reply: Bytes) -> Self {
        Self::new(move |_| Ok(reply.clone()))
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Calls seen so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().clone()
    }
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("delay", &self.delay)
            .field("calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        _endpoint: &Url,
        call: OutboundCall,
        _timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        self.calls.lock().push(call.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&call)
    }
}

// ---------------------------------------------------------------------------
// StalledTransport
// ---------------------------------------------------------------------------

/// Never replies. Useful for timeout and cancellation tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn send(
        &self,
        _endpoint: &Url,
        _call: OutboundCall,
        _timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        std::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    use wirecall_core::{Decoded, OperationDescriptor, TypeDescriptor, FaultTable};

    use super::*;

    fn endpoint() -> Url {
        Url::parse("http://stub.invalid/").unwrap()
    }

    fn descriptor() -> OperationDescriptor {
        OperationDescriptor::new(
            "Echo",
            "urn:test/Echo",
            TypeDescriptor::of::<Vec<String>>(),
            TypeDescriptor::of::<Vec<String>>(),
            FaultTable::new(),
        )
    }

    fn call(body: Bytes) -> OutboundCall {
        OutboundCall {
            action: "urn:test/Echo".into(),
            message_id: "urn:uuid:e".into(),
            content_type: wirecall_core::CONTENT_TYPE,
            body,
        }
    }

    #[tokio::test]
    async fn echo_reflects_request_body() {
        let codec = WireCodec;
        let desc = descriptor();
        let words = vec!["a".to_string(), "b".to_string()];
        let body = codec.encode_request(&desc, "urn:uuid:e", &words).unwrap();

        let reply = EchoTransport
            .send(&endpoint(), call(body), Duration::from_secs(1))
            .await
            .unwrap();
        let decoded: Decoded<Vec<String>> = codec.decode_response(&desc, &reply).unwrap();
        assert_eq!(
            decoded,
            Decoded::Reply {
                body: words,
                relates_to: Some("urn:uuid:e".into())
            }
        );
    }

    #[tokio::test]
    async fn echo_rejects_non_request_bytes() {
        let err = EchoTransport
            .send(&endpoint(), call(Bytes::from_static(b"junk")), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[tokio::test]
    async fn scripted_records_calls() {
        let transport = ScriptedTransport::fixed(Bytes::from_static(b"ok"));
        let reply = transport
            .send(&endpoint(), call(Bytes::new()), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, Bytes::from_static(b"ok"));
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(transport.calls()[0].action, "urn:test/Echo");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_never_completes() {
        let result = tokio::time::timeout(
            Duration::from_secs(60),
            StalledTransport.send(&endpoint(), call(Bytes::new()), Duration::from_secs(1)),
        )
        .await;
        assert!(result.is_err());
    }
}
