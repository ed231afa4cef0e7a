//! Static operation metadata: names, action URIs, payload types, known faults.

use std::any::{type_name, TypeId};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fault::FaultTable;

/// Suffix appended to an operation's action URI to address its reply.
pub const REPLY_ACTION_SUFFIX: &str = "Response";

// ---------------------------------------------------------------------------
// TypeDescriptor
// ---------------------------------------------------------------------------

/// Identifies the Rust type carried as a request or response body.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub id: TypeId,
}

impl TypeDescriptor {
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// Returns true if `T` is the type this descriptor stands for.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ---------------------------------------------------------------------------
// Operation trait
// ---------------------------------------------------------------------------

/// Compile-time description of a single RPC operation.
///
/// Implemented by zero-sized marker types, one per remote operation. The
/// registry stores the derived [`OperationDescriptor`]; callers use the marker
/// to get typed requests and responses without naming the operation as a
/// string.
pub trait Operation: Send + Sync + 'static {
    /// Unique operation name (e.g. `"DescribeRegions"`).
    const NAME: &'static str;
    /// Action URI the request envelope is addressed to.
    const ACTION: &'static str;

    type Request: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Response: Serialize + DeserializeOwned + Send + 'static;

    /// Faults specific to this operation. Service-wide faults belong in the
    /// `FaultMapper`'s common table instead.
    #[must_use]
    fn faults() -> FaultTable {
        FaultTable::new()
    }
}

// ---------------------------------------------------------------------------
// OperationDescriptor
// ---------------------------------------------------------------------------

/// Immutable metadata for one registered operation.
///
/// Created once when the registry is built and shared behind an `Arc`
/// afterwards; there is no way to mutate a descriptor after construction.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    name: String,
    action: String,
    request_type: TypeDescriptor,
    response_type: TypeDescriptor,
    faults: FaultTable,
}

impl OperationDescriptor {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        action: impl Into<String>,
        request_type: TypeDescriptor,
        response_type: TypeDescriptor,
        faults: FaultTable,
    ) -> Self {
        Self {
            name: name.into(),
            action: action.into(),
            request_type,
            response_type,
            faults,
        }
    }

    /// Derives the descriptor for an [`Operation`] marker type.
    #[must_use]
    pub fn of<O: Operation>() -> Self {
        Self::new(
            O::NAME,
            O::ACTION,
            TypeDescriptor::of::<O::Request>(),
            TypeDescriptor::of::<O::Response>(),
            O::faults(),
        )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Action URI a well-formed reply to this operation carries.
    #[must_use]
    pub fn reply_action(&self) -> String {
        format!("{}{REPLY_ACTION_SUFFIX}", self.action)
    }

    #[must_use]
    pub fn request_type(&self) -> TypeDescriptor {
        self.request_type
    }

    #[must_use]
    pub fn response_type(&self) -> TypeDescriptor {
        self.response_type
    }

    #[must_use]
    pub fn faults(&self) -> &FaultTable {
        &self.faults
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct PingRequest {
        nonce: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct PingResponse {
        nonce: u32,
    }

    struct Ping;

    impl Operation for Ping {
        const NAME: &'static str = "Ping";
        const ACTION: &'static str = "urn:test/Ping";
        type Request = PingRequest;
        type Response = PingResponse;
    }

    #[test]
    fn descriptor_of_operation_carries_metadata() {
        let desc = OperationDescriptor::of::<Ping>();
        assert_eq!(desc.name(), "Ping");
        assert_eq!(desc.action(), "urn:test/Ping");
        assert!(desc.request_type().is::<PingRequest>());
        assert!(desc.response_type().is::<PingResponse>());
        assert!(desc.faults().is_empty());
    }

    #[test]
    fn reply_action_appends_suffix() {
        let desc = OperationDescriptor::of::<Ping>();
        assert_eq!(desc.reply_action(), "urn:test/PingResponse");
    }

    #[test]
    fn type_descriptor_distinguishes_types() {
        let req = TypeDescriptor::of::<PingRequest>();
        assert!(!req.is::<PingResponse>());
        assert!(req.name.ends_with("PingRequest"));
    }
}
