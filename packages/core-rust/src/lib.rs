//! `wirecall` Core: operation descriptors, registry, wire envelopes, codec, and fault mapping.
//!
//! Everything in this crate is pure: no I/O, no clocks, no shared mutable
//! state. The client crate adds transports and the invocation facade.

pub mod codec;
pub mod descriptor;
pub mod ec2;
pub mod envelope;
pub mod fault;
pub mod registry;

pub use codec::{CodecError, Decoded, WireCodec, CONTENT_TYPE};
pub use descriptor::{Operation, OperationDescriptor, TypeDescriptor};
pub use envelope::{Envelope, FaultEnvelope, RawEnvelope, ReplyEnvelope, RequestEnvelope};
pub use fault::{FaultMapper, FaultTable, FaultType, KnownFault, ServiceFault, TypedFault};
pub use registry::{OperationRegistry, RegistryBuilder, RegistryError};
