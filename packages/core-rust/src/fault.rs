//! Fault mapping: turns a wire `FaultEnvelope` into a structured `TypedFault`.
//!
//! Typed faults are registered by code in a `FaultTable`. Each operation
//! carries its own table; the `FaultMapper` holds a second, service-wide table
//! for faults any operation can raise. Both are built once and never mutated.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::descriptor::OperationDescriptor;
use crate::envelope::FaultEnvelope;

// ---------------------------------------------------------------------------
// ServiceFault
// ---------------------------------------------------------------------------

/// Typed detail payload of a known service fault.
///
/// Implemented for every `Debug + Send + Sync + 'static` type; use
/// [`KnownFault::detail`] to get the concrete type back.
pub trait ServiceFault: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: fmt::Debug + Send + Sync + 'static> ServiceFault for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

type DetailDecoder = fn(Option<&rmpv::Value>) -> Result<Arc<dyn ServiceFault>, rmpv::ext::Error>;

fn decode_detail<D>(detail: Option<&rmpv::Value>) -> Result<Arc<dyn ServiceFault>, rmpv::ext::Error>
where
    D: DeserializeOwned + fmt::Debug + Send + Sync + 'static,
{
    // A fault without detail still populates a detail type whose fields all
    // have defaults.
    let value = detail
        .cloned()
        .unwrap_or_else(|| rmpv::Value::Map(Vec::new()));
    let parsed: D = rmpv::ext::from_value(value)?;
    Ok(Arc::new(parsed))
}

// ---------------------------------------------------------------------------
// FaultType / FaultTable
// ---------------------------------------------------------------------------

/// One known fault: the wire code it answers to and how to build its detail.
#[derive(Clone)]
pub struct FaultType {
    code: String,
    name: &'static str,
    decode: DetailDecoder,
    retryable: bool,
}

impl FaultType {
    /// Registers detail type `D` under the given fault code.
    #[must_use]
    pub fn of<D>(code: impl Into<String>) -> Self
    where
        D: DeserializeOwned + fmt::Debug + Send + Sync + 'static,
    {
        Self {
            code: code.into(),
            name: type_name::<D>(),
            decode: decode_detail::<D>,
            retryable: false,
        }
    }

    /// Marks the fault as transient: repeating the call may succeed.
    #[must_use]
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Rust type name of the detail payload.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultType")
            .field("code", &self.code)
            .field("name", &self.name)
            .field("retryable", &self.retryable)
            .finish_non_exhaustive()
    }
}

/// Lookup table from fault code to `FaultType`.
#[derive(Debug, Clone, Default)]
pub struct FaultTable {
    by_code: HashMap<String, FaultType>,
}

impl FaultTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fault type, replacing any earlier entry for the same code.
    #[must_use]
    pub fn with(mut self, fault: FaultType) -> Self {
        self.by_code.insert(fault.code.clone(), fault);
        self
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&FaultType> {
        self.by_code.get(code)
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

// ---------------------------------------------------------------------------
// TypedFault
// ---------------------------------------------------------------------------

/// A fault whose code matched a registered `FaultType`.
#[derive(Debug, Clone)]
pub struct KnownFault {
    pub fault_type: &'static str,
    pub code: String,
    pub subcode: Option<String>,
    pub message: String,
    /// Copied from the matching `FaultType`.
    pub retryable: bool,
    detail: Arc<dyn ServiceFault>,
}

impl KnownFault {
    /// The decoded detail payload, if it is of type `D`.
    #[must_use]
    pub fn detail<D: ServiceFault>(&self) -> Option<&D> {
        ServiceFault::as_any(&*self.detail).downcast_ref::<D>()
    }

    #[must_use]
    pub fn is<D: ServiceFault>(&self) -> bool {
        self.detail::<D>().is_some()
    }
}

impl fmt::Display for KnownFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Structured error for any syntactically valid fault envelope.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypedFault {
    #[error("service fault {0}")]
    Known(KnownFault),
    #[error("unmapped service fault {code}: {message}")]
    Unmapped { code: String, message: String },
}

impl TypedFault {
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Known(known) => &known.code,
            Self::Unmapped { code, .. } => code,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Known(known) => &known.message,
            Self::Unmapped { message, .. } => message,
        }
    }

    /// Whether the fault type was registered as retryable. Unmapped faults
    /// never are.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Known(known) => known.retryable,
            Self::Unmapped { .. } => false,
        }
    }

    /// The typed detail, if this is a known fault carrying a `D`.
    #[must_use]
    pub fn detail<D: ServiceFault>(&self) -> Option<&D> {
        match self {
            Self::Known(known) => known.detail::<D>(),
            Self::Unmapped { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// FaultMapper
// ---------------------------------------------------------------------------

/// Classifies fault envelopes into typed faults.
///
/// Lookup order: the fault code in the operation's table, then in the common
/// table; if neither knows the code and a subcode is present, the same two
/// lookups run for the subcode.
#[derive(Debug, Clone, Default)]
pub struct FaultMapper {
    common: Arc<FaultTable>,
}

impl FaultMapper {
    #[must_use]
    pub fn new(common: FaultTable) -> Self {
        Self {
            common: Arc::new(common),
        }
    }

    #[must_use]
    pub fn common(&self) -> &FaultTable {
        &self.common
    }

    /// Maps a fault envelope. Never fails: anything that cannot be matched
    /// to a registered type comes back as `TypedFault::Unmapped`.
    #[must_use]
    pub fn map(&self, fault: FaultEnvelope, descriptor: &OperationDescriptor) -> TypedFault {
        let Some(fault_type) = self.lookup(&fault, descriptor) else {
            return TypedFault::Unmapped {
                code: fault.code,
                message: fault.message,
            };
        };

        match (fault_type.decode)(fault.detail.as_ref()) {
            Ok(detail) => TypedFault::Known(KnownFault {
                fault_type: fault_type.name,
                code: fault.code,
                subcode: fault.subcode,
                message: fault.message,
                retryable: fault_type.retryable,
                detail,
            }),
            Err(err) => {
                debug!(
                    operation = descriptor.name(),
                    code = %fault.code,
                    fault_type = fault_type.name,
                    error = %err,
                    "fault detail does not match registered type"
                );
                TypedFault::Unmapped {
                    code: fault.code,
                    message: fault.message,
                }
            }
        }
    }

    fn lookup<'a>(
        &'a self,
        fault: &FaultEnvelope,
        descriptor: &'a OperationDescriptor,
    ) -> Option<&'a FaultType> {
        let find = |code: &str| {
            descriptor
                .faults()
                .get(code)
                .or_else(|| self.common.get(code))
        };
        find(&fault.code).or_else(|| fault.subcode.as_deref().and_then(find))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::descriptor::TypeDescriptor;

    #[derive(Debug, PartialEq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct InvalidParameter {
        parameter: String,
        #[serde(default)]
        allowed: Vec<String>,
    }

    #[derive(Debug, PartialEq, Default, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Throttled {
        retry_after_ms: Option<u64>,
    }

    fn descriptor() -> OperationDescriptor {
        OperationDescriptor::new(
            "Ping",
            "urn:test/Ping",
            TypeDescriptor::of::<()>(),
            TypeDescriptor::of::<()>(),
            FaultTable::new().with(FaultType::of::<InvalidParameter>("InvalidParameter")),
        )
    }

    fn mapper() -> FaultMapper {
        FaultMapper::new(
            FaultTable::new().with(FaultType::of::<Throttled>("Throttled").retryable()),
        )
    }

    fn detail(pairs: &[(&str, rmpv::Value)]) -> rmpv::Value {
        rmpv::Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (rmpv::Value::from(*k), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn known_code_maps_to_typed_detail() {
        let fault = FaultEnvelope::new("InvalidParameter", "bad region").with_detail(detail(&[
            ("parameter", rmpv::Value::from("RegionName")),
            (
                "allowed",
                rmpv::Value::Array(vec![rmpv::Value::from("eu-west-1")]),
            ),
        ]));

        let typed = mapper().map(fault, &descriptor());
        let TypedFault::Known(known) = &typed else {
            panic!("expected known fault, got {typed:?}");
        };
        assert_eq!(known.code, "InvalidParameter");
        assert_eq!(known.message, "bad region");
        assert_eq!(
            known.detail::<InvalidParameter>(),
            Some(&InvalidParameter {
                parameter: "RegionName".into(),
                allowed: vec!["eu-west-1".into()],
            })
        );
        assert!(!known.is::<Throttled>());
    }

    #[test]
    fn common_table_is_consulted_after_operation_table() {
        let fault = FaultEnvelope::new("Throttled", "slow down")
            .with_detail(detail(&[("retryAfterMs", rmpv::Value::from(250u64))]));

        let typed = mapper().map(fault, &descriptor());
        assert_eq!(
            typed.detail::<Throttled>(),
            Some(&Throttled {
                retry_after_ms: Some(250)
            })
        );
    }

    #[test]
    fn retryable_flag_follows_the_fault_type() {
        let throttled = mapper().map(FaultEnvelope::new("Throttled", "slow down"), &descriptor());
        assert!(throttled.is_retryable());

        let invalid = FaultEnvelope::new("InvalidParameter", "bad region")
            .with_detail(detail(&[("parameter", rmpv::Value::from("RegionName"))]));
        assert!(!mapper().map(invalid, &descriptor()).is_retryable());

        let unmapped = mapper().map(FaultEnvelope::new("Mystery", "no idea"), &descriptor());
        assert!(!unmapped.is_retryable());
    }

    #[test]
    fn missing_detail_uses_defaults() {
        let typed = mapper().map(FaultEnvelope::new("Throttled", "slow down"), &descriptor());
        assert_eq!(typed.detail::<Throttled>(), Some(&Throttled::default()));
    }

    #[test]
    fn subcode_is_used_when_code_is_generic() {
        let fault = FaultEnvelope::new("Client", "bad region")
            .with_subcode("InvalidParameter")
            .with_detail(detail(&[("parameter", rmpv::Value::from("RegionName"))]));

        let typed = mapper().map(fault, &descriptor());
        let known = match typed {
            TypedFault::Known(known) => known,
            TypedFault::Unmapped { .. } => panic!("expected known fault"),
        };
        assert_eq!(known.code, "Client");
        assert_eq!(known.subcode.as_deref(), Some("InvalidParameter"));
        assert!(known.is::<InvalidParameter>());
    }

    #[test]
    fn unknown_code_maps_to_unmapped() {
        let typed = mapper().map(FaultEnvelope::new("Mystery", "no idea"), &descriptor());
        assert!(matches!(
            &typed,
            TypedFault::Unmapped { code, message } if code == "Mystery" && message == "no idea"
        ));
        assert_eq!(typed.code(), "Mystery");
    }

    #[test]
    fn detail_of_wrong_shape_falls_back_to_unmapped() {
        // `parameter` is required but missing.
        let fault = FaultEnvelope::new("InvalidParameter", "bad region")
            .with_detail(detail(&[("unrelated", rmpv::Value::from(1))]));

        let typed = mapper().map(fault, &descriptor());
        assert!(matches!(typed, TypedFault::Unmapped { ref code, .. } if code == "InvalidParameter"));
    }

    #[test]
    fn operation_faults_are_not_visible_to_other_operations() {
        let other = OperationDescriptor::new(
            "Other",
            "urn:test/Other",
            TypeDescriptor::of::<()>(),
            TypeDescriptor::of::<()>(),
            FaultTable::new(),
        );
        let fault = FaultEnvelope::new("InvalidParameter", "bad region")
            .with_detail(detail(&[("parameter", rmpv::Value::from("RegionName"))]));

        assert!(matches!(mapper().map(fault, &other), TypedFault::Unmapped { .. }));
    }
}
