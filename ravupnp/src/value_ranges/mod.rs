//! Plages de valeurs autorisées (`allowedValueRange` du SCPD).

mod methods;

use crate::values::Value;

/// Plage min/max avec pas optionnel.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub min: Value,
    pub max: Value,
    pub step: Option<Value>,
}
