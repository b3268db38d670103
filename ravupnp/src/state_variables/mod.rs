//! Variables d'état des services UPnP.
//!
//! Le modèle [`StateVariable`] décrit une variable telle qu'annoncée dans le
//! SCPD ; [`StateVarInstance`] porte sa valeur runtime sur une instance de
//! service.

mod instance_methods;
mod variable_methods;

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::object_set::{Named, ObjectSet};
use crate::value_ranges::ValueRange;
use crate::values::{Value, VarType};

/// Modèle d'une variable d'état.
#[derive(Debug, Clone)]
pub struct StateVariable {
    name: String,
    var_type: VarType,
    send_events: bool,
    multicast: bool,
    default_value: Option<Value>,
    allowed_values: Vec<String>,
    range: Option<ValueRange>,
}

impl Named for StateVariable {
    fn name(&self) -> &str {
        &self.name
    }
}

pub type StateVariableSet = ObjectSet<StateVariable>;

/// Valeur runtime d'une variable d'état.
pub struct StateVarInstance {
    model: std::sync::Arc<StateVariable>,
    value: RwLock<Value>,
    last_changed: RwLock<DateTime<Utc>>,
}

pub type StateVarInstanceSet = ObjectSet<StateVarInstance>;
