//! Méthodes des instances de variables d'état.

use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::object_set::Named;
use crate::state_variables::{StateVarInstance, StateVariable};
use crate::values::{Value, VarType};

impl Named for StateVarInstance {
    fn name(&self) -> &str {
        self.model.name()
    }
}

impl std::fmt::Debug for StateVarInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateVarInstance")
            .field("name", &self.name())
            .field("value", &*self.value.read().unwrap())
            .finish()
    }
}

impl StateVarInstance {
    pub fn new(model: Arc<StateVariable>) -> Self {
        let initial = model.initial_value();
        Self {
            model,
            value: RwLock::new(initial),
            last_changed: RwLock::new(Utc::now()),
        }
    }

    pub fn model(&self) -> &Arc<StateVariable> {
        &self.model
    }

    pub fn var_type(&self) -> VarType {
        self.model.var_type()
    }

    pub fn sends_events(&self) -> bool {
        self.model.sends_events()
    }

    /// Valeur courante.
    pub fn value(&self) -> Value {
        self.value.read().unwrap().clone()
    }

    /// Remplace la valeur. Retourne vrai si elle a changé.
    pub fn set_value(&self, value: Value) -> bool {
        let mut current = self.value.write().unwrap();
        if *current == value {
            return false;
        }
        *current = value;
        *self.last_changed.write().unwrap() = Utc::now();
        true
    }

    pub fn last_changed(&self) -> chrono::DateTime<Utc> {
        *self.last_changed.read().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_starts_at_default() {
        let model = Arc::new(StateVariable::new("Volume", VarType::UI2).with_default(Value::UI2(30)));
        let instance = StateVarInstance::new(model);
        assert_eq!(instance.value(), Value::UI2(30));
    }

    #[test]
    fn test_set_value_reports_change() {
        let model = Arc::new(StateVariable::new("Mute", VarType::Boolean));
        let instance = StateVarInstance::new(model);

        assert!(instance.set_value(Value::Boolean(true)));
        assert!(!instance.set_value(Value::Boolean(true)));
        assert_eq!(instance.value(), Value::Boolean(true));
    }
}
