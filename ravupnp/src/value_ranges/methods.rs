//! Méthodes des plages de valeurs.

use crate::value_ranges::ValueRange;
use crate::values::{Value, VarType};

impl ValueRange {
    pub fn new(min: Value, max: Value) -> Self {
        Self {
            min,
            max,
            step: None,
        }
    }

    pub fn with_step(min: Value, max: Value, step: Value) -> Self {
        Self {
            min,
            max,
            step: Some(step),
        }
    }

    /// Teste l'appartenance d'une valeur numérique à la plage.
    ///
    /// Les valeurs non numériques ne sont jamais dans une plage.
    pub fn contains(&self, value: &Value) -> bool {
        if !VarType::from(value).is_numeric() {
            return false;
        }

        match (
            f64::try_from(value),
            f64::try_from(&self.min),
            f64::try_from(&self.max),
        ) {
            (Ok(v), Ok(min), Ok(max)) => v >= min && v <= max,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let range = ValueRange::new(Value::UI2(0), Value::UI2(100));
        assert!(range.contains(&Value::UI2(0)));
        assert!(range.contains(&Value::UI2(100)));
        assert!(!range.contains(&Value::UI2(101)));
        assert!(!range.contains(&Value::String("50".to_string())));
    }

    #[test]
    fn test_contains_across_integer_widths() {
        let range = ValueRange::new(Value::I4(-10), Value::I4(10));
        assert!(range.contains(&Value::I2(-10)));
        assert!(!range.contains(&Value::I8(11)));
    }
}
