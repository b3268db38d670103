//! Conversion chaîne ↔ valeur.

use base64::Engine;

use crate::values::{Value, ValueError, VarType};

fn parse_err(ty: VarType, e: impl std::fmt::Display) -> ValueError {
    ValueError::ParseError(format!("failed to parse {}: {}", ty.wire_name(), e))
}

impl Value {
    /// Parse une représentation fil selon le type attendu.
    ///
    /// Les entiers sont en ASCII décimal, signe en tête autorisé pour les
    /// types signés ; le dépassement de capacité est une erreur. Les booléens
    /// acceptent `1`, `0`, `true`, `false`, `yes`, `no` sans tenir compte de
    /// la casse. Les flottants passent par le parseur de Rust, insensible à la
    /// locale du process. Les alias de chaîne sont conservés verbatim.
    pub fn from_wire(s: &str, var_type: VarType) -> Result<Value, ValueError> {
        match var_type {
            VarType::UI1 => s.parse::<u8>().map(Value::UI1).map_err(|e| parse_err(var_type, e)),
            VarType::UI2 => s.parse::<u16>().map(Value::UI2).map_err(|e| parse_err(var_type, e)),
            VarType::UI4 => s.parse::<u32>().map(Value::UI4).map_err(|e| parse_err(var_type, e)),
            VarType::UI8 => s.parse::<u64>().map(Value::UI8).map_err(|e| parse_err(var_type, e)),
            VarType::I1 => s.parse::<i8>().map(Value::I1).map_err(|e| parse_err(var_type, e)),
            VarType::I2 => s.parse::<i16>().map(Value::I2).map_err(|e| parse_err(var_type, e)),
            VarType::I4 => s.parse::<i32>().map(Value::I4).map_err(|e| parse_err(var_type, e)),
            VarType::Int => s.parse::<i32>().map(Value::Int).map_err(|e| parse_err(var_type, e)),
            VarType::I8 => s.parse::<i64>().map(Value::I8).map_err(|e| parse_err(var_type, e)),
            VarType::R4 => s.parse::<f32>().map(Value::R4).map_err(|e| parse_err(var_type, e)),
            VarType::R8 => s.parse::<f64>().map(Value::R8).map_err(|e| parse_err(var_type, e)),
            VarType::Number => s.parse::<f64>().map(Value::Number).map_err(|e| parse_err(var_type, e)),
            VarType::Fixed14_4 => s
                .parse::<f64>()
                .map(Value::Fixed14_4)
                .map_err(|e| parse_err(var_type, e)),
            VarType::Char => s
                .chars()
                .next()
                .ok_or_else(|| ValueError::ParseError("empty string for char".to_string()))
                .map(Value::Char),
            VarType::String => Ok(Value::String(s.to_string())),
            VarType::Boolean => match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(Value::Boolean(true)),
                "0" | "false" | "no" => Ok(Value::Boolean(false)),
                other => Err(ValueError::ParseError(format!(
                    "invalid boolean value: {}",
                    other
                ))),
            },
            VarType::BinBase64 => Ok(Value::BinBase64(s.to_string())),
            VarType::BinHex => Ok(Value::BinHex(s.to_string())),
            VarType::Date => Ok(Value::Date(s.to_string())),
            VarType::DateTime => Ok(Value::DateTime(s.to_string())),
            VarType::DateTimeTZ => Ok(Value::DateTimeTZ(s.to_string())),
            VarType::Time => Ok(Value::Time(s.to_string())),
            VarType::TimeTZ => Ok(Value::TimeTZ(s.to_string())),
            VarType::UUID => Ok(Value::UUID(s.to_string())),
            VarType::URI => Ok(Value::URI(s.to_string())),
        }
    }

    /// Représentation fil de la valeur.
    ///
    /// Les booléens sortent `1`/`0` ; les flottants via le formateur de Rust,
    /// indépendant de la locale.
    pub fn to_wire(&self) -> String {
        match self {
            Value::UI1(v) => v.to_string(),
            Value::UI2(v) => v.to_string(),
            Value::UI4(v) => v.to_string(),
            Value::UI8(v) => v.to_string(),
            Value::I1(v) => v.to_string(),
            Value::I2(v) => v.to_string(),
            Value::I4(v) | Value::Int(v) => v.to_string(),
            Value::I8(v) => v.to_string(),
            Value::R4(v) => v.to_string(),
            Value::R8(v) | Value::Number(v) | Value::Fixed14_4(v) => v.to_string(),
            Value::Char(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Boolean(v) => if *v { "1" } else { "0" }.to_string(),
            Value::BinBase64(v)
            | Value::BinHex(v)
            | Value::Date(v)
            | Value::DateTime(v)
            | Value::DateTimeTZ(v)
            | Value::Time(v)
            | Value::TimeTZ(v)
            | Value::UUID(v)
            | Value::URI(v) => v.clone(),
        }
    }

    /// Valeur zéro d'un type, utilisée pour les arguments de sortie absents.
    pub fn zero(var_type: VarType) -> Value {
        match var_type {
            VarType::UI1 => Value::UI1(0),
            VarType::UI2 => Value::UI2(0),
            VarType::UI4 => Value::UI4(0),
            VarType::UI8 => Value::UI8(0),
            VarType::I1 => Value::I1(0),
            VarType::I2 => Value::I2(0),
            VarType::I4 => Value::I4(0),
            VarType::Int => Value::Int(0),
            VarType::I8 => Value::I8(0),
            VarType::R4 => Value::R4(0.0),
            VarType::R8 => Value::R8(0.0),
            VarType::Number => Value::Number(0.0),
            VarType::Fixed14_4 => Value::Fixed14_4(0.0),
            VarType::Char => Value::Char('\0'),
            VarType::String => Value::String(String::new()),
            VarType::Boolean => Value::Boolean(false),
            VarType::BinBase64 => Value::BinBase64(String::new()),
            VarType::BinHex => Value::BinHex(String::new()),
            VarType::Date => Value::Date(String::new()),
            VarType::DateTime => Value::DateTime(String::new()),
            VarType::DateTimeTZ => Value::DateTimeTZ(String::new()),
            VarType::Time => Value::Time(String::new()),
            VarType::TimeTZ => Value::TimeTZ(String::new()),
            VarType::UUID => Value::UUID(String::new()),
            VarType::URI => Value::URI(String::new()),
        }
    }

    /// Décode le contenu d'une valeur `bin.base64`.
    pub fn decode_base64(&self) -> Result<Vec<u8>, ValueError> {
        match self {
            Value::BinBase64(s) => base64::engine::general_purpose::STANDARD
                .decode(s.trim())
                .map_err(|e| ValueError::DecodeError(e.to_string())),
            other => Err(ValueError::TypeMismatch {
                expected: "bin.base64".to_string(),
                found: VarType::from(other).wire_name().to_string(),
            }),
        }
    }

    /// Décode le contenu d'une valeur `bin.hex`.
    pub fn decode_hex(&self) -> Result<Vec<u8>, ValueError> {
        match self {
            Value::BinHex(s) => {
                hex::decode(s.trim()).map_err(|e| ValueError::DecodeError(e.to_string()))
            }
            other => Err(ValueError::TypeMismatch {
                expected: "bin.hex".to_string(),
                found: VarType::from(other).wire_name().to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_parsing() {
        assert_eq!(Value::from_wire("42", VarType::UI4).unwrap(), Value::UI4(42));
        assert_eq!(Value::from_wire("-7", VarType::I2).unwrap(), Value::I2(-7));
        assert_eq!(
            Value::from_wire("+12", VarType::I4).unwrap(),
            Value::I4(12)
        );
    }

    #[test]
    fn test_integer_overflow_fails() {
        assert!(Value::from_wire("256", VarType::UI1).is_err());
        assert!(Value::from_wire("-1", VarType::UI4).is_err());
        assert!(Value::from_wire("40000", VarType::I2).is_err());
    }

    #[test]
    fn test_boolean_forms() {
        for s in ["1", "true", "TRUE", "Yes", "yes"] {
            assert_eq!(
                Value::from_wire(s, VarType::Boolean).unwrap(),
                Value::Boolean(true)
            );
        }
        for s in ["0", "false", "FALSE", "No", "no"] {
            assert_eq!(
                Value::from_wire(s, VarType::Boolean).unwrap(),
                Value::Boolean(false)
            );
        }
        assert!(Value::from_wire("maybe", VarType::Boolean).is_err());
    }

    #[test]
    fn test_boolean_wire_format() {
        assert_eq!(Value::Boolean(true).to_wire(), "1");
        assert_eq!(Value::Boolean(false).to_wire(), "0");
    }

    #[test]
    fn test_float_round_trip() {
        let v = Value::from_wire("3.25", VarType::R8).unwrap();
        assert_eq!(v, Value::R8(3.25));
        assert_eq!(v.to_wire(), "3.25");
    }

    #[test]
    fn test_boxed_strings_preserved_verbatim() {
        // Aucun de ces contenus n'est valide pour son type nominal ; ils
        // doivent quand même traverser sans modification.
        let cases = [
            (VarType::UUID, "not-a-uuid"),
            (VarType::URI, "::not a uri::"),
            (VarType::Date, "9999-99-99"),
            (VarType::BinBase64, "%%%%"),
            (VarType::BinHex, "xyz"),
        ];
        for (ty, s) in cases {
            let v = Value::from_wire(s, ty).unwrap();
            assert_eq!(v.to_wire(), s);
        }
    }

    #[test]
    fn test_decode_helpers() {
        let v = Value::BinBase64("aGVsbG8=".to_string());
        assert_eq!(v.decode_base64().unwrap(), b"hello");

        let v = Value::BinHex("68656c6c6f".to_string());
        assert_eq!(v.decode_hex().unwrap(), b"hello");

        // bin.hex et bin.base64 ne sont pas interchangeables
        assert!(Value::BinHex("aGVsbG8=".to_string()).decode_base64().is_err());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(Value::zero(VarType::UI4), Value::UI4(0));
        assert_eq!(Value::zero(VarType::String), Value::String("".to_string()));
        assert_eq!(Value::zero(VarType::Boolean), Value::Boolean(false));
    }
}
