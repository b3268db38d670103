//! Méthodes sur les types de variables.

use crate::values::{Value, VarType};

impl VarType {
    /// Résout un `dataType` SCPD.
    ///
    /// Un type inconnu est traité comme `string`, conformément au protocole.
    pub fn from_wire_name(name: &str) -> VarType {
        match name {
            "ui1" => VarType::UI1,
            "ui2" => VarType::UI2,
            "ui4" => VarType::UI4,
            "ui8" => VarType::UI8,
            "i1" => VarType::I1,
            "i2" => VarType::I2,
            "i4" => VarType::I4,
            "int" => VarType::Int,
            "i8" => VarType::I8,
            "r4" => VarType::R4,
            "r8" => VarType::R8,
            "number" => VarType::Number,
            "fixed.14.4" => VarType::Fixed14_4,
            "char" => VarType::Char,
            "string" => VarType::String,
            "boolean" => VarType::Boolean,
            "bin.base64" => VarType::BinBase64,
            "bin.hex" => VarType::BinHex,
            "date" => VarType::Date,
            "dateTime" => VarType::DateTime,
            "dateTime.tz" => VarType::DateTimeTZ,
            "time" => VarType::Time,
            "time.tz" => VarType::TimeTZ,
            "uuid" => VarType::UUID,
            "uri" => VarType::URI,
            other => {
                tracing::debug!("Unknown UPnP dataType '{}', treating as string", other);
                VarType::String
            }
        }
    }

    /// Nom du type sur le fil (élément `<dataType>` du SCPD).
    pub fn wire_name(&self) -> &'static str {
        match self {
            VarType::UI1 => "ui1",
            VarType::UI2 => "ui2",
            VarType::UI4 => "ui4",
            VarType::UI8 => "ui8",
            VarType::I1 => "i1",
            VarType::I2 => "i2",
            VarType::I4 => "i4",
            VarType::Int => "int",
            VarType::I8 => "i8",
            VarType::R4 => "r4",
            VarType::R8 => "r8",
            VarType::Number => "number",
            VarType::Fixed14_4 => "fixed.14.4",
            VarType::Char => "char",
            VarType::String => "string",
            VarType::Boolean => "boolean",
            VarType::BinBase64 => "bin.base64",
            VarType::BinHex => "bin.hex",
            VarType::Date => "date",
            VarType::DateTime => "dateTime",
            VarType::DateTimeTZ => "dateTime.tz",
            VarType::Time => "time",
            VarType::TimeTZ => "time.tz",
            VarType::UUID => "uuid",
            VarType::URI => "uri",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            VarType::UI1
                | VarType::UI2
                | VarType::UI4
                | VarType::UI8
                | VarType::I1
                | VarType::I2
                | VarType::I4
                | VarType::Int
                | VarType::I8
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            VarType::R4 | VarType::R8 | VarType::Number | VarType::Fixed14_4
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Vrai pour les alias de chaîne transportés verbatim.
    pub fn is_string_boxed(&self) -> bool {
        matches!(
            self,
            VarType::BinBase64
                | VarType::BinHex
                | VarType::Date
                | VarType::DateTime
                | VarType::DateTimeTZ
                | VarType::Time
                | VarType::TimeTZ
                | VarType::UUID
                | VarType::URI
        )
    }
}

impl From<&Value> for VarType {
    fn from(value: &Value) -> VarType {
        match value {
            Value::UI1(_) => VarType::UI1,
            Value::UI2(_) => VarType::UI2,
            Value::UI4(_) => VarType::UI4,
            Value::UI8(_) => VarType::UI8,
            Value::I1(_) => VarType::I1,
            Value::I2(_) => VarType::I2,
            Value::I4(_) => VarType::I4,
            Value::Int(_) => VarType::Int,
            Value::I8(_) => VarType::I8,
            Value::R4(_) => VarType::R4,
            Value::R8(_) => VarType::R8,
            Value::Number(_) => VarType::Number,
            Value::Fixed14_4(_) => VarType::Fixed14_4,
            Value::Char(_) => VarType::Char,
            Value::String(_) => VarType::String,
            Value::Boolean(_) => VarType::Boolean,
            Value::BinBase64(_) => VarType::BinBase64,
            Value::BinHex(_) => VarType::BinHex,
            Value::Date(_) => VarType::Date,
            Value::DateTime(_) => VarType::DateTime,
            Value::DateTimeTZ(_) => VarType::DateTimeTZ,
            Value::Time(_) => VarType::Time,
            Value::TimeTZ(_) => VarType::TimeTZ,
            Value::UUID(_) => VarType::UUID,
            Value::URI(_) => VarType::URI,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for name in [
            "ui1",
            "ui2",
            "ui4",
            "ui8",
            "i1",
            "i2",
            "i4",
            "int",
            "i8",
            "r4",
            "r8",
            "number",
            "fixed.14.4",
            "char",
            "string",
            "boolean",
            "bin.base64",
            "bin.hex",
            "date",
            "dateTime",
            "dateTime.tz",
            "time",
            "time.tz",
            "uuid",
            "uri",
        ] {
            assert_eq!(VarType::from_wire_name(name).wire_name(), name);
        }
    }

    #[test]
    fn test_unknown_type_maps_to_string() {
        assert_eq!(VarType::from_wire_name("frobnicator"), VarType::String);
    }

    #[test]
    fn test_bin_hex_distinct_from_bin_base64() {
        assert_ne!(
            VarType::from_wire_name("bin.hex"),
            VarType::from_wire_name("bin.base64")
        );
    }

    #[test]
    fn test_numeric_predicates() {
        assert!(VarType::UI4.is_numeric());
        assert!(VarType::R8.is_numeric());
        assert!(!VarType::String.is_numeric());
        assert!(!VarType::UUID.is_numeric());
        assert!(VarType::URI.is_string_boxed());
    }
}
