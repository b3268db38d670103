//! Conversions entre valeurs UPnP et types natifs.

use crate::values::{Value, ValueError, VarType};

macro_rules! value_from_native {
    ($native:ty, $variant:ident) => {
        impl From<$native> for Value {
            fn from(v: $native) -> Value {
                Value::$variant(v)
            }
        }
    };
}

value_from_native!(u8, UI1);
value_from_native!(u16, UI2);
value_from_native!(u32, UI4);
value_from_native!(u64, UI8);
value_from_native!(i8, I1);
value_from_native!(i16, I2);
value_from_native!(i32, I4);
value_from_native!(i64, I8);
value_from_native!(f32, R4);
value_from_native!(f64, R8);
value_from_native!(char, Char);
value_from_native!(bool, Boolean);

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

fn mismatch(expected: &str, found: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected: expected.to_string(),
        found: VarType::from(found).wire_name().to_string(),
    }
}

impl TryFrom<&Value> for i64 {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<i64, ValueError> {
        match value {
            Value::UI1(v) => Ok(*v as i64),
            Value::UI2(v) => Ok(*v as i64),
            Value::UI4(v) => Ok(*v as i64),
            Value::UI8(v) => i64::try_from(*v)
                .map_err(|_| ValueError::ParseError(format!("{} overflows i64", v))),
            Value::I1(v) => Ok(*v as i64),
            Value::I2(v) => Ok(*v as i64),
            Value::I4(v) | Value::Int(v) => Ok(*v as i64),
            Value::I8(v) => Ok(*v),
            other => Err(mismatch("integer", other)),
        }
    }
}

impl TryFrom<&Value> for u64 {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<u64, ValueError> {
        match value {
            Value::UI8(v) => Ok(*v),
            other => {
                let signed = i64::try_from(other)?;
                u64::try_from(signed)
                    .map_err(|_| ValueError::ParseError(format!("{} is negative", signed)))
            }
        }
    }
}

impl TryFrom<&Value> for u32 {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<u32, ValueError> {
        let wide = u64::try_from(value)?;
        u32::try_from(wide).map_err(|_| ValueError::ParseError(format!("{} overflows u32", wide)))
    }
}

impl TryFrom<&Value> for f64 {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<f64, ValueError> {
        match value {
            Value::R4(v) => Ok(*v as f64),
            Value::R8(v) | Value::Number(v) | Value::Fixed14_4(v) => Ok(*v),
            other if VarType::from(other).is_integer() => Ok(i64::try_from(other)? as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl TryFrom<&Value> for bool {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<bool, ValueError> {
        match value {
            Value::Boolean(v) => Ok(*v),
            other => Err(mismatch("boolean", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_into_value() {
        assert_eq!(Value::from(5u32), Value::UI4(5));
        assert_eq!(Value::from(-3i32), Value::I4(-3));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from("x"), Value::String("x".to_string()));
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(i64::try_from(&Value::UI2(9)).unwrap(), 9);
        assert_eq!(u32::try_from(&Value::I4(7)).unwrap(), 7);
        assert!(u32::try_from(&Value::I4(-1)).is_err());
        assert!(u32::try_from(&Value::UI8(u64::MAX)).is_err());
    }

    #[test]
    fn test_float_from_integer() {
        assert_eq!(f64::try_from(&Value::I4(2)).unwrap(), 2.0);
        assert!(f64::try_from(&Value::String("x".to_string())).is_err());
    }
}
