//! Decimal (de)serialization helpers
//!
//! The exchange is inconsistent about numbers: `"minOrderSize": "0.001"` next
//! to `"price": 0.02`. Every decimal field goes through these helpers so both
//! forms parse, without a detour through `f64` on the way in.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use std::str::FromStr;

fn from_value<E: serde::de::Error>(value: &Value) -> Result<Option<Decimal>, E> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(E::custom(format!("expected decimal, got {}", other))),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|e| E::custom(format!("invalid decimal {:?}: {}", text, e)))
}

/// Required decimal, number or string
pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    from_value(&value)?.ok_or_else(|| D::Error::custom("missing decimal value"))
}

/// Optional decimal; `null` and `""` read as `None`
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    from_value(&value)
}

/// Serialize as a JSON number, the form the order endpoint expects
pub fn serialize_as_number<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value.to_f64() {
        Some(number) => serializer.serialize_f64(number),
        None => Err(serde::ser::Error::custom(format!(
            "decimal {} not representable as a number",
            value
        ))),
    }
}

pub fn serialize_option_as_number<S>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(value) => serialize_as_number(value, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Deserialize, Serialize)]
    struct Sample {
        #[serde(deserialize_with = "super::deserialize", serialize_with = "super::serialize_as_number")]
        price: Decimal,
        #[serde(default, deserialize_with = "super::deserialize_option")]
        size: Option<Decimal>,
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        let a: Sample = serde_json::from_str(r#"{"price": 0.02, "size": "1.5"}"#).unwrap();
        assert_eq!(a.price, dec!(0.02));
        assert_eq!(a.size, Some(dec!(1.5)));

        let b: Sample = serde_json::from_str(r#"{"price": "9999.9", "size": null}"#).unwrap();
        assert_eq!(b.price, dec!(9999.9));
        assert_eq!(b.size, None);

        let c: Sample = serde_json::from_str(r#"{"price": 10000}"#).unwrap();
        assert_eq!(c.price, dec!(10000));
        assert_eq!(c.size, None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Sample>(r#"{"price": "abc"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"price": true}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"price": null}"#).is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let sample = Sample {
            price: dec!(0.02),
            size: None,
        };
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["price"], serde_json::json!(0.02));
    }
}
