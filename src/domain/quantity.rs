use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// A line quantity, always between 1 and [`Quantity::MAX`].
///
/// Incoming quantities are normalized rather than rejected: numbers are
/// floored, numeric strings are parsed, anything non-positive or
/// non-numeric becomes 1 and anything larger than the cap becomes the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[schema(value_type = i32)]
pub struct Quantity(i32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    /// Largest quantity a single line can hold, merged lines included.
    pub const MAX: Quantity = Quantity(9_999);

    pub fn new(raw: i64) -> Self {
        Quantity(raw.clamp(1, i64::from(Self::MAX.0)) as i32)
    }

    pub fn from_f64(raw: f64) -> Self {
        if !raw.is_finite() {
            return Quantity::ONE;
        }
        let floored = raw.floor();
        if floored < 1.0 {
            Quantity::ONE
        } else if floored >= f64::from(Self::MAX.0) {
            Quantity::MAX
        } else {
            Quantity(floored as i32)
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Quantity::new(i),
                None => n.as_f64().map(Quantity::from_f64).unwrap_or(Quantity::ONE),
            },
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Quantity::from_f64)
                .unwrap_or(Quantity::ONE),
            _ => Quantity::ONE,
        }
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::ONE
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Quantity::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_positive_and_garbage_become_one() {
        for value in [json!(0), json!(-3), json!("abc"), json!(null), json!(0.4), json!([2])] {
            assert_eq!(Quantity::from_json(&value).get(), 1, "{value}");
        }
    }

    #[test]
    fn fractional_and_string_quantities_floor() {
        assert_eq!(Quantity::from_json(&json!(2.9)).get(), 2);
        assert_eq!(Quantity::from_json(&json!("3")).get(), 3);
        assert_eq!(Quantity::from_json(&json!(" 4.7 ")).get(), 4);
    }

    #[test]
    fn huge_quantities_stop_at_the_cap() {
        for value in [json!(2_000_000_000), json!(1e300), json!("123456789"), json!(i64::MAX)] {
            assert_eq!(Quantity::from_json(&value), Quantity::MAX, "{value}");
        }
        assert_eq!(Quantity::new(9_999).get(), 9_999);
    }

    #[test]
    fn deserializes_from_any_json() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            qty: Quantity,
        }
        let body: Body = serde_json::from_str(r#"{"qty":"5"}"#).unwrap();
        assert_eq!(body.qty.get(), 5);
        let body: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(body.qty.get(), 1);
    }
}
