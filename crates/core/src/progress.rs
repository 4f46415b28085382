//! Typed render progress, decoded once from loosely-typed upstream JSON.
//!
//! Render-service deployments disagree on the unit of `renderProgress`:
//! some report a fraction in `0..1`, others a percentage in `0..100`.
//! Values strictly above [`PERCENTAGE_THRESHOLD`] are read as percentages.
//! A job reporting exactly 100% as `1.0` and one reporting 1% as `1` are
//! indistinguishable; both decode as a fraction.

use serde_json::Value;

/// Raw values above this are treated as percentages.
pub const PERCENTAGE_THRESHOLD: f64 = 1.01;

/// Progress as reported upstream, with its unit resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressValue {
    /// Already a fraction of completion.
    Fraction(f64),
    /// A percentage (0-100).
    Percentage(f64),
    /// Absent or of an unusable shape.
    Missing,
}

impl ProgressValue {
    /// Resolve the unit of a raw numeric reading.
    pub fn from_raw(value: f64) -> Self {
        if !value.is_finite() {
            Self::Missing
        } else if value > PERCENTAGE_THRESHOLD {
            Self::Percentage(value)
        } else {
            Self::Fraction(value)
        }
    }

    /// Decode an arbitrary JSON value.
    ///
    /// Numbers and numeric strings are accepted; every other shape
    /// degrades to [`ProgressValue::Missing`].
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map_or(Self::Missing, Self::from_raw),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_or(Self::Missing, Self::from_raw),
            _ => Self::Missing,
        }
    }

    /// Completion as a fraction clamped to `[0, 1]`. Missing reads as `0`.
    pub fn as_fraction(self) -> f64 {
        let raw = match self {
            Self::Fraction(v) => v,
            Self::Percentage(v) => v / 100.0,
            Self::Missing => 0.0,
        };
        raw.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fraction_passes_through() {
        assert_eq!(ProgressValue::from_json(&json!(0.55)), ProgressValue::Fraction(0.55));
        assert!((ProgressValue::from_json(&json!(0.55)).as_fraction() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn percentage_is_scaled() {
        assert_eq!(ProgressValue::from_json(&json!(55)), ProgressValue::Percentage(55.0));
        assert!((ProgressValue::from_json(&json!(55)).as_fraction() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn one_is_a_fraction() {
        assert_eq!(ProgressValue::from_json(&json!(1.0)), ProgressValue::Fraction(1.0));
        assert_eq!(ProgressValue::from_json(&json!(1)), ProgressValue::Fraction(1.0));
        assert_eq!(ProgressValue::from_json(&json!(1.0)).as_fraction(), 1.0);
    }

    #[test]
    fn threshold_boundary() {
        // 1.01 itself is not strictly above the threshold.
        assert_eq!(ProgressValue::from_raw(1.01), ProgressValue::Fraction(1.01));
        assert_eq!(ProgressValue::from_raw(1.01).as_fraction(), 1.0);

        assert_eq!(ProgressValue::from_raw(1.02), ProgressValue::Percentage(1.02));
        assert!((ProgressValue::from_raw(1.02).as_fraction() - 0.0102).abs() < 1e-9);
    }

    #[test]
    fn hundred_percent_is_complete() {
        assert_eq!(ProgressValue::from_json(&json!(100)).as_fraction(), 1.0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(ProgressValue::from_json(&json!(250)).as_fraction(), 1.0);
        assert_eq!(ProgressValue::from_json(&json!(-0.3)).as_fraction(), 0.0);
        assert_eq!(ProgressValue::from_json(&json!(-40)).as_fraction(), 0.0);
    }

    #[test]
    fn numeric_strings_are_decoded() {
        assert_eq!(ProgressValue::from_json(&json!("42")), ProgressValue::Percentage(42.0));
        assert_eq!(ProgressValue::from_json(&json!(" 0.25 ")), ProgressValue::Fraction(0.25));
    }

    #[test]
    fn unusable_shapes_are_missing() {
        for value in [
            json!(null),
            json!(true),
            json!("halfway"),
            json!({"value": 3}),
            json!([0.5]),
            json!("NaN"),
            json!("inf"),
        ] {
            assert_eq!(ProgressValue::from_json(&value), ProgressValue::Missing, "{value}");
        }
        assert_eq!(ProgressValue::Missing.as_fraction(), 0.0);
    }
}
