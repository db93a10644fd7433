#![forbid(unsafe_code)]

use crate::Value;
use std::fmt;

/// Allow-listed numeric classification predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    IsNotANumber,
    IsInfinite,
    IsFinite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateResolutionError {
    pub name: String,
}

impl fmt::Display for PredicateResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allowed = Predicate::ALLOWED_NAMES
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "cannot resolve predicate `{}`; allowed predicates: {allowed}",
            self.name
        )
    }
}

impl std::error::Error for PredicateResolutionError {}

impl Predicate {
    /// Canonical names first, then the `math.*` spellings older IR files use.
    pub const ALLOWED_NAMES: [(&'static str, Self); 6] = [
        ("is-not-a-number", Self::IsNotANumber),
        ("is-infinite", Self::IsInfinite),
        ("is-finite", Self::IsFinite),
        ("math.isnan", Self::IsNotANumber),
        ("math.isinf", Self::IsInfinite),
        ("math.isfinite", Self::IsFinite),
    ];

    pub fn resolve(name: &str) -> Result<Self, PredicateResolutionError> {
        Self::ALLOWED_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, predicate)| *predicate)
            .ok_or_else(|| PredicateResolutionError {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::IsNotANumber => "is-not-a-number",
            Self::IsInfinite => "is-infinite",
            Self::IsFinite => "is-finite",
        }
    }

    /// Non-numeric values never satisfy a predicate.
    #[must_use]
    pub fn apply(self, value: &Value) -> bool {
        let (re, im) = match value {
            Value::Int(v) => (*v as f64, 0.0),
            Value::Float(v) => (*v, 0.0),
            Value::Complex { re, im } => (*re, *im),
            _ => return false,
        };
        match self {
            Self::IsNotANumber => re.is_nan() || im.is_nan(),
            Self::IsInfinite => re.is_infinite() || im.is_infinite(),
            Self::IsFinite => re.is_finite() && im.is_finite(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::Predicate;
    use crate::Value;

    #[test]
    fn resolves_canonical_and_math_names() {
        assert_eq!(Predicate::resolve("is-infinite"), Ok(Predicate::IsInfinite));
        assert_eq!(Predicate::resolve("math.isnan"), Ok(Predicate::IsNotANumber));
        assert_eq!(Predicate::resolve("math.isfinite"), Ok(Predicate::IsFinite));
    }

    #[test]
    fn rejects_names_outside_the_allow_list() {
        for name in ["os.system", "math.sqrt", "isnan", "IS-FINITE", ""] {
            let err = Predicate::resolve(name).expect_err("should be rejected");
            assert_eq!(err.name, name);
            assert!(err.to_string().contains("is-not-a-number"));
        }
    }

    #[test]
    fn large_finite_values_are_not_infinite() {
        assert!(!Predicate::IsInfinite.apply(&Value::Float(1e308)));
        assert!(Predicate::IsFinite.apply(&Value::Float(1e308)));
        assert!(Predicate::IsInfinite.apply(&Value::Float(f64::NEG_INFINITY)));
        assert!(Predicate::IsFinite.apply(&Value::Int(i64::MAX)));
    }

    #[test]
    fn non_numeric_values_fail_every_predicate() {
        for predicate in [
            Predicate::IsNotANumber,
            Predicate::IsInfinite,
            Predicate::IsFinite,
        ] {
            assert!(!predicate.apply(&Value::from("NaN")));
            assert!(!predicate.apply(&Value::Null));
        }
    }
}
