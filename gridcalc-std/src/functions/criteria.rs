//! Criteria for conditional aggregation (`">40"`, `"test*"`, `"<>x"`, `5`)

use gridcalc_core::wildcard::is_wildcard_pattern;
use gridcalc_core::{CompareToken, FormulaError, Operand, Value};

/// Parsed predicate applied to each cell of a criteria range
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    pub op: CompareToken,
    pub comparand: Value,
    pub wildcard: bool,
}

impl Criteria {
    /// Parse a criteria argument.
    ///
    /// Text may start with a relational token; the remainder is read as a
    /// literal. Anything else is compared for equality. Multi-cell ranges
    /// are rejected with `#VALUE!`.
    pub fn parse(arg: &Operand) -> Result<Self, FormulaError> {
        if arg.is_range() && arg.shape() != (1, 1) {
            return Err(FormulaError::value().with_message("Criteria must be a single value"));
        }

        match arg.to_scalar() {
            Value::Error(e) => Err(e),
            Value::Text(text) => Ok(Self::from_text(&text)),
            Value::Null => Ok(Self::new(CompareToken::Equals, Value::Text(String::new()))),
            other => Ok(Self::new(CompareToken::Equals, other)),
        }
    }

    pub fn from_text(text: &str) -> Self {
        let (op, rest) = CompareToken::split_prefix(text).unwrap_or((CompareToken::Equals, text));
        let comparand = if rest.is_empty() {
            Value::Text(String::new())
        } else {
            Value::from_literal(rest)
        };
        Self::new(op, comparand)
    }

    fn new(op: CompareToken, comparand: Value) -> Self {
        let wildcard = comparand.as_text().is_some_and(is_wildcard_pattern);
        Self { op, comparand, wildcard }
    }

    /// Error cells never match.
    pub fn matches(&self, cell: &Value) -> bool {
        let outcome = if self.wildcard {
            cell.wildcard(&self.comparand, self.op)
        } else {
            cell.compare(&self.comparand, self.op)
        };
        outcome.as_bool() == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relational_prefix() {
        let c = Criteria::from_text(">=40");
        assert_eq!(c.op, CompareToken::GreaterThanOrEqual);
        assert_eq!(c.comparand, Value::number(40));
        assert!(!c.wildcard);
        assert!(c.matches(&Value::number(40)));
        assert!(!c.matches(&Value::number(39)));
    }

    #[test]
    fn test_bare_text_is_equality() {
        let c = Criteria::from_text("apple");
        assert_eq!(c.op, CompareToken::Equals);
        assert!(c.matches(&Value::from("apple")));
        assert!(!c.matches(&Value::from("pear")));
    }

    #[test]
    fn test_wildcard_detection() {
        let c = Criteria::from_text("<>te?t");
        assert!(c.wildcard);
        assert!(!c.matches(&Value::from("test")));
        assert!(c.matches(&Value::from("toast")));
    }

    #[test]
    fn test_empty_criteria_matches_blank() {
        let c = Criteria::from_text("=");
        assert!(c.matches(&Value::Null));
        assert!(!c.matches(&Value::number(0)));
    }

    #[test]
    fn test_error_cells_never_match() {
        let c = Criteria::from_text("<>1");
        assert!(!c.matches(&Value::error(gridcalc_core::ErrorType::Na)));
    }

    #[test]
    fn test_array_criteria_rejected() {
        let arg = Operand::from(Value::Array(gridcalc_core::ArrayValue::from_rows(vec![vec![
            Value::number(1),
            Value::number(2),
        ]])));
        assert!(Criteria::parse(&arg).is_err());
    }
}
