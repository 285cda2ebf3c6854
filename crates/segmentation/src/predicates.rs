//! Predicate types and evaluation logic for segment rules.

use chrono::{DateTime, NaiveDate, Utc};
use crm_core::types::Customer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Customer attribute a rule filters on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RuleField {
    TotalSpend,
    LastPurchaseDate,
    Location,
    /// Any field name this engine does not know.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RuleOperator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equals,
    #[serde(other)]
    Unsupported,
}

/// Structured form of a segment rule: exactly one field/operator/value
/// triple. Conjunctions are not representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRule {
    pub field: RuleField,
    pub operator: RuleOperator,
    pub value: serde_json::Value,
}

impl ParsedRule {
    pub fn new(field: RuleField, operator: RuleOperator, value: serde_json::Value) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    pub fn total_spend(operator: RuleOperator, amount: u64) -> Self {
        Self::new(RuleField::TotalSpend, operator, serde_json::Value::from(amount))
    }

    pub fn last_purchase_before(date: NaiveDate) -> Self {
        Self::new(
            RuleField::LastPurchaseDate,
            RuleOperator::LessThan,
            serde_json::Value::from(date.format("%Y-%m-%d").to_string()),
        )
    }

    pub fn location(city: impl Into<String>) -> Self {
        Self::new(
            RuleField::Location,
            RuleOperator::Equals,
            serde_json::Value::from(city.into()),
        )
    }

    /// Evaluate the rule against one customer. Field/operator pairs without
    /// an implementation let the customer through.
    pub fn evaluate(&self, customer: &Customer) -> bool {
        match (self.field, self.operator) {
            (RuleField::TotalSpend, op @ (RuleOperator::GreaterThan
            | RuleOperator::LessThan
            | RuleOperator::Equals)) => compare_spend(customer.total_spend, op, &self.value),
            (RuleField::LastPurchaseDate, op @ (RuleOperator::GreaterThan | RuleOperator::LessThan)) => {
                compare_dates(customer.last_purchase_date.as_deref(), op, &self.value)
            }
            (RuleField::Location, RuleOperator::Equals) => {
                self.value.as_str() == Some(customer.location.as_str())
            }
            _ => true,
        }
    }
}

#[allow(clippy::unnecessary_map_or)]
fn compare_spend(actual: f64, operator: RuleOperator, expected: &serde_json::Value) -> bool {
    let ordering = expected.as_f64().and_then(|e| actual.partial_cmp(&e));
    match operator {
        RuleOperator::GreaterThan => ordering.map_or(false, |o| o == Ordering::Greater),
        RuleOperator::LessThan => ordering.map_or(false, |o| o == Ordering::Less),
        RuleOperator::Equals => ordering.map_or(false, |o| o == Ordering::Equal),
        RuleOperator::Unsupported => true,
    }
}

/// Unparseable dates on either side make every comparison false, the same
/// way an invalid date never orders against anything.
fn compare_dates(actual: Option<&str>, operator: RuleOperator, expected: &serde_json::Value) -> bool {
    let (Some(actual), Some(expected)) = (
        actual.and_then(parse_date),
        expected.as_str().and_then(parse_date),
    ) else {
        return false;
    };
    match operator {
        RuleOperator::LessThan => actual < expected,
        RuleOperator::GreaterThan => actual > expected,
        _ => true,
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer(spend: f64, last_purchase: Option<&str>, location: &str) -> Customer {
        let mut c = Customer::new("Test", "test@example.com", "+91-9000000000", spend, location);
        c.last_purchase_date = last_purchase.map(str::to_string);
        c
    }

    #[test]
    fn test_rule_wire_format() {
        let rule: ParsedRule =
            serde_json::from_value(json!({"field": "totalSpend", "operator": ">", "value": 10000}))
                .unwrap();
        assert_eq!(rule, ParsedRule::total_spend(RuleOperator::GreaterThan, 10000));

        let json = serde_json::to_value(ParsedRule::location("Delhi")).unwrap();
        assert_eq!(json, json!({"field": "location", "operator": "=", "value": "Delhi"}));
    }

    #[test]
    fn test_unknown_field_and_operator_deserialize() {
        let rule: ParsedRule =
            serde_json::from_value(json!({"field": "loyaltyTier", "operator": "~", "value": "gold"}))
                .unwrap();
        assert_eq!(rule.field, RuleField::Unsupported);
        assert_eq!(rule.operator, RuleOperator::Unsupported);
    }

    #[test]
    fn test_spend_comparisons() {
        let c = customer(15000.0, None, "Mumbai");
        assert!(ParsedRule::total_spend(RuleOperator::GreaterThan, 10000).evaluate(&c));
        assert!(!ParsedRule::total_spend(RuleOperator::LessThan, 10000).evaluate(&c));
        assert!(ParsedRule::total_spend(RuleOperator::Equals, 15000).evaluate(&c));
        assert!(!ParsedRule::total_spend(RuleOperator::Equals, 15001).evaluate(&c));
    }

    #[test]
    fn test_spend_with_non_numeric_value_is_false() {
        let c = customer(15000.0, None, "Mumbai");
        let rule = ParsedRule::new(RuleField::TotalSpend, RuleOperator::GreaterThan, json!("lots"));
        assert!(!rule.evaluate(&c));
    }

    #[test]
    fn test_date_comparisons() {
        let c = customer(0.0, Some("2023-11-20"), "Delhi");
        let before = ParsedRule::new(RuleField::LastPurchaseDate, RuleOperator::LessThan, json!("2024-01-01"));
        let after = ParsedRule::new(RuleField::LastPurchaseDate, RuleOperator::GreaterThan, json!("2024-01-01"));
        assert!(before.evaluate(&c));
        assert!(!after.evaluate(&c));
    }

    #[test]
    fn test_malformed_dates_never_match() {
        let bad_customer = customer(0.0, Some("last tuesday"), "Delhi");
        let missing = customer(0.0, None, "Delhi");
        let before = ParsedRule::new(RuleField::LastPurchaseDate, RuleOperator::LessThan, json!("2024-01-01"));
        let after = ParsedRule::new(RuleField::LastPurchaseDate, RuleOperator::GreaterThan, json!("2024-01-01"));
        assert!(!before.evaluate(&bad_customer));
        assert!(!after.evaluate(&bad_customer));
        assert!(!before.evaluate(&missing));

        let good = customer(0.0, Some("2023-01-01"), "Delhi");
        let bad_rule = ParsedRule::new(RuleField::LastPurchaseDate, RuleOperator::LessThan, json!("soon"));
        assert!(!bad_rule.evaluate(&good));
    }

    #[test]
    fn test_location_is_exact_match() {
        let c = customer(0.0, None, "Mumbai");
        assert!(ParsedRule::location("Mumbai").evaluate(&c));
        assert!(!ParsedRule::location("mumbai").evaluate(&c));
        assert!(!ParsedRule::location("Delhi").evaluate(&c));
    }

    #[test]
    fn test_unsupported_combinations_default_allow() {
        let c = customer(100.0, Some("not a date"), "Chennai");
        let cases = [
            ParsedRule::new(RuleField::Location, RuleOperator::GreaterThan, json!("Mumbai")),
            ParsedRule::new(RuleField::Location, RuleOperator::LessThan, json!("Mumbai")),
            ParsedRule::new(RuleField::LastPurchaseDate, RuleOperator::Equals, json!("2024-01-01")),
            ParsedRule::new(RuleField::Unsupported, RuleOperator::Equals, json!(1)),
            ParsedRule::new(RuleField::TotalSpend, RuleOperator::Unsupported, json!(1_000_000)),
        ];
        for rule in cases {
            assert!(rule.evaluate(&c), "expected default-allow for {:?}", rule);
        }
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-01-15").is_some());
        assert!(parse_date("2024-01-15T10:30:00.000Z").is_some());
        assert!(parse_date("15/01/2024").is_none());
        assert!(parse_date("").is_none());
    }
}
