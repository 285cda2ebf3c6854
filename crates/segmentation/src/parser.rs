//! Free-text segment rule parsing.
//!
//! The heuristic parser is plain keyword containment. Every input yields a
//! rule; text it does not understand falls back to "spend > 0".

use crate::predicates::{ParsedRule, RuleOperator};
use chrono::{Duration, NaiveDate, Utc};
use crm_core::config::SegmentationConfig;
use tracing::debug;

const DEFAULT_SPEND_ABOVE: u64 = 10_000;
const DEFAULT_SPEND_BELOW: u64 = 5_000;

/// Turns a rule description into a structured predicate.
pub trait RuleParser: Send + Sync {
    fn parse(&self, rule_text: &str) -> ParsedRule;
}

/// Keyword-driven parser with a configurable inactivity window and city list.
#[derive(Debug, Clone)]
pub struct HeuristicRuleParser {
    inactivity_days: i64,
    cities: Vec<String>,
    default_city: String,
}

impl HeuristicRuleParser {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            inactivity_days: config.inactivity_days,
            cities: config.cities.clone(),
            default_city: config.default_city.clone(),
        }
    }

    /// Parse relative to a fixed `today`, used for the inactivity cutoff.
    pub fn parse_at(&self, rule_text: &str, today: NaiveDate) -> ParsedRule {
        let lower = rule_text.to_lowercase();

        let rule = if lower.contains("spend") && lower.contains('>') {
            ParsedRule::total_spend(
                RuleOperator::GreaterThan,
                first_amount(rule_text).unwrap_or(DEFAULT_SPEND_ABOVE),
            )
        } else if lower.contains("spend") && lower.contains('<') {
            ParsedRule::total_spend(
                RuleOperator::LessThan,
                first_amount(rule_text).unwrap_or(DEFAULT_SPEND_BELOW),
            )
        } else if lower.contains("last purchase") || lower.contains("inactive") {
            ParsedRule::last_purchase_before(today - Duration::days(self.inactivity_days))
        } else if lower.contains("location") || lower.contains("city") {
            let city = self
                .cities
                .iter()
                .find(|c| lower.contains(&c.to_lowercase()))
                .unwrap_or(&self.default_city);
            ParsedRule::location(city.clone())
        } else {
            ParsedRule::total_spend(RuleOperator::GreaterThan, 0)
        };

        debug!(rule_text = %rule_text, field = ?rule.field, operator = ?rule.operator, "Parsed segment rule");
        rule
    }
}

impl Default for HeuristicRuleParser {
    fn default() -> Self {
        Self::new(&SegmentationConfig::default())
    }
}

impl RuleParser for HeuristicRuleParser {
    fn parse(&self, rule_text: &str) -> ParsedRule {
        self.parse_at(rule_text, Utc::now().date_naive())
    }
}

/// First run of digits in the text, with thousands separators removed.
/// "spend > ₹10,000" yields 10000.
fn first_amount(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::RuleField;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    fn parse(text: &str) -> ParsedRule {
        HeuristicRuleParser::default().parse_at(text, today())
    }

    #[test]
    fn test_spend_greater_than_rupees() {
        assert_eq!(
            parse("spend > ₹10,000"),
            ParsedRule::total_spend(RuleOperator::GreaterThan, 10000)
        );
    }

    #[test]
    fn test_spend_less_than() {
        let rule = parse("Customers who spend < 2500");
        assert_eq!(rule.field, RuleField::TotalSpend);
        assert_eq!(rule.operator, RuleOperator::LessThan);
        assert_eq!(rule.value, json!(2500));
    }

    #[test]
    fn test_spend_defaults_without_amount() {
        assert_eq!(parse("big spend > lots").value, json!(10000));
        assert_eq!(parse("low spend < a little").value, json!(5000));
    }

    #[test]
    fn test_multiple_separators_are_stripped() {
        assert_eq!(parse("spend > 1,000,000").value, json!(1_000_000));
    }

    #[test]
    fn test_inactive_uses_ninety_day_window() {
        let rule = parse("Inactive customers");
        assert_eq!(rule.field, RuleField::LastPurchaseDate);
        assert_eq!(rule.operator, RuleOperator::LessThan);
        assert_eq!(rule.value, json!("2024-01-02"));

        assert_eq!(parse("no last purchase in a while"), rule);
    }

    #[test]
    fn test_underscored_field_name_falls_through() {
        // Only the phrase "last purchase" triggers the date rule.
        assert_eq!(
            parse("last_purchase_date older than 3 months"),
            ParsedRule::total_spend(RuleOperator::GreaterThan, 0)
        );
    }

    #[test]
    fn test_location_picks_mentioned_city() {
        assert_eq!(parse("customers in city Chennai"), ParsedRule::location("Chennai"));
        assert_eq!(parse("location is delhi"), ParsedRule::location("Delhi"));
    }

    #[test]
    fn test_location_defaults_to_configured_city() {
        assert_eq!(parse("location: Pune"), ParsedRule::location("Mumbai"));

        let config = SegmentationConfig {
            inactivity_days: 30,
            cities: vec!["Pune".to_string()],
            default_city: "Goa".to_string(),
        };
        let parser = HeuristicRuleParser::new(&config);
        assert_eq!(parser.parse_at("city pune", today()), ParsedRule::location("Pune"));
        assert_eq!(parser.parse_at("city Delhi", today()), ParsedRule::location("Goa"));
        assert_eq!(parser.parse_at("inactive", today()).value, json!("2024-03-02"));
    }

    #[test]
    fn test_fallback_matches_everyone() {
        assert_eq!(
            parse("everyone who likes tea"),
            ParsedRule::total_spend(RuleOperator::GreaterThan, 0)
        );
        assert_eq!(parse(""), ParsedRule::total_spend(RuleOperator::GreaterThan, 0));
    }

    #[test]
    fn test_trait_object_parse() {
        let parser: Box<dyn RuleParser> = Box::new(HeuristicRuleParser::default());
        assert_eq!(parser.parse("spend > 500").value, json!(500));
    }
}
