//! Segment matcher — filters a customer list by a segment's parsed rule.

use chrono::{DateTime, Utc};
use crm_core::types::{Customer, Entity};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::predicates::ParsedRule;

/// A named, rule-defined subset of customers. `customer_count` is a
/// snapshot taken when the segment was created or last updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: Uuid,
    pub name: String,
    pub rule_text: String,
    pub parsed_rule: ParsedRule,
    pub customer_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    pub fn new(name: impl Into<String>, rule_text: impl Into<String>, parsed_rule: ParsedRule) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rule_text: rule_text.into(),
            parsed_rule,
            customer_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Segment {
    fn id(&self) -> Uuid {
        self.id
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Applies a single-predicate rule to customers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentMatcher;

impl SegmentMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Customers matching `rule`, in input order. No rule means everyone.
    pub fn match_customers(&self, customers: &[Customer], rule: Option<&ParsedRule>) -> Vec<Customer> {
        let Some(rule) = rule else {
            return customers.to_vec();
        };
        let matched: Vec<Customer> = customers
            .iter()
            .filter(|c| rule.evaluate(c))
            .cloned()
            .collect();
        debug!(
            field = ?rule.field,
            operator = ?rule.operator,
            total = customers.len(),
            matched = matched.len(),
            "Segment rule applied"
        );
        matched
    }

    pub fn count_matches(&self, customers: &[Customer], rule: Option<&ParsedRule>) -> usize {
        match rule {
            Some(rule) => customers.iter().filter(|c| rule.evaluate(c)).count(),
            None => customers.len(),
        }
    }
}
