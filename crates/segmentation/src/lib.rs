//! Rule-based audience segmentation — free-text rule parsing and
//! single-predicate customer matching.

pub mod engine;
pub mod parser;
pub mod predicates;

pub use engine::{Segment, SegmentMatcher};
pub use parser::{HeuristicRuleParser, RuleParser};
pub use predicates::{ParsedRule, RuleField, RuleOperator};
