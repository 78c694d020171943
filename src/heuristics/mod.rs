//! Rule-based overrides that bypass the classifier.

mod engine;
mod rules;

pub use engine::{HeuristicEngine, HeuristicVerdict};
pub use rules::{Condition, Rule, RuleInput, RuleKind, RuleTable};
