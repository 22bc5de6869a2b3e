use crate::config::RuleDescriptor;
use crate::error::ConfigError;
use crate::matcher::{Condition, Match};
use crate::record::Record;
use crate::rule::{Assignment, Outcome, Rule};

/// Key of the drop flag in a rule descriptor
pub const IGNORE_KEY: &str = "ignore";

/// Ordered rule list with first-match-wins dispatch
#[derive(Debug, Clone, Default)]
pub struct Classificator {
    rules: Vec<Rule>,
}

impl Classificator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build rules from descriptors, preserving their order.
    ///
    /// `match_*` and `pattern_*` keys become conditions, `ignore` is the
    /// drop flag and every other key is an assignment.
    pub fn from_descriptors(descriptors: &[RuleDescriptor]) -> Result<Self, ConfigError> {
        descriptors
            .iter()
            .enumerate()
            .map(|(idx, descriptor)| build_rule(&format!("rule[{}]", idx), descriptor))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply the first rule whose match succeeds; later rules are not evaluated
    pub fn classify(&self, record: &mut dyn Record) -> Outcome {
        for rule in &self.rules {
            let outcome = rule.apply(record);
            if outcome.is_matched() {
                return outcome;
            }
        }
        Outcome::Unmatched
    }
}

fn build_rule(context: &str, descriptor: &RuleDescriptor) -> Result<Rule, ConfigError> {
    let mut conditions = Vec::new();
    let mut ignore = false;
    let mut assignments = Vec::new();

    for (key, value) in descriptor.entries() {
        if let Some(condition) = Condition::from_entry(context, key, value)? {
            conditions.push(condition);
        } else if key == IGNORE_KEY {
            ignore = value.to_field_value().is_truthy();
        } else if key.starts_with(IGNORE_KEY) {
            // reserved for annotations such as `ignore_reason`; never assigned
            continue;
        } else {
            assignments.push(Assignment::new(key.clone(), value.to_field_value()));
        }
    }

    Ok(Rule::new(Match::new(conditions), ignore, assignments))
}
