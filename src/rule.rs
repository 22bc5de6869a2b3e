use crate::matcher::{Groups, Match};
use crate::models::FieldValue;
use crate::record::Record;
use tracing::debug;

/// Result of evaluating a rule (or a whole classificator) against a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No rule matched; the record is untouched
    Unmatched,
    /// A rule matched and its assignments were applied
    Applied,
    /// A drop rule matched; the line must not be emitted
    Dropped,
}

impl Outcome {
    pub fn is_matched(self) -> bool {
        !matches!(self, Outcome::Unmatched)
    }
}

/// Field assignment performed when a rule fires
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub value: FieldValue,
}

impl Assignment {
    pub fn new(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Value to store, with capture groups substituted into text templates
    fn resolve(&self, groups: &Groups) -> FieldValue {
        match &self.value {
            FieldValue::Text(template)
                if !groups.is_empty() && template.contains('{') && template.contains('}') =>
            {
                FieldValue::Text(interpolate(template, groups))
            }
            other => other.clone(),
        }
    }
}

/// A match paired with either a drop flag or a set of assignments
#[derive(Debug, Clone)]
pub struct Rule {
    matcher: Match,
    ignore: bool,
    assignments: Vec<Assignment>,
}

impl Rule {
    pub fn new(matcher: Match, ignore: bool, assignments: Vec<Assignment>) -> Self {
        Self {
            matcher,
            ignore,
            assignments,
        }
    }

    /// A rule that drops every record its match accepts
    pub fn ignore(matcher: Match) -> Self {
        Self::new(matcher, true, Vec::new())
    }

    pub fn matcher(&self) -> &Match {
        &self.matcher
    }

    pub fn is_drop(&self) -> bool {
        self.ignore
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Evaluate the rule; a drop rule never touches the record
    pub fn apply(&self, record: &mut dyn Record) -> Outcome {
        let groups = match self.matcher.check(record) {
            Some(groups) => groups,
            None => return Outcome::Unmatched,
        };

        if self.ignore {
            return Outcome::Dropped;
        }

        for assignment in &self.assignments {
            let value = assignment.resolve(&groups);
            debug!(field = %assignment.field, value = %value, "rule assignment");
            record.set(&assignment.field, value);
        }
        Outcome::Applied
    }
}

/// Substitute capture groups into a positional template.
///
/// `{N}` selects group N, `{}` the next group in sequence, `{{` and `}}`
/// are literal braces. A placeholder whose group does not exist is kept
/// verbatim; a group that did not participate renders as nothing.
pub fn interpolate(template: &str, groups: &Groups) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    let mut next_auto = 0;

    while let Some((start, ch)) = chars.next() {
        match ch {
            '{' if chars.peek().map(|&(_, c)| c) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().map(|&(_, c)| c) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &template[start + 1..];
                let close = match rest.find('}') {
                    Some(close) => close,
                    None => {
                        out.push_str(&template[start..]);
                        break;
                    }
                };
                let body = &rest[..close];
                let index = if body.is_empty() {
                    let index = next_auto;
                    next_auto += 1;
                    Some(index)
                } else {
                    body.parse::<usize>().ok()
                };

                match index.filter(|&i| i < groups.len()) {
                    Some(i) => out.push_str(groups.get(i).unwrap_or_default()),
                    None => out.push_str(&template[start..start + close + 2]),
                }

                // skip the placeholder body and its closing brace
                for _ in 0..body.chars().count() + 1 {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }
    out
}
