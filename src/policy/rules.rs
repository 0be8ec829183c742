//! Caller-supplied validation rules

use std::fmt;
use std::sync::Arc;

use crate::models::Transaction;

/// A named pass/fail predicate over a transaction
pub trait ValidationRule: Send + Sync {
    /// Name reported in `blocked_by` when the rule fails
    fn name(&self) -> &str;

    /// Disabled rules are skipped
    fn is_enabled(&self) -> bool {
        true
    }

    /// `true` when the transaction passes
    fn check(&self, transaction: &Transaction) -> bool;
}

/// Rule backed by a closure
pub struct FnRule<F> {
    name: String,
    enabled: bool,
    predicate: F,
}

impl<F> FnRule<F>
where
    F: Fn(&Transaction) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            predicate,
        }
    }

    /// Same rule, disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl<F> ValidationRule for FnRule<F>
where
    F: Fn(&Transaction) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn check(&self, transaction: &Transaction) -> bool {
        (self.predicate)(transaction)
    }
}

/// Shared, ordered collection of rules
#[derive(Clone, Default)]
pub struct RuleSet(Vec<Arc<dyn ValidationRule>>);

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule
    pub fn push(&mut self, rule: Arc<dyn ValidationRule>) {
        self.0.push(rule);
    }

    /// Builder form of [`RuleSet::push`]
    pub fn with(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.0.push(Arc::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of enabled rules that reject `transaction`, in rule order
    pub fn failing(&self, transaction: &Transaction) -> Vec<String> {
        self.0
            .iter()
            .filter(|rule| rule.is_enabled())
            .filter(|rule| !rule.check(transaction))
            .map(|rule| rule.name().to_string())
            .collect()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.0.iter().map(|rule| rule.name()))
            .finish()
    }
}

impl FromIterator<Arc<dyn ValidationRule>> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ValidationRule>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
