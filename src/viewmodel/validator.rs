//! Per-property validation engine.
//!
//! A validator maps property names to pass/fail rules and accumulates the
//! error messages of currently failing properties. Validation failure is
//! data, never an error type: it lives in the error map and is surfaced
//! through the errors-changed event, which fires only when a property's
//! errors-presence actually transitions.

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::core::Event;

/// Property identifier. Short and hot-path, hence `CompactString`.
pub type PropertyName = CompactString;

/// The conventional empty token: "everything may have changed".
pub const ALL_PROPERTIES: &str = "";

pub struct ValidationRule {
    property: PropertyName,
    message: String,
    predicate: Box<dyn Fn() -> bool + Send + Sync>,
}

pub struct Validator {
    /// Insertion order is validation order; tests may observe predicate
    /// side effects.
    rules: Vec<ValidationRule>,
    errors: FxHashMap<PropertyName, Vec<String>>,
    errors_changed: Event<PropertyName>,
}

impl Validator {
    /// A validator wired to an existing errors-changed event (the one the
    /// owning view model exposes).
    pub(crate) fn attached(errors_changed: Event<PropertyName>) -> Self {
        Self {
            rules: Vec::new(),
            errors: FxHashMap::default(),
            errors_changed,
        }
    }

    /// A free-standing validator with its own event.
    pub fn new() -> Self {
        Self::attached(Event::new())
    }

    pub fn on_errors_changed(&self) -> &Event<PropertyName> {
        &self.errors_changed
    }

    /// Installs the rule for `property`, replacing any prior rule in
    /// place (the original insertion position is kept).
    pub fn add_validation(
        &mut self,
        property: impl Into<PropertyName>,
        message: impl Into<String>,
        predicate: impl Fn() -> bool + Send + Sync + 'static,
    ) {
        let rule = ValidationRule {
            property: property.into(),
            message: message.into(),
            predicate: Box::new(predicate),
        };

        match self.rules.iter().position(|r| r.property == rule.property) {
            Some(index) => self.rules[index] = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn has_rule(&self, property: &str) -> bool {
        self.rules.iter().any(|r| r.property == property)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Runs the rule for `property`, if any. The errors-changed event
    /// fires only when the property transitions between "no error" and
    /// "has error"; re-running an unchanged rule is silent.
    pub fn validate_property(&mut self, property: &str) {
        let Some(index) = self.rules.iter().position(|r| r.property == property) else {
            return;
        };
        self.run_rule(index);
    }

    pub fn validate_properties<I, S>(&mut self, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for property in properties {
            self.validate_property(property.as_ref());
        }
    }

    /// Runs every installed rule in insertion order.
    pub fn validate_all_properties(&mut self) {
        for index in 0..self.rules.len() {
            self.run_rule(index);
        }
    }

    fn run_rule(&mut self, index: usize) {
        let passed = (self.rules[index].predicate)();
        let property = self.rules[index].property.clone();

        if passed {
            if self.errors.remove(property.as_str()).is_some() {
                self.errors_changed.emit(&property);
            }
        } else {
            let message = self.rules[index].message.clone();
            let was_clean = !self.errors.contains_key(property.as_str());
            self.errors.insert(property.clone(), vec![message]);
            if was_clean {
                tracing::debug!(property = %property, "validation failed");
                self.errors_changed.emit(&property);
            }
        }
    }

    /// Removes the rule and any error for `property`. Removal is itself a
    /// change, so the notification fires unconditionally.
    pub fn remove_validation(&mut self, property: &str) {
        self.rules.retain(|r| r.property != property);
        self.errors.remove(property);
        self.errors_changed.emit(&PropertyName::from(property));
    }

    /// Replaces the error list for `property` with a single message,
    /// notifying on the no-error -> has-error transition.
    pub fn add_error(&mut self, property: impl Into<PropertyName>, message: impl Into<String>) {
        let property = property.into();
        let was_clean = !self.errors.contains_key(property.as_str());
        self.errors.insert(property.clone(), vec![message.into()]);
        if was_clean {
            self.errors_changed.emit(&property);
        }
    }

    pub fn remove_error(&mut self, property: &str) {
        if self.errors.remove(property).is_some() {
            self.errors_changed.emit(&PropertyName::from(property));
        }
    }

    /// Wipes the error map and fires one notification with the empty
    /// "errors changed globally" token.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.errors_changed.emit(&PropertyName::from(ALL_PROPERTIES));
    }

    pub(crate) fn clear_errors_silent(&mut self) {
        self.errors.clear();
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &FxHashMap<PropertyName, Vec<String>> {
        &self.errors
    }

    pub fn errors_for(&self, property: &str) -> Option<&[String]> {
        self.errors.get(property).map(Vec::as_slice)
    }

    /// Every active message, newline-joined, in rule insertion order
    /// (errors without a rule follow, sorted for determinism).
    pub fn error_messages(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();

        for rule in &self.rules {
            if let Some(messages) = self.errors.get(rule.property.as_str()) {
                lines.extend(messages.iter().map(String::as_str));
            }
        }

        let mut orphans: Vec<&PropertyName> = self
            .errors
            .keys()
            .filter(|p| !self.rules.iter().any(|r| &r.property == *p))
            .collect();
        orphans.sort();
        for property in orphans {
            lines.extend(self.errors[property].iter().map(String::as_str));
        }

        lines.join("\n")
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
