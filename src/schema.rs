use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use regex::Regex;

use crate::controller::FieldKey;
use crate::validation::{FieldLens, ValidationError};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

type FieldCheckFn<T, E> = Arc<dyn Fn(&T) -> Result<(), E> + Send + Sync>;
type FormRuleFn<T, E> = Arc<dyn Fn(&T) -> Vec<(FieldKey, E)> + Send + Sync>;

/// A plain message-carrying validation error for schemas that do not need
/// their own error type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Violation {
    message: Cow<'static, str>,
}

impl Violation {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl ValidationError for Violation {
    fn message(&self) -> Cow<'static, str> {
        self.message.clone()
    }
}

impl From<&'static str> for Violation {
    fn from(message: &'static str) -> Self {
        Self::new(message)
    }
}

impl From<String> for Violation {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub struct FieldChecks<T, E> {
    key: FieldKey,
    required: bool,
    checks: Vec<FieldCheckFn<T, E>>,
}

impl<T, E> FieldChecks<T, E> {
    pub fn new(key: FieldKey) -> Self {
        Self {
            key,
            required: false,
            checks: Vec::new(),
        }
    }

    pub fn mark_required(&mut self) {
        self.required = true;
    }

    pub fn push(&mut self, check: impl Fn(&T) -> Result<(), E> + Send + Sync + 'static) {
        self.checks.push(Arc::new(check));
    }
}

/// Converts a bundle of typed rules into ordered checks for one field.
pub trait RuleSet<T, L, E>
where
    L: FieldLens<T>,
{
    fn into_checks(self, lens: L) -> FieldChecks<T, E>;
}

/// Rules for `String` fields. Every rule except `required` accepts empty
/// input, so presence stays the job of `required` and optional fields are
/// valid while blank.
pub struct TextRules<E> {
    rules: Vec<TextRule<E>>,
}

enum TextRule<E> {
    Required(E),
    Email(E),
    MinChars(usize, E),
    OneOf(Vec<String>, E),
    NotOneOf(Vec<String>, E),
    Date(&'static str, E),
}

impl<E> TextRules<E> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn required(mut self, message: impl Into<E>) -> Self {
        self.rules.push(TextRule::Required(message.into()));
        self
    }

    pub fn email(mut self, message: impl Into<E>) -> Self {
        self.rules.push(TextRule::Email(message.into()));
        self
    }

    pub fn min_chars(mut self, min: usize, message: impl Into<E>) -> Self {
        self.rules.push(TextRule::MinChars(min, message.into()));
        self
    }

    pub fn one_of<I, S>(mut self, allowed: I, message: impl Into<E>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed = allowed.into_iter().map(Into::into).collect();
        self.rules.push(TextRule::OneOf(allowed, message.into()));
        self
    }

    pub fn not_one_of<I, S>(mut self, excluded: I, message: impl Into<E>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let excluded = excluded.into_iter().map(Into::into).collect();
        self.rules.push(TextRule::NotOneOf(excluded, message.into()));
        self
    }

    /// Accepts values that parse as a `chrono::NaiveDate` under `format`.
    pub fn date(mut self, format: &'static str, message: impl Into<E>) -> Self {
        self.rules.push(TextRule::Date(format, message.into()));
        self
    }
}

impl<E> Default for TextRules<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, L, E> RuleSet<T, L, E> for TextRules<E>
where
    L: FieldLens<T, Value = String>,
    E: ValidationError,
{
    fn into_checks(self, lens: L) -> FieldChecks<T, E> {
        let mut checks = FieldChecks::new(lens.key());
        for rule in self.rules {
            match rule {
                TextRule::Required(error) => {
                    checks.mark_required();
                    checks.push(move |model: &T| {
                        if lens.get(model).is_empty() {
                            Err(error.clone())
                        } else {
                            Ok(())
                        }
                    });
                }
                TextRule::Email(error) => {
                    checks.push(move |model: &T| {
                        let value = lens.get(model);
                        if value.is_empty() || EMAIL_PATTERN.is_match(value) {
                            Ok(())
                        } else {
                            Err(error.clone())
                        }
                    });
                }
                TextRule::MinChars(min, error) => {
                    checks.push(move |model: &T| {
                        let value = lens.get(model);
                        if value.is_empty() || value.chars().count() >= min {
                            Ok(())
                        } else {
                            Err(error.clone())
                        }
                    });
                }
                TextRule::OneOf(allowed, error) => {
                    checks.push(move |model: &T| {
                        let value = lens.get(model);
                        if value.is_empty() || allowed.iter().any(|option| option == value) {
                            Ok(())
                        } else {
                            Err(error.clone())
                        }
                    });
                }
                TextRule::NotOneOf(excluded, error) => {
                    checks.push(move |model: &T| {
                        let value = lens.get(model);
                        if value.is_empty() || !excluded.iter().any(|option| option == value) {
                            Ok(())
                        } else {
                            Err(error.clone())
                        }
                    });
                }
                TextRule::Date(format, error) => {
                    checks.push(move |model: &T| {
                        let value = lens.get(model);
                        if value.is_empty() || NaiveDate::parse_from_str(value, format).is_ok() {
                            Ok(())
                        } else {
                            Err(error.clone())
                        }
                    });
                }
            }
        }
        checks
    }
}

/// Rules for `bool` fields.
pub struct BoolRules<E> {
    rules: Vec<BoolRule<E>>,
}

enum BoolRule<E> {
    Accepted(E),
}

impl<E> BoolRules<E> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Requires the field to be `true`, e.g. a terms-of-use checkbox.
    pub fn accepted(mut self, message: impl Into<E>) -> Self {
        self.rules.push(BoolRule::Accepted(message.into()));
        self
    }
}

impl<E> Default for BoolRules<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, L, E> RuleSet<T, L, E> for BoolRules<E>
where
    L: FieldLens<T, Value = bool>,
    E: ValidationError,
{
    fn into_checks(self, lens: L) -> FieldChecks<T, E> {
        let mut checks = FieldChecks::new(lens.key());
        for rule in self.rules {
            match rule {
                BoolRule::Accepted(error) => {
                    checks.mark_required();
                    checks.push(move |model: &T| {
                        if *lens.get(model) {
                            Ok(())
                        } else {
                            Err(error.clone())
                        }
                    });
                }
            }
        }
        checks
    }
}

pub struct SchemaBuilder<T, E> {
    fields: Vec<FieldChecks<T, E>>,
    form_rules: Vec<FormRuleFn<T, E>>,
}

impl<T, E> SchemaBuilder<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn field<L, R>(mut self, lens: L, rules: R) -> Self
    where
        L: FieldLens<T>,
        R: RuleSet<T, L, E>,
    {
        let incoming = rules.into_checks(lens);
        let entry = self.entry_mut(incoming.key);
        entry.required |= incoming.required;
        entry.checks.extend(incoming.checks);
        self
    }

    /// Appends a model-aware check for one field, ordered after any rules
    /// already declared for it. Useful for cross-field constraints such as
    /// password confirmation.
    pub fn check<L, F>(mut self, lens: L, check: F) -> Self
    where
        L: FieldLens<T>,
        F: Fn(&T, &L::Value) -> Result<(), E> + Send + Sync + 'static,
    {
        let entry = self.entry_mut(lens.key());
        entry.push(move |model: &T| check(model, lens.get(model)));
        self
    }

    /// Appends a whole-form rule whose violations are attributed to the
    /// returned field keys.
    pub fn rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&T) -> Vec<(FieldKey, E)> + Send + Sync + 'static,
    {
        self.form_rules.push(Arc::new(rule));
        self
    }

    pub fn build(self) -> Schema<T, E> {
        let required = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.key)
            .collect();
        Schema {
            fields: self.fields,
            form_rules: self.form_rules,
            required,
        }
    }

    fn entry_mut(&mut self, key: FieldKey) -> &mut FieldChecks<T, E> {
        let index = match self.fields.iter().position(|field| field.key == key) {
            Some(index) => index,
            None => {
                self.fields.push(FieldChecks::new(key));
                self.fields.len() - 1
            }
        };
        &mut self.fields[index]
    }
}

/// Declarative validation rules for one form model, held in field declaration
/// order. The schema is immutable once built and all queries are pure.
pub struct Schema<T, E> {
    fields: Vec<FieldChecks<T, E>>,
    form_rules: Vec<FormRuleFn<T, E>>,
    required: BTreeSet<FieldKey>,
}

impl<T, E> Schema<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn builder() -> SchemaBuilder<T, E> {
        SchemaBuilder {
            fields: Vec::new(),
            form_rules: Vec::new(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.iter().map(|field| field.key)
    }

    pub fn is_required(&self, key: FieldKey) -> bool {
        self.required.contains(&key)
    }

    /// Whole-model check. Returns `true` only when every field rule and every
    /// form rule passes; never records anything.
    pub fn evaluate(&self, model: &T) -> bool {
        self.fields
            .iter()
            .all(|field| field.checks.iter().all(|check| check(model).is_ok()))
            && self.form_rules.iter().all(|rule| rule(model).is_empty())
    }

    /// Checks a single field and reports its first violated rule, in
    /// declaration order. Unknown keys have no rules and pass.
    pub fn check_field(&self, model: &T, key: FieldKey) -> Result<(), E> {
        let Some(field) = self.fields.iter().find(|field| field.key == key) else {
            return Ok(());
        };
        for check in &field.checks {
            check(model)?;
        }
        Ok(())
    }

    /// Sweeps the whole model: the first violation of every failing field in
    /// declaration order, followed by any form rule violations.
    pub fn violations(&self, model: &T) -> Vec<(FieldKey, E)> {
        let mut violations = Vec::new();
        for field in &self.fields {
            for check in &field.checks {
                if let Err(error) = check(model) {
                    violations.push((field.key, error));
                    break;
                }
            }
        }
        for rule in &self.form_rules {
            violations.extend(rule(model));
        }
        violations
    }
}
