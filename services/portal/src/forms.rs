//! Submitted form values and the validation rules applied to them
//!
//! A [`Form`] lives for a single request. Rules only ever add messages to
//! its [`Errors`], so a form that failed a rule stays invalid.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Shape of an email address: `local@domain.tld`
pub fn email_rx() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    })
}

/// Exactly ten digits
pub fn phone_rx() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("Failed to compile phone regex"))
}

/// Validation messages keyed by field name, in the order they were added
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Errors(HashMap<String, Vec<String>>);

impl Errors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// First message recorded for `field`
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Every message recorded for `field`
    pub fn all(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Snapshot of submitted fields plus the errors found while validating them
#[derive(Debug, Default, Clone)]
pub struct Form {
    values: HashMap<String, Vec<String>>,
    pub errors: Errors,
}

impl Form {
    /// Build a form from submitted `(name, value)` pairs. Repeated names keep
    /// every value, but only the first one is ever read.
    pub fn new<I, K, V>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in data {
            values.entry(key.into()).or_default().push(value.into());
        }

        Self {
            values,
            errors: Errors::default(),
        }
    }

    /// First submitted value of `field`, or `""` when it is absent
    pub fn get(&self, field: &str) -> &str {
        self.values
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Whether `field` was submitted with a non-blank value
    pub fn has(&self, field: &str) -> bool {
        !self.get(field).trim().is_empty()
    }

    /// Replace every value of `field` with `value`
    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(field.to_string(), vec![value.into()]);
    }

    pub fn required(&mut self, fields: &[&str]) {
        for field in fields {
            if self.get(field).trim().is_empty() {
                self.errors.add(field, "This field cannot be blank");
            }
        }
    }

    pub fn min_length(&mut self, field: &str, min: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if value.chars().count() < min {
            self.errors.add(
                field,
                format!("This field is too short (minimum is {} characters)", min),
            );
        }
    }

    pub fn max_length(&mut self, field: &str, max: usize) {
        let value = self.get(field);
        if value.is_empty() {
            return;
        }
        if value.chars().count() > max {
            self.errors.add(
                field,
                format!("This field is too long (maximum is {} characters)", max),
            );
        }
    }

    /// Check `field` against `pattern`.
    ///
    /// Only `email` and `phone` have a message to report; a mismatch on any
    /// other field records nothing.
    pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) {
        let value = self.get(field);
        if value.is_empty() || pattern.is_match(value) {
            return;
        }

        match field {
            "email" => self.errors.add(field, "Invalid email address"),
            "phone" => self
                .errors
                .add(field, "Phone field should have exactly 10 digits"),
            _ => {}
        }
    }

    /// Validate the `age` field and return its parsed value, `0` when it
    /// does not parse. Both checks always run, so a non-numeric age collects
    /// two messages.
    pub fn age_valid(&mut self) -> i32 {
        let parsed = self.get("age").parse::<i32>();
        if parsed.is_err() {
            self.errors.add("age", "Age should be a valid number");
        }

        let age = parsed.unwrap_or(0);
        if age <= 0 {
            self.errors.add("age", "Age should be a positive number");
        }
        age
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Template-facing view: first value and first error of every field
    pub fn view(&self) -> FormView<'_> {
        FormView {
            values: self
                .values
                .keys()
                .map(|field| (field.as_str(), self.get(field)))
                .collect(),
            errors: self
                .errors
                .0
                .keys()
                .filter_map(|field| Some((field.as_str(), self.errors.get(field)?)))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FormView<'a> {
    pub values: HashMap<&'a str, &'a str>,
    pub errors: HashMap<&'a str, &'a str>,
}
