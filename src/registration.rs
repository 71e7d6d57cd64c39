use serde::Serialize;

use crate::controller::{FormController, FormError, FormOptions, FormResult, FormSnapshot};
use crate::schema::{BoolRules, Schema, TextRules, Violation};
use crate::submit::{HttpSubmitTarget, SubmitOutcome, SubmitTarget};
use crate::validation::{FieldLens, FormModel, ValidationError};

pub const REGISTRATION_ENDPOINT: &str = "https://reqres.in/api/users";

pub const ROLE_OPTIONS: [&str; 3] = ["student", "instructor", "team lead"];

// Value of the placeholder entry in country pickers, rejected by the schema.
pub const COUNTRY_PLACEHOLDER: &str = "select";

#[derive(Clone, Debug, Default, PartialEq, Serialize, formwork_derive::FormModel)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub terms: bool,
    pub role: String,
    pub country: String,
    pub birthday: String,
    pub news: bool,
}

pub fn registration_schema() -> Schema<Registration, Violation> {
    let fields = Registration::fields();
    Schema::builder()
        .field(
            fields.name(),
            TextRules::new().required("Full Name is required!"),
        )
        .field(
            fields.email(),
            TextRules::new()
                .required("Email is required")
                .email("Please enter a valid email"),
        )
        .field(
            fields.password(),
            TextRules::new()
                .required("Password is required")
                .min_chars(8, "Password should contain more than 7 characters"),
        )
        .field(
            fields.terms(),
            BoolRules::new().accepted("Please agree to terms of use"),
        )
        .field(
            fields.role(),
            TextRules::new()
                .required("Please choose a role")
                .one_of(ROLE_OPTIONS, "Please choose a role"),
        )
        .field(
            fields.country(),
            TextRules::new()
                .required("Please select your country")
                .not_one_of([COUNTRY_PLACEHOLDER], "Please select your country"),
        )
        .field(
            fields.birthday(),
            TextRules::new()
                .required("Please enter a valid birthday")
                .date("%Y-%m-%d", "Please enter a valid birthday"),
        )
        .field(fields.news(), BoolRules::new())
        .build()
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldInput {
    Text(String),
    Toggle(bool),
}

/// The registration form wired to its schema and submission endpoint.
#[derive(Clone)]
pub struct RegistrationForm {
    controller: FormController<Registration, Violation>,
    target: HttpSubmitTarget,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::with_target(HttpSubmitTarget::new(REGISTRATION_ENDPOINT))
    }

    pub fn with_target(target: HttpSubmitTarget) -> Self {
        let controller = FormController::new(
            Registration::default(),
            registration_schema(),
            FormOptions::default(),
        );
        Self { controller, target }
    }

    pub fn controller(&self) -> &FormController<Registration, Violation> {
        &self.controller
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<Registration, Violation>> {
        self.controller.snapshot()
    }

    pub fn field_error(&self, field: &str) -> FormResult<Option<String>> {
        let snapshot = self.controller.snapshot()?;
        Ok(snapshot
            .field_meta
            .iter()
            .find(|(key, _)| key.as_str() == field)
            .and_then(|(_, meta)| meta.errors.first().map(|error| error.message().into_owned())))
    }

    /// Routes raw widget input to the matching typed lens. Checkboxes arrive
    /// as `Toggle`, every other control as the literal entered `Text`.
    pub fn apply_input(&self, field: &str, input: FieldInput) -> FormResult<()> {
        let fields = Registration::fields();
        match field {
            "name" => self.set_text(fields.name(), input),
            "email" => self.set_text(fields.email(), input),
            "password" => self.set_text(fields.password(), input),
            "terms" => self.set_toggle(fields.terms(), input),
            "role" => self.set_text(fields.role(), input),
            "country" => self.set_text(fields.country(), input),
            "birthday" => self.set_text(fields.birthday(), input),
            "news" => self.set_toggle(fields.news(), input),
            other => Err(FormError::UnknownField(other.to_string())),
        }
    }

    fn set_text<L>(&self, lens: L, input: FieldInput) -> FormResult<()>
    where
        L: FieldLens<Registration, Value = String>,
    {
        match input {
            FieldInput::Text(value) => self.controller.set(lens, value),
            FieldInput::Toggle(_) => Err(FormError::InputKindMismatch {
                field: lens.key(),
                expected: "text",
            }),
        }
    }

    fn set_toggle<L>(&self, lens: L, input: FieldInput) -> FormResult<()>
    where
        L: FieldLens<Registration, Value = bool>,
    {
        match input {
            FieldInput::Toggle(value) => self.controller.set(lens, value),
            FieldInput::Text(_) => Err(FormError::InputKindMismatch {
                field: lens.key(),
                expected: "checkbox",
            }),
        }
    }

    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        self.controller.submit_to(&self.target).await
    }

    pub async fn submit_via<S>(&self, target: &S) -> FormResult<SubmitOutcome>
    where
        S: SubmitTarget<Registration> + ?Sized,
    {
        self.controller.submit_to(target).await
    }
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self::new()
    }
}
