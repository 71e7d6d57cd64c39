pub mod controller;
pub mod registration;
pub mod schema;
pub mod submit;
pub mod validation;


pub use controller::{
    FieldKey, FieldMeta, FormController, FormError, FormId, FormOptions, FormResult, FormSnapshot,
    RevalidateMode, SubmitState, ValidationMode, ValidationTicket,
};
pub use formwork_derive::FormModel;
pub use registration::{
    COUNTRY_PLACEHOLDER, FieldInput, REGISTRATION_ENDPOINT, ROLE_OPTIONS, Registration,
    RegistrationForm, registration_schema,
};
pub use schema::{BoolRules, FieldChecks, RuleSet, Schema, SchemaBuilder, TextRules, Violation};
pub use submit::{
    BoxedSubmitFuture, HttpSubmitTarget, SUBMIT_TIMEOUT, SubmitError, SubmitOutcome, SubmitReceipt,
    SubmitTarget,
};
pub use validation::{
    AsyncFieldValidator, BoxedValidationFuture, FieldLens, FormModel, ValidationError,
};
