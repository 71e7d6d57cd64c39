use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::schema::Schema;
use crate::submit::SubmitReceipt;
use crate::validation::ValidationError;

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevalidateMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_mode: ValidationMode,
    pub revalidate_mode: RevalidateMode,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_mode: ValidationMode::OnChange,
            revalidate_mode: RevalidateMode::OnChange,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldMeta<E> {
    pub dirty: bool,
    pub touched: bool,
    pub validating: bool,
    pub errors: Vec<E>,
}

impl<E> Default for FieldMeta<E> {
    fn default() -> Self {
        Self {
            dirty: false,
            touched: false,
            validating: false,
            errors: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T, E> {
    pub model: T,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub submit_disabled: bool,
    pub is_dirty: bool,
    pub field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
    pub submissions: Vec<SubmitReceipt>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    AlreadySubmitting,
    UnknownField(String),
    InputKindMismatch { field: FieldKey, expected: &'static str },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::AlreadySubmitting => f.write_str("form submit is already in progress"),
            FormError::UnknownField(name) => write!(f, "unknown form field: {name}"),
            FormError::InputKindMismatch { field, expected } => {
                write!(f, "field {field} expects {expected} input")
            }
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(crate) type AsyncFieldValidatorFn<T, E> =
    Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'static>> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct AsyncFieldValidatorEntry<T, E> {
    pub(crate) debounce: Duration,
    pub(crate) validator: AsyncFieldValidatorFn<T, E>,
}

pub(crate) struct FormState<T, E> {
    pub(crate) id: FormId,
    pub(crate) initial_model: T,
    pub(crate) model: T,
    pub(crate) submit_state: SubmitState,
    pub(crate) submit_count: u32,
    pub(crate) submit_disabled: bool,
    pub(crate) dirty_fields: BTreeSet<FieldKey>,
    pub(crate) field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
    pub(crate) tickets: BTreeMap<FieldKey, ValidationTicket>,
    pub(crate) first_error: Option<FieldKey>,
    pub(crate) submissions: Vec<SubmitReceipt>,
}

impl<T, E> FormState<T, E>
where
    T: Clone,
{
    pub(crate) fn ensure_meta(&mut self, key: FieldKey) -> &mut FieldMeta<E> {
        self.field_meta.entry(key).or_default()
    }

    pub(crate) fn rewind_to_initial(&mut self) {
        self.model = self.initial_model.clone();
        self.dirty_fields.clear();
        self.tickets.clear();
        self.first_error = None;
        for meta in self.field_meta.values_mut() {
            meta.dirty = false;
            meta.touched = false;
            meta.validating = false;
            meta.errors.clear();
        }
    }
}

#[derive(Clone)]
pub struct FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub(crate) options: FormOptions,
    pub(crate) schema: Arc<Schema<T, E>>,
    pub(crate) state: Arc<RwLock<FormState<T, E>>>,
    pub(crate) async_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<AsyncFieldValidatorEntry<T, E>>>>>,
    pub(crate) dependencies: Arc<RwLock<BTreeMap<FieldKey, BTreeSet<FieldKey>>>>,
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn new(initial: T, schema: Schema<T, E>, options: FormOptions) -> Self {
        let mut field_meta = BTreeMap::new();
        for key in schema.keys() {
            field_meta.insert(key, FieldMeta::default());
        }
        let submit_disabled = !schema.evaluate(&initial);
        Self {
            options,
            schema: Arc::new(schema),
            state: Arc::new(RwLock::new(FormState {
                id: FormId::next(),
                initial_model: initial.clone(),
                model: initial,
                submit_state: SubmitState::Idle,
                submit_count: 0,
                submit_disabled,
                dirty_fields: BTreeSet::new(),
                field_meta,
                tickets: BTreeMap::new(),
                first_error: None,
                submissions: Vec::new(),
            })),
            async_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            dependencies: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    pub fn schema(&self) -> &Schema<T, E> {
        &self.schema
    }

    pub fn reset_to_initial(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting form")?;
        state.rewind_to_initial();
        state.submit_state = SubmitState::Idle;
        let gate_open = self.schema.evaluate(&state.model);
        state.submit_disabled = !gate_open;
        Ok(())
    }

    pub fn reset_field<L>(&self, lens: L) -> FormResult<()>
    where
        L: crate::validation::FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state, "resetting field")?;
        let initial_value = lens.get(&state.initial_model).clone();
        lens.set(&mut state.model, initial_value);
        state.dirty_fields.remove(&key);
        let meta = state.ensure_meta(key);
        meta.dirty = false;
        meta.touched = false;
        meta.validating = false;
        meta.errors.clear();
        state.first_error = first_error_key(&state.field_meta);
        let gate_open = self.schema.evaluate(&state.model);
        state.submit_disabled = !gate_open;
        Ok(())
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing all field errors")?;
        for meta in state.field_meta.values_mut() {
            meta.errors.clear();
            meta.validating = false;
        }
        state.first_error = None;
        Ok(())
    }

    pub fn clear_field_errors<L>(&self, lens: L) -> FormResult<()>
    where
        L: crate::validation::FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state, "clearing field errors")?;
        if let Some(meta) = state.field_meta.get_mut(&key) {
            meta.errors.clear();
            meta.validating = false;
        }
        state.first_error = first_error_key(&state.field_meta);
        Ok(())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T, E>> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            model: state.model.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            submit_disabled: state.submit_disabled,
            is_dirty: !state.dirty_fields.is_empty(),
            field_meta: state.field_meta.clone(),
            submissions: state.submissions.clone(),
        })
    }

    pub fn field_meta<L>(&self, lens: L) -> FormResult<Option<FieldMeta<E>>>
    where
        L: crate::validation::FieldLens<T>,
    {
        Ok(read_lock(&self.state, "reading field meta")?
            .field_meta
            .get(&lens.key())
            .cloned())
    }

    pub fn submissions(&self) -> FormResult<Vec<SubmitReceipt>> {
        Ok(read_lock(&self.state, "reading submission log")?
            .submissions
            .clone())
    }

    /// Key of the first field currently holding an error, so hosts can focus
    /// or scroll to it.
    pub fn first_error(&self) -> FormResult<Option<FieldKey>> {
        Ok(read_lock(&self.state, "reading first error key")?.first_error)
    }

    pub fn is_required<L>(&self, lens: L) -> bool
    where
        L: crate::validation::FieldLens<T>,
    {
        self.schema.is_required(lens.key())
    }
}

pub(crate) fn transition_submit_state<T, E>(
    state: &mut FormState<T, E>,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Validating, SubmitState::Failed)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Validating)
            | (SubmitState::Failed, SubmitState::Validating)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}

pub(crate) fn first_error_key<E>(
    field_meta: &BTreeMap<FieldKey, FieldMeta<E>>,
) -> Option<FieldKey> {
    field_meta
        .iter()
        .find_map(|(key, meta)| (!meta.errors.is_empty()).then_some(*key))
}

pub(crate) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
