use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_timer::Delay;

use crate::controller::{
    AsyncFieldValidatorEntry, AsyncFieldValidatorFn, FieldKey, FormController, FormResult,
    RevalidateMode, ValidationMode, ValidationTicket, first_error_key, read_lock, write_lock,
};

pub trait ValidationError: Clone + Send + Sync + 'static {
    fn message(&self) -> Cow<'static, str>;
}

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    fn fields() -> Self::Fields;
}

pub type BoxedValidationFuture<'a, E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'a>>;

pub trait AsyncFieldValidator<T, L, E>: Send + Sync
where
    L: FieldLens<T>,
    E: ValidationError,
{
    type Fut<'a>: Future<Output = Result<(), E>> + Send + 'a
    where
        Self: 'a,
        T: 'a,
        L::Value: 'a;

    fn validate<'a>(&'a self, model: &'a T, value: &'a L::Value) -> Self::Fut<'a>;
}

impl<T, L, E, F> AsyncFieldValidator<T, L, E> for F
where
    L: FieldLens<T>,
    E: ValidationError,
    F: for<'a> Fn(&'a T, &'a L::Value) -> BoxedValidationFuture<'a, E> + Send + Sync,
{
    type Fut<'a>
        = BoxedValidationFuture<'a, E>
    where
        Self: 'a,
        T: 'a,
        L::Value: 'a;

    fn validate<'a>(&'a self, model: &'a T, value: &'a L::Value) -> Self::Fut<'a> {
        (self)(model, value)
    }
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn register_async_field_validator<L, V>(&self, lens: L, validator: V) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: AsyncFieldValidator<T, L, E> + 'static,
    {
        self.register_async_field_validator_with_debounce(lens, 0, validator)
    }

    pub fn register_async_field_validator_with_debounce<L, V>(
        &self,
        lens: L,
        debounce_ms: u64,
        validator: V,
    ) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: AsyncFieldValidator<T, L, E> + 'static,
    {
        let key = lens.key();
        let validator = std::sync::Arc::new(validator);
        let wrapped: AsyncFieldValidatorFn<T, E> = std::sync::Arc::new(move |model: T| {
            let value = lens.get(&model).clone();
            let validator = validator.clone();
            Box::pin(async move { validator.validate(&model, &value).await })
        });
        let entry = AsyncFieldValidatorEntry {
            debounce: Duration::from_millis(debounce_ms),
            validator: wrapped,
        };
        let mut validators = write_lock(
            &self.async_field_validators,
            "registering async field validator",
        )?;
        validators.entry(key).or_default().push(entry);
        Ok(())
    }

    pub fn register_dependency<S, D>(&self, source: S, dependent: D) -> FormResult<()>
    where
        S: FieldLens<T>,
        D: FieldLens<T>,
    {
        let mut dependencies = write_lock(&self.dependencies, "registering dependency")?;
        dependencies
            .entry(source.key())
            .or_default()
            .insert(dependent.key());
        Ok(())
    }

    pub fn set<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        {
            let mut state = write_lock(&self.state, "writing form model")?;
            lens.set(&mut state.model, value);
            let is_dirty = lens.get(&state.model) != lens.get(&state.initial_model);
            if is_dirty {
                state.dirty_fields.insert(key);
            } else {
                state.dirty_fields.remove(&key);
            }
            state.ensure_meta(key).dirty = is_dirty;
            // The gate tracks whole-model validity, not the edited field.
            let gate_open = self.schema.evaluate(&state.model);
            state.submit_disabled = !gate_open;
        }

        if self.options.validate_mode == ValidationMode::OnChange {
            let _ = self.validate_field_by_key(key)?;
        }
        if self.options.revalidate_mode == RevalidateMode::OnChange {
            self.revalidate_dependents(key)?;
        }
        Ok(())
    }

    pub fn touch<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        {
            let mut state = write_lock(&self.state, "touching field")?;
            state.ensure_meta(key).touched = true;
        }

        if self.options.validate_mode == ValidationMode::OnBlur {
            let _ = self.validate_field_by_key(key)?;
        }
        if self.options.revalidate_mode == RevalidateMode::OnBlur {
            self.revalidate_dependents(key)?;
        }
        Ok(())
    }

    pub async fn set_async<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.set(lens, value)?;
        if self.options.validate_mode == ValidationMode::OnChange {
            let _ = self.validate_field_async_registered_by_key(key).await?;
        }
        if self.options.revalidate_mode == RevalidateMode::OnChange {
            self.revalidate_dependents_async(key).await?;
        }
        Ok(())
    }

    pub async fn touch_async<L>(&self, lens: L) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        self.touch(lens)?;
        if self.options.validate_mode == ValidationMode::OnBlur {
            let _ = self.validate_field_async_registered_by_key(key).await?;
        }
        if self.options.revalidate_mode == RevalidateMode::OnBlur {
            self.revalidate_dependents_async(key).await?;
        }
        Ok(())
    }

    pub fn validate_field<L>(&self, lens: L) -> FormResult<bool>
    where
        L: FieldLens<T>,
    {
        self.validate_field_by_key(lens.key())
    }

    pub async fn validate_field_async<L, V>(
        &self,
        lens: L,
        validator: &V,
    ) -> FormResult<ValidationTicket>
    where
        L: FieldLens<T>,
        V: AsyncFieldValidator<T, L, E>,
    {
        let key = lens.key();
        let (ticket, model, value) = {
            let mut state = write_lock(&self.state, "starting async validation")?;
            let next = ValidationTicket(
                state
                    .tickets
                    .get(&key)
                    .copied()
                    .unwrap_or(ValidationTicket(0))
                    .0
                    + 1,
            );
            state.tickets.insert(key, next);
            state.ensure_meta(key).validating = true;
            (next, state.model.clone(), lens.get(&state.model).clone())
        };

        let result = validator.validate(&model, &value).await;
        self.finish_async_validation(key, ticket, result)?;
        Ok(ticket)
    }

    pub async fn validate_field_async_registered<L>(
        &self,
        lens: L,
    ) -> FormResult<Vec<ValidationTicket>>
    where
        L: FieldLens<T>,
    {
        self.validate_field_async_registered_by_key(lens.key())
            .await
    }

    pub fn validate_form(&self) -> FormResult<bool> {
        let model = {
            read_lock(&self.state, "reading model for form validation")?
                .model
                .clone()
        };
        let violations = self.schema.violations(&model);

        let mut field_errors = BTreeMap::<FieldKey, Vec<E>>::new();
        for (key, error) in violations {
            field_errors.entry(key).or_default().push(error);
        }

        let mut state = write_lock(&self.state, "applying form validation result")?;
        let mut keys = state
            .field_meta
            .keys()
            .copied()
            .collect::<BTreeSet<FieldKey>>();
        keys.extend(field_errors.keys().copied());
        let mut is_valid = true;
        for key in keys {
            let meta = state.ensure_meta(key);
            meta.validating = false;
            meta.errors = field_errors.remove(&key).unwrap_or_default();
            is_valid &= meta.errors.is_empty();
        }
        state.first_error = first_error_key(&state.field_meta);
        let gate_open = self.schema.evaluate(&state.model);
        state.submit_disabled = !gate_open;
        Ok(is_valid)
    }

    pub async fn validate_form_async(&self) -> FormResult<bool> {
        let _ = self.validate_form()?;
        let keys = read_lock(
            &self.async_field_validators,
            "reading async validator keys for form validation",
        )?
        .keys()
        .copied()
        .collect::<Vec<_>>();

        for key in keys {
            let _ = self.validate_field_async_registered_by_key(key).await?;
        }

        let state = read_lock(&self.state, "reading async form validation result")?;
        let errors_clear = state.field_meta.values().all(|meta| meta.errors.is_empty());
        Ok(errors_clear && !state.submit_disabled)
    }

    pub(crate) fn validate_field_by_key(&self, key: FieldKey) -> FormResult<bool> {
        let model = {
            read_lock(&self.state, "reading model for field validation")?
                .model
                .clone()
        };
        let result = self.schema.check_field(&model, key);

        let mut state = write_lock(&self.state, "writing field validation result")?;
        let meta = state.ensure_meta(key);
        meta.validating = false;
        meta.errors = match result {
            Ok(()) => Vec::new(),
            Err(error) => vec![error],
        };
        let valid = meta.errors.is_empty();
        state.first_error = first_error_key(&state.field_meta);
        Ok(valid)
    }

    pub(crate) fn revalidate_dependents(&self, source: FieldKey) -> FormResult<()> {
        let dependents = read_lock(&self.dependencies, "reading field dependencies")?
            .get(&source)
            .cloned()
            .unwrap_or_default();
        for dependent in dependents {
            let _ = self.validate_field_by_key(dependent)?;
        }
        Ok(())
    }

    pub(crate) async fn revalidate_dependents_async(&self, source: FieldKey) -> FormResult<()> {
        let dependents = read_lock(&self.dependencies, "reading async field dependencies")?
            .get(&source)
            .cloned()
            .unwrap_or_default();
        for dependent in dependents {
            let _ = self
                .validate_field_async_registered_by_key(dependent)
                .await?;
        }
        Ok(())
    }

    pub(crate) async fn validate_field_async_registered_by_key(
        &self,
        key: FieldKey,
    ) -> FormResult<Vec<ValidationTicket>> {
        let model = {
            read_lock(&self.state, "reading model for registered async validation")?
                .model
                .clone()
        };
        let validators = {
            read_lock(
                &self.async_field_validators,
                "reading registered async validators",
            )?
            .get(&key)
            .cloned()
            .unwrap_or_default()
        };

        let mut tickets = Vec::with_capacity(validators.len());
        for entry in validators {
            let ticket = {
                let mut state = write_lock(&self.state, "starting registered async validation")?;
                let next = ValidationTicket(
                    state
                        .tickets
                        .get(&key)
                        .copied()
                        .unwrap_or(ValidationTicket(0))
                        .0
                        + 1,
                );
                state.tickets.insert(key, next);
                state.ensure_meta(key).validating = true;
                next
            };

            if !entry.debounce.is_zero() {
                Delay::new(entry.debounce).await;
                if !self.is_latest_ticket(key, ticket)? {
                    continue;
                }
            }

            let result = (entry.validator)(model.clone()).await;
            self.finish_async_validation(key, ticket, result)?;
            tickets.push(ticket);
        }
        Ok(tickets)
    }

    fn is_latest_ticket(&self, key: FieldKey, ticket: ValidationTicket) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking latest validation ticket")?
            .tickets
            .get(&key)
            .copied()
            == Some(ticket))
    }

    fn finish_async_validation(
        &self,
        key: FieldKey,
        ticket: ValidationTicket,
        result: Result<(), E>,
    ) -> FormResult<()> {
        let mut state = write_lock(&self.state, "finishing async validation")?;
        if state.tickets.get(&key).copied() != Some(ticket) {
            return Ok(());
        }
        let meta = state.ensure_meta(key);
        meta.validating = false;
        meta.errors = match result {
            Ok(()) => Vec::new(),
            Err(error) => vec![error],
        };
        state.first_error = first_error_key(&state.field_meta);
        Ok(())
    }
}
