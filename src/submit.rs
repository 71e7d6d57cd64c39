use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::controller::{
    FormController, FormError, FormResult, SubmitState, transition_submit_state, write_lock,
};
use crate::validation::ValidationError;

pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned status {status}")]
    Status { status: u16, body: String },
}

/// One accepted submission: the response status and its parsed JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitReceipt {
    pub status: u16,
    pub body: Value,
}

pub type BoxedSubmitFuture<'a> =
    Pin<Box<dyn Future<Output = Result<SubmitReceipt, SubmitError>> + Send + 'a>>;

pub trait SubmitTarget<T>: Send + Sync {
    fn deliver<'a>(&'a self, model: &'a T) -> BoxedSubmitFuture<'a>;
}

impl<T, F> SubmitTarget<T> for F
where
    F: for<'a> Fn(&'a T) -> BoxedSubmitFuture<'a> + Send + Sync,
{
    fn deliver<'a>(&'a self, model: &'a T) -> BoxedSubmitFuture<'a> {
        (self)(model)
    }
}

/// Posts the form model as JSON to a fixed endpoint. Any 2xx response counts
/// as delivered; everything else is an error.
#[derive(Clone)]
pub struct HttpSubmitTarget {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpSubmitTarget {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    pub fn with_client(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<T> SubmitTarget<T> for HttpSubmitTarget
where
    T: Serialize + Send + Sync,
{
    fn deliver<'a>(&'a self, model: &'a T) -> BoxedSubmitFuture<'a> {
        Box::pin(async move {
            let response = self.http.post(&self.endpoint).json(model).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SubmitError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            let bytes = response.bytes().await?;
            // Non-JSON success bodies degrade to null.
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            Ok(SubmitReceipt {
                status: status.as_u16(),
                body,
            })
        })
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Submitted(SubmitReceipt),
    RejectedInvalid,
    DeliveryFailed(SubmitError),
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub async fn submit_to<S>(&self, target: &S) -> FormResult<SubmitOutcome>
    where
        S: SubmitTarget<T> + ?Sized,
    {
        {
            let mut state = write_lock(&self.state, "preparing submit")?;
            if state.submit_state == SubmitState::Submitting {
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state, SubmitState::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
        }

        let is_valid = self.validate_form_async().await?;
        if !is_valid {
            let mut state = write_lock(&self.state, "recording submit validation failure")?;
            transition_submit_state(&mut state, SubmitState::Failed)?;
            tracing::debug!(form_id = state.id.0, "submit rejected by validation");
            return Ok(SubmitOutcome::RejectedInvalid);
        }

        let model = {
            let mut state = write_lock(&self.state, "moving submit to delivery")?;
            transition_submit_state(&mut state, SubmitState::Submitting)?;
            state.model.clone()
        };

        match target.deliver(&model).await {
            Ok(receipt) => {
                let mut state = write_lock(&self.state, "completing submit")?;
                transition_submit_state(&mut state, SubmitState::Succeeded)?;
                tracing::debug!(
                    form_id = state.id.0,
                    status = receipt.status,
                    "form submission accepted"
                );
                state.submissions.push(receipt.clone());
                state.rewind_to_initial();
                let gate_open = self.schema.evaluate(&state.model);
                state.submit_disabled = !gate_open;
                Ok(SubmitOutcome::Submitted(receipt))
            }
            Err(error) => {
                let mut state = write_lock(&self.state, "recording submit delivery failure")?;
                transition_submit_state(&mut state, SubmitState::Failed)?;
                tracing::warn!(form_id = state.id.0, error = %error, "form submission failed");
                Ok(SubmitOutcome::DeliveryFailed(error))
            }
        }
    }
}
