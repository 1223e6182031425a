use std::sync::Arc;

use shared::{
    domain::ContactField,
    error::{MissingField, RegistrationError, StatusMessage, ValidationError},
    protocol::ContactSubmission,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::transport::SubmissionTransport;

pub const CONTACT_SUCCESS_MESSAGE: &str =
    "Thank you for your message! We will get back to you soon.";
pub const CONTACT_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Default)]
struct ContactState {
    form: ContactSubmission,
    sending: bool,
    status: Option<StatusMessage>,
}

/// The "get in touch" form: four fields posted as a URL-encoded form.
pub struct ContactClient {
    transport: Arc<dyn SubmissionTransport>,
    state: Mutex<ContactState>,
}

impl ContactClient {
    pub fn new(transport: Arc<dyn SubmissionTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            state: Mutex::new(ContactState::default()),
        })
    }

    pub async fn set_field(
        &self,
        field: ContactField,
        value: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        let mut state = self.state.lock().await;
        if state.sending {
            return Err(RegistrationError::SubmissionInProgress);
        }
        let value = value.into();
        match field {
            ContactField::Name => state.form.name = value,
            ContactField::Email => state.form.email = value,
            ContactField::Phone => state.form.phone = value,
            ContactField::Message => state.form.message = value,
        }
        Ok(())
    }

    pub async fn form(&self) -> ContactSubmission {
        self.state.lock().await.form.clone()
    }

    pub async fn status(&self) -> Option<StatusMessage> {
        self.state.lock().await.status.clone()
    }

    pub async fn send(&self) -> Result<(), RegistrationError> {
        let form = {
            let mut state = self.state.lock().await;
            if state.sending {
                return Err(RegistrationError::SubmissionInProgress);
            }
            let missing = missing_contact_fields(&state.form);
            if !missing.is_empty() {
                return Err(ValidationError::MissingFields(missing).into());
            }
            state.sending = true;
            state.status = None;
            state.form.clone()
        };

        let outcome = self.transport.send_form(form.form_fields()).await;

        let mut state = self.state.lock().await;
        state.sending = false;
        match outcome {
            Ok(()) => {
                info!("contact: message sent");
                state.form = ContactSubmission::default();
                state.status = Some(StatusMessage::success(CONTACT_SUCCESS_MESSAGE));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "contact: send failed");
                state.status = Some(StatusMessage::error(CONTACT_FAILURE_MESSAGE));
                Err(err.into())
            }
        }
    }
}

fn missing_contact_fields(form: &ContactSubmission) -> Vec<MissingField> {
    [
        (ContactField::Name, &form.name),
        (ContactField::Email, &form.email),
        (ContactField::Phone, &form.phone),
        (ContactField::Message, &form.message),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| MissingField::Contact { field })
    .collect()
}

#[cfg(test)]
#[path = "tests/contact_tests.rs"]
mod tests;
