use std::sync::Arc;

use catalog::ParticipantRules;
use shared::{
    domain::{EventRecord, SessionId},
    error::{EncodingError, RegistrationError, StatusMessage},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod contact;
pub mod encoder;
pub mod session;
pub mod transport;

pub use contact::ContactClient;
pub use encoder::{Attachment, AttachmentPolicy, AttachmentSource, SubmissionEncoder};
pub use session::{
    AttachmentSlot, RegistrationSession, RegistrationStep, SubmissionSnapshot, SubmissionState,
};
pub use transport::{HttpSubmissionTransport, MissingSubmissionEndpoint, SubmissionTransport};

pub const REGISTRATION_SUCCESS_MESSAGE: &str = "Registration successful!";
const ABANDONED_REASON: &str = "submission abandoned";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub session_id: SessionId,
    pub event_name: String,
    pub participant_count: u32,
    pub total_amount: u64,
}

/// Owns one registration session and drives submit through encode and delivery.
pub struct Registrar {
    session: Arc<Mutex<RegistrationSession>>,
    encoder: SubmissionEncoder,
    transport: Arc<dyn SubmissionTransport>,
}

impl Registrar {
    pub fn new(
        session: RegistrationSession,
        encoder: SubmissionEncoder,
        transport: Arc<dyn SubmissionTransport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(Mutex::new(session)),
            encoder,
            transport,
        })
    }

    pub fn open(
        event: Arc<EventRecord>,
        rules: &ParticipantRules,
        encoder: SubmissionEncoder,
        transport: Arc<dyn SubmissionTransport>,
    ) -> Result<Arc<Self>, RegistrationError> {
        let session = RegistrationSession::open(event, rules, encoder.policy().clone())?;
        info!(
            session = %session.id(),
            event = %session.event().name,
            "registration: session opened"
        );
        Ok(Self::new(session, encoder, transport))
    }

    /// Runs `edit` against the live session; use for every form interaction.
    pub async fn with_session<R>(&self, edit: impl FnOnce(&mut RegistrationSession) -> R) -> R {
        let mut session = self.session.lock().await;
        edit(&mut session)
    }

    pub async fn session_snapshot(&self) -> RegistrationSession {
        self.session.lock().await.clone()
    }

    pub async fn submit(&self) -> Result<SubmissionReceipt, RegistrationError> {
        let snapshot = self.session.lock().await.begin_submission()?;
        info!(
            session = %snapshot.session_id,
            event = %snapshot.event.name,
            participants = snapshot.participants.len(),
            "registration: submitting"
        );

        let mut in_flight = InFlight::new(&self.session, snapshot.session_id);
        let outcome = self.deliver(&snapshot).await;

        let mut session = self.session.lock().await;
        in_flight.disarm();
        match outcome {
            Ok(receipt) => {
                session.complete_submission()?;
                info!(
                    session = %receipt.session_id,
                    total_amount = receipt.total_amount,
                    "registration: submitted"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(session = %snapshot.session_id, error = %err, "registration: submit failed");
                session.fail_submission(err.to_string())?;
                Err(err)
            }
        }
    }

    /// Submit, collapsed to the one line shown to the visitor.
    pub async fn submit_for_status(&self) -> StatusMessage {
        match self.submit().await {
            Ok(_) => StatusMessage::success(REGISTRATION_SUCCESS_MESSAGE),
            Err(err) => err.status_message(),
        }
    }

    async fn deliver(
        &self,
        snapshot: &SubmissionSnapshot,
    ) -> Result<SubmissionReceipt, RegistrationError> {
        let payload = self.encoder.encode(snapshot).await?;
        let body = serde_json::to_string(&payload)
            .map_err(|e| EncodingError::Serialize(e.to_string()))?;
        self.transport.send_text(body).await?;

        Ok(SubmissionReceipt {
            session_id: snapshot.session_id,
            event_name: snapshot.event.name.clone(),
            participant_count: snapshot.participant_count(),
            total_amount: payload.total_amount,
        })
    }
}

/// Marks the session failed if a submit future is dropped before it settles,
/// so a cancelled submit never leaves the form locked.
struct InFlight {
    session: Arc<Mutex<RegistrationSession>>,
    session_id: SessionId,
    armed: bool,
}

impl InFlight {
    fn new(session: &Arc<Mutex<RegistrationSession>>, session_id: SessionId) -> Self {
        Self {
            session: Arc::clone(session),
            session_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(session = %self.session_id, "registration: submit abandoned");
        match self.session.try_lock() {
            Ok(mut session) => abandon(&mut session),
            Err(_) => {
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    return;
                };
                let session = Arc::clone(&self.session);
                runtime.spawn(async move {
                    abandon(&mut *session.lock().await);
                });
            }
        }
    }
}

fn abandon(session: &mut RegistrationSession) {
    if let Err(err) = session.fail_submission(ABANDONED_REASON) {
        debug!(session = %session.id(), error = %err, "registration: nothing to abandon");
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
