use std::sync::Arc;

use catalog::ParticipantRules;
use shared::{
    domain::{EventRecord, ParticipantField, ParticipantForm, SessionId, TeamSizeRange},
    error::{MissingField, RegistrationError, ValidationError},
};
use tracing::debug;

use crate::encoder::{Attachment, AttachmentPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    SelectingTeamSize,
    EnteringDetails,
}

impl RegistrationStep {
    fn label(self) -> &'static str {
        match self {
            RegistrationStep::SelectingTeamSize => "selecting team size",
            RegistrationStep::EnteringDetails => "entering details",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSlot {
    TransactionProof,
    IdCard(usize),
}

/// Frozen copy of everything a submission is built from.
#[derive(Debug, Clone)]
pub struct SubmissionSnapshot {
    pub session_id: SessionId,
    pub event: Arc<EventRecord>,
    pub participants: Vec<ParticipantForm>,
    pub id_cards: Vec<Option<Attachment>>,
    pub transaction_reference: String,
    pub payment_proof: Option<Attachment>,
}

impl SubmissionSnapshot {
    pub fn participant_count(&self) -> u32 {
        self.participants.len() as u32
    }

    pub fn total_amount(&self) -> u64 {
        self.event.total_fee(self.participant_count())
    }
}

/// One visitor's in-progress registration for a single event.
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    id: SessionId,
    event: Arc<EventRecord>,
    bounds: TeamSizeRange,
    policy: AttachmentPolicy,
    step: RegistrationStep,
    participants: Vec<ParticipantForm>,
    id_cards: Vec<Option<Attachment>>,
    transaction_reference: String,
    payment_proof: Option<Attachment>,
    submission_state: SubmissionState,
}

impl RegistrationSession {
    pub fn open(
        event: Arc<EventRecord>,
        rules: &ParticipantRules,
        policy: AttachmentPolicy,
    ) -> Result<Self, ValidationError> {
        let bounds = rules.effective_bounds(&event)?;
        let default_count = bounds.min() as usize;
        Ok(Self {
            id: SessionId::new(),
            event,
            bounds,
            policy,
            step: RegistrationStep::SelectingTeamSize,
            participants: vec![ParticipantForm::default(); default_count],
            id_cards: vec![None; default_count],
            transaction_reference: String::new(),
            payment_proof: None,
            submission_state: SubmissionState::Idle,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn event(&self) -> &Arc<EventRecord> {
        &self.event
    }

    pub fn bounds(&self) -> TeamSizeRange {
        self.bounds
    }

    pub fn step(&self) -> RegistrationStep {
        self.step
    }

    pub fn participant_count(&self) -> u32 {
        self.participants.len() as u32
    }

    pub fn participants(&self) -> &[ParticipantForm] {
        &self.participants
    }

    pub fn id_cards(&self) -> &[Option<Attachment>] {
        &self.id_cards
    }

    pub fn payment_proof(&self) -> Option<&Attachment> {
        self.payment_proof.as_ref()
    }

    pub fn transaction_reference(&self) -> &str {
        &self.transaction_reference
    }

    pub fn submission_state(&self) -> &SubmissionState {
        &self.submission_state
    }

    pub fn total_amount(&self) -> u64 {
        self.event.total_fee(self.participant_count())
    }

    pub fn choose_participant_count(&mut self, count: u32) -> Result<(), RegistrationError> {
        self.ensure_editable()?;
        if !self.bounds.contains(count) {
            return Err(ValidationError::ParticipantCountOutOfRange {
                requested: count,
                min: self.bounds.min(),
                max: self.bounds.max(),
            }
            .into());
        }

        let count = count as usize;
        self.participants.resize_with(count, ParticipantForm::default);
        self.id_cards.resize(count, None);
        debug!(session = %self.id, count, "registration: participant count chosen");
        Ok(())
    }

    pub fn advance(&mut self) -> Result<(), RegistrationError> {
        self.ensure_editable()?;
        self.transition(
            RegistrationStep::SelectingTeamSize,
            RegistrationStep::EnteringDetails,
            "advance",
        )
    }

    pub fn retreat(&mut self) -> Result<(), RegistrationError> {
        self.ensure_editable()?;
        self.transition(
            RegistrationStep::EnteringDetails,
            RegistrationStep::SelectingTeamSize,
            "go back",
        )
    }

    pub fn set_participant_field(
        &mut self,
        index: usize,
        field: ParticipantField,
        value: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        self.ensure_editable()?;
        let count = self.participant_count();
        let participant = self
            .participants
            .get_mut(index)
            .ok_or(ValidationError::ParticipantIndexOutOfRange { index, count })?;
        participant.set_field(field, value);
        Ok(())
    }

    pub fn set_participant(
        &mut self,
        index: usize,
        form: ParticipantForm,
    ) -> Result<(), RegistrationError> {
        self.ensure_editable()?;
        let count = self.participant_count();
        let participant = self
            .participants
            .get_mut(index)
            .ok_or(ValidationError::ParticipantIndexOutOfRange { index, count })?;
        *participant = form;
        Ok(())
    }

    pub fn set_transaction_reference(
        &mut self,
        reference: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        self.ensure_editable()?;
        self.transaction_reference = reference.into();
        Ok(())
    }

    /// Replaces whatever was attached to `slot` before.
    pub fn attach_file(
        &mut self,
        slot: AttachmentSlot,
        attachment: Attachment,
    ) -> Result<(), RegistrationError> {
        self.ensure_editable()?;
        self.policy.check_type(&attachment)?;
        match slot {
            AttachmentSlot::TransactionProof => self.payment_proof = Some(attachment),
            AttachmentSlot::IdCard(index) => {
                let count = self.participant_count();
                let card = self
                    .id_cards
                    .get_mut(index)
                    .ok_or(ValidationError::ParticipantIndexOutOfRange { index, count })?;
                *card = Some(attachment);
            }
        }
        Ok(())
    }

    /// Every field still required before a submit can start.
    pub fn missing_fields(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        for (index, participant) in self.participants.iter().enumerate() {
            missing.extend(
                participant
                    .blank_fields()
                    .into_iter()
                    .map(|field| MissingField::Participant { index, field }),
            );
        }
        missing.extend(
            self.id_cards
                .iter()
                .enumerate()
                .filter(|(_, card)| card.is_none())
                .map(|(index, _)| MissingField::IdCard { index }),
        );
        if self.transaction_reference.trim().is_empty() {
            missing.push(MissingField::TransactionReference);
        }
        if self.payment_proof.is_none() {
            missing.push(MissingField::PaymentProof);
        }
        missing
    }

    pub fn begin_submission(&mut self) -> Result<SubmissionSnapshot, RegistrationError> {
        self.ensure_editable()?;
        if self.step != RegistrationStep::EnteringDetails {
            return Err(ValidationError::InvalidTransition {
                action: "submit",
                step: self.step.label(),
            }
            .into());
        }

        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing).into());
        }

        self.submission_state = SubmissionState::Submitting;
        Ok(SubmissionSnapshot {
            session_id: self.id,
            event: Arc::clone(&self.event),
            participants: self.participants.clone(),
            id_cards: self.id_cards.clone(),
            transaction_reference: self.transaction_reference.trim().to_string(),
            payment_proof: self.payment_proof.clone(),
        })
    }

    /// Clears the form back to the event's default team size.
    pub fn complete_submission(&mut self) -> Result<(), RegistrationError> {
        self.ensure_submitting("complete submission")?;
        let default_count = self.bounds.min() as usize;
        self.step = RegistrationStep::SelectingTeamSize;
        self.participants = vec![ParticipantForm::default(); default_count];
        self.id_cards = vec![None; default_count];
        self.transaction_reference.clear();
        self.payment_proof = None;
        self.submission_state = SubmissionState::Succeeded;
        Ok(())
    }

    /// Keeps every entered field so the visitor can retry unchanged.
    pub fn fail_submission(&mut self, reason: impl Into<String>) -> Result<(), RegistrationError> {
        self.ensure_submitting("fail submission")?;
        self.submission_state = SubmissionState::Failed(reason.into());
        Ok(())
    }

    fn transition(
        &mut self,
        from: RegistrationStep,
        to: RegistrationStep,
        action: &'static str,
    ) -> Result<(), RegistrationError> {
        if self.step != from {
            return Err(ValidationError::InvalidTransition {
                action,
                step: self.step.label(),
            }
            .into());
        }
        self.step = to;
        Ok(())
    }

    fn ensure_editable(&self) -> Result<(), RegistrationError> {
        if self.submission_state == SubmissionState::Submitting {
            return Err(RegistrationError::SubmissionInProgress);
        }
        Ok(())
    }

    fn ensure_submitting(&self, action: &'static str) -> Result<(), RegistrationError> {
        if self.submission_state != SubmissionState::Submitting {
            return Err(ValidationError::InvalidTransition {
                action,
                step: "no submission is running",
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
