use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context};
use registration::{Attachment, AttachmentSlot, RegistrationSession};
use serde::Deserialize;
use shared::{domain::ParticipantForm, error::RegistrationError};

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantAnswers {
    #[serde(flatten)]
    pub form: ParticipantForm,
    pub id_card: PathBuf,
}

/// A filled-in registration form read from TOML; file paths are relative to the answers file.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationAnswers {
    pub transaction_id: String,
    pub payment_proof: PathBuf,
    pub participants: Vec<ParticipantAnswers>,
}

impl RegistrationAnswers {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read answers file '{}'", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&raw, base).with_context(|| format!("invalid answers file '{}'", path.display()))
    }

    pub fn parse(raw: &str, base: &Path) -> anyhow::Result<Self> {
        let mut answers: Self = toml::from_str(raw)?;
        ensure!(
            !answers.participants.is_empty(),
            "answers must list at least one participant"
        );
        answers.payment_proof = base.join(&answers.payment_proof);
        for participant in &mut answers.participants {
            participant.id_card = base.join(&participant.id_card);
        }
        Ok(answers)
    }

    /// Walks the form the way a visitor would: team size, details, uploads.
    pub fn apply(&self, session: &mut RegistrationSession) -> Result<(), RegistrationError> {
        session.choose_participant_count(self.participants.len() as u32)?;
        session.advance()?;
        for (index, participant) in self.participants.iter().enumerate() {
            session.set_participant(index, participant.form.clone())?;
            session.attach_file(
                AttachmentSlot::IdCard(index),
                Attachment::from_path(&participant.id_card),
            )?;
        }
        session.set_transaction_reference(self.transaction_id.clone())?;
        session.attach_file(
            AttachmentSlot::TransactionProof,
            Attachment::from_path(&self.payment_proof),
        )
    }
}
