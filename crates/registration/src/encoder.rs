use std::{path::PathBuf, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::try_join_all;
use shared::{
    error::{EncodingError, ValidationError},
    protocol::{ParticipantEntry, SubmissionPayload},
};
use tracing::debug;

use crate::session::SubmissionSnapshot;

pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    Bytes(Arc<[u8]>),
    /// Read lazily when the submission is encoded.
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    mime_type: String,
    source: AttachmentSource,
}

impl Attachment {
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type.unwrap_or_else(|| guess_mime_type(&file_name).to_string());
        Self {
            file_name,
            mime_type,
            source: AttachmentSource::Bytes(Arc::from(bytes)),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = guess_mime_type(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            source: AttachmentSource::Path(path),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }

    /// Loads the bytes, refusing path sources whose on-disk size already exceeds `max_bytes`.
    async fn read(&self, max_bytes: usize) -> Result<Arc<[u8]>, EncodingError> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
            AttachmentSource::Path(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|e| self.read_error(e))?;
                let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
                if size > max_bytes {
                    return Err(EncodingError::TooLarge {
                        file_name: self.file_name.clone(),
                        size,
                        limit: max_bytes,
                    });
                }
                tokio::fs::read(path)
                    .await
                    .map(Arc::from)
                    .map_err(|e| self.read_error(e))
            }
        }
    }

    fn read_error(&self, err: std::io::Error) -> EncodingError {
        EncodingError::Read {
            file_name: self.file_name.clone(),
            message: err.to_string(),
        }
    }
}

pub fn guess_mime_type(file_name: &str) -> &'static str {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or(FALLBACK_MIME_TYPE)
}

/// Limits applied to uploaded files. An empty allow-list accepts any type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub max_bytes: usize,
    pub allowed_mime_types: Vec<String>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            allowed_mime_types: [
                "image/png",
                "image/jpeg",
                "image/gif",
                "image/webp",
                "application/pdf",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl AttachmentPolicy {
    pub fn unrestricted() -> Self {
        Self {
            max_bytes: usize::MAX,
            allowed_mime_types: Vec::new(),
        }
    }

    pub fn check_type(&self, attachment: &Attachment) -> Result<(), ValidationError> {
        let permitted = self.allowed_mime_types.is_empty()
            || self
                .allowed_mime_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(attachment.mime_type()));
        if permitted {
            Ok(())
        } else {
            Err(ValidationError::UnsupportedAttachment {
                file_name: attachment.file_name().to_string(),
                mime_type: attachment.mime_type().to_string(),
            })
        }
    }

    fn check_size(&self, attachment: &Attachment, size: usize) -> Result<(), EncodingError> {
        if size > self.max_bytes {
            return Err(EncodingError::TooLarge {
                file_name: attachment.file_name().to_string(),
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Turns a frozen session into the single JSON payload the endpoint expects.
#[derive(Debug, Clone, Default)]
pub struct SubmissionEncoder {
    policy: AttachmentPolicy,
    fixed_time: Option<DateTime<Utc>>,
}

impl SubmissionEncoder {
    pub fn new(policy: AttachmentPolicy) -> Self {
        Self {
            policy,
            fixed_time: None,
        }
    }

    /// Stamps every payload with `at` instead of the wall clock.
    pub fn with_fixed_time(mut self, at: DateTime<Utc>) -> Self {
        self.fixed_time = Some(at);
        self
    }

    pub fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }

    pub async fn encode(
        &self,
        snapshot: &SubmissionSnapshot,
    ) -> Result<SubmissionPayload, EncodingError> {
        let at = self.fixed_time.unwrap_or_else(Utc::now);
        self.encode_at(snapshot, at).await
    }

    pub async fn encode_at(
        &self,
        snapshot: &SubmissionSnapshot,
        at: DateTime<Utc>,
    ) -> Result<SubmissionPayload, EncodingError> {
        let registration_date = at.to_rfc3339_opts(SecondsFormat::Millis, true);

        // All conversions run together; the first failure drops the rest.
        let id_cards = try_join_all(
            snapshot
                .id_cards
                .iter()
                .map(|card| self.encode_optional(card.as_ref())),
        );
        let proof = self.encode_optional(snapshot.payment_proof.as_ref());
        let (id_card_images, transaction_image) = futures::try_join!(id_cards, proof)?;

        let participants = snapshot
            .participants
            .iter()
            .zip(id_card_images)
            .map(|(form, id_card_image)| ParticipantEntry {
                form: form.clone(),
                event_name: snapshot.event.name.clone(),
                registration_date: registration_date.clone(),
                id_card_image,
            })
            .collect();

        debug!(
            session = %snapshot.session_id,
            participants = snapshot.participants.len(),
            "encoder: submission assembled"
        );

        Ok(SubmissionPayload {
            participants,
            transaction_id: snapshot.transaction_reference.clone(),
            transaction_image,
            total_amount: snapshot.total_amount(),
        })
    }

    pub async fn to_data_url(&self, attachment: &Attachment) -> Result<String, EncodingError> {
        let bytes = attachment.read(self.policy.max_bytes).await?;
        self.policy.check_size(attachment, bytes.len())?;

        let mime_type = attachment.mime_type().to_string();
        tokio::task::spawn_blocking(move || {
            format!("data:{mime_type};base64,{}", STANDARD.encode(&bytes))
        })
        .await
        .map_err(|e| EncodingError::Interrupted {
            file_name: attachment.file_name().to_string(),
            message: e.to_string(),
        })
    }

    async fn encode_optional(
        &self,
        attachment: Option<&Attachment>,
    ) -> Result<String, EncodingError> {
        match attachment {
            Some(attachment) => self.to_data_url(attachment).await,
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
#[path = "tests/encoder_tests.rs"]
mod tests;
