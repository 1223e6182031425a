use super::*;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{EventKind, ParticipantField, ParticipantForm},
    error::{StatusKind, TransportError, ValidationError},
    protocol::SubmissionPayload,
};
use tokio::sync::{Mutex as AsyncMutex, Notify};

#[derive(Default)]
struct RecordingTransport {
    bodies: AsyncMutex<Vec<String>>,
    fail_with: AsyncMutex<Option<TransportError>>,
}

impl RecordingTransport {
    async fn fail_next(&self, err: TransportError) {
        *self.fail_with.lock().await = Some(err);
    }

    async fn payloads(&self) -> Vec<SubmissionPayload> {
        self.bodies
            .lock()
            .await
            .iter()
            .map(|body| serde_json::from_str(body).expect("payload json"))
            .collect()
    }
}

#[async_trait]
impl SubmissionTransport for RecordingTransport {
    async fn send_text(&self, body: String) -> Result<(), TransportError> {
        self.bodies.lock().await.push(body);
        match self.fail_with.lock().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn send_form(&self, _fields: Vec<(String, String)>) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Holds every delivery until released, so a submit can be observed mid-flight.
#[derive(Default)]
struct GatedTransport {
    entered: Notify,
    release: Notify,
    calls: AsyncMutex<u32>,
}

#[async_trait]
impl SubmissionTransport for GatedTransport {
    async fn send_text(&self, _body: String) -> Result<(), TransportError> {
        *self.calls.lock().await += 1;
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }

    async fn send_form(&self, _fields: Vec<(String, String)>) -> Result<(), TransportError> {
        Ok(())
    }
}

fn hack_iot() -> Arc<EventRecord> {
    Arc::new(EventRecord {
        name: "Hack-IoT".into(),
        date: "14 March 2025".into(),
        venue: "Tech Park".into(),
        team_size: "2-4".parse().expect("team size"),
        registration_fee: 500,
        about: "Twelve-hour IoT build sprint".into(),
        highlights: None,
        details: None,
        naac_grade: None,
        image: None,
        convener: "Dr. Rao".into(),
        faculty_coordinator: "Prof. Iyer".into(),
        student_coordinator: "Karthik".into(),
        kind: EventKind::Event,
    })
}

fn encoder() -> SubmissionEncoder {
    SubmissionEncoder::default().with_fixed_time(
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0)
            .single()
            .expect("timestamp"),
    )
}

fn open(transport: Arc<dyn SubmissionTransport>) -> Arc<Registrar> {
    Registrar::open(hack_iot(), &ParticipantRules::default(), encoder(), transport)
        .expect("registrar")
}

fn participant(index: usize) -> ParticipantForm {
    ParticipantForm {
        name: format!("Student {index}"),
        email: format!("student{index}@example.edu"),
        phone: format!("98765432{index:02}"),
        college: "SRM IST".into(),
        college_id: format!("RA2111{index:03}"),
    }
}

async fn fill(registrar: &Registrar, count: u32) {
    registrar
        .with_session(|session| -> Result<(), RegistrationError> {
            session.choose_participant_count(count)?;
            session.advance()?;
            for index in 0..count as usize {
                session.set_participant(index, participant(index))?;
                session.attach_file(
                    AttachmentSlot::IdCard(index),
                    Attachment::from_bytes(format!("id{index}.png"), None, vec![index as u8; 8]),
                )?;
            }
            session.set_transaction_reference("UPI123")?;
            session.attach_file(
                AttachmentSlot::TransactionProof,
                Attachment::from_bytes("proof.jpg", None, vec![0xff, 0xd8, 0xff]),
            )
        })
        .await
        .expect("fill form");
}

#[tokio::test]
async fn three_member_team_submits_full_payload() {
    let transport = Arc::new(RecordingTransport::default());
    let registrar = open(transport.clone());

    registrar
        .with_session(|session| session.choose_participant_count(3))
        .await
        .expect("three members");
    assert_eq!(
        registrar.with_session(|s| s.participants().len()).await,
        3
    );

    fill(&registrar, 3).await;
    let receipt = registrar.submit().await.expect("submitted");

    assert_eq!(receipt.total_amount, 1500);
    assert_eq!(receipt.participant_count, 3);
    assert_eq!(receipt.event_name, "Hack-IoT");

    let payloads = transport.payloads().await;
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload.total_amount, 1500);
    assert_eq!(payload.transaction_id, "UPI123");
    assert!(payload.transaction_image.starts_with("data:image/jpeg;base64,"));
    assert_eq!(payload.participants.len(), 3);
    for (index, entry) in payload.participants.iter().enumerate() {
        assert_eq!(entry.event_name, "Hack-IoT");
        assert_eq!(entry.form, participant(index));
        assert!(entry.id_card_image.starts_with("data:image/png;base64,"));
    }
}

#[tokio::test]
async fn five_member_team_is_rejected_for_four_seat_event() {
    let transport = Arc::new(RecordingTransport::default());
    let registrar = open(transport.clone());

    let err = registrar
        .with_session(|session| session.choose_participant_count(5))
        .await
        .expect_err("too many");
    assert_eq!(
        err,
        RegistrationError::Validation(ValidationError::ParticipantCountOutOfRange {
            requested: 5,
            min: 2,
            max: 4,
        })
    );
    assert_eq!(registrar.with_session(|s| s.participant_count()).await, 2);
}

#[tokio::test]
async fn success_resets_session_to_initial_state() {
    let transport = Arc::new(RecordingTransport::default());
    let registrar = open(transport.clone());
    fill(&registrar, 3).await;

    let status = registrar.submit_for_status().await;
    assert_eq!(status.kind, StatusKind::Success);
    assert_eq!(status.message, REGISTRATION_SUCCESS_MESSAGE);

    let session = registrar.session_snapshot().await;
    assert_eq!(session.step(), RegistrationStep::SelectingTeamSize);
    assert_eq!(session.participant_count(), 2);
    assert_eq!(session.transaction_reference(), "");
    assert!(session.payment_proof().is_none());
    assert_eq!(session.submission_state(), &SubmissionState::Succeeded);
}

#[tokio::test]
async fn transport_failure_keeps_session_and_retry_reproduces_payload() {
    let transport = Arc::new(RecordingTransport::default());
    let registrar = open(transport.clone());
    fill(&registrar, 2).await;
    let before = registrar.session_snapshot().await;

    transport
        .fail_next(TransportError::Request("connection reset".into()))
        .await;
    let err = registrar.submit().await.expect_err("transport failure");
    assert_eq!(
        err,
        RegistrationError::Transport(TransportError::Request("connection reset".into()))
    );

    let after = registrar.session_snapshot().await;
    assert_eq!(after.participants(), before.participants());
    assert_eq!(after.id_cards(), before.id_cards());
    assert_eq!(after.payment_proof(), before.payment_proof());
    assert_eq!(after.transaction_reference(), before.transaction_reference());
    assert!(matches!(after.submission_state(), SubmissionState::Failed(reason) if reason.contains("connection reset")));

    registrar.submit().await.expect("retry succeeds");
    let payloads = transport.payloads().await;
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);
}

#[tokio::test]
async fn encoding_failure_aborts_before_transport() {
    let transport = Arc::new(RecordingTransport::default());
    let registrar = open(transport.clone());
    fill(&registrar, 2).await;
    let dir = tempfile::tempdir().expect("tempdir");
    registrar
        .with_session(|session| {
            session.attach_file(
                AttachmentSlot::TransactionProof,
                Attachment::from_path(dir.path().join("deleted.png")),
            )
        })
        .await
        .expect("attach");

    let err = registrar.submit().await.expect_err("unreadable proof");
    assert!(matches!(err, RegistrationError::Encoding(_)), "{err:?}");
    assert!(transport.payloads().await.is_empty());

    let status = err.status_message();
    assert_eq!(status.kind, StatusKind::Error);
    let session = registrar.session_snapshot().await;
    assert!(matches!(session.submission_state(), SubmissionState::Failed(_)));
    assert_eq!(session.participant_count(), 2);
}

#[tokio::test]
async fn incomplete_form_never_reaches_transport() {
    let transport = Arc::new(RecordingTransport::default());
    let registrar = open(transport.clone());
    registrar
        .with_session(|session| {
            session.advance()?;
            session.set_participant_field(0, ParticipantField::Name, "Asha")
        })
        .await
        .expect("partial form");

    let err = registrar.submit().await.expect_err("missing fields");
    assert!(matches!(
        err,
        RegistrationError::Validation(ValidationError::MissingFields(_))
    ));
    assert!(transport.payloads().await.is_empty());
    assert_eq!(
        registrar.with_session(|s| s.submission_state().clone()).await,
        SubmissionState::Idle
    );
}

#[tokio::test]
async fn second_submit_while_in_flight_is_rejected() {
    let transport = Arc::new(GatedTransport::default());
    let registrar = open(transport.clone());
    fill(&registrar, 2).await;

    let first = {
        let registrar = Arc::clone(&registrar);
        tokio::spawn(async move { registrar.submit().await })
    };
    transport.entered.notified().await;

    assert_eq!(
        registrar.submit().await,
        Err(RegistrationError::SubmissionInProgress)
    );
    assert_eq!(
        registrar
            .with_session(|s| s.set_transaction_reference("changed"))
            .await,
        Err(RegistrationError::SubmissionInProgress)
    );

    transport.release.notify_one();
    first
        .await
        .expect("join")
        .expect("first submit succeeds");
    assert_eq!(*transport.calls.lock().await, 1);
}

#[tokio::test]
async fn missing_endpoint_surfaces_retry_prompt() {
    let registrar = open(Arc::new(MissingSubmissionEndpoint));
    fill(&registrar, 2).await;

    let status = registrar.submit_for_status().await;
    assert_eq!(status.kind, StatusKind::Error);
    assert_eq!(status.message, "Registration failed. Please try again.");
    assert_eq!(registrar.with_session(|s| s.participant_count()).await, 2);
}

#[tokio::test]
async fn cancelled_submit_leaves_form_editable() {
    let transport = Arc::new(GatedTransport::default());
    let registrar = open(transport.clone());
    fill(&registrar, 2).await;

    let cancelled =
        tokio::time::timeout(std::time::Duration::from_millis(50), registrar.submit()).await;
    assert!(cancelled.is_err(), "gated delivery never settles");

    assert_eq!(
        registrar.with_session(|s| s.submission_state().clone()).await,
        SubmissionState::Failed("submission abandoned".into())
    );
    assert_eq!(
        registrar
            .with_session(|s| s.set_transaction_reference("UPI456"))
            .await,
        Ok(())
    );

    transport.release.notify_one();
    let receipt = registrar.submit().await.expect("resubmit");
    assert_eq!(receipt.participant_count, 2);
    assert_eq!(*transport.calls.lock().await, 2);
}
