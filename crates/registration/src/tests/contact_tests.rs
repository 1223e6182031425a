use super::*;
use async_trait::async_trait;
use shared::error::{StatusKind, TransportError};

#[derive(Default)]
struct FormRecorder {
    forms: Mutex<Vec<Vec<(String, String)>>>,
    fail: bool,
}

#[async_trait]
impl SubmissionTransport for FormRecorder {
    async fn send_text(&self, _body: String) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send_form(&self, fields: Vec<(String, String)>) -> Result<(), TransportError> {
        self.forms.lock().await.push(fields);
        if self.fail {
            return Err(TransportError::Request("offline".into()));
        }
        Ok(())
    }
}

async fn fill(client: &ContactClient) {
    for (field, value) in [
        (ContactField::Name, "Asha"),
        (ContactField::Email, "asha@example.edu"),
        (ContactField::Phone, "9876543210"),
        (ContactField::Message, "Is on-spot registration open?"),
    ] {
        client.set_field(field, value).await.expect("set field");
    }
}

#[tokio::test]
async fn sends_all_four_fields_and_clears_form() {
    let recorder = Arc::new(FormRecorder::default());
    let client = ContactClient::new(recorder.clone());
    fill(&client).await;

    client.send().await.expect("sent");

    let forms = recorder.forms.lock().await;
    assert_eq!(forms.len(), 1);
    assert_eq!(
        forms[0],
        vec![
            ("name".to_string(), "Asha".to_string()),
            ("email".to_string(), "asha@example.edu".to_string()),
            ("phone".to_string(), "9876543210".to_string()),
            ("message".to_string(), "Is on-spot registration open?".to_string()),
        ]
    );
    assert_eq!(client.form().await, ContactSubmission::default());
    assert_eq!(
        client.status().await,
        Some(StatusMessage::success(CONTACT_SUCCESS_MESSAGE))
    );
}

#[tokio::test]
async fn blank_fields_are_reported_without_sending() {
    let recorder = Arc::new(FormRecorder::default());
    let client = ContactClient::new(recorder.clone());
    client
        .set_field(ContactField::Name, "Asha")
        .await
        .expect("name");
    client
        .set_field(ContactField::Message, "   ")
        .await
        .expect("message");

    let err = client.send().await.expect_err("incomplete");
    assert_eq!(
        err,
        RegistrationError::Validation(ValidationError::MissingFields(vec![
            MissingField::Contact { field: ContactField::Email },
            MissingField::Contact { field: ContactField::Phone },
            MissingField::Contact { field: ContactField::Message },
        ]))
    );
    assert!(recorder.forms.lock().await.is_empty());
}

#[tokio::test]
async fn failed_send_keeps_form_for_retry() {
    let recorder = Arc::new(FormRecorder {
        fail: true,
        ..FormRecorder::default()
    });
    let client = ContactClient::new(recorder.clone());
    fill(&client).await;

    let err = client.send().await.expect_err("offline");
    assert!(matches!(err, RegistrationError::Transport(_)));
    assert_eq!(client.form().await.name, "Asha");

    let status = client.status().await.expect("status");
    assert_eq!(status.kind, StatusKind::Error);
    assert_eq!(status.message, CONTACT_FAILURE_MESSAGE);
}
