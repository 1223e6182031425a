use serde::{Deserialize, Serialize};

use crate::domain::ParticipantForm;

/// One participant row as the spreadsheet endpoint stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEntry {
    #[serde(flatten)]
    pub form: ParticipantForm,
    pub event_name: String,
    pub registration_date: String,
    pub id_card_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub participants: Vec<ParticipantEntry>,
    pub transaction_id: String,
    pub transaction_image: String,
    pub total_amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ContactSubmission {
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("name".to_string(), self.name.clone()),
            ("email".to_string(), self.email.clone()),
            ("phone".to_string(), self.phone.clone()),
            ("message".to_string(), self.message.clone()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointResult {
    Success,
    Error,
}

/// Optional JSON body the endpoint may answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointReply {
    pub result: EndpointResult,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_camel_case_keys_and_flattens_participant_fields() {
        let payload = SubmissionPayload {
            participants: vec![ParticipantEntry {
                form: ParticipantForm {
                    name: "Asha".into(),
                    email: "asha@example.edu".into(),
                    phone: "99999".into(),
                    college: "SRM".into(),
                    college_id: "RA21".into(),
                },
                event_name: "Hack-IoT".into(),
                registration_date: "2026-03-01T10:00:00.000Z".into(),
                id_card_image: "data:image/png;base64,AAAA".into(),
            }],
            transaction_id: "UPI123".into(),
            transaction_image: String::new(),
            total_amount: 500,
        };

        let json = serde_json::to_value(&payload).expect("serialize");
        let participant = &json["participants"][0];
        assert_eq!(participant["collegeId"], "RA21");
        assert_eq!(participant["eventName"], "Hack-IoT");
        assert_eq!(participant["idCardImage"], "data:image/png;base64,AAAA");
        assert_eq!(json["transactionId"], "UPI123");
        assert_eq!(json["transactionImage"], "");
        assert_eq!(json["totalAmount"], 500);
    }

    #[test]
    fn endpoint_reply_parses_optional_message() {
        let reply: EndpointReply =
            serde_json::from_str(r#"{"result":"error","message":"sheet locked"}"#).expect("parse");
        assert_eq!(reply.result, EndpointResult::Error);
        assert_eq!(reply.message.as_deref(), Some("sheet locked"));

        let reply: EndpointReply = serde_json::from_str(r#"{"result":"success"}"#).expect("parse");
        assert_eq!(reply.message, None);
    }
}
