use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::referralmodel::ReferralVisit;

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct TrackVisitDto {
    #[validate(length(min = 1, message = "Referral code is required"))]
    #[serde(rename = "referralCode")]
    pub referral_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackVisitResponseDto {
    pub success: bool,
    pub visit: ReferralVisit,
}

// Identity-provider webhook payload (Clerk user.* events).
#[derive(Debug, Deserialize)]
pub struct ClerkWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: ClerkUserData,
}

#[derive(Debug, Deserialize)]
pub struct ClerkUserData {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClerkEmailAddress {
    pub email_address: String,
}

impl ClerkUserData {
    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|e| e.email_address.as_str())
    }

    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let name = name.trim().to_string();
        if name.is_empty() {
            self.id.clone()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_code_fails_validation() {
        let dto = TrackVisitDto {
            referral_code: "".to_string(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn clerk_event_parses_camel_payload() {
        let event: ClerkWebhookEvent = serde_json::from_str(
            r#"{
                "type": "user.created",
                "data": {
                    "id": "user_abc",
                    "email_addresses": [{"email_address": "ada@example.com"}],
                    "first_name": "Ada",
                    "last_name": "Lovelace"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(event.event_type, "user.created");
        assert_eq!(event.data.primary_email(), Some("ada@example.com"));
        assert_eq!(event.data.display_name(), "Ada Lovelace");
    }

    #[test]
    fn display_name_falls_back_to_provider_id() {
        let data = ClerkUserData {
            id: "user_abc".to_string(),
            email_addresses: vec![],
            first_name: None,
            last_name: None,
        };
        assert_eq!(data.display_name(), "user_abc");
        assert_eq!(data.primary_email(), None);
    }
}
