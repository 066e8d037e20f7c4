//! Club invitation models.
//!
//! An invitation carries a one-time secret token. Only its SHA-256 hash is
//! stored; the plaintext goes out in the invitation email and in the
//! response to the request that created it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// Represents a row of the `invitations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub club_id: Uuid,
    pub email: String,
    pub role: String,
    pub token_hash: String,
    pub invited_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Request body for inviting someone to a club.
///
/// ```json
/// { "email": "coach@example.com", "role": "coach" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateInvitationRequest {
    pub email: String,
    pub role: String,
}

/// Invitation as returned to clients.
#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub club_id: Uuid,
    pub email: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,

    /// Only present in the response that created the invitation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept_url: Option<String>,
}

impl From<Invitation> for InvitationResponse {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id,
            club_id: invitation.club_id,
            email: invitation.email,
            role: invitation.role,
            expires_at: invitation.expires_at,
            accepted: invitation.accepted_at.is_some(),
            created_at: invitation.created_at,
            token: None,
            accept_url: None,
        }
    }
}

/// Request body for `POST /api/v1/invitations/{token}/accept`.
#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub display_name: Option<String>,
}

/// Response body for an accepted invitation.
///
/// `access_token` is only minted for a user created by this acceptance.
/// Existing users accept while signed in and keep their own tokens.
#[derive(Debug, Serialize)]
pub struct AcceptInvitationResponse {
    pub user: User,
    pub club_id: Uuid,
    pub role: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invitation(expires_at: DateTime<Utc>) -> Invitation {
        Invitation {
            id: Uuid::new_v4(),
            club_id: Uuid::new_v4(),
            email: "new@example.com".to_string(),
            role: "member".to_string(),
            token_hash: "00".repeat(32),
            invited_by: None,
            expires_at,
            accepted_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let now = Utc::now();
        assert!(invitation(now).is_expired(now));
        assert!(invitation(now - Duration::hours(1)).is_expired(now));
        assert!(!invitation(now + Duration::hours(1)).is_expired(now));
    }

    #[test]
    fn response_hides_token_by_default() {
        let response = InvitationResponse::from(invitation(Utc::now()));
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("token").is_none());
        assert!(json.get("accept_url").is_none());
        assert_eq!(json["accepted"], false);
    }
}
