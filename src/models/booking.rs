//! Facility booking models.
//!
//! A booking reserves a facility for the half-open interval
//! `[starts_at, ends_at)`. Confirmed bookings of the same facility never
//! overlap; cancelled bookings are kept for history and ignored by the
//! overlap check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// Represents a booking record from the `bookings` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Booking {
    pub id: Uuid,
    pub club_id: Uuid,
    pub facility_id: Uuid,
    pub team_id: Option<Uuid>,
    pub booked_by: Option<Uuid>,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    /// `confirmed` or `cancelled`
    pub status: String,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a booking.
///
/// ```json
/// {
///   "facility_id": "550e8400-e29b-41d4-a716-446655440000",
///   "team_id": "660e8400-e29b-41d4-a716-446655440001",
///   "title": "U12 training",
///   "starts_at": "2025-03-01T17:00:00Z",
///   "ends_at": "2025-03-01T18:30:00Z"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub facility_id: Uuid,
    pub team_id: Option<Uuid>,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Request body for updating or rescheduling a booking.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub facility_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub title: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Query string for listing bookings.
#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    pub facility_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_cancelled: bool,
}

/// Whether two half-open intervals `[a_start, a_end)` and `[b_start, b_end)`
/// share any instant.
///
/// Back-to-back bookings (one ends exactly when the next starts) do not
/// overlap. This mirrors the SQL predicate used when booking.
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn partial_overlap_is_detected() {
        assert!(intervals_overlap(at(17, 0), at(18, 0), at(17, 30), at(19, 0)));
        assert!(intervals_overlap(at(17, 30), at(19, 0), at(17, 0), at(18, 0)));
    }

    #[test]
    fn containment_is_an_overlap() {
        assert!(intervals_overlap(at(16, 0), at(20, 0), at(17, 0), at(18, 0)));
        assert!(intervals_overlap(at(17, 0), at(18, 0), at(16, 0), at(20, 0)));
    }

    #[test]
    fn back_to_back_bookings_do_not_overlap() {
        assert!(!intervals_overlap(at(17, 0), at(18, 0), at(18, 0), at(19, 0)));
        assert!(!intervals_overlap(at(18, 0), at(19, 0), at(17, 0), at(18, 0)));
    }

    #[test]
    fn disjoint_bookings_do_not_overlap() {
        assert!(!intervals_overlap(at(9, 0), at(10, 0), at(17, 0), at(18, 0)));
    }
}
