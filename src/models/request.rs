//! Book request model and the request status machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::issue::ReturnCondition;

/// Request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Borrow,
    Donation,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Borrow => "borrow",
            RequestType::Donation => "donation",
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "borrow" => Ok(RequestType::Borrow),
            "donation" => Ok(RequestType::Donation),
            _ => Err(format!("Invalid request type: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for RequestType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for RequestType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Collected,
    ReturnRequested,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Collected => "collected",
            RequestStatus::ReturnRequested => "return_requested",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }

    /// Live statuses count against the one-open-request-per-(member, book) rule.
    pub fn is_live(self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }

    /// Statuses during which a borrow request holds a copy reservation.
    /// `reserved_copy_id` is non-null exactly while one of these holds.
    pub fn holds_reservation(self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::Collected | RequestStatus::ReturnRequested
        )
    }

    /// Legal status moves for the given request kind. Cancellation is a
    /// deletion from `pending`, not a transition, so it does not appear here.
    pub fn can_transition_to(self, target: RequestStatus, kind: RequestType) -> bool {
        use RequestStatus::*;
        match kind {
            RequestType::Borrow => matches!(
                (self, target),
                (Pending, Approved)
                    | (Pending, Rejected)
                    | (Approved, Rejected)
                    | (Approved, Collected)
                    | (Collected, ReturnRequested)
                    | (ReturnRequested, Completed)
                    | (Collected, Completed)
            ),
            RequestType::Donation => matches!(
                (self, target),
                (Pending, Approved) | (Pending, Rejected) | (Approved, Rejected) | (Approved, Completed)
            ),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "collected" => Ok(RequestStatus::Collected),
            "return_requested" => Ok(RequestStatus::ReturnRequested),
            "completed" => Ok(RequestStatus::Completed),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Book request model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookRequest {
    pub id: i64,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub member_id: i64,
    pub reviewer_id: Option<i64>,
    pub book_id: Option<i64>,
    pub reserved_copy_id: Option<i64>,
    pub donation_title: Option<String>,
    pub donation_author: Option<String>,
    pub donation_year: Option<i32>,
    pub donation_pages: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Create borrow request payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    pub book_id: i64,
}

/// Create donation request payload (free-text proposal)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDonationRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 300))]
    pub author: String,
    #[validate(range(min = 1400, max = 2100))]
    pub year: Option<i32>,
    #[validate(range(min = 1, max = 50000))]
    pub pages: Option<i32>,
}

/// Request listing query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub member_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Collect (handover) payload; the due date may be overridden per issue
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CollectRequest {
    pub due_date: Option<DateTime<Utc>>,
}

/// Confirm-return payload: the admin records the copy's condition
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmReturnRequest {
    pub condition: ReturnCondition,
}

/// Donation completion payload
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompleteDonationRequest {
    #[validate(range(min = 1, max = 1000))]
    pub copies_to_add: i32,
}

/// Result of approving a request
#[derive(Debug, Serialize, ToSchema)]
pub struct ApproveResult {
    pub request_id: i64,
    pub status: RequestStatus,
    /// Copy locked for the member; set for borrow requests only
    pub reserved_copy_id: Option<i64>,
}

/// Result of rejecting a request
#[derive(Debug, Serialize, ToSchema)]
pub struct RejectResult {
    pub request_id: i64,
    pub status: RequestStatus,
    /// Copy returned to the shelf when an approved borrow was rejected
    pub released_copy_id: Option<i64>,
}

/// Result of collecting (handing over) an approved borrow request
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectResult {
    pub request_id: i64,
    pub status: RequestStatus,
    pub issue_id: i64,
    pub due_date: DateTime<Utc>,
}

/// Result of confirming a return
#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnResult {
    pub request_id: i64,
    pub status: RequestStatus,
    pub issue_id: i64,
    pub copy_status: super::copy::CopyStatus,
}

/// Result of completing a donation
#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteDonationResult {
    pub request_id: i64,
    pub status: RequestStatus,
    pub book_id: i64,
    pub copies_added: i32,
    /// False when the donation matched an existing (title, author) entry
    pub book_created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    #[test]
    fn borrow_happy_path_is_legal() {
        let kind = RequestType::Borrow;
        assert!(Pending.can_transition_to(Approved, kind));
        assert!(Approved.can_transition_to(Collected, kind));
        assert!(Collected.can_transition_to(ReturnRequested, kind));
        assert!(ReturnRequested.can_transition_to(Completed, kind));
    }

    #[test]
    fn borrow_direct_return_skips_return_requested() {
        assert!(Collected.can_transition_to(Completed, RequestType::Borrow));
    }

    #[test]
    fn approve_is_not_idempotent() {
        assert!(!Approved.can_transition_to(Approved, RequestType::Borrow));
        assert!(!Approved.can_transition_to(Approved, RequestType::Donation));
    }

    #[test]
    fn terminal_statuses_have_no_successors() {
        for kind in [RequestType::Borrow, RequestType::Donation] {
            for from in [Rejected, Completed] {
                for to in [Pending, Approved, Rejected, Collected, ReturnRequested, Completed] {
                    assert!(!from.can_transition_to(to, kind), "{from} -> {to} must be illegal");
                }
            }
        }
    }

    #[test]
    fn donation_never_reaches_collection_states() {
        let kind = RequestType::Donation;
        for from in [Pending, Approved, Rejected, Collected, ReturnRequested, Completed] {
            assert!(!from.can_transition_to(Collected, kind));
            assert!(!from.can_transition_to(ReturnRequested, kind));
        }
        assert!(Approved.can_transition_to(Completed, kind));
    }

    #[test]
    fn reservation_window_matches_status_set() {
        assert!(!Pending.holds_reservation());
        assert!(Approved.holds_reservation());
        assert!(Collected.holds_reservation());
        assert!(ReturnRequested.holds_reservation());
        assert!(!Rejected.holds_reservation());
        assert!(!Completed.holds_reservation());
    }

    #[test]
    fn live_statuses_block_duplicates() {
        assert!(Pending.is_live());
        assert!(Approved.is_live());
        for status in [Rejected, Collected, ReturnRequested, Completed] {
            assert!(!status.is_live());
        }
    }
}
