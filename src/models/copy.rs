//! Book copy (physical inventory) model and status machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// Physical copy status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Available,
    Reserved,
    Issued,
    Damaged,
    Lost,
}

impl CopyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "available",
            CopyStatus::Reserved => "reserved",
            CopyStatus::Issued => "issued",
            CopyStatus::Damaged => "damaged",
            CopyStatus::Lost => "lost",
        }
    }

    /// Legal status moves. Reservation holds a copy between approval and
    /// collection; damaged/lost are terminal shelf states.
    pub fn can_transition_to(self, target: CopyStatus) -> bool {
        use CopyStatus::*;
        matches!(
            (self, target),
            (Available, Reserved)
                | (Available, Issued)
                | (Reserved, Issued)
                | (Reserved, Available)
                | (Issued, Available)
                | (Issued, Damaged)
                | (Issued, Lost)
        )
    }
}

impl std::fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CopyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(CopyStatus::Available),
            "reserved" => Ok(CopyStatus::Reserved),
            "issued" => Ok(CopyStatus::Issued),
            "damaged" => Ok(CopyStatus::Damaged),
            "lost" => Ok(CopyStatus::Lost),
            _ => Err(format!("Invalid copy status: {}", s)),
        }
    }
}

// SQLx conversion for CopyStatus
impl sqlx::Type<Postgres> for CopyStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for CopyStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for CopyStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Book copy model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: i64,
    pub book_id: i64,
    pub status: CopyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Add copies request
#[derive(Debug, Deserialize, validator::Validate, ToSchema)]
pub struct AddCopies {
    #[validate(range(min = 1, max = 1000))]
    pub count: i32,
}

/// Per-book copy counts grouped by status
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CopyCounts {
    pub total: i64,
    pub available: i64,
    pub reserved: i64,
    pub issued: i64,
    pub damaged: i64,
    pub lost: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use CopyStatus::*;

    #[test]
    fn reservation_only_from_available() {
        assert!(Available.can_transition_to(Reserved));
        for from in [Reserved, Issued, Damaged, Lost] {
            assert!(!from.can_transition_to(Reserved), "{from} -> reserved must be illegal");
        }
    }

    #[test]
    fn issue_from_available_or_reserved_only() {
        assert!(Available.can_transition_to(Issued));
        assert!(Reserved.can_transition_to(Issued));
        for from in [Issued, Damaged, Lost] {
            assert!(!from.can_transition_to(Issued));
        }
    }

    #[test]
    fn damaged_and_lost_only_from_issued() {
        for target in [Damaged, Lost] {
            assert!(Issued.can_transition_to(target));
            for from in [Available, Reserved, Damaged, Lost] {
                assert!(!from.can_transition_to(target));
            }
        }
    }

    #[test]
    fn damaged_and_lost_are_terminal() {
        for from in [Damaged, Lost] {
            for target in [Available, Reserved, Issued, Damaged, Lost] {
                assert!(!from.can_transition_to(target));
            }
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [Available, Reserved, Issued, Damaged, Lost] {
            assert_eq!(status.as_str().parse::<CopyStatus>().unwrap(), status);
        }
        assert!("borrowed".parse::<CopyStatus>().is_err());
    }
}
