//! Issue (physical possession) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::copy::CopyStatus;

/// Fixed loan period applied when no explicit due date is supplied
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Where an issue came from: a member's approved request, or a walk-in
/// handover recorded directly by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum IssuanceOrigin {
    FromRequest { request_id: i64 },
    Direct,
}

/// Condition recorded when a copy comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReturnCondition {
    Available,
    Damaged,
    Lost,
}

impl ReturnCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnCondition::Available => "available",
            ReturnCondition::Damaged => "damaged",
            ReturnCondition::Lost => "lost",
        }
    }
}

impl From<ReturnCondition> for CopyStatus {
    fn from(c: ReturnCondition) -> Self {
        match c {
            ReturnCondition::Available => CopyStatus::Available,
            ReturnCondition::Damaged => CopyStatus::Damaged,
            ReturnCondition::Lost => CopyStatus::Lost,
        }
    }
}

impl std::fmt::Display for ReturnCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReturnCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(ReturnCondition::Available),
            "damaged" => Ok(ReturnCondition::Damaged),
            "lost" => Ok(ReturnCondition::Lost),
            _ => Err(format!("Invalid return condition: {}", s)),
        }
    }
}

/// Issue model from database; the immutable possession record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct IssueBook {
    pub id: i64,
    pub member_id: i64,
    pub copy_id: i64,
    pub issued_by: i64,
    pub request_id: Option<i64>,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl IssueBook {
    pub fn origin(&self) -> IssuanceOrigin {
        match self.request_id {
            Some(request_id) => IssuanceOrigin::FromRequest { request_id },
            None => IssuanceOrigin::Direct,
        }
    }

    /// Overdue test against an explicit clock; pure, no persistence
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.return_date.is_none() && now > self.due_date
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }
}

/// Compute the due date for an issue, applying the default loan period
/// unless an explicit override is supplied.
pub fn due_date_for(issue_date: DateTime<Utc>, override_due: Option<DateTime<Utc>>) -> DateTime<Utc> {
    override_due.unwrap_or(issue_date + Duration::days(LOAN_PERIOD_DAYS))
}

/// Direct (walk-in) issue payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDirectIssue {
    pub member_id: i64,
    pub copy_id: i64,
    pub due_date: Option<DateTime<Utc>>,
}

/// Return-by-issue payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnIssueRequest {
    pub condition: ReturnCondition,
}

/// Issue listing query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct IssueQuery {
    pub member_id: Option<i64>,
    /// When true, only unreturned issues past their due date
    pub overdue: Option<bool>,
    /// When true, include returned issues as well
    pub include_returned: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Issue with origin tag and overdue flag for display
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: IssueBook,
    #[serde(flatten)]
    pub origin: IssuanceOrigin,
    pub is_overdue: bool,
}

impl From<IssueBook> for IssueDetails {
    fn from(issue: IssueBook) -> Self {
        let origin = issue.origin();
        let is_overdue = issue.is_overdue();
        Self { issue, origin, is_overdue }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issue_at(issue_date: DateTime<Utc>) -> IssueBook {
        IssueBook {
            id: 1,
            member_id: 10,
            copy_id: 20,
            issued_by: 2,
            request_id: None,
            issue_date,
            due_date: due_date_for(issue_date, None),
            return_date: None,
            created_at: issue_date,
        }
    }

    #[test]
    fn due_date_defaults_to_fourteen_days() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(due_date_for(t, None), t + Duration::days(14));
    }

    #[test]
    fn due_date_override_is_honored() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let custom = t + Duration::days(30);
        assert_eq!(due_date_for(t, Some(custom)), custom);
    }

    #[test]
    fn overdue_boundary() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let issue = issue_at(t);
        assert!(!issue.is_overdue_at(t + Duration::days(13)));
        assert!(!issue.is_overdue_at(t + Duration::days(14)));
        assert!(issue.is_overdue_at(t + Duration::days(15)));
    }

    #[test]
    fn returned_issue_is_never_overdue() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut issue = issue_at(t);
        issue.return_date = Some(t + Duration::days(40));
        assert!(!issue.is_overdue_at(t + Duration::days(60)));
    }

    #[test]
    fn origin_is_tagged_by_request_link() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut issue = issue_at(t);
        assert_eq!(issue.origin(), IssuanceOrigin::Direct);
        issue.request_id = Some(99);
        assert_eq!(issue.origin(), IssuanceOrigin::FromRequest { request_id: 99 });
    }

    #[test]
    fn condition_parsing_is_strict() {
        assert_eq!("damaged".parse::<ReturnCondition>().unwrap(), ReturnCondition::Damaged);
        assert!("pristine".parse::<ReturnCondition>().is_err());
        assert!("returned".parse::<ReturnCondition>().is_err());
    }
}
