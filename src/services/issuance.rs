//! Issuance service: physical possession records and returns

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::BookCopy,
        issue::{CreateDirectIssue, IssueBook, IssueQuery, ReturnCondition},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct IssuanceService {
    repository: Repository,
}

impl IssuanceService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get an issue. Members can read their own; admins can read any.
    pub async fn get(&self, issue_id: i64, claims: &UserClaims) -> AppResult<IssueBook> {
        let issue = self.repository.issues.get_by_id(issue_id).await?;
        if claims.require_admin().is_err() && issue.member_id != claims.user_id {
            return Err(AppError::Forbidden(
                "Issue belongs to another member".to_string(),
            ));
        }
        Ok(issue)
    }

    /// List issues with filters (admin surface)
    pub async fn list(&self, query: &IssueQuery) -> AppResult<(Vec<IssueBook>, i64)> {
        self.repository.issues.list(query).await
    }

    /// List the calling member's issues
    pub async fn list_own(&self, member_id: i64, include_returned: bool) -> AppResult<Vec<IssueBook>> {
        let query = IssueQuery {
            member_id: Some(member_id),
            include_returned: Some(include_returned),
            ..Default::default()
        };
        let (issues, _) = self.repository.issues.list(&query).await?;
        Ok(issues)
    }

    /// Walk-in issuance: hand an available copy to a member with no prior
    /// request. Recorded with a direct origin, not a fabricated request.
    pub async fn direct_issue(
        &self,
        payload: &CreateDirectIssue,
        admin_id: i64,
    ) -> AppResult<IssueBook> {
        let member = self.repository.users.get_by_id(payload.member_id).await?;
        if !member.is_active {
            return Err(AppError::Conflict("Member account is deactivated".to_string()));
        }

        let issue = self
            .repository
            .issues
            .direct_issue(payload.member_id, payload.copy_id, admin_id, payload.due_date)
            .await?;
        tracing::info!(
            issue_id = issue.id,
            member_id = payload.member_id,
            copy_id = payload.copy_id,
            admin_id,
            "Direct issue created"
        );
        Ok(issue)
    }

    /// Return by issue id (admin-direct path). Completes the linked request
    /// when one exists.
    pub async fn return_by_id(
        &self,
        issue_id: i64,
        condition: ReturnCondition,
    ) -> AppResult<(IssueBook, BookCopy)> {
        let result = self.repository.issues.return_by_id(issue_id, condition).await?;
        tracing::info!(issue_id, %condition, "Issue returned");
        Ok(result)
    }

    /// Count unreturned issues
    pub async fn count_active(&self) -> AppResult<i64> {
        self.repository.issues.count_active().await
    }

    /// Count unreturned issues past their due date
    pub async fn count_overdue(&self) -> AppResult<i64> {
        self.repository.issues.count_overdue().await
    }
}
