//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, categories, health, issues, requests, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lectern API",
        version = "1.0.0",
        description = "Library Circulation Management REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Lectern Team", email = "contact@lectern.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::register_admin,
        auth::verify_email,
        auth::login,
        auth::me,
        auth::update_my_profile,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_copies,
        books::add_copies,
        books::delete_copy,
        // Categories
        categories::list_categories,
        categories::create_category,
        categories::delete_category,
        // Requests
        requests::create_borrow_request,
        requests::create_donation_request,
        requests::list_requests,
        requests::list_my_requests,
        requests::get_request,
        requests::cancel_request,
        requests::approve_request,
        requests::reject_request,
        requests::collect_request,
        requests::request_return,
        requests::confirm_return,
        requests::complete_donation,
        // Issues
        issues::create_issue,
        issues::list_issues,
        issues::list_my_issues,
        issues::get_issue,
        issues::return_issue,
        // Users
        users::list_users,
        users::get_user,
        users::update_active,
    ),
    components(
        schemas(
            // Auth
            auth::LoginResponse,
            auth::RegisterResponse,
            crate::models::user::Role,
            crate::models::user::UserShort,
            crate::models::user::RegisterUser,
            crate::models::user::RegisterAdmin,
            crate::models::user::VerifyEmail,
            crate::models::user::Login,
            crate::models::user::UpdateProfile,
            // Books
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::copy::BookCopy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CopyCounts,
            crate::models::copy::AddCopies,
            books::BookListResponse,
            books::BookDetailsResponse,
            // Requests
            crate::models::request::BookRequest,
            crate::models::request::RequestType,
            crate::models::request::RequestStatus,
            crate::models::request::CreateBorrowRequest,
            crate::models::request::CreateDonationRequest,
            crate::models::request::CollectRequest,
            crate::models::request::ConfirmReturnRequest,
            crate::models::request::CompleteDonationRequest,
            crate::models::request::ApproveResult,
            crate::models::request::RejectResult,
            crate::models::request::CollectResult,
            crate::models::request::ReturnResult,
            crate::models::request::CompleteDonationResult,
            requests::RequestListResponse,
            requests::MyRequestsQuery,
            // Issues
            crate::models::issue::IssueBook,
            crate::models::issue::IssueDetails,
            crate::models::issue::IssuanceOrigin,
            crate::models::issue::ReturnCondition,
            crate::models::issue::CreateDirectIssue,
            crate::models::issue::ReturnIssueRequest,
            issues::IssueListResponse,
            issues::ReturnIssueResponse,
            issues::MyIssuesQuery,
            // Users
            users::UserListResponse,
            users::UpdateActive,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog and copy management"),
        (name = "categories", description = "Catalog taxonomy"),
        (name = "requests", description = "Borrow and donation request lifecycle"),
        (name = "issues", description = "Issuance ledger"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
