//! API integration tests
//!
//! These tests run against a live server with seeded accounts:
//! an admin (admin@lectern.test / admin-password) and two verified members
//! (member1@lectern.test, member2@lectern.test / member-password).

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn login(client: &Client, email: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    login(client, "admin@lectern.test", "admin-password").await
}

async fn member_token(client: &Client, n: u32) -> String {
    login(client, &format!("member{}@lectern.test", n), "member-password").await
}

/// Unique suffix so repeated runs don't collide on titles
fn unique_suffix() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos()
}

/// Create a book with `copies` available copies; returns the book id
async fn create_book_with_copies(client: &Client, token: &str, title: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": title,
            "author": "Test Author",
            "published_year": 2001,
            "pages": 321
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse book response");
    let book_id = body["id"].as_i64().expect("No book ID");

    if copies > 0 {
        let response = client
            .post(format!("{}/books/{}/copies", BASE_URL, book_id))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "count": copies }))
            .send()
            .await
            .expect("Failed to add copies");
        assert_eq!(response.status(), 201);
    }

    book_id
}

async fn create_borrow_request(client: &Client, token: &str, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/requests/borrow", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to create borrow request")
}

async fn request_action(client: &Client, token: &str, request_id: i64, action: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/requests/{}/{}", BASE_URL, request_id, action))
        .header("Authorization", format!("Bearer {}", token))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request action")
}

async fn copy_counts(client: &Client, token: &str, book_id: i64) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to get book");
    let body: Value = response.json().await.expect("Failed to parse book");
    body["copies"].clone()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "admin@lectern.test",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_approve() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client, 1).await;

    let book_id = create_book_with_copies(
        &client,
        &admin,
        &format!("Forbidden Approve {}", unique_suffix()),
        1,
    )
    .await;

    let response = create_borrow_request(&client, &member, book_id).await;
    let request: Value = response.json().await.unwrap();
    let request_id = request["id"].as_i64().unwrap();

    let response = request_action(&client, &member, request_id, "approve", json!({})).await;
    assert_eq!(response.status(), 403);
}

/// Scenario A: one copy, approve reserves it, duplicate request is refused
#[tokio::test]
#[ignore]
async fn test_duplicate_borrow_request_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client, 1).await;

    let book_id =
        create_book_with_copies(&client, &admin, &format!("Scenario A {}", unique_suffix()), 1).await;

    let response = create_borrow_request(&client, &member, book_id).await;
    assert_eq!(response.status(), 201);
    let request: Value = response.json().await.unwrap();
    assert_eq!(request["status"], "pending");
    let request_id = request["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);
    let approved: Value = response.json().await.unwrap();
    assert_eq!(approved["status"], "approved");
    assert!(approved["reserved_copy_id"].is_i64());

    let counts = copy_counts(&client, &admin, book_id).await;
    assert_eq!(counts["reserved"], 1);
    assert_eq!(counts["available"], 0);

    // Second request by the same member for the same book
    let response = create_borrow_request(&client, &member, book_id).await;
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "DuplicateRequest");
}

/// Scenario B: a second member's request is created fine, but approving it
/// after the only copy is reserved fails with NoAvailableCopy
#[tokio::test]
#[ignore]
async fn test_second_approval_fails_without_copies() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member1 = member_token(&client, 1).await;
    let member2 = member_token(&client, 2).await;

    let book_id =
        create_book_with_copies(&client, &admin, &format!("Scenario B {}", unique_suffix()), 1).await;

    let response = create_borrow_request(&client, &member1, book_id).await;
    let request1: Value = response.json().await.unwrap();
    let request1_id = request1["id"].as_i64().unwrap();

    // No conflict at creation time: nothing is committed while pending
    let response = create_borrow_request(&client, &member2, book_id).await;
    assert_eq!(response.status(), 201);
    let request2: Value = response.json().await.unwrap();
    let request2_id = request2["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request1_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);

    let response = request_action(&client, &admin, request2_id, "approve", json!({})).await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "NoAvailableCopy");

    // The request stays pending and can be approved once a copy frees up
    let response = client
        .get(format!("{}/requests/{}", BASE_URL, request2_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "pending");
}

/// Scenario C: rejecting an approved request releases the copy
#[tokio::test]
#[ignore]
async fn test_reject_releases_reserved_copy() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member1 = member_token(&client, 1).await;
    let member2 = member_token(&client, 2).await;

    let book_id =
        create_book_with_copies(&client, &admin, &format!("Scenario C {}", unique_suffix()), 1).await;

    let response = create_borrow_request(&client, &member1, book_id).await;
    let request1: Value = response.json().await.unwrap();
    let request1_id = request1["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request1_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);

    let response = request_action(&client, &admin, request1_id, "reject", json!({})).await;
    assert_eq!(response.status(), 200);
    let rejected: Value = response.json().await.unwrap();
    assert!(rejected["released_copy_id"].is_i64());

    let counts = copy_counts(&client, &admin, book_id).await;
    assert_eq!(counts["available"], 1);
    assert_eq!(counts["reserved"], 0);

    // The freed copy can now serve another member's request
    let response = create_borrow_request(&client, &member2, book_id).await;
    let request2: Value = response.json().await.unwrap();
    let request2_id = request2["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request2_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);
}

/// Scenario D: donation dedup by exact (title, author) match
#[tokio::test]
#[ignore]
async fn test_donation_dedup_by_exact_title_author() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client, 1).await;

    let title = format!("Scenario D {}", unique_suffix());

    // First donation: creates the book with 2 copies
    let response = client
        .post(format!("{}/requests/donation", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "title": title, "author": "Author Z", "year": 2010, "pages": 100 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let request1: Value = response.json().await.unwrap();
    let request1_id = request1["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request1_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);

    let response =
        request_action(&client, &admin, request1_id, "complete", json!({ "copies_to_add": 2 })).await;
    assert_eq!(response.status(), 200);
    let completed1: Value = response.json().await.unwrap();
    assert_eq!(completed1["book_created"], true);
    assert_eq!(completed1["copies_added"], 2);
    let book_id = completed1["book_id"].as_i64().unwrap();

    // Second donation with identical title/author: reuses the book
    let response = client
        .post(format!("{}/requests/donation", BASE_URL))
        .header("Authorization", format!("Bearer {}", member))
        .json(&json!({ "title": title, "author": "Author Z" }))
        .send()
        .await
        .unwrap();
    let request2: Value = response.json().await.unwrap();
    let request2_id = request2["id"].as_i64().unwrap();

    request_action(&client, &admin, request2_id, "approve", json!({})).await;
    let response =
        request_action(&client, &admin, request2_id, "complete", json!({ "copies_to_add": 1 })).await;
    assert_eq!(response.status(), 200);
    let completed2: Value = response.json().await.unwrap();
    assert_eq!(completed2["book_created"], false);
    assert_eq!(completed2["book_id"].as_i64().unwrap(), book_id);

    let counts = copy_counts(&client, &admin, book_id).await;
    assert_eq!(counts["total"], 3);
    assert_eq!(counts["available"], 3);
}

/// Full round trip: approve -> collect -> request_return -> confirm_return.
/// The copy ends exactly where it started and the issue is closed.
#[tokio::test]
#[ignore]
async fn test_borrow_round_trip() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client, 1).await;

    let book_id =
        create_book_with_copies(&client, &admin, &format!("Round Trip {}", unique_suffix()), 1).await;

    let response = create_borrow_request(&client, &member, book_id).await;
    let request: Value = response.json().await.unwrap();
    let request_id = request["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);

    let response = request_action(&client, &admin, request_id, "collect", json!({})).await;
    assert_eq!(response.status(), 200);
    let collected: Value = response.json().await.unwrap();
    let issue_id = collected["issue_id"].as_i64().unwrap();
    assert!(collected["due_date"].is_string());

    let counts = copy_counts(&client, &admin, book_id).await;
    assert_eq!(counts["issued"], 1);

    let response = request_action(&client, &member, request_id, "return-request", json!({})).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "return_requested");

    let response = request_action(
        &client,
        &admin,
        request_id,
        "confirm-return",
        json!({ "condition": "available" }),
    )
    .await;
    assert_eq!(response.status(), 200);
    let returned: Value = response.json().await.unwrap();
    assert_eq!(returned["status"], "completed");
    assert_eq!(returned["copy_status"], "available");

    // Conservation: the copy is back where it started
    let counts = copy_counts(&client, &admin, book_id).await;
    assert_eq!(counts["total"], 1);
    assert_eq!(counts["available"], 1);

    // Exactly one closed issue remains
    let response = client
        .get(format!("{}/issues/{}", BASE_URL, issue_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let issue: Value = response.json().await.unwrap();
    assert!(issue["return_date"].is_string());
    assert_eq!(issue["is_overdue"], false);
}

/// Approving twice must fail on the second call and never reserve a second copy
#[tokio::test]
#[ignore]
async fn test_double_approve_is_rejected() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client, 1).await;

    let book_id =
        create_book_with_copies(&client, &admin, &format!("Double Approve {}", unique_suffix()), 2).await;

    let response = create_borrow_request(&client, &member, book_id).await;
    let request: Value = response.json().await.unwrap();
    let request_id = request["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);

    let response = request_action(&client, &admin, request_id, "approve", json!({})).await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "InvalidTransition");
    assert_eq!(body["details"]["current"], "approved");

    let counts = copy_counts(&client, &admin, book_id).await;
    assert_eq!(counts["reserved"], 1);
    assert_eq!(counts["available"], 1);
}

/// Cancellation is allowed only while pending
#[tokio::test]
#[ignore]
async fn test_cancel_only_while_pending() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let member = member_token(&client, 1).await;

    let book_id =
        create_book_with_copies(&client, &admin, &format!("Cancel {}", unique_suffix()), 1).await;

    let response = create_borrow_request(&client, &member, book_id).await;
    let request: Value = response.json().await.unwrap();
    let request_id = request["id"].as_i64().unwrap();

    let response = request_action(&client, &admin, request_id, "approve", json!({})).await;
    assert_eq!(response.status(), 200);

    let response = client
        .delete(format!("{}/requests/{}", BASE_URL, request_id))
        .header("Authorization", format!("Bearer {}", member))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
}

/// Direct walk-in issuance and the admin-direct return path
#[tokio::test]
#[ignore]
async fn test_direct_issue_and_double_return() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let book_id =
        create_book_with_copies(&client, &admin, &format!("Walk-in {}", unique_suffix()), 1).await;

    let response = client
        .get(format!("{}/books/{}/copies", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .unwrap();
    let copies: Value = response.json().await.unwrap();
    let copy_id = copies[0]["id"].as_i64().unwrap();

    // Need the walk-in member's id
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header(
            "Authorization",
            format!("Bearer {}", member_token(&client, 2).await),
        )
        .send()
        .await
        .unwrap();
    let member: Value = response.json().await.unwrap();
    let member_id = member["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/issues", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "member_id": member_id, "copy_id": copy_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let issue: Value = response.json().await.unwrap();
    let issue_id = issue["id"].as_i64().unwrap();
    assert_eq!(issue["origin"], "direct");

    let response = client
        .post(format!("{}/issues/{}/return", BASE_URL, issue_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "condition": "damaged" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let returned: Value = response.json().await.unwrap();
    assert_eq!(returned["copy_status"], "damaged");

    // Returning the same issue twice must fail
    let response = client
        .post(format!("{}/issues/{}/return", BASE_URL, issue_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "condition": "available" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "AlreadyReturned");
}
