//! API integration tests
//!
//! These run against a live server with the dev seed applied
//! (users 1=librarian, 2=student, 3=faculty, 4=admin, 5=student):
//!
//!     cargo run &
//!     cargo test -- --ignored

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use circulation_server::models::user::{Role, UserClaims};

const BASE_URL: &str = "http://localhost:8080/api/v1";

const LIBRARIAN_ID: i64 = 1;
const STUDENT_ID: i64 = 2;
const FACULTY_ID: i64 = 3;
const STUDENT2_ID: i64 = 5;

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

/// Mint a token the way the identity service would
fn token(user_id: i64, role: Role) -> String {
    let now = Utc::now();
    let claims = UserClaims {
        sub: user_id.to_string(),
        user_id,
        role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    claims.create_token(&jwt_secret()).expect("Failed to mint token")
}

fn librarian_token() -> String {
    token(LIBRARIAN_ID, Role::Librarian)
}

fn student_token() -> String {
    token(STUDENT_ID, Role::Student)
}

/// Unique-enough ISBN so reruns against the same database do not collide
fn fresh_isbn() -> String {
    format!("978-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

/// Create a book and return its id
async fn create_book(client: &Client, total_copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(librarian_token())
        .json(&json!({
            "title": "Integration Test Book",
            "author": "Tester",
            "isbn": fresh_isbn(),
            "total_copies": total_copies
        }))
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book");
    body["id"].as_i64().expect("No book id")
}

async fn get_available_copies(client: &Client, book_id: i64) -> i64 {
    let body: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(librarian_token())
        .send()
        .await
        .expect("Failed to get book")
        .json()
        .await
        .expect("Failed to parse book");
    body["available_copies"].as_i64().expect("No available_copies")
}

async fn issue_copy(client: &Client, book_id: i64, borrower_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/issues", BASE_URL))
        .bearer_auth(librarian_token())
        .json(&json!({ "book_id": book_id, "borrower_id": borrower_id }))
        .send()
        .await
        .expect("Failed to send issue request")
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
async fn test_create_book_rejects_duplicate_isbn() {
    let client = Client::new();
    let isbn = fresh_isbn();

    let payload = json!({
        "title": "Dup",
        "isbn": isbn,
        "total_copies": 1
    });

    let first = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(librarian_token())
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(librarian_token())
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_create_book_requires_staff_role() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(student_token())
        .json(&json!({
            "title": "Forbidden",
            "isbn": fresh_isbn(),
            "total_copies": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

/// Scenario: total=2 -> issue, issue, issue. Two succeed, third is NoStock,
/// counter walks 2 -> 1 -> 0 and never below.
#[tokio::test]
#[ignore]
async fn test_issue_until_out_of_stock() {
    let client = Client::new();
    let book_id = create_book(&client, 2).await;

    let first = issue_copy(&client, book_id, STUDENT_ID).await;
    assert_eq!(first.status(), 201);
    let body: Value = first.json().await.expect("Failed to parse issue");
    assert_eq!(body["issue"]["status"], "ISSUED");
    let issued_at = body["issue"]["issued_at"].as_str().expect("No issued_at");
    let due_at = body["issue"]["due_at"].as_str().expect("No due_at");
    let issued_at: chrono::DateTime<Utc> = issued_at.parse().expect("Bad issued_at");
    let due_at: chrono::DateTime<Utc> = due_at.parse().expect("Bad due_at");
    assert_eq!(due_at - issued_at, Duration::days(15));
    assert_eq!(get_available_copies(&client, book_id).await, 1);

    let second = issue_copy(&client, book_id, FACULTY_ID).await;
    assert_eq!(second.status(), 201);
    assert_eq!(get_available_copies(&client, book_id).await, 0);

    let third = issue_copy(&client, book_id, STUDENT2_ID).await;
    assert_eq!(third.status(), 409);
    assert_eq!(get_available_copies(&client, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_issue_rejects_ineligible_role() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;

    let response = issue_copy(&client, book_id, LIBRARIAN_ID).await;
    assert_eq!(response.status(), 422);
    // no copy consumed
    assert_eq!(get_available_copies(&client, book_id).await, 1);
}

/// Scenario: return with a fine. Counter comes back, entry flips to
/// RETURNED, and a second return fails AlreadyReturned without a second
/// increment.
#[tokio::test]
#[ignore]
async fn test_return_with_fine_is_idempotency_guarded() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;

    let issued: Value = issue_copy(&client, book_id, STUDENT_ID)
        .await
        .json()
        .await
        .expect("Failed to parse issue");
    let issue_id = issued["issue"]["id"].as_i64().expect("No issue id");
    assert_eq!(get_available_copies(&client, book_id).await, 0);

    let returned = client
        .post(format!("{}/issues/{}/return", BASE_URL, issue_id))
        .bearer_auth(librarian_token())
        .json(&json!({ "fine_amount": "5.00" }))
        .send()
        .await
        .expect("Failed to send return");
    assert_eq!(returned.status(), 200);

    let body: Value = returned.json().await.expect("Failed to parse return");
    assert_eq!(body["issue"]["status"], "RETURNED");
    assert_eq!(body["issue"]["fine_amount"], "5.00");
    assert!(body["issue"]["returned_at"].is_string());
    assert_eq!(get_available_copies(&client, book_id).await, 1);

    // second return must lose
    let again = client
        .post(format!("{}/issues/{}/return", BASE_URL, issue_id))
        .bearer_auth(librarian_token())
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send return");
    assert_eq!(again.status(), 409);
    // and must not increment a second time
    assert_eq!(get_available_copies(&client, book_id).await, 1);
}

/// Concurrency: 10 racers for 3 copies. Exactly 3 succeed, 7 observe
/// NoStock, and the counter lands on 0.
#[tokio::test]
#[ignore]
async fn test_concurrent_issues_never_oversell() {
    let client = Client::new();
    let book_id = create_book(&client, 3).await;

    let racers: Vec<_> = (0..10)
        .map(|i| {
            let client = client.clone();
            let borrower = if i % 2 == 0 { STUDENT_ID } else { FACULTY_ID };
            async move { issue_copy(&client, book_id, borrower).await.status() }
        })
        .collect();

    let statuses = futures::future::join_all(racers).await;

    let created = statuses.iter().filter(|s| s.as_u16() == 201).count();
    let no_stock = statuses.iter().filter(|s| s.as_u16() == 409).count();

    assert_eq!(created, 3, "exactly one issue per copy: {:?}", statuses);
    assert_eq!(no_stock, 7);
    assert_eq!(get_available_copies(&client, book_id).await, 0);
}

/// Scenario: requesting a book with no stock fails up front
#[tokio::test]
#[ignore]
async fn test_request_fails_without_stock() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;
    assert_eq!(issue_copy(&client, book_id, FACULTY_ID).await.status(), 201);

    let response = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(student_token())
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

/// Scenario: a second pending request for the same book is a conflict
#[tokio::test]
#[ignore]
async fn test_duplicate_pending_request_conflicts() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;

    let first = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(student_token())
        .json(&json!({ "book_id": book_id, "remarks": "please" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(student_token())
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), 409);

    // another student is not blocked
    let other = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(token(STUDENT2_ID, Role::Student))
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(other.status(), 201);
}

/// Concurrent duplicate requests: two simultaneous creates by the same
/// student land exactly one PENDING row; the loser gets a conflict from the
/// partial unique index even when both pass the advisory pre-check.
#[tokio::test]
#[ignore]
async fn test_concurrent_duplicate_requests_leave_one_pending() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;

    let racers: Vec<_> = (0..2)
        .map(|_| {
            let client = client.clone();
            async move {
                client
                    .post(format!("{}/requests", BASE_URL))
                    .bearer_auth(student_token())
                    .json(&json!({ "book_id": book_id }))
                    .send()
                    .await
                    .expect("Failed to send request")
                    .status()
            }
        })
        .collect();

    let statuses = futures::future::join_all(racers).await;

    let created = statuses.iter().filter(|s| s.as_u16() == 201).count();
    let conflicts = statuses.iter().filter(|s| s.as_u16() == 409).count();
    assert_eq!(created, 1, "exactly one request may land: {:?}", statuses);
    assert_eq!(conflicts, 1);
}

/// Approval records the decision but does not issue a copy or touch stock
#[tokio::test]
#[ignore]
async fn test_approve_does_not_consume_stock() {
    let client = Client::new();
    let book_id = create_book(&client, 2).await;

    let request: Value = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(student_token())
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse request");
    let request_id = request["id"].as_i64().expect("No request id");

    let decided = client
        .post(format!("{}/requests/{}/decide", BASE_URL, request_id))
        .bearer_auth(librarian_token())
        .json(&json!({ "action": "approve", "remarks": "pick up at desk" }))
        .send()
        .await
        .expect("Failed to send decision");
    assert_eq!(decided.status(), 200);

    let body: Value = decided.json().await.expect("Failed to parse decision");
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["decided_by"].as_i64(), Some(LIBRARIAN_ID));
    assert_eq!(body["remarks"], "pick up at desk");

    // counter untouched; no ledger entry was created
    assert_eq!(get_available_copies(&client, book_id).await, 2);

    // the decision is terminal
    let again = client
        .post(format!("{}/requests/{}/decide", BASE_URL, request_id))
        .bearer_auth(librarian_token())
        .json(&json!({ "action": "REJECT" }))
        .send()
        .await
        .expect("Failed to send decision");
    assert_eq!(again.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_decide_rejects_unknown_action() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;

    let request: Value = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(student_token())
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse request");
    let request_id = request["id"].as_i64().expect("No request id");

    let response = client
        .post(format!("{}/requests/{}/decide", BASE_URL, request_id))
        .bearer_auth(librarian_token())
        .json(&json!({ "action": "ISSUE" }))
        .send()
        .await
        .expect("Failed to send decision");
    assert_eq!(response.status(), 400);
}

/// Scenario: cancel a pending request, then cancelling again is invalid
#[tokio::test]
#[ignore]
async fn test_cancel_pending_request_once() {
    let client = Client::new();
    let book_id = create_book(&client, 1).await;

    let request: Value = client
        .post(format!("{}/requests", BASE_URL))
        .bearer_auth(student_token())
        .json(&json!({ "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse request");
    let request_id = request["id"].as_i64().expect("No request id");

    // only the requester may cancel
    let forbidden = client
        .post(format!("{}/requests/{}/cancel", BASE_URL, request_id))
        .bearer_auth(token(STUDENT2_ID, Role::Student))
        .send()
        .await
        .expect("Failed to send cancel");
    assert_eq!(forbidden.status(), 403);

    let cancelled = client
        .post(format!("{}/requests/{}/cancel", BASE_URL, request_id))
        .bearer_auth(student_token())
        .send()
        .await
        .expect("Failed to send cancel");
    assert_eq!(cancelled.status(), 200);

    let body: Value = cancelled.json().await.expect("Failed to parse cancel");
    assert_eq!(body["status"], "CANCELLED");

    let again = client
        .post(format!("{}/requests/{}/cancel", BASE_URL, request_id))
        .bearer_auth(student_token())
        .send()
        .await
        .expect("Failed to send cancel");
    assert_eq!(again.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_list_pending_requests_fifo() {
    let client = Client::new();
    let first_book = create_book(&client, 1).await;
    let second_book = create_book(&client, 1).await;

    for book_id in [first_book, second_book] {
        let response = client
            .post(format!("{}/requests", BASE_URL))
            .bearer_auth(student_token())
            .json(&json!({ "book_id": book_id }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 201);
    }

    let response = client
        .get(format!("{}/requests/pending?per_page=100", BASE_URL))
        .bearer_auth(librarian_token())
        .send()
        .await
        .expect("Failed to list pending");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse list");
    let items = body["items"].as_array().expect("No items");
    assert!(items.len() >= 2);

    // oldest first
    let timestamps: Vec<&str> = items
        .iter()
        .map(|r| r["requested_at"].as_str().expect("No requested_at"))
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
#[ignore]
async fn test_student_cannot_list_other_students_requests() {
    let client = Client::new();

    let response = client
        .get(format!("{}/students/{}/requests", BASE_URL, STUDENT2_ID))
        .bearer_auth(student_token())
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let own = client
        .get(format!("{}/students/{}/requests", BASE_URL, STUDENT_ID))
        .bearer_auth(student_token())
        .send()
        .await
        .expect("Failed to send request");
    assert!(own.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_stats() {
    let client = Client::new();

    let response = client
        .get(format!("{}/stats", BASE_URL))
        .bearer_auth(librarian_token())
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["books_total"].is_number());
    assert!(body["requests_pending"].is_number());
    assert!(body["issues_active"].is_number());
    assert!(body["issues_overdue"].is_number());
}
