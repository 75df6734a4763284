//! API integration tests
//!
//! Run against a live server with: cargo test -- --ignored

use readshelf_server::models::UserClaims;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8080/api/v1";

const SAMPLE_EXPORT: &str = "\
Book Id,Title,Author,Author l-f,ISBN,ISBN13,My Rating,Exclusive Shelf,Bookshelves,Date Added
1,\"Harry Potter and the Chamber of Secrets (Harry Potter, #2)\",J.K. Rowling,\"Rowling, J.K.\",=\"0439064872\",=\"9780439064873\",5,read,fantasy,2019/12/24
2,Dune,\"Herbert, Frank\",\"Herbert, Frank\",,,4,currently-reading,\"science-fiction, favorites\",2020/01/05
3,,Jane Austen,\"Austen, Jane\",,,0,to-read,,2021/03/01
";

/// Token for a fresh user so runs do not see each other's books
fn auth_token() -> (i64, String) {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    let now = chrono::Utc::now();
    let user_id = now.timestamp_nanos_opt().unwrap_or_default() % 1_000_000_000;
    let claims = UserClaims {
        sub: format!("reader-{}", user_id),
        user_id,
        exp: now.timestamp() + 3600,
        iat: now.timestamp(),
    };
    (user_id, claims.create_token(&secret).expect("Failed to create token"))
}

fn csv_form(file_name: &str, contents: &str) -> Form {
    let part = Part::bytes(contents.as_bytes().to_vec())
        .file_name(file_name.to_string())
        .mime_str("text/csv")
        .expect("Invalid mime type");
    Form::new().part("file", part)
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
async fn test_import_requires_authentication() {
    let client = Client::new();

    let response = client
        .post(format!("{}/imports/goodreads", BASE_URL))
        .multipart(csv_form("library.csv", SAMPLE_EXPORT))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_preview_returns_normalized_rows() {
    let client = Client::new();
    let (_, token) = auth_token();

    let response = client
        .post(format!("{}/imports/goodreads", BASE_URL))
        .bearer_auth(&token)
        .multipart(csv_form("library.csv", SAMPLE_EXPORT).text("previewOnly", "true"))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["totalRows"], 3);
    assert_eq!(body["candidates"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["candidates"][0]["title"], "Harry Potter and the Chamber of Secrets");
    assert_eq!(body["candidates"][0]["series"], "Harry Potter");
    assert_eq!(body["candidates"][0]["seriesNumber"], 2);
    assert_eq!(body["candidates"][1]["author"], "Frank Herbert");
    assert_eq!(body["candidates"][1]["readingStatus"], "currently-reading");
    assert_eq!(body["diagnostics"]["errors"][0]["rowIndex"], 2);
}

#[tokio::test]
#[ignore]
async fn test_rejects_non_csv_upload() {
    let client = Client::new();
    let (_, token) = auth_token();

    let response = client
        .post(format!("{}/imports/goodreads", BASE_URL))
        .bearer_auth(&token)
        .multipart(csv_form("library.xlsx", SAMPLE_EXPORT))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_rejects_file_without_valid_rows() {
    let client = Client::new();
    let (_, token) = auth_token();

    let response = client
        .post(format!("{}/imports/goodreads", BASE_URL))
        .bearer_auth(&token)
        .multipart(csv_form("library.csv", "Title,Author\n,Nobody\n"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["message"].as_str().unwrap_or_default().contains("No valid rows"));
}

#[tokio::test]
#[ignore]
async fn test_import_streams_progress_and_records_history() {
    let client = Client::new();
    let (_, token) = auth_token();

    let response = client
        .post(format!("{}/imports/goodreads", BASE_URL))
        .bearer_auth(&token)
        .multipart(csv_form("library.csv", SAMPLE_EXPORT).text("createCollections", "true"))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap_or_default(),
        "application/x-ndjson"
    );

    let text = response.text().await.expect("Failed to read stream");
    let events: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid NDJSON line"))
        .collect();

    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["type"], "progress");
    assert_eq!(events[0]["current"], 1);
    assert_eq!(events[1]["current"], 2);
    assert_eq!(events[2]["type"], "complete");
    assert_eq!(events[2]["result"]["imported"], 2);
    assert_eq!(events[2]["result"]["totalProcessed"], 2);

    let history: Value = client
        .get(format!("{}/imports/history?limit=5", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(history[0]["source"], "goodreads-csv");
    assert_eq!(history[0]["success_count"], 2);
}
