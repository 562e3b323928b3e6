//! Integration tests for the text and file write paths.

mod common;

use axum::http::StatusCode;
use common::*;
use pastebox::config::RecordStoreKind;

#[tokio::test]
async fn anonymous_text_upload_is_rejected_when_login_required() {
    let server = TestServer::new().await;

    let response = server
        .send(form_request("/text", "input=hello", None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(server.stored_files().is_empty());
    assert!(server.state.uploads().latest(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_file_upload_is_rejected_when_login_required() {
    let server = TestServer::new().await;

    let response = server
        .send(multipart_request("notes.txt", b"hi", None, None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(server.stored_files().is_empty());
}

#[tokio::test]
async fn text_upload_creates_record_file_and_link() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .send(form_request("/text", "input=hello+world", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;

    let records = server.state.uploads().latest(10).await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record.title, record.file_path);
    assert_eq!(record.uploader, TEST_USER);
    assert!(record.file_path.ends_with(".txt"));
    assert_eq!(record.file_path.len(), 12);

    let contents = std::fs::read(server.uploads_dir.join(&record.file_path)).unwrap();
    assert_eq!(contents, b"hello world");

    assert!(body.contains(&format!("http://paste.test/t/{}", record.id)));
}

#[tokio::test]
async fn text_upload_keeps_supplied_title() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .send(form_request(
            "/text",
            "input=fn+main()+{}&title=Snippet",
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let records = server.state.uploads().latest(10).await.unwrap();
    assert_eq!(records[0].title, "Snippet");
}

#[tokio::test]
async fn empty_or_missing_input_is_bad_request() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    for body in ["input=", "title=only-a-title"] {
        let response = server.send(form_request("/text", body, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    assert!(server.stored_files().is_empty());
}

#[tokio::test]
async fn file_upload_uses_sanitized_basename() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .send(multipart_request(
            "../../etc/passwd",
            b"root:x:0:0",
            None,
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(server.stored_files(), vec!["passwd".to_string()]);
    let records = server.state.uploads().latest(10).await.unwrap();
    assert_eq!(records[0].file_path, "passwd");
    assert_eq!(records[0].title, "passwd");

    let body = body_string(response).await;
    assert!(body.contains(&format!("http://paste.test/u/{}", records[0].id)));
}

#[tokio::test]
async fn text_files_link_to_text_page() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .send(multipart_request(
            "notes.txt",
            b"plain text",
            Some("My notes"),
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let records = server.state.uploads().latest(10).await.unwrap();
    assert_eq!(records[0].title, "My notes");
    let body = body_string(response).await;
    assert!(body.contains(&format!("http://paste.test/t/{}", records[0].id)));
}

#[tokio::test]
async fn dot_dot_filename_is_bad_request() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .send(multipart_request("..", b"x", None, Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.stored_files().is_empty());
}

#[tokio::test]
async fn duplicate_file_name_conflicts() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let first = server
        .send(multipart_request("photo.png", b"one", None, Some(&cookie)))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = server
        .send(multipart_request("photo.png", b"two", None, Some(&cookie)))
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let contents = std::fs::read(server.uploads_dir.join("photo.png")).unwrap();
    assert_eq!(contents, b"one");
    assert_eq!(server.state.uploads().latest(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let server = TestServer::with_config(|config| {
        config.uploads.max_file_size_bytes = 1024;
    })
    .await;
    let cookie = server.login().await;

    let response = server
        .send(multipart_request(
            "big.bin",
            &vec![0u8; 4096],
            None,
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(server.stored_files().is_empty());
}

#[tokio::test]
async fn body_over_hard_limit_is_rejected() {
    let server = TestServer::with_config(|config| {
        config.uploads.max_file_size_bytes = 1024;
    })
    .await;
    let cookie = server.login().await;

    let response = server
        .send(multipart_request(
            "huge.bin",
            &vec![0u8; 256 * 1024],
            None,
            Some(&cookie),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(server.stored_files().is_empty());
}

#[tokio::test]
async fn missing_file_part_is_bad_request() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nno file\r\n--{BOUNDARY}--\r\n"
    );
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/files")
        .header(
            axum::http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(axum::http::header::COOKIE, &cookie)
        .body(axum::body::Body::from(body))
        .unwrap();

    let response = server.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_uploads_when_login_not_required() {
    let server = TestServer::with_config(|config| {
        config.uploads.require_login = false;
    })
    .await;

    let form = server.send(get_request("/text", None)).await;
    assert_eq!(form.status(), StatusCode::OK);

    let response = server
        .send(form_request("/text", "input=anonymous+note", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let records = server.state.uploads().latest(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].uploader, "");
}

#[tokio::test]
async fn memory_record_store_serves_the_same_flow() {
    let server = TestServer::with_config(|config| {
        config.storage.record_store = RecordStoreKind::Memory;
    })
    .await;
    let cookie = server.login().await;

    let response = server
        .send(form_request("/text", "input=in+memory", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("http://paste.test/t/1"));

    let page = server.send(get_request("/t/1", None)).await;
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_string(page).await.contains("in memory"));
}
