mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use helpers::auth::bearer;
use helpers::{setup_test_app, PUBLIC_BASE_URL};
use portrait_core::constants::MAX_IMAGE_BYTES;

const UPLOAD_PATH: &str = "/api/images/upload";

// 1x1 PNG
const PNG_DATA: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 dimensions
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, //
    0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT chunk
    0x08, 0xD7, 0x63, 0xF8, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, //
    0x00, 0x18, 0xDD, 0x8D, 0x89, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, //
    0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82, // IEND chunk
];

fn file_form(data: Vec<u8>, file_name: &str, mime: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data).file_name(file_name).mime_type(mime),
    )
}

#[tokio::test]
async fn test_upload_requires_auth() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(UPLOAD_PATH)
        .multipart(file_form(PNG_DATA.to_vec(), "me.png", "image/png"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "unauthorized");
    assert!(app.storage.puts().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_invalid_token() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer("not-a-jwt"))
        .multipart(file_form(PNG_DATA.to_vec(), "me.png", "image/png"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_image() {
    let app = setup_test_app().await;
    let user_id = app.profiles.insert_user(None);
    let token = app.token_for(user_id);

    let response = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .multipart(file_form(PNG_DATA.to_vec(), "me.png", "image/png"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let url = body["url"].as_str().unwrap();
    let expected_prefix = format!("{}/profile-images/{}-", PUBLIC_BASE_URL, user_id);
    assert!(url.starts_with(&expected_prefix), "unexpected url {}", url);
    assert!(url.ends_with(".png"));

    let puts = app.storage.puts();
    assert_eq!(puts.len(), 1);
    assert!(url.ends_with(&puts[0]));
}

#[tokio::test]
async fn test_upload_twice_yields_distinct_urls() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let mut urls = Vec::new();
    for _ in 0..2 {
        let response = app
            .client()
            .post(UPLOAD_PATH)
            .add_header("Authorization", bearer(&token))
            .multipart(file_form(PNG_DATA.to_vec(), "me.png", "image/png"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        urls.push(body["url"].as_str().unwrap().to_string());
    }

    assert_ne!(urls[0], urls[1]);
}

#[tokio::test]
async fn test_upload_without_file() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let form = MultipartForm::new().add_text("name", "me");
    let response = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .multipart(form)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "No file provided");
}

#[tokio::test]
async fn test_upload_rejects_disallowed_type() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();
    let response = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .multipart(file_form(gif, "anim.gif", "image/gif"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(
        body["message"],
        "Invalid file type. Only JPG, PNG, and WebP are allowed."
    );
    assert!(app.storage.puts().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_mislabeled_content() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let response = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .multipart(file_form(b"<html>not an image</html>".to_vec(), "me.png", "image/png"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "invalidInput");
    assert!(app.storage.puts().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_file_over_limit() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let mut data = PNG_DATA.to_vec();
    data.resize(MAX_IMAGE_BYTES as usize + 1, 0);

    let response = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .multipart(file_form(data, "big.png", "image/png"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "File too large. Maximum size is 5MB.");
    assert!(app.storage.puts().is_empty());
}

#[tokio::test]
async fn test_upload_storage_failure() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));
    app.storage.set_offline(true);

    let response = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .multipart(file_form(PNG_DATA.to_vec(), "me.png", "image/png"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Failed to upload image");
    assert!(!body.to_string().contains("bucket offline"));
}

#[tokio::test]
async fn test_delete_uploaded_image() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let upload = app
        .client()
        .post(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .multipart(file_form(PNG_DATA.to_vec(), "me.png", "image/png"))
        .await;
    upload.assert_status(StatusCode::CREATED);
    let url = upload.json::<serde_json::Value>()["url"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .client()
        .delete(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .add_query_param("url", &url)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(app.storage.deletes(), app.storage.puts());
}

#[tokio::test]
async fn test_delete_missing_object_succeeds() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));
    let url = format!("{}/profile-images/gone-1-abcdefg.jpg", PUBLIC_BASE_URL);

    let response = app
        .client()
        .delete(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .add_query_param("url", &url)
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_delete_foreign_url_never_reaches_storage() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let response = app
        .client()
        .delete(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .add_query_param("url", "https://evil.example.com/profile-images/x.jpg")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Invalid URL");
    assert!(app.storage.deletes().is_empty());
}

#[tokio::test]
async fn test_delete_without_url() {
    let app = setup_test_app().await;
    let token = app.token_for(app.profiles.insert_user(None));

    let response = app
        .client()
        .delete(UPLOAD_PATH)
        .add_header("Authorization", bearer(&token))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "No image URL provided");
}
