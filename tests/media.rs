#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use quill::auth::{create_jwt, Role};
use quill::cache::{ResponseCache, SystemClock};
use quill::repo::inmem::InMemRepo;
use quill::routes::{config, AppState};
use quill::storage::FsMediaStore;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    std::env::set_var("QUILL_DATA_DIR", tempfile::tempdir().unwrap().path());
    std::env::set_var("QUILL_MEDIA_DIR", tempfile::tempdir().unwrap().path());
}

fn state() -> AppState {
    AppState {
        repo: Arc::new(InMemRepo::new()),
        media: Arc::new(FsMediaStore::new()),
        cache: Arc::new(ResponseCache::new(Duration::ZERO, Arc::new(SystemClock))),
    }
}

fn user_token() -> String {
    create_jwt("alice", "alice", vec![Role::User]).unwrap()
}

// Helper to build a multipart body with provided bytes and filename
fn build_multipart(file_name: &str, bytes: &[u8], boundary: &str) -> (String, Vec<u8>) {
    let mut body: Vec<u8> = Vec::new();
    let disp = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        boundary, file_name
    );
    body.extend_from_slice(disp.as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

// Minimal 1x1 PNG (transparent)
fn sample_png() -> Vec<u8> {
    vec![
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, // signature
        0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R', 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, b'I',
        b'D', b'A', b'T', 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A,
        0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
    ]
}

#[actix_web::test]
#[serial]
async fn upload_is_content_addressed_and_idempotent() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (ct, body) = build_multipart("pixel.png", &sample_png(), "XBOUNDARY");
    let req = test::TestRequest::post()
        .uri("/api/v1/media")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header(("Content-Type", ct.clone()))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let uploaded: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(uploaded["mime"], "image/png");
    assert_eq!(uploaded["duplicate"], false);
    let path = uploaded["path"].as_str().unwrap().to_string();
    assert!(path.starts_with("posts/"));

    // same bytes again: 200, flagged as duplicate, same path
    let req = test::TestRequest::post()
        .uri("/api/v1/media")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let again: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(again["duplicate"], true);
    assert_eq!(again["path"], path.as_str());

    // the stored bytes are served back under /media/<path>
    let req = test::TestRequest::get()
        .uri(&format!("/media/{path}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "image/png"
    );
    assert_eq!(test::read_body(resp).await.as_ref(), sample_png());
}

#[actix_web::test]
#[serial]
async fn upload_rejects_non_image_payloads() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (ct, body) = build_multipart("notes.txt", b"plain text, not an image", "XBOUNDARY");
    let req = test::TestRequest::post()
        .uri("/api/v1/media")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 415);
}

#[actix_web::test]
#[serial]
async fn upload_requires_identity() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (ct, body) = build_multipart("pixel.png", &sample_png(), "XBOUNDARY");
    let req = test::TestRequest::post()
        .uri("/api/v1/media")
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 302);
    assert_eq!(
        resp.headers().get("Location").unwrap(),
        "/auth/login?next=%2Fapi%2Fv1%2Fmedia"
    );

    let req = test::TestRequest::get()
        .uri("/media/posts/does-not-exist")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
#[serial]
async fn post_can_reference_an_uploaded_image() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (ct, body) = build_multipart("pixel.png", &sample_png(), "XBOUNDARY");
    let req = test::TestRequest::post()
        .uri("/api/v1/media")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let uploaded: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    let path = uploaded["path"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .set_json(serde_json::json!({"text":"with picture","group":null,"image":path}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 302);

    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let ctx: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    assert_eq!(ctx["page_obj"]["items"][0]["image"], path);
}

#[actix_web::test]
#[serial]
async fn moderating_a_post_removes_its_media() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let (ct, body) = build_multipart("pixel.png", &sample_png(), "XBOUNDARY");
    let req = test::TestRequest::post()
        .uri("/api/v1/media")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header(("Content-Type", ct))
        .set_payload(body)
        .to_request();
    let uploaded: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    let path = uploaded["path"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .set_json(serde_json::json!({"text":"takedown me","group":null,"image":path.as_str()}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 302);

    let req = test::TestRequest::get().uri("/api/v1/posts").to_request();
    let ctx: serde_json::Value =
        serde_json::from_slice(&test::read_body(test::call_service(&app, req).await).await).unwrap();
    let post_id = ctx["page_obj"]["items"][0]["id"].as_i64().unwrap();

    let admin = create_jwt("1", "admin", vec![Role::Admin]).unwrap();
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/posts/{post_id}"))
        .insert_header(("Authorization", format!("Bearer {admin}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);

    // the blob goes with the post
    let req = test::TestRequest::get()
        .uri(&format!("/media/{path}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
