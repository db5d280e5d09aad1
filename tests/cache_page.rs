#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use quill::auth::{create_jwt, Role};
use quill::cache::{ManualClock, ResponseCache};
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

fn state_with_clock(ttl_secs: u64) -> (Arc<ManualClock>, AppState) {
    let clock = Arc::new(ManualClock::new());
    let state = AppState {
        repo: Arc::new(InMemRepo::new()),
        media: Arc::new(FsMediaStore::new()),
        cache: Arc::new(ResponseCache::new(
            Duration::from_secs(ttl_secs),
            clock.clone(),
        )),
    };
    (clock, state)
}

fn publish_req(text: &str) -> actix_http::Request {
    let token = create_jwt("alice", "alice", vec![Role::User]).unwrap();
    test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(serde_json::json!({"text": text, "group": null, "image": null}))
        .to_request()
}

fn index_req() -> actix_http::Request {
    test::TestRequest::get().uri("/api/v1/posts").to_request()
}

#[actix_web::test]
#[serial]
async fn cached_index_is_byte_identical_until_expiry() {
    setup_env();
    let (clock, state) = state_with_clock(20);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state))
            .configure(config),
    )
    .await;

    assert_eq!(test::call_service(&app, publish_req("first post")).await.status(), 302);
    let before = test::read_body(test::call_service(&app, index_req()).await).await;

    // a write inside the window is invisible to repeat viewers
    assert_eq!(test::call_service(&app, publish_req("second post")).await.status(), 302);
    clock.advance(Duration::from_secs(19));
    let during = test::read_body(test::call_service(&app, index_req()).await).await;
    assert_eq!(before, during);

    // past the TTL the listing recomputes and picks it up
    clock.advance(Duration::from_secs(2));
    let after = test::read_body(test::call_service(&app, index_req()).await).await;
    assert_ne!(before, after);
    let ctx: serde_json::Value = serde_json::from_slice(&after).unwrap();
    assert_eq!(ctx["page_obj"]["items"][0]["text"], "second post");
}

#[actix_web::test]
#[serial]
async fn admin_cache_clear_forces_recompute() {
    setup_env();
    let (_clock, state) = state_with_clock(3600);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state))
            .configure(config),
    )
    .await;

    assert_eq!(test::call_service(&app, publish_req("stale")).await.status(), 302);
    let cached = test::read_body(test::call_service(&app, index_req()).await).await;

    assert_eq!(test::call_service(&app, publish_req("fresh")).await.status(), 302);
    let still_cached = test::read_body(test::call_service(&app, index_req()).await).await;
    assert_eq!(cached, still_cached);

    // clearing is admin-only
    let user_token = create_jwt("bob", "bob", vec![Role::User]).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/cache/clear")
        .insert_header(("Authorization", format!("Bearer {user_token}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let admin_token = create_jwt("1", "admin", vec![Role::Admin]).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/cache/clear")
        .insert_header(("Authorization", format!("Bearer {admin_token}")))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let body = test::read_body(test::call_service(&app, index_req()).await).await;
    let ctx: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(ctx["page_obj"]["items"][0]["text"], "fresh");
}

#[actix_web::test]
#[serial]
async fn cache_ignores_identity_and_query_string() {
    setup_env();
    let (_clock, state) = state_with_clock(3600);
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state))
            .configure(config),
    )
    .await;

    assert_eq!(test::call_service(&app, publish_req("only post")).await.status(), 302);
    let anon = test::read_body(test::call_service(&app, index_req()).await).await;

    // an authenticated request within the window gets the same bytes
    let token = create_jwt("bob", "bob", vec![Role::User]).unwrap();
    let req = test::TestRequest::get()
        .uri("/api/v1/posts")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(anon, test::read_body(resp).await);

    // the single cache entry does not vary on the page parameter
    let req = test::TestRequest::get()
        .uri("/api/v1/posts?page=2")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(anon, test::read_body(resp).await);
}
