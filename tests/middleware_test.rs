//! Request guards and public routes, exercised without a live database.

use actix_session::{Session, SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpResponse, cookie::Key, http::StatusCode, test, web};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;

use consenso::auth::session;
use consenso::config::AppConfig;
use consenso::errors::AppError;
use consenso::handlers;
use consenso::models::user::{Role, User};
use consenso::storage::LocalBlobStore;

macro_rules! test_app {
    ($dir:expr) => {{
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://consenso@localhost/unused")
            .expect("lazy pool");
        let store = LocalBlobStore::new($dir.path(), b"middleware-test-key".to_vec());
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://consenso@localhost/unused".to_string()),
            _ => None,
        })
        .expect("config");

        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(store))
                .app_data(web::Data::new(config))
                .app_data(handlers::json_config())
                .app_data(handlers::query_config())
                .app_data(handlers::path_config())
                .route("/test-sign-in/member", web::get().to(sign_in_member))
                .configure(handlers::configure),
        )
        .await
    }};
}

/// Puts a MEMBER in the session without touching the database.
async fn sign_in_member(session: Session) -> Result<HttpResponse, AppError> {
    let user = User {
        id: 7,
        username: "member1".to_string(),
        email: "member1@example.com".to_string(),
        display_name: "Member One".to_string(),
        password_hash: String::new(),
        role: Role::Member,
        created_at: Utc::now(),
    };
    session::sign_in(&session, &user)?;
    Ok(HttpResponse::NoContent().finish())
}

fn header_str<B>(resp: &actix_web::dev::ServiceResponse<B>, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[actix_web::test]
async fn test_api_requires_session() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::get().uri("/api/proposals").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Authentication required");
}

#[actix_web::test]
async fn test_current_session_without_login_is_unauthorized() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::get().uri("/api/session").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_pages_redirect_to_login() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    for uri in ["/dashboard", "/consensus/1", "/proposals/1", "/workgroups/1"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(resp.headers().get("location").and_then(|v| v.to_str().ok()), Some("/login"));
    }
}

#[actix_web::test]
async fn test_root_redirects_to_dashboard() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get("location").and_then(|v| v.to_str().ok()), Some("/dashboard"));
}

#[actix_web::test]
async fn test_mutations_must_be_json() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::post()
        .uri("/api/proposals")
        .insert_header(("content-type", "text/plain"))
        .set_payload("title=hi")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post().uri("/api/session").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_raw_upload_skips_json_check_but_needs_session() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::post()
        .uri("/api/proposals/1/attachment?filename=a.pdf")
        .insert_header(("content-type", "application/pdf"))
        .set_payload("%PDF")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_malformed_json_login_is_a_validation_error() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::post()
        .uri("/api/session")
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"username": 42}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_logout_without_session_is_no_content() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::delete()
        .uri("/api/session")
        .insert_header(("content-type", "application/json"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_login_page_renders_form() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::get().uri("/login").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("csrf_token"));
    assert!(html.contains("Consenso"));
}

#[actix_web::test]
async fn test_login_form_rejects_bad_csrf() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "admin"), ("password", "admin123"), ("csrf_token", "forged")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_files_require_valid_signature() {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("abc-note.txt"), b"secret").expect("write blob");
    let app = test_app!(dir);

    let req = test::TestRequest::get()
        .uri("/files/abc-note.txt?expires=9999999999&signature=00ff")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get().uri("/files/abc-note.txt").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_signed_file_is_served() {
    use consenso::storage::BlobStore;

    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("abc-note.txt"), b"secret").expect("write blob");
    let signer = LocalBlobStore::new(dir.path(), b"middleware-test-key".to_vec());
    let signed = signer.get_signed_url("/files/abc-note.txt", 5).expect("sign");
    let app = test_app!(dir);

    let req = test::TestRequest::get().uri(&signed).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = header_str(&resp, "content-disposition");
    assert!(disposition.starts_with("attachment"), "{disposition}");
    assert!(disposition.contains("note.txt"), "{disposition}");
    let body = test::read_body(resp).await;
    assert_eq!(&body[..], b"secret");
}

#[actix_web::test]
async fn test_uploaded_html_is_downloaded_not_rendered() {
    use consenso::storage::BlobStore;

    let dir = TempDir::new().expect("temp dir");
    let signer = LocalBlobStore::new(dir.path(), b"middleware-test-key".to_vec());
    let url = signer
        .upload_file(b"<script>alert(document.cookie)</script>", "evil.html", "text/html")
        .await
        .expect("upload");
    let signed = signer.get_signed_url(&url, 5).expect("sign");
    let app = test_app!(dir);

    let req = test::TestRequest::get().uri(&signed).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let content_type = header_str(&resp, "content-type");
    assert!(!content_type.starts_with("text/html"), "{content_type}");
    assert_eq!(content_type, "application/octet-stream");

    let disposition = header_str(&resp, "content-disposition");
    assert!(disposition.starts_with("attachment"), "{disposition}");
    assert!(disposition.contains("evil.html"), "{disposition}");
    assert_eq!(header_str(&resp, "x-content-type-options"), "nosniff");
}

#[actix_web::test]
async fn test_consensus_controls_are_admin_only() {
    let dir = TempDir::new().expect("temp dir");
    let app = test_app!(dir);

    let req = test::TestRequest::get().uri("/test-sign-in/member").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let cookie = resp
        .response()
        .cookies()
        .next()
        .expect("session cookie")
        .into_owned();

    let attempts = [
        (test::TestRequest::post(), "/api/reports/1/rounds", "{}"),
        (
            test::TestRequest::put(),
            "/api/reports/1/consensus-status",
            r#"{"status": "CONSENSED"}"#,
        ),
        (test::TestRequest::put(), "/api/objections/1/status", r#"{"status": "VALIDA"}"#),
    ];
    for (builder, uri, body) in attempts {
        let req = builder
            .uri(uri)
            .cookie(cookie.clone())
            .insert_header(("content-type", "application/json"))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}
