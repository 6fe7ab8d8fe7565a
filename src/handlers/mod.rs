pub mod api;
pub mod auth_handlers;
pub mod page_handlers;

use chrono::{NaiveDate, Utc};

/// The calendar day used for deadline checks.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn see_other(location: &str) -> actix_web::HttpResponse {
    actix_web::HttpResponse::SeeOther()
        .insert_header(("Location", location))
        .finish()
}

/// Malformed JSON bodies answer with the same JSON error shape as every other 400.
pub fn json_config() -> actix_web::web::JsonConfig {
    actix_web::web::JsonConfig::default()
        .limit(1024 * 1024)
        .error_handler(|err, _req| crate::errors::AppError::Validation(err.to_string()).into())
}

pub fn query_config() -> actix_web::web::QueryConfig {
    actix_web::web::QueryConfig::default()
        .error_handler(|err, _req| crate::errors::AppError::Validation(err.to_string()).into())
}

pub fn path_config() -> actix_web::web::PathConfig {
    actix_web::web::PathConfig::default()
        .error_handler(|_err, _req| crate::errors::AppError::NotFound.into())
}

/// Every route of the application. Session middleware and app data are set up by the caller.
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    use actix_web::web;

    cfg
        // Public routes
        .route("/login", web::get().to(auth_handlers::login_page))
        .route("/login", web::post().to(auth_handlers::login_submit))
        .route("/files/{key}", web::get().to(crate::storage::serve_file))
        .route("/", web::get().to(|| async { see_other("/dashboard") }))
        .configure(api::configure)
        // Protected pages
        .service(
            web::scope("")
                .wrap(actix_web::middleware::from_fn(crate::auth::middleware::require_auth))
                .route("/logout", web::post().to(auth_handlers::logout))
                .route("/dashboard", web::get().to(page_handlers::dashboard))
                .route("/consensus/{report_id}", web::get().to(page_handlers::consensus_page))
                .route("/proposals/{id}", web::get().to(page_handlers::proposal_page))
                .route("/workgroups/{id}", web::get().to(page_handlers::workgroup_page)),
        );
}
