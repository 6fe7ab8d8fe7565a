pub mod attachments;
pub mod comments;
pub mod objections;
pub mod proposals;
pub mod reports;
pub mod session;
pub mod users;
pub mod votes;
pub mod workgroups;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    middleware::Next,
    web,
};

use crate::auth::middleware::require_api_auth;
use crate::templates_structs::ApiErrorResponse;

/// Mutations that carry a raw body instead of JSON.
fn is_raw_upload(req: &ServiceRequest) -> bool {
    req.method() == Method::POST && req.path().ends_with("/attachment")
}

/// CSRF protection for REST API mutation endpoints.
///
/// Rejects POST/PUT/PATCH/DELETE requests that don't have
/// Content-Type: application/json. Browsers cannot send cross-origin JSON
/// with cookies via a simple form POST. GET requests are exempt.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if (method == Method::POST
        || method == Method::PUT
        || method == Method::PATCH
        || method == Method::DELETE)
        && !is_raw_upload(&req)
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Content-Type must be application/json for mutation requests".to_string(),
                details: None,
            });
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure everything under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            // Session: login is the only unauthenticated API call
            .route("/session", web::get().to(session::current))
            .route("/session", web::post().to(session::login))
            .route("/session", web::delete().to(session::logout))
            .service(
                web::scope("")
                    .wrap(actix_web::middleware::from_fn(require_api_auth))
                    .configure(configure_protected),
            ),
    );
}

fn configure_protected(cfg: &mut web::ServiceConfig) {
    cfg
        // Users (admin)
        .route("/users", web::get().to(users::list))
        .route("/users", web::post().to(users::create))
        // Quarterly reports
        .route("/quarterly-reports", web::get().to(reports::list))
        .route("/quarterly-reports", web::post().to(reports::create))
        .route("/quarterly-reports/{id}", web::get().to(reports::read))
        // Consensus
        .route("/reports/{id}/votes", web::get().to(votes::list))
        .route("/reports/{id}/votes", web::post().to(votes::cast))
        .route("/reports/{id}/rounds", web::post().to(votes::open_round))
        .route("/reports/{id}/consensus-status", web::put().to(votes::set_consensus_status))
        .route("/reports/{id}/comments", web::get().to(comments::list_for_report))
        .route("/reports/{id}/comments", web::post().to(comments::create_for_report))
        .route("/objections/{id}/status", web::put().to(objections::resolve))
        // Comments
        .route("/comments/{id}/like", web::post().to(comments::like))
        .route("/comments/{id}/dislike", web::post().to(comments::dislike))
        .route("/comments/{id}", web::delete().to(comments::delete))
        // Proposals
        .route("/proposals", web::get().to(proposals::list))
        .route("/proposals", web::post().to(proposals::create))
        .route("/proposals/{id}", web::get().to(proposals::read))
        .route("/proposals/{id}", web::patch().to(proposals::update))
        .route("/proposals/{id}/vote", web::post().to(proposals::vote))
        .route("/proposals/{id}/comment", web::get().to(comments::list_for_proposal))
        .route("/proposals/{id}/comment", web::post().to(comments::create_for_proposal))
        .route("/proposals/{id}/attachment", web::post().to(attachments::upload))
        .route("/proposals/{id}/attachment", web::delete().to(attachments::delete))
        .route("/proposals/{id}/attachment/url", web::get().to(attachments::signed_url))
        // Workgroups
        .route("/workgroups", web::get().to(workgroups::list))
        .route("/workgroups", web::post().to(workgroups::create))
        .route("/workgroups/{id}", web::get().to(workgroups::read))
        .route("/workgroups/{id}/members", web::get().to(workgroups::members))
        .route("/workgroups/{id}/join-request", web::get().to(workgroups::own_join_request))
        .route("/workgroups/{id}/join-request", web::post().to(workgroups::file_join_request))
        .route("/workgroups/{id}/join-requests", web::get().to(workgroups::pending_join_requests))
        .route("/workgroups/{id}/quarterly-reports", web::get().to(workgroups::reports))
        .route("/workgroups/{id}/add-member", web::post().to(workgroups::add_member))
        .route("/join-requests/{id}", web::put().to(workgroups::resolve_join_request));
}
