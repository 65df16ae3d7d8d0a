use crate::handlers::leave;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leave")
            .route("", web::post().to(leave::submit_leave))
            .route("", web::get().to(leave::get_leave_requests))
            .route("/{id}", web::get().to(leave::get_leave_request))
            .route("/{id}/process", web::post().to(leave::process_leave))
            .route("/{id}/cancel", web::post().to(leave::cancel_leave)),
    );
}
