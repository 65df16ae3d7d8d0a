use crate::handlers::overtime;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/overtime")
            .route("", web::post().to(overtime::create_overtime))
            .route("", web::get().to(overtime::get_overtime_requests))
            .route("/{id}", web::get().to(overtime::get_overtime_request))
            .route("/{id}/status", web::post().to(overtime::update_overtime_status)),
    );
}
