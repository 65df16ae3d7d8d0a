use crate::handlers::slots;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/slots")
            .route("", web::get().to(slots::get_slots))
            .route("/generate", web::post().to(slots::generate_slots))
            .route("/{id}/book", web::post().to(slots::book_slot))
            .route("/{id}/cancel", web::post().to(slots::cancel_booking))
            .route("/{id}/block", web::post().to(slots::toggle_block)),
    );
}
