use crate::handlers::swaps;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/swaps")
            .route("", web::post().to(swaps::create_swap))
            .route("", web::get().to(swaps::get_swaps))
            .route("/{id}", web::get().to(swaps::get_swap))
            .route("/{id}/respond", web::post().to(swaps::respond_to_swap))
            .route("/{id}/decide", web::post().to(swaps::decide_swap)),
    );
}
