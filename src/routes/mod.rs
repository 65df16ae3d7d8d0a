use actix_web::web;

use crate::error::AppError;
use crate::handlers;

pub mod leave;
pub mod overtime;
pub mod shifts;
pub mod slots;
pub mod swaps;

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Malformed bodies and query strings get the same envelope as other errors
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(handlers::health))
    .service(
        web::scope("/api/v1")
            .configure(shifts::configure)
            .configure(slots::configure)
            .configure(leave::configure)
            .configure(overtime::configure)
            .configure(swaps::configure),
    );
}
