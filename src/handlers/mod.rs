pub mod leave;
pub mod overtime;
pub mod shared;
pub mod shifts;
pub mod slots;
pub mod swaps;

use actix_web::HttpResponse;

pub use shared::ApiResponse;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}
