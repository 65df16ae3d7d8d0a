use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Result;

use clinic_roster::config::StoreKind;
use clinic_roster::database::init_database;
use clinic_roster::middleware::RequestId;
use clinic_roster::services::{
    LeavePolicy, LogNotificationSink, NotificationSink, Notifier, OutboxNotificationSink,
};
use clinic_roster::{AppState, Config, Repositories, routes};

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env when present)
    let config = Config::from_env()?;

    env_logger::init();

    log::info!(
        "Starting clinic-roster (environment: {}, store: {:?})",
        config.environment,
        config.store
    );

    let (repos, sink): (Repositories, Arc<dyn NotificationSink>) = match config.store {
        StoreKind::Postgres => {
            let pool = init_database(&config.database_url).await?;
            log::info!("Database initialized");
            let sink: Arc<dyn NotificationSink> =
                Arc::new(OutboxNotificationSink::new(pool.clone()));
            (Repositories::postgres(pool), sink)
        }
        StoreKind::Memory => {
            log::warn!("Using the in-memory store; data is lost on shutdown");
            let sink: Arc<dyn NotificationSink> = Arc::new(LogNotificationSink);
            (Repositories::in_memory(), sink)
        }
    };

    let policy = LeavePolicy {
        block_booked_slots: config.leave_blocks_booked_slots,
    };
    let app_state = web::Data::new(AppState::new(repos, policy, Notifier::new(sink)));
    let config_data = web::Data::new(config.clone());

    let server_address = config.server_address();
    let allowed_origin = config.client_base_url.clone();
    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(config_data.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&allowed_origin)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(Logger::new(
                r#"%a "%r" %s %b %T correlation_id=%{x-correlation-id}o"#,
            ))
            .wrap(RequestId)
            .configure(routes::configure)
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
