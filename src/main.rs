use actix_web::{web, App, HttpResponse, HttpServer};
use service_layout::config::AppSettings;
use service_layout::core::events::{create_start_app_handler, create_stop_app_handler};
use service_layout::core::telemetry;
use service_layout::db::SessionProvider;
use service_layout::Result;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let settings = AppSettings::from_env().expect("Failed to load configuration");
    settings.validate().expect("Configuration validation failed");

    // Initialize tracing
    telemetry::init_tracing(&settings).expect("Failed to initialize tracing");

    tracing::info!("Starting {}", settings.title);
    tracing::info!("Environment: {}", settings.app_env);
    tracing::info!("Server binding to: {}", settings.server.bind_address());

    // Create database connection pool
    let db_pool = settings
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool initialized ({} connections)",
        settings.database.max_connections
    );

    let start_app = create_start_app_handler(&settings);
    start_app().await.expect("Startup handler failed");

    let sessions = SessionProvider::new(db_pool);
    let bind_address = settings.server.bind_address();
    let workers = settings.server.workers;
    let app_settings = web::Data::new(settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(sessions.clone()))
            .app_data(app_settings.clone())
            .route("/health", web::get().to(health_check))
            .route("/", web::get().to(index))
    })
    .workers(workers)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    let result = server.await;

    let stop_app = create_stop_app_handler();
    stop_app().await;

    result
}

async fn health_check(sessions: web::Data<SessionProvider>) -> Result<HttpResponse> {
    sessions.scope(|session| async move { session.ping().await }).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
    })))
}

async fn index(settings: web::Data<AppSettings>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "service": settings.title,
        "version": settings.version,
        "debug": settings.debug,
    }))
}
