use actix_files::Files;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

use chaitin::config::Config;
use chaitin::db::Database;
use chaitin::{AppState, configure_app, mail, templates};

/// How often expired login sessions are purged
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).expect("Failed to initialize database");
    let db = Arc::new(db);

    log::info!("Compiling templates");
    let templates = Arc::new(templates::build_templates().expect("Failed to compile templates"));

    log::info!("Using {} mail backend", config.email.backend);
    let mailer = mail::create_mailer(&config);

    // Session cleanup background task
    let cleanup_db = Arc::clone(&db);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            match cleanup_db.cleanup_expired_sessions() {
                Ok(0) => {}
                Ok(n) => log::info!("Removed {} expired sessions", n),
                Err(e) => log::error!("Failed to clean up sessions: {}", e),
            }
        }
    });

    let static_dir = config.static_dir.clone();
    if !std::path::Path::new(&static_dir).exists() {
        log::warn!("Static directory {} not found - stylesheets will 404", static_dir);
    }

    log::info!(
        "Starting {} on port {} (canonical host {})",
        config.project_name,
        port,
        config.canonical_host
    );

    let state = web::Data::new(AppState {
        db,
        config,
        templates,
        mailer,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure_app)
            .service(Files::new("/static", static_dir.clone()))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
