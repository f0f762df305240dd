use actix_web::{HttpResponse, Responder, web};

use crate::AppState;

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
    cfg.service(web::resource("/api/version").route(web::get().to(get_version)));
}

/// Reports "degraded" with 503 when the database does not answer
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    match state.db.count_subscriptions() {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "version": VERSION
        })),
        Err(e) => {
            log::error!("Health check database query failed: {}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "degraded",
                "version": VERSION
            }))
        }
    }
}

async fn get_version(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "name": state.config.project_name,
        "version": VERSION
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use actix_web::test;

    #[actix_web::test]
    async fn test_health() {
        let app = TestApp::new();
        let service = test::init_service(app.app()).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], super::VERSION);
    }

    #[actix_web::test]
    async fn test_version_names_the_project() {
        let app = TestApp::new();
        let service = test::init_service(app.app()).await;

        let req = test::TestRequest::get().uri("/api/version").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(body["name"], "Chaitin School");
    }
}
