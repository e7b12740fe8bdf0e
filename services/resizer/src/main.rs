mod cloud;
mod config;
mod models;
mod resizer;

use actix_web::{
    middleware::Logger,
    web::{self, Data},
    App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult,
};
use anyhow::Result;
use chrono::Utc;
use cloud::GcpConnector;
use config::Config;
use log::{error, info};
use models::ResizeQuery;
use resizer::PoolResizer;
use std::sync::Arc;

struct AppState {
    resizer: Arc<PoolResizer>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    let config = Arc::new(Config::from_env()?);
    info!(
        "Loaded configuration: cluster '{}', node pools {:?}, Cloud SQL instance '{}'",
        config.cluster_path(),
        config.node_pools,
        config.cloud_sql_instance
    );

    let connector = Arc::new(GcpConnector::from_config(config.clone())?);
    let resizer = Arc::new(PoolResizer::new(config, connector));

    let app_state = Data::new(AppState { resizer });

    info!("Starting server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .configure(routes)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await?;

    Ok(())
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/", web::route().to(resize_node_pools));
}

async fn health_check() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "pool-resizer",
        "timestamp": Utc::now()
    })))
}

async fn resize_node_pools(state: Data<AppState>, req: HttpRequest) -> HttpResponse {
    let node_count = ResizeQuery::from_query_string(req.query_string()).node_count();

    match state.resizer.resize(node_count).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!("Error resizing GKE node pools: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Error resizing GKE node pools: {}", e)
            }))
        }
    }
}
