// src/main.rs

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use marketplace_hub::config::AppConfig;
use marketplace_hub::web::configure_app_routes;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Marketplace Hub server...");

  let config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
  })?;
  let server_address = format!("{}:{}", config.server_host, config.server_port);

  let app_state = marketplace_hub::build_state(config).await.map_err(|e| {
    tracing::error!(error = %format!("{:#}", e), "Failed to initialise application state.");
    std::io::Error::new(std::io::ErrorKind::Other, format!("{:#}", e))
  })?;
  let cors_origin = app_state.config.cors_origin.clone();

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    let cors = Cors::default()
      .allowed_origin(&cors_origin)
      .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
      .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
      .supports_credentials()
      .max_age(3600);

    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(cors)
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
