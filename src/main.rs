//! hvmnd API - backend of the compute rental marketplace
//!
//! Architecture:
//! - SeaORM for database access (PostgreSQL)
//! - Axum for the JSON API with rate limiting
//! - Plugin supervisor restarting crashed services
//! - Tokio for async runtime

mod entity;
mod error;
mod model;
mod patch;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use std::sync::Arc;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::{App, server},
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "hvmnd_api=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;

  info!("Starting hvmnd API v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(config).await?);

  let http = server::Plugin::bind(app.config.port).await?;
  let services = App::new().register(http).run(app);

  tokio::select! {
    _ = services => warn!("All services stopped"),
    signal = tokio::signal::ctrl_c() => {
      signal.context("Failed to listen for Ctrl-C")?;
      info!("Shutting down");
    }
  }

  Ok(())
}
