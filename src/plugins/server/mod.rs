mod handlers;

use std::{net::SocketAddr, sync::Arc};

use axum::{
  Router,
  http::StatusCode,
  routing::{get, patch, post},
};
use tokio::{net::TcpListener, sync::Mutex};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  timeout::TimeoutLayer,
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub fn routes() -> Router<Arc<AppState>> {
  let api = Router::new()
    .route("/ping", get(handlers::ping))
    .route(
      "/users",
      get(handlers::users).post(handlers::upsert_user).patch(handlers::update_user),
    )
    .route("/users/{id}", get(handlers::users))
    .route("/nodes", get(handlers::nodes).patch(handlers::update_node))
    .route("/nodes/{id}", get(handlers::nodes))
    .route("/payments", get(handlers::payments).post(handlers::create_payment))
    .route("/payments/{id}", get(handlers::payments))
    .route("/payments/complete/{id}", patch(handlers::complete_payment))
    .route("/payments/cancel/{id}", patch(handlers::cancel_payment))
    .route("/quiz/hashes", post(handlers::save_hash).get(handlers::lookup_hash))
    .route("/quiz/answers", post(handlers::save_answer));

  Router::new().nest("/api/v1", api)
}

async fn listen(port: u16) -> anyhow::Result<TcpListener> {
  let addr = SocketAddr::from(([0, 0, 0, 0], port));
  TcpListener::bind(addr)
    .await
    .with_context(|| format!("Failed to bind {addr}"))
}

pub struct Plugin {
  port: u16,
  /// Socket bound at startup, consumed by the first run.
  listener: Mutex<Option<TcpListener>>,
}

impl Plugin {
  /// Binds the HTTP port, so a busy port fails startup instead of a restart.
  pub async fn bind(port: u16) -> anyhow::Result<Self> {
    let listener = listen(port).await?;
    Ok(Self { port, listener: Mutex::new(Some(listener)) })
  }
}

#[async_trait]
impl super::Plugin for Plugin {
  fn name(&self) -> &'static str {
    "http"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let bound = self.listener.lock().await.take();
    let listener = match bound {
      Some(listener) => listener,
      None => listen(self.port).await?,
    };
    let addr = listener.local_addr()?;

    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();
    let timeout = app.config.request_timeout;

    let router = routes()
      .layer(
        ServiceBuilder::new()
          .layer(TraceLayer::new_for_http())
          .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
          ))
          .layer(GovernorLayer::new(governor_conf))
          .layer(
            CorsLayer::new()
              .allow_origin(Any)
              .allow_methods(Any)
              .allow_headers(Any),
          ),
      )
      .with_state(app)
      .into_make_service_with_connect_info::<SocketAddr>();

    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        anyhow::bail!("Rate limiter cleaner stopped unexpectedly")
      }
    }
  }
}
