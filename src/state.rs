use std::env;

use crate::{prelude::*, sv};

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  pub request_timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::new(),
      port: 8080,
      request_timeout: Duration::from_secs(30),
    }
  }
}

impl Config {
  /// Reads `POSTGRES_URL` (required), `PORT` and `REQUEST_TIMEOUT`.
  pub fn from_env() -> anyhow::Result<Self> {
    let defaults = Self::default();

    let database_url =
      env::var("POSTGRES_URL").context("POSTGRES_URL is not set")?;

    let port = match env::var("PORT") {
      Ok(port) => port.parse().context("Invalid PORT")?,
      Err(_) => defaults.port,
    };

    let request_timeout = match env::var("REQUEST_TIMEOUT") {
      Ok(raw) => {
        humantime::parse_duration(&raw).context("Invalid REQUEST_TIMEOUT")?
      }
      Err(_) => defaults.request_timeout,
    };

    Ok(Self { database_url, port, request_timeout })
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub node: sv::Node<'a>,
  pub payment: sv::Payment<'a>,
  pub quiz: sv::Quiz<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;
    db.ping().await.context("Database is unreachable")?;

    Ok(Self::with_connection(db, config))
  }

  pub fn with_connection(db: DatabaseConnection, config: Config) -> Self {
    Self { db, config }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      node: sv::Node::new(&self.db),
      payment: sv::Payment::new(&self.db),
      quiz: sv::Quiz::new(&self.db),
    }
  }
}
