//! Error types for the rental API

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use tracing::error;

use crate::model::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("{0}")]
  Validation(String),

  #[error("User not found")]
  UserNotFound,

  #[error("Node not found or no changes applied")]
  NodeNotFound,

  #[error("Payment not found")]
  PaymentNotFound,

  #[error("Hash not found")]
  HashNotFound,

  #[error("No {0} found matching the criteria")]
  NoMatches(&'static str),

  #[error("{0}")]
  Conflict(String),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Error::Validation(_) => StatusCode::BAD_REQUEST,
      Error::UserNotFound
      | Error::NodeNotFound
      | Error::PaymentNotFound
      | Error::HashNotFound
      | Error::NoMatches(_) => StatusCode::NOT_FOUND,
      Error::Conflict(_) => StatusCode::CONFLICT,
    }
  }
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl From<PathRejection> for Error {
  fn from(rejection: PathRejection) -> Self {
    Self::Validation(rejection.body_text())
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let message = match &self {
      // store errors are logged, never echoed
      Error::Database(err) => {
        error!("Database error: {err}");
        String::from("Database error")
      }
      other => other.to_string(),
    };

    (self.status(), Json(Envelope::failure(message))).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
