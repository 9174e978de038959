use axum::{
  Json,
  response::{IntoResponse, Response},
};
use serde::Serialize;

/// Uniform JSON wrapper of every API response.
#[derive(Debug, Serialize)]
pub struct Envelope<T = json::Value> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
}

impl<T> Envelope<T> {
  pub fn data(data: T) -> Self {
    Self { success: true, message: None, error: None, data: Some(data) }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }
}

impl Envelope {
  pub fn message(message: impl Into<String>) -> Self {
    Self {
      success: true,
      message: Some(message.into()),
      error: None,
      data: None,
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self { success: false, message: None, error: Some(error.into()), data: None }
  }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
  fn into_response(self) -> Response {
    Json(self).into_response()
  }
}
