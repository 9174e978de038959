use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
};
use serde::Deserialize;

use crate::{
  entity::{node, payment, user},
  model::Envelope,
  prelude::*,
  state::AppState,
  sv::{
    node::{NodeChanges, NodeFilter},
    payment::{NewPayment, Outcome, PaymentFilter},
    quiz::{QuizPair, UserAnswer},
    user::{UserChanges, UserFilter, UserUpsert},
  },
};

type Body<T> = std::result::Result<Json<T>, JsonRejection>;
type Params<T> = std::result::Result<Query<T>, QueryRejection>;
type Id = std::result::Result<Path<i32>, PathRejection>;
type MaybeId = std::result::Result<Option<Path<i32>>, PathRejection>;

pub async fn ping() -> Envelope {
  Envelope::message("pong")
}

pub async fn users(
  State(app): State<Arc<AppState>>,
  id: MaybeId,
  query: Params<UserFilter>,
) -> Result<Envelope<Vec<user::Model>>> {
  let Query(mut filter) = query?;
  // query string id wins over the path segment
  filter.id = filter.id.or(id?.map(|Path(id)| id));

  let users = app.sv().user.find(&filter).await?;
  let message = format!("Found {} users", users.len());
  Ok(Envelope::data(users).with_message(message))
}

pub async fn upsert_user(
  State(app): State<Arc<AppState>>,
  body: Body<UserUpsert>,
) -> Result<Envelope<user::Model>> {
  let Json(input) = body?;
  let user = app.sv().user.upsert(input).await?;
  Ok(Envelope::data(user).with_message("User saved successfully"))
}

pub async fn update_user(
  State(app): State<Arc<AppState>>,
  body: Body<UserChanges>,
) -> Result<Envelope> {
  let Json(input) = body?;
  app.sv().user.update(input).await?;
  Ok(Envelope::message("User updated successfully"))
}

pub async fn nodes(
  State(app): State<Arc<AppState>>,
  id: MaybeId,
  query: Params<NodeFilter>,
) -> Result<Envelope<Vec<node::Model>>> {
  let Query(mut filter) = query?;
  filter.id = filter.id.or(id?.map(|Path(id)| id));

  let nodes = app.sv().node.find(&filter).await?;
  let message = format!("Found {} nodes", nodes.len());
  Ok(Envelope::data(nodes).with_message(message))
}

pub async fn update_node(
  State(app): State<Arc<AppState>>,
  body: Body<NodeChanges>,
) -> Result<Envelope> {
  let Json(input) = body?;
  app.sv().node.update(input).await?;
  Ok(Envelope::message("Node updated successfully"))
}

pub async fn payments(
  State(app): State<Arc<AppState>>,
  id: MaybeId,
  query: Params<PaymentFilter>,
) -> Result<Envelope<Vec<payment::Model>>> {
  let Query(mut filter) = query?;
  filter.id = filter.id.or(id?.map(|Path(id)| id));

  let payments = app.sv().payment.find(&filter).await?;
  let message = format!("Found {} payments", payments.len());
  Ok(Envelope::data(payments).with_message(message))
}

pub async fn create_payment(
  State(app): State<Arc<AppState>>,
  body: Body<NewPayment>,
) -> Result<Envelope> {
  let Json(input) = body?;
  let payment = app.sv().payment.create(input).await?;
  Ok(
    Envelope::data(json::json!({ "payment_ticket_id": payment.id }))
      .with_message("Payment ticket created"),
  )
}

fn ticket(outcome: &Outcome, applied: &str, unchanged: &str) -> Envelope {
  let message = match outcome {
    Outcome::Applied(_) => applied,
    Outcome::Unchanged(_) => unchanged,
  };
  Envelope::data(json::json!({ "payment_ticket_id": outcome.payment().id }))
    .with_message(message)
}

pub async fn complete_payment(
  State(app): State<Arc<AppState>>,
  id: Id,
) -> Result<Envelope> {
  let Path(id) = id?;
  let outcome = app.sv().payment.complete(id).await?;
  Ok(ticket(&outcome, "Payment completed", "Payment already completed"))
}

pub async fn cancel_payment(
  State(app): State<Arc<AppState>>,
  id: Id,
) -> Result<Envelope> {
  let Path(id) = id?;
  let outcome = app.sv().payment.cancel(id).await?;
  Ok(ticket(&outcome, "Payment cancelled", "Payment already cancelled"))
}

pub async fn save_hash(
  State(app): State<Arc<AppState>>,
  body: Body<QuizPair>,
) -> Result<Envelope> {
  let Json(pair) = body?;
  let hash = app.sv().quiz.save_mapping(pair).await?;
  Ok(
    Envelope::data(json::json!({ "hash": hash }))
      .with_message("Hash mapping saved successfully"),
  )
}

#[derive(Debug, Deserialize)]
pub struct HashQuery {
  pub hash: String,
}

pub async fn lookup_hash(
  State(app): State<Arc<AppState>>,
  query: Params<HashQuery>,
) -> Result<Envelope> {
  let Query(HashQuery { hash }) = query?;
  if hash.is_empty() {
    return Err(Error::validation("Missing hash parameter"));
  }

  let mapping = app.sv().quiz.by_hash(&hash).await?;
  Ok(Envelope::data(json::json!({
    "question": mapping.question,
    "answer": mapping.answer,
  })))
}

pub async fn save_answer(
  State(app): State<Arc<AppState>>,
  body: Body<UserAnswer>,
) -> Result<Envelope> {
  let Json(input) = body?;
  let hash = app.sv().quiz.save_answer(input).await?;
  Ok(
    Envelope::data(json::json!({ "hash": hash }))
      .with_message("User answer saved successfully"),
  )
}
