//! Latest answer of a Telegram user to a quiz question

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quiz_answers")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub telegram_id: i64,
  #[sea_orm(primary_key, auto_increment = false)]
  pub question: String,
  pub answer: String,
  pub hash: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
