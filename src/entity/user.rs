use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub telegram_id: i64,
  pub total_spent: Decimal,
  /// Changed only by payment completion and cancellation
  pub balance: Decimal,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub username: Option<String>,
  pub language_code: Option<String>,
  pub banned: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::payment::Entity")]
  Payments,
  #[sea_orm(has_many = "super::node::Entity")]
  RentedNodes,
}

impl Related<super::payment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Payments.def()
  }
}

impl Related<super::node::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::RentedNodes.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
