//! Node entity - rentable remote-access machines

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::user;

#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
  #[sea_orm(string_value = "free")]
  Free,
  #[sea_orm(string_value = "rented")]
  Rented,
  #[sea_orm(string_value = "offline")]
  Offline,
}

impl std::str::FromStr for NodeStatus {
  type Err = DbErr;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    Self::try_from_value(&raw.to_owned())
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  /// Identifier from the previous inventory
  pub old_id: Option<i32>,
  #[sea_orm(unique)]
  pub any_desk_address: String,
  pub any_desk_password: String,
  pub status: NodeStatus,
  pub software: Option<String>,
  pub price: Decimal,
  /// `users.id` of the current renter
  pub renter: Option<i32>,
  pub rent_start_time: Option<DateTimeUtc>,
  /// Billing watermark
  pub last_balance_update_timestamp: Option<DateTimeUtc>,
  pub cpu: Option<String>,
  pub gpu: Option<String>,
  pub other_specs: Option<String>,
  pub licenses: Option<String>,
  pub machine_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::Renter",
    to = "user::Column::Id"
  )]
  Renter,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Renter.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
