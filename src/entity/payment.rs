//! Payment entity - payment tickets and their lifecycle

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::user;

/// Ticket status.
///
/// ```text
/// unpaid ──► paid ──► cancelled
///    └──────────────────▲
/// ```
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
pub enum PaymentStatus {
  #[sea_orm(string_value = "unpaid")]
  Unpaid,
  #[sea_orm(string_value = "paid")]
  Paid,
  #[sea_orm(string_value = "cancelled")]
  Cancelled,
}

impl std::str::FromStr for PaymentStatus {
  type Err = DbErr;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    Self::try_from_value(&raw.to_owned())
  }
}

/// Effect of moving a ticket into a target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Target already reached.
  Noop,
  /// Credit the amount to the owner's balance.
  Credit,
  /// Take a previous credit back.
  Debit,
  /// Status change only.
  Settle,
}

impl PaymentStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Unpaid => "unpaid",
      Self::Paid => "paid",
      Self::Cancelled => "cancelled",
    }
  }

  /// `None` when the graph has no edge from `self` to `target`.
  pub fn transition(self, target: Self) -> Option<Transition> {
    use PaymentStatus::*;

    match (self, target) {
      (from, to) if from == to => Some(Transition::Noop),
      (Unpaid, Paid) => Some(Transition::Credit),
      (Paid, Cancelled) => Some(Transition::Debit),
      (Unpaid, Cancelled) => Some(Transition::Settle),
      _ => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub user_id: i32,
  pub amount: Decimal,
  pub status: PaymentStatus,
  pub datetime: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id"
  )]
  User,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
  use super::{PaymentStatus::*, *};

  #[test]
  fn test_transition_table() {
    assert_eq!(Unpaid.transition(Paid), Some(Transition::Credit));
    assert_eq!(Unpaid.transition(Cancelled), Some(Transition::Settle));
    assert_eq!(Paid.transition(Cancelled), Some(Transition::Debit));

    assert_eq!(Paid.transition(Paid), Some(Transition::Noop));
    assert_eq!(Cancelled.transition(Cancelled), Some(Transition::Noop));
  }

  #[test]
  fn test_cancelled_is_terminal() {
    assert_eq!(Cancelled.transition(Paid), None);
    assert_eq!(Cancelled.transition(Unpaid), None);
    assert_eq!(Paid.transition(Unpaid), None);
  }

  #[test]
  fn test_wire_strings() {
    assert_eq!(json::to_value(Cancelled).unwrap(), "cancelled");
    assert_eq!(Unpaid.as_str(), "unpaid");
    assert_eq!(Paid.to_value(), "paid");
    assert_eq!("cancelled".parse::<PaymentStatus>().ok(), Some(Cancelled));
    assert!("refunded".parse::<PaymentStatus>().is_err());
  }
}
