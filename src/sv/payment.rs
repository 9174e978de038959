use sea_orm::{Select, UpdateMany, sea_query::Expr};
use serde::Deserialize;

use crate::{
  entity::{PaymentStatus, Transition, payment, user},
  prelude::*,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentFilter {
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub id: Option<i32>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub user_id: Option<i32>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub status: Option<PaymentStatus>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub limit: Option<u64>,
}

impl PaymentFilter {
  pub fn select(&self) -> Select<payment::Entity> {
    payment::Entity::find()
      .apply_if(self.id, |q, id| q.filter(payment::Column::Id.eq(id)))
      .apply_if(self.user_id, |q, user_id| {
        q.filter(payment::Column::UserId.eq(user_id))
      })
      .apply_if(self.status, |q, status| {
        q.filter(payment::Column::Status.eq(status))
      })
      .order_by_asc(payment::Column::Id)
      .apply_if(self.limit, |q, limit| q.limit(limit))
  }
}

#[derive(Debug, Deserialize)]
pub struct NewPayment {
  pub user_id: i32,
  pub amount: Decimal,
}

/// Result of a lifecycle call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Applied(payment::Model),
  /// The ticket was already in the requested status.
  Unchanged(payment::Model),
}

impl Outcome {
  pub fn payment(&self) -> &payment::Model {
    match self {
      Self::Applied(payment) | Self::Unchanged(payment) => payment,
    }
  }
}

/// Reads the ticket under an exclusive row lock.
fn locked(id: i32) -> Select<payment::Entity> {
  payment::Entity::find_by_id(id).lock_exclusive()
}

/// Moves the ticket only while it is still in `from`.
fn swap_status(
  id: i32,
  from: PaymentStatus,
  to: PaymentStatus,
) -> UpdateMany<payment::Entity> {
  payment::Entity::update_many()
    .set(payment::ActiveModel { status: Set(to), ..Default::default() })
    .filter(payment::Column::Id.eq(id))
    .filter(payment::Column::Status.eq(from))
}

pub struct Payment<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Payment<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn find(&self, filter: &PaymentFilter) -> Result<Vec<payment::Model>> {
    let payments = filter.select().all(self.db).await?;
    if payments.is_empty() {
      return Err(Error::NoMatches("payments"));
    }
    Ok(payments)
  }

  /// Opens an `unpaid` ticket for an existing user.
  pub async fn create(&self, input: NewPayment) -> Result<payment::Model> {
    if input.amount <= Decimal::ZERO {
      return Err(Error::validation("Amount must be positive"));
    }

    let txn = self.db.begin().await?;

    user::Entity::find_by_id(input.user_id)
      .one(&txn)
      .await?
      .ok_or(Error::UserNotFound)?;

    let payment = payment::ActiveModel {
      id: NotSet,
      user_id: Set(input.user_id),
      amount: Set(input.amount),
      status: Set(PaymentStatus::Unpaid),
      datetime: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
      "Payment #{} opened for user #{} ({})",
      payment.id, payment.user_id, payment.amount
    );
    Ok(payment)
  }

  pub async fn complete(&self, id: i32) -> Result<Outcome> {
    self.transition(id, PaymentStatus::Paid).await
  }

  pub async fn cancel(&self, id: i32) -> Result<Outcome> {
    self.transition(id, PaymentStatus::Cancelled).await
  }

  /// Moves the ticket to `target` and applies the balance effect in one
  /// transaction, holding the payment row lock throughout.
  async fn transition(&self, id: i32, target: PaymentStatus) -> Result<Outcome> {
    let txn = self.db.begin().await?;

    let payment = locked(id)
      .one(&txn)
      .await?
      .ok_or(Error::PaymentNotFound)?;

    let step = payment.status.transition(target).ok_or_else(|| {
      Error::Conflict(format!(
        "Payment is {} and cannot become {}",
        payment.status.as_str(),
        target.as_str()
      ))
    })?;

    if step == Transition::Noop {
      return Ok(Outcome::Unchanged(payment));
    }

    let updated = swap_status(id, payment.status, target).exec(&txn).await?;

    if updated.rows_affected == 0 {
      warn!("Payment #{id} changed while moving to {}", target.as_str());
      return Err(Error::Conflict(String::from(
        "Payment was modified concurrently",
      )));
    }

    let balance = match step {
      Transition::Credit => {
        Some(Expr::col(user::Column::Balance).add(payment.amount))
      }
      Transition::Debit => {
        Some(Expr::col(user::Column::Balance).sub(payment.amount))
      }
      Transition::Settle | Transition::Noop => None,
    };

    if let Some(balance) = balance {
      let res = user::Entity::update_many()
        .col_expr(user::Column::Balance, balance)
        .filter(user::Column::Id.eq(payment.user_id))
        .exec(&txn)
        .await?;

      if res.rows_affected == 0 {
        return Err(Error::UserNotFound);
      }
    }

    txn.commit().await?;

    info!(
      "Payment #{id}: {} -> {} ({step:?} {} for user #{})",
      payment.status.as_str(),
      target.as_str(),
      payment.amount,
      payment.user_id
    );

    Ok(Outcome::Applied(payment::Model { status: target, ..payment }))
  }
}
