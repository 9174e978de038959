//! Partial updates.
//!
//! A payload field is tri-state: a missing key leaves the column alone, an
//! explicit `null` clears it and a value overwrites it. [`Patch`] keeps that
//! distinction through deserialization and turns it into an [`ActiveValue`],
//! so the generated `UPDATE` touches exactly the supplied columns and binds
//! every value as a parameter.

use sea_orm::{ActiveValue, Iterable, Value, sea_query::SimpleExpr};
use serde::{Deserialize, Deserializer};

use crate::prelude::*;

/// Deserialize with `#[serde(default)]`, otherwise a missing key fails
/// instead of becoming [`Patch::Missing`].
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
  Missing,
  Null,
  Value(T),
}

impl<T> Default for Patch<T> {
  fn default() -> Self {
    Self::Missing
  }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
  fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    Option::<T>::deserialize(deserializer).map(|value| match value {
      Some(value) => Self::Value(value),
      None => Self::Null,
    })
  }
}

impl<T> Patch<T> {
  pub fn is_present(&self) -> bool {
    !matches!(self, Self::Missing)
  }

  pub fn value(&self) -> Option<&T> {
    match self {
      Self::Value(value) => Some(value),
      _ => None,
    }
  }

  /// Change of a nullable column.
  pub fn nullable(self) -> ActiveValue<Option<T>>
  where
    Option<T>: Into<Value>,
  {
    match self {
      Self::Missing => NotSet,
      Self::Null => Set(None),
      Self::Value(value) => Set(Some(value)),
    }
  }

  /// Change of a `NOT NULL` column.
  pub fn required(self, field: &str) -> Result<ActiveValue<T>>
  where
    T: Into<Value>,
  {
    match self {
      Self::Missing => Ok(NotSet),
      Self::Null => Err(Error::validation(format!("`{field}` cannot be null"))),
      Self::Value(value) => Ok(Set(value)),
    }
  }
}

/// Whether any column of `model` carries a change.
pub fn has_changes<A: ActiveModelTrait>(model: &A) -> bool {
  <A::Entity as EntityTrait>::Column::iter().any(|col| model.get(col).is_set())
}

/// Writes the set columns of `changes` to the rows matched by `target`.
///
/// Returns the number of affected rows.
pub async fn apply<A, C>(db: &C, changes: A, target: SimpleExpr) -> Result<u64>
where
  A: ActiveModelTrait + Send,
  C: ConnectionTrait,
{
  if !has_changes(&changes) {
    return Err(Error::validation("No updatable fields provided"));
  }

  let res = <A::Entity as EntityTrait>::update_many()
    .set(changes)
    .filter(target)
    .exec(db)
    .await?;
  Ok(res.rows_affected)
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;

  use super::*;

  #[derive(Debug, Default, Deserialize)]
  #[serde(default)]
  struct Payload {
    cpu: Patch<String>,
    price: Patch<i32>,
  }

  #[test]
  fn test_missing_null_and_value_are_distinct() {
    let payload: Payload =
      json::from_str(r#"{ "cpu": null, "price": 10 }"#).unwrap();
    assert_eq!(payload.cpu, Patch::Null);
    assert_eq!(payload.price, Patch::Value(10));

    let payload: Payload = json::from_str("{}").unwrap();
    assert_eq!(payload.cpu, Patch::Missing);
    assert!(!payload.price.is_present());
  }

  #[test]
  fn test_nullable_mapping() {
    assert!(matches!(Patch::<String>::Missing.nullable(), ActiveValue::NotSet));
    assert!(matches!(Patch::<String>::Null.nullable(), ActiveValue::Set(None)));
    assert!(matches!(
      Patch::Value("i9".to_string()).nullable(),
      ActiveValue::Set(Some(cpu)) if cpu == "i9"
    ));
  }

  #[test]
  fn test_required_rejects_null() {
    assert!(matches!(Patch::Value(5).required("price"), Ok(ActiveValue::Set(5))));
    assert!(matches!(
      Patch::<i32>::Missing.required("price"),
      Ok(ActiveValue::NotSet)
    ));
    assert!(matches!(
      Patch::<i32>::Null.required("price"),
      Err(Error::Validation(msg)) if msg.contains("price")
    ));
  }
}
