use std::str::FromStr;

use sea_orm::{
  Condition, Select,
  sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};
use serde::Deserialize;

use crate::{
  entity::{NodeStatus, node},
  patch::{self, Patch},
  prelude::*,
};

/// `renter` query filter: `non_null` for any rented node, otherwise a user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenterFilter {
  Assigned,
  User(i32),
}

impl FromStr for RenterFilter {
  type Err = String;

  fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
    match raw {
      "non_null" => Ok(Self::Assigned),
      id => id
        .parse()
        .map(Self::User)
        .map_err(|_| format!("invalid renter filter `{id}`")),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeFilter {
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub id: Option<i32>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub status: Option<NodeStatus>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub renter: Option<RenterFilter>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub any_desk_address: Option<String>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub software: Option<String>,
}

/// Case-insensitive substring match of `needle` in `col`.
fn contains(col: node::Column, needle: &str) -> SimpleExpr {
  let pattern = utils::contains_pattern(&needle.to_lowercase());
  Expr::expr(Func::lower(Expr::col((node::Entity, col))))
    .like(LikeExpr::new(pattern).escape(utils::LIKE_ESCAPE))
}

impl NodeFilter {
  pub fn select(&self) -> Select<node::Entity> {
    node::Entity::find()
      .apply_if(self.id, |q, id| q.filter(node::Column::Id.eq(id)))
      .apply_if(self.renter, |q, renter| match renter {
        RenterFilter::Assigned => q.filter(node::Column::Renter.is_not_null()),
        RenterFilter::User(id) => q.filter(node::Column::Renter.eq(id)),
      })
      .apply_if(self.status, |q, status| {
        q.filter(node::Column::Status.eq(status))
      })
      .apply_if(self.any_desk_address.as_deref(), |q, address| {
        q.filter(node::Column::AnyDeskAddress.eq(address))
      })
      .apply_if(self.software.as_deref(), |q, software| {
        q.filter(
          Condition::any()
            .add(contains(node::Column::Software, software))
            .add(contains(node::Column::Licenses, software)),
        )
      })
      .order_by_asc(node::Column::Id)
  }
}

/// Row selector of a node update, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKey {
  Id(i32),
  OldId(i32),
  AnyDeskAddress(String),
}

impl NodeKey {
  fn condition(&self) -> SimpleExpr {
    match self {
      Self::Id(id) => node::Column::Id.eq(*id),
      Self::OldId(old_id) => node::Column::OldId.eq(*old_id),
      Self::AnyDeskAddress(address) => {
        node::Column::AnyDeskAddress.eq(address.as_str())
      }
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeChanges {
  pub id: Patch<i32>,
  pub old_id: Patch<i32>,
  pub any_desk_address: Patch<String>,
  pub any_desk_password: Patch<String>,
  pub status: Patch<NodeStatus>,
  pub software: Patch<String>,
  pub price: Patch<Decimal>,
  pub renter: Patch<i32>,
  pub rent_start_time: Patch<chrono::DateTime<Utc>>,
  pub last_balance_update_timestamp: Patch<chrono::DateTime<Utc>>,
  pub cpu: Patch<String>,
  pub gpu: Patch<String>,
  pub other_specs: Patch<String>,
  pub licenses: Patch<String>,
  pub machine_id: Patch<String>,
}

impl NodeChanges {
  /// Splits the payload into the row selector and the column changes.
  ///
  /// The selector is the first of `id`, `old_id`, `any_desk_address` that
  /// carries a value; the other two stay regular column changes.
  pub fn into_parts(self) -> Result<(NodeKey, node::ActiveModel)> {
    let key = match (&self.id, &self.old_id, &self.any_desk_address) {
      (Patch::Value(id), _, _) => NodeKey::Id(*id),
      (_, Patch::Value(old_id), _) => NodeKey::OldId(*old_id),
      (_, _, Patch::Value(address)) => NodeKey::AnyDeskAddress(address.clone()),
      _ => {
        return Err(Error::validation(
          "At least one of any_desk_address, old_id, or id must be provided",
        ));
      }
    };

    if let Some(price) = self.price.value()
      && price.is_sign_negative()
    {
      return Err(Error::validation("`price` cannot be negative"));
    }

    let old_id = match key {
      NodeKey::OldId(_) => NotSet,
      _ => self.old_id.nullable(),
    };
    let any_desk_address = match key {
      NodeKey::AnyDeskAddress(_) => NotSet,
      _ => self.any_desk_address.required("any_desk_address")?,
    };

    let changes = node::ActiveModel {
      id: NotSet,
      old_id,
      any_desk_address,
      any_desk_password: self.any_desk_password.required("any_desk_password")?,
      status: self.status.required("status")?,
      software: self.software.nullable(),
      price: self.price.required("price")?,
      renter: self.renter.nullable(),
      rent_start_time: self.rent_start_time.nullable(),
      last_balance_update_timestamp: self
        .last_balance_update_timestamp
        .nullable(),
      cpu: self.cpu.nullable(),
      gpu: self.gpu.nullable(),
      other_specs: self.other_specs.nullable(),
      licenses: self.licenses.nullable(),
      machine_id: self.machine_id.nullable(),
    };

    Ok((key, changes))
  }
}

pub struct Node<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Node<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn find(&self, filter: &NodeFilter) -> Result<Vec<node::Model>> {
    let nodes = filter.select().all(self.db).await?;
    if nodes.is_empty() {
      return Err(Error::NoMatches("nodes"));
    }
    Ok(nodes)
  }

  pub async fn update(&self, input: NodeChanges) -> Result<()> {
    let (key, changes) = input.into_parts()?;

    match patch::apply(self.db, changes, key.condition()).await? {
      0 => Err(Error::NodeNotFound),
      rows => {
        debug!("Updated {rows} node(s) by {key:?}");
        Ok(())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;
  use sea_orm::DbBackend;

  use super::*;
  use crate::{entity::setup_test_db, sv};

  async fn insert_node(
    db: &DatabaseConnection,
    address: &str,
    status: NodeStatus,
  ) -> node::Model {
    node::ActiveModel {
      id: NotSet,
      old_id: Set(None),
      any_desk_address: Set(address.to_string()),
      any_desk_password: Set("secret".to_string()),
      status: Set(status),
      software: Set(Some("Blender, Maya".to_string())),
      price: Set(dec!(12.5)),
      renter: Set(None),
      rent_start_time: Set(None),
      last_balance_update_timestamp: Set(None),
      cpu: Set(Some("Ryzen 9".to_string())),
      gpu: Set(Some("RTX 4090".to_string())),
      other_specs: Set(None),
      licenses: Set(Some("Adobe Photoshop".to_string())),
      machine_id: Set(None),
    }
    .insert(db)
    .await
    .unwrap()
  }

  fn changes(value: json::Value) -> NodeChanges {
    json::from_value(value).unwrap()
  }

  #[test]
  fn test_renter_filter_parse() {
    assert_eq!("non_null".parse(), Ok(RenterFilter::Assigned));
    assert_eq!("17".parse(), Ok(RenterFilter::User(17)));
    assert!("someone".parse::<RenterFilter>().is_err());
  }

  #[test]
  fn test_filter_sql() {
    let filter = NodeFilter {
      status: Some(NodeStatus::Free),
      renter: Some(RenterFilter::Assigned),
      software: Some("Photo".into()),
      ..Default::default()
    };
    let sql = filter.select().build(DbBackend::Postgres).to_string();

    assert!(sql.contains(r#""renter" IS NOT NULL"#), "{sql}");
    assert!(sql.contains(r#""status" = 'free'"#), "{sql}");
    assert!(sql.contains("LOWER"), "{sql}");
    assert!(sql.contains("'%photo%'"), "{sql}");
    assert!(sql.contains(" OR "), "{sql}");

    let sql = NodeFilter::default().select().build(DbBackend::Postgres).to_string();
    assert!(!sql.contains("WHERE"), "{sql}");
  }

  #[test]
  fn test_key_priority() {
    let (key, _) = changes(json::json!({
      "any_desk_address": "X",
      "old_id": 4,
      "id": 9,
      "status": "free",
    }))
    .into_parts()
    .unwrap();
    assert_eq!(key, NodeKey::Id(9));

    let (key, _) =
      changes(json::json!({ "any_desk_address": "X", "old_id": 4, "cpu": null }))
        .into_parts()
        .unwrap();
    assert_eq!(key, NodeKey::OldId(4));

    let err = changes(json::json!({ "old_id": null, "cpu": "i9" })).into_parts();
    assert!(matches!(err, Err(Error::Validation(_))));
  }

  #[test]
  fn test_required_columns_reject_null() {
    let err =
      changes(json::json!({ "id": 1, "status": null })).into_parts();
    assert!(matches!(err, Err(Error::Validation(msg)) if msg.contains("status")));
  }

  #[tokio::test]
  async fn test_update_touches_only_supplied_columns() {
    let db = setup_test_db().await;
    let before = insert_node(&db, "X", NodeStatus::Free).await;

    Node::new(&db)
      .update(changes(json::json!({ "any_desk_address": "X", "status": "rented" })))
      .await
      .unwrap();

    let after = node::Entity::find_by_id(before.id).one(&db).await.unwrap().unwrap();
    assert_eq!(after.status, NodeStatus::Rented);
    assert_eq!(
      after,
      node::Model { status: NodeStatus::Rented, ..before }
    );
  }

  #[tokio::test]
  async fn test_update_explicit_null_clears_column() {
    let db = setup_test_db().await;
    let before = insert_node(&db, "X", NodeStatus::Free).await;

    Node::new(&db)
      .update(changes(json::json!({
        "id": before.id,
        "gpu": null,
        "any_desk_address": "Y",
      })))
      .await
      .unwrap();

    let after = node::Entity::find_by_id(before.id).one(&db).await.unwrap().unwrap();
    assert_eq!(after.gpu, None);
    assert_eq!(after.cpu.as_deref(), Some("Ryzen 9"));
    assert_eq!(after.any_desk_address, "Y");
  }

  #[tokio::test]
  async fn test_update_assigns_renter() {
    let db = setup_test_db().await;
    let node = insert_node(&db, "X", NodeStatus::Free).await;
    let user = sv::User::new(&db)
      .upsert(json::from_value(json::json!({ "telegram_id": 42 })).unwrap())
      .await
      .unwrap();

    Node::new(&db)
      .update(changes(json::json!({
        "id": node.id,
        "status": "rented",
        "renter": user.id,
        "rent_start_time": "2026-10-01T12:00:00Z",
      })))
      .await
      .unwrap();

    let filter = NodeFilter {
      renter: Some(RenterFilter::User(user.id)),
      ..Default::default()
    };
    let rented = Node::new(&db).find(&filter).await.unwrap();
    assert_eq!(rented.len(), 1);
    assert!(rented[0].rent_start_time.is_some());
  }

  #[tokio::test]
  async fn test_update_failures() {
    let db = setup_test_db().await;
    insert_node(&db, "X", NodeStatus::Free).await;
    let sv = Node::new(&db);

    let nothing = changes(json::json!({ "any_desk_address": "X" }));
    assert!(matches!(sv.update(nothing).await, Err(Error::Validation(_))));

    let unknown = changes(json::json!({ "any_desk_address": "Z", "cpu": "i7" }));
    assert!(matches!(sv.update(unknown).await, Err(Error::NodeNotFound)));
  }

  #[tokio::test]
  async fn test_find_filters() {
    let db = setup_test_db().await;
    insert_node(&db, "A", NodeStatus::Free).await;
    insert_node(&db, "B", NodeStatus::Offline).await;
    insert_node(&db, "C", NodeStatus::Free).await;
    let sv = Node::new(&db);

    let free = sv
      .find(&NodeFilter { status: Some(NodeStatus::Free), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(free.len(), 2);
    assert!(free.iter().all(|node| node.status == NodeStatus::Free));

    let by_license = sv
      .find(&NodeFilter { software: Some("photoSHOP".into()), ..Default::default() })
      .await
      .unwrap();
    assert_eq!(by_license.len(), 3);

    let rented = sv
      .find(&NodeFilter { renter: Some(RenterFilter::Assigned), ..Default::default() })
      .await;
    assert!(matches!(rented, Err(Error::NoMatches("nodes"))));

    let literal = sv
      .find(&NodeFilter { software: Some("%".into()), ..Default::default() })
      .await;
    assert!(matches!(literal, Err(Error::NoMatches(_))));
  }
}
