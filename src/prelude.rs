pub use std::time::Duration;

pub use anyhow::Context;
pub use async_trait::async_trait;
pub use chrono::Utc;
pub use rust_decimal::Decimal;
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
  EntityTrait, NotSet, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
  TransactionTrait,
};
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
pub(crate) use crate::utils;
