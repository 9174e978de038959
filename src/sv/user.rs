use sea_orm::{Iterable, Select, sea_query::OnConflict};
use serde::Deserialize;

use crate::{
  entity::user,
  patch::{self, Patch},
  prelude::*,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserFilter {
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub id: Option<i32>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub telegram_id: Option<i64>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub username: Option<String>,
  #[serde(deserialize_with = "crate::utils::blank_as_none")]
  pub limit: Option<u64>,
}

impl UserFilter {
  pub fn select(&self) -> Select<user::Entity> {
    user::Entity::find()
      .apply_if(self.id, |q, id| q.filter(user::Column::Id.eq(id)))
      .apply_if(self.telegram_id, |q, tg| {
        q.filter(user::Column::TelegramId.eq(tg))
      })
      .apply_if(self.username.as_deref(), |q, name| {
        q.filter(user::Column::Username.eq(name))
      })
      .order_by_asc(user::Column::Id)
      .apply_if(self.limit, |q, limit| q.limit(limit))
  }
}

/// Profile fields shared by upsert and partial update.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Profile {
  pub total_spent: Patch<Decimal>,
  pub first_name: Patch<String>,
  pub last_name: Patch<String>,
  pub username: Patch<String>,
  pub language_code: Patch<String>,
  pub banned: Patch<bool>,
}

impl Profile {
  fn into_active(self) -> Result<user::ActiveModel> {
    if let Some(spent) = self.total_spent.value()
      && spent.is_sign_negative()
    {
      return Err(Error::validation("`total_spent` cannot be negative"));
    }

    Ok(user::ActiveModel {
      total_spent: self.total_spent.required("total_spent")?,
      first_name: self.first_name.nullable(),
      last_name: self.last_name.nullable(),
      username: self.username.nullable(),
      language_code: self.language_code.nullable(),
      banned: self.banned.nullable(),
      ..Default::default()
    })
  }
}

#[derive(Debug, Deserialize)]
pub struct UserUpsert {
  pub telegram_id: i64,
  #[serde(flatten)]
  pub profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserChanges {
  #[serde(default)]
  pub id: Patch<i32>,
  #[serde(default)]
  pub telegram_id: Patch<i64>,
  #[serde(flatten)]
  pub profile: Profile,
}

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, id: i32) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(id).one(self.db).await?)
  }

  pub async fn by_telegram_id(
    &self,
    telegram_id: i64,
  ) -> Result<Option<user::Model>> {
    let user = user::Entity::find()
      .filter(user::Column::TelegramId.eq(telegram_id))
      .one(self.db)
      .await?;
    Ok(user)
  }

  pub async fn find(&self, filter: &UserFilter) -> Result<Vec<user::Model>> {
    let users = filter.select().all(self.db).await?;
    if users.is_empty() {
      return Err(Error::NoMatches("users"));
    }
    Ok(users)
  }

  /// Inserts the user or updates the supplied fields of the existing one.
  pub async fn upsert(&self, input: UserUpsert) -> Result<user::Model> {
    let changes = input.profile.into_active()?;
    let columns: Vec<_> = user::Column::iter()
      .filter(|col| changes.get(*col).is_set())
      .collect();

    let mut row = changes;
    row.telegram_id = Set(input.telegram_id);
    row.balance = Set(Decimal::ZERO);
    if !row.total_spent.is_set() {
      row.total_spent = Set(Decimal::ZERO);
    }

    let mut on_conflict = OnConflict::column(user::Column::TelegramId);
    if columns.is_empty() {
      on_conflict.do_nothing();
    } else {
      on_conflict.update_columns(columns);
    }

    user::Entity::insert(row)
      .on_conflict(on_conflict)
      .exec_without_returning(self.db)
      .await?;

    self.by_telegram_id(input.telegram_id).await?.ok_or(Error::UserNotFound)
  }

  /// Updates the supplied fields of the user selected by `id`, falling back
  /// to `telegram_id`.
  pub async fn update(&self, input: UserChanges) -> Result<()> {
    let mut changes = input.profile.into_active()?;

    let target = match (input.id, input.telegram_id) {
      (Patch::Value(id), telegram_id) => {
        changes.telegram_id = telegram_id.required("telegram_id")?;
        user::Column::Id.eq(id)
      }
      (_, Patch::Value(telegram_id)) => {
        user::Column::TelegramId.eq(telegram_id)
      }
      _ => {
        return Err(Error::validation(
          "At least one of id or telegram_id must be provided",
        ));
      }
    };

    match patch::apply(self.db, changes, target).await? {
      0 => Err(Error::UserNotFound),
      _ => Ok(()),
    }
  }
}
