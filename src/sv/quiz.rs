use sea_orm::sea_query::OnConflict;
use serde::Deserialize;

use crate::{
  entity::{quiz_answer, quiz_hash},
  prelude::*,
};

#[derive(Debug, Deserialize)]
pub struct QuizPair {
  pub question: String,
  pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct UserAnswer {
  pub telegram_id: i64,
  #[serde(flatten)]
  pub pair: QuizPair,
}

impl QuizPair {
  fn hash(&self) -> Result<String> {
    if self.question.trim().is_empty() {
      return Err(Error::validation("`question` cannot be empty"));
    }
    Ok(utils::content_hash(&self.question, &self.answer))
  }
}

pub struct Quiz<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Quiz<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Stores the pair under its content hash. Existing mappings are kept.
  pub async fn save_mapping(&self, pair: QuizPair) -> Result<String> {
    let hash = pair.hash()?;

    quiz_hash::Entity::insert(quiz_hash::ActiveModel {
      hash: Set(hash.clone()),
      question: Set(pair.question),
      answer: Set(pair.answer),
    })
    .on_conflict(
      OnConflict::column(quiz_hash::Column::Hash).do_nothing().to_owned(),
    )
    .exec_without_returning(self.db)
    .await?;

    Ok(hash)
  }

  pub async fn by_hash(&self, hash: &str) -> Result<quiz_hash::Model> {
    quiz_hash::Entity::find_by_id(hash)
      .one(self.db)
      .await?
      .ok_or(Error::HashNotFound)
  }

  /// Records the latest answer of a user to a question.
  pub async fn save_answer(&self, input: UserAnswer) -> Result<String> {
    let hash = input.pair.hash()?;

    quiz_answer::Entity::insert(quiz_answer::ActiveModel {
      telegram_id: Set(input.telegram_id),
      question: Set(input.pair.question),
      answer: Set(input.pair.answer),
      hash: Set(hash.clone()),
    })
    .on_conflict(
      OnConflict::columns([
        quiz_answer::Column::TelegramId,
        quiz_answer::Column::Question,
      ])
      .update_columns([quiz_answer::Column::Answer, quiz_answer::Column::Hash])
      .to_owned(),
    )
    .exec_without_returning(self.db)
    .await?;

    Ok(hash)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::setup_test_db;

  fn pair(question: &str, answer: &str) -> QuizPair {
    QuizPair { question: question.into(), answer: answer.into() }
  }

  #[tokio::test]
  async fn test_mapping_roundtrip() {
    let db = setup_test_db().await;
    let sv = Quiz::new(&db);

    let hash = sv.save_mapping(pair("2+2?", "4")).await.unwrap();
    assert_eq!(hash, utils::content_hash("2+2?", "4"));

    // second save is a no-op
    assert_eq!(sv.save_mapping(pair("2+2?", "4")).await.unwrap(), hash);

    let stored = sv.by_hash(&hash).await.unwrap();
    assert_eq!(stored.question, "2+2?");
    assert_eq!(stored.answer, "4");

    assert!(matches!(sv.by_hash("nope").await, Err(Error::HashNotFound)));
  }

  #[tokio::test]
  async fn test_answer_upsert_keeps_latest() {
    let db = setup_test_db().await;
    let sv = Quiz::new(&db);

    for answer in ["3", "4"] {
      sv.save_answer(UserAnswer { telegram_id: 42, pair: pair("2+2?", answer) })
        .await
        .unwrap();
    }

    let rows = quiz_answer::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].answer, "4");
    assert_eq!(rows[0].hash, utils::content_hash("2+2?", "4"));
  }

  #[tokio::test]
  async fn test_empty_question_rejected() {
    let db = setup_test_db().await;
    let res = Quiz::new(&db).save_mapping(pair("  ", "x")).await;
    assert!(matches!(res, Err(Error::Validation(_))));
  }
}
