//! SeaORM entity definitions

pub mod node;
pub mod payment;
pub mod quiz_answer;
pub mod quiz_hash;
pub mod user;

pub use node::NodeStatus;
pub use payment::{PaymentStatus, Transition};

#[cfg(test)]
pub async fn setup_test_db() -> sea_orm::DatabaseConnection {
  use sea_orm::{ConnectionTrait, Database, DbBackend, Schema};

  let db = Database::connect("sqlite::memory:").await.unwrap();
  let schema = Schema::new(DbBackend::Sqlite);
  let backend = db.get_database_backend();

  let tables = [
    schema.create_table_from_entity(user::Entity),
    schema.create_table_from_entity(node::Entity),
    schema.create_table_from_entity(payment::Entity),
    schema.create_table_from_entity(quiz_hash::Entity),
    schema.create_table_from_entity(quiz_answer::Entity),
  ];

  for stmt in &tables {
    db.execute(backend.build(stmt)).await.unwrap();
  }

  db
}
