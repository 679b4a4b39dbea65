use sqlx::{Pool, Sqlite};

/// Thin wrapper around the connection pool. All queries live in the
/// concern modules next to this file, each as an `impl Database` block.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}
