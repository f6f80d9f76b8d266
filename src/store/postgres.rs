use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::{debug, info};

use super::{Direction, Document, DocumentStore, Filter, OrderBy, StoreError, Write};

/// Collections stored as rows of one JSONB table, see `migrations/`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;
        info!("connected to postgres document store");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn order_clause(order: Option<&OrderBy>) -> &'static str {
    match order.map(|o| o.direction) {
        Some(Direction::Asc) => "ORDER BY data -> $4 ASC, id",
        Some(Direction::Desc) => "ORDER BY data -> $4 DESC, id",
        None => "ORDER BY id",
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Document>>(
            r#"
            SELECT data
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = format!(
            "SELECT data FROM documents WHERE collection = $1 AND data -> $2 = $3 {}",
            order_clause(order)
        );
        let mut query = sqlx::query_scalar::<_, Json<Document>>(&sql)
            .bind(collection)
            .bind(&filter.field)
            .bind(Json(&filter.value));
        if let Some(order) = order {
            query = query.bind(&order.field);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_scalar::<_, Json<Document>>(
            r#"
            SELECT data
            FROM documents
            WHERE collection = $1
            ORDER BY id
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for write in writes {
            match write {
                Write::Create {
                    collection,
                    id,
                    data,
                } => {
                    let inserted = sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (collection, id) DO NOTHING
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(Json(&data))
                    .execute(&mut *tx)
                    .await?;
                    if inserted.rows_affected() == 0 {
                        return Err(StoreError::AlreadyExists { collection, id });
                    }
                }
                Write::Set {
                    collection,
                    id,
                    data,
                } => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (collection, id)
                        DO UPDATE SET data = EXCLUDED.data, updated_at = now()
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(Json(&data))
                    .execute(&mut *tx)
                    .await?;
                }
                Write::Update {
                    collection,
                    id,
                    patch,
                } => {
                    let current = sqlx::query_scalar::<_, Json<Document>>(
                        r#"
                        SELECT data
                        FROM documents
                        WHERE collection = $1 AND id = $2
                        FOR UPDATE
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .fetch_optional(&mut *tx)
                    .await?;
                    let Some(Json(mut data)) = current else {
                        return Err(StoreError::MissingDocument { collection, id });
                    };
                    patch.apply(&mut data);
                    sqlx::query(
                        r#"
                        UPDATE documents
                        SET data = $3, updated_at = now()
                        WHERE collection = $1 AND id = $2
                        "#,
                    )
                    .bind(&collection)
                    .bind(&id)
                    .bind(Json(&data))
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
        tx.commit().await?;
        debug!("document batch committed");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
