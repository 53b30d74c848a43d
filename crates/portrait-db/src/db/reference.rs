use portrait_core::models::{Area, Language};
use portrait_core::AppError;
use sqlx::{PgPool, Postgres};

/// Read access to the languages and areas a profile can refer to.
#[async_trait::async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn languages(&self) -> Result<Vec<Language>, AppError>;

    async fn areas(&self) -> Result<Vec<Area>, AppError>;

    /// Ids from `ids` that do not name a known language, in input order.
    async fn unknown_language_ids(&self, ids: &[i32]) -> Result<Vec<i32>, AppError>;

    /// Ids from `ids` that do not name a known area, in input order.
    async fn unknown_area_ids(&self, ids: &[i32]) -> Result<Vec<i32>, AppError>;
}

#[derive(Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReferenceStore for ReferenceRepository {
    #[tracing::instrument(skip(self), fields(db.table = "languages", db.operation = "select"))]
    async fn languages(&self) -> Result<Vec<Language>, AppError> {
        let languages = sqlx::query_as::<Postgres, Language>(
            r#"
            SELECT id, name, code
            FROM languages
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(languages)
    }

    #[tracing::instrument(skip(self), fields(db.table = "areas", db.operation = "select"))]
    async fn areas(&self) -> Result<Vec<Area>, AppError> {
        let areas = sqlx::query_as::<Postgres, Area>(
            r#"
            SELECT id, name, city, country
            FROM areas
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(areas)
    }

    #[tracing::instrument(skip(self), fields(db.table = "languages", db.operation = "select"))]
    async fn unknown_language_ids(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let unknown = sqlx::query_scalar::<Postgres, i32>(
            r#"
            SELECT t.id
            FROM UNNEST($1::INT[]) WITH ORDINALITY AS t(id, ord)
            WHERE NOT EXISTS (SELECT 1 FROM languages l WHERE l.id = t.id)
            ORDER BY t.ord
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(unknown)
    }

    #[tracing::instrument(skip(self), fields(db.table = "areas", db.operation = "select"))]
    async fn unknown_area_ids(&self, ids: &[i32]) -> Result<Vec<i32>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let unknown = sqlx::query_scalar::<Postgres, i32>(
            r#"
            SELECT t.id
            FROM UNNEST($1::INT[]) WITH ORDINALITY AS t(id, ord)
            WHERE NOT EXISTS (SELECT 1 FROM areas a WHERE a.id = t.id)
            ORDER BY t.ord
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(unknown)
    }
}
