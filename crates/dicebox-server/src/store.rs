use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use dicebox_core::{IdeaPool, IdeaRecord, ParameterQuery, PoolError, PregeneratedIdea};

// ---------------------------------------------------------------------------
// PgIdeaPool
// ---------------------------------------------------------------------------

/// Postgres-backed idea pool. Matching is set membership per axis
/// (`= ANY($n)`), consumption is oldest-first. Store errors are passed
/// through as their own message, verbatim.
#[derive(Clone)]
pub struct PgIdeaPool {
    pool: PgPool,
}

impl PgIdeaPool {
    /// Connect and run the embedded migrations.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }
}

#[derive(sqlx::FromRow)]
struct IdeaRow {
    id: Uuid,
    idea: String,
    focus_group: String,
    topic: String,
    medium: String,
    created_at: DateTime<Utc>,
    illustration_url: Option<String>,
    postcard_url: Option<String>,
}

impl From<IdeaRow> for PregeneratedIdea {
    fn from(row: IdeaRow) -> Self {
        Self {
            id: row.id,
            idea: row.idea,
            focus_group: row.focus_group,
            topic: row.topic,
            medium: row.medium,
            created_at: row.created_at,
            illustration_url: row.illustration_url,
            postcard_url: row.postcard_url,
        }
    }
}

fn pool_err(e: sqlx::Error) -> PoolError {
    PoolError::Query(e.to_string())
}

impl IdeaPool for PgIdeaPool {
    async fn oldest_matching(
        &self,
        query: &ParameterQuery,
    ) -> Result<Option<PregeneratedIdea>, PoolError> {
        let row = sqlx::query_as::<_, IdeaRow>(
            "SELECT id, idea, focus_group, topic, medium, created_at, \
                    illustration_url, postcard_url \
             FROM pregenerated_ideas \
             WHERE focus_group = ANY($1) AND topic = ANY($2) AND medium = ANY($3) \
             ORDER BY created_at ASC \
             LIMIT 1",
        )
        .bind(&query.focus_groups)
        .bind(&query.topics)
        .bind(&query.mediums)
        .fetch_optional(&self.pool)
        .await
        .map_err(pool_err)?;

        Ok(row.map(PregeneratedIdea::from))
    }

    async fn count_matching(&self, query: &ParameterQuery) -> Result<u64, PoolError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pregenerated_ideas \
             WHERE focus_group = ANY($1) AND topic = ANY($2) AND medium = ANY($3)",
        )
        .bind(&query.focus_groups)
        .bind(&query.topics)
        .bind(&query.mediums)
        .fetch_one(&self.pool)
        .await
        .map_err(pool_err)?;

        Ok(count as u64)
    }

    async fn insert(&self, idea: &IdeaRecord) -> Result<(), PoolError> {
        sqlx::query(
            "INSERT INTO pregenerated_ideas \
                (idea, focus_group, topic, medium, illustration_url, postcard_url) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&idea.idea)
        .bind(&idea.focus_group)
        .bind(&idea.topic)
        .bind(&idea.medium)
        .bind(&idea.illustration_url)
        .bind(&idea.postcard_url)
        .execute(&self.pool)
        .await
        .map_err(pool_err)?;

        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), PoolError> {
        sqlx::query("DELETE FROM pregenerated_ideas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(pool_err)?;

        Ok(())
    }

    async fn archive(&self, idea: &IdeaRecord) -> Result<(), PoolError> {
        sqlx::query(
            "INSERT INTO ideas \
                (idea, focus_group, topic, medium, illustration_url, postcard_url) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&idea.idea)
        .bind(&idea.focus_group)
        .bind(&idea.topic)
        .bind(&idea.medium)
        .bind(&idea.illustration_url)
        .bind(&idea.postcard_url)
        .execute(&self.pool)
        .await
        .map_err(pool_err)?;

        Ok(())
    }
}
