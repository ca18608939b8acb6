use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use tubely_core::models::Video;
use tubely_core::AppError;
use uuid::Uuid;

/// Metadata collaborator used by the ingestion pipeline.
///
/// `update_video` overwrites the whole record; there is no version check, so
/// two writers racing on one record resolve to whichever update lands last.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError>;

    async fn update_video(&self, video: &Video) -> Result<(), AppError>;
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))
}

#[derive(Clone)]
pub struct PostgresVideoRepository {
    pool: PgPool,
}

impl PostgresVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PostgresVideoRepository {
    #[tracing::instrument(skip(self), fields(db.table = "videos", db.operation = "select"))]
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<Postgres, Video>(
            "SELECT id, user_id, title, description, thumbnail_url, video_url, created_at, updated_at FROM videos WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    #[tracing::instrument(skip(self, video), fields(db.table = "videos", db.operation = "update", video_id = %video.id))]
    async fn update_video(&self, video: &Video) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE videos
            SET title = $2, description = $3, thumbnail_url = $4, video_url = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.thumbnail_url)
        .bind(&video.video_url)
        .bind(video.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Video {} not found", video.id)));
        }

        Ok(())
    }
}
