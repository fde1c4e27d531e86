//! Sighting persistence.
//!
//! One repository, one write path: a sighting post and its ordered image
//! rows are created inside a single transaction, so a post either exists
//! with its full image set or not at all. `post_number` is assigned by
//! the database on insert.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use huella_core::models::{
    AnimalSize, AnimalType, NewSighting, Sex, SightingImage, SightingRecord, UploadedImageRef,
};
use huella_core::AppError;

use crate::transaction::TransactionGuard;

/// Persistence seam for sighting posts.
#[async_trait]
pub trait SightingRepository: Send + Sync {
    /// Atomically create a sighting with its ordered images. The first
    /// image is the primary one; its URLs are duplicated on the post row.
    async fn create_with_images(
        &self,
        sighting: NewSighting,
        images: Vec<UploadedImageRef>,
        pending_approval: bool,
        moderation_reason: Option<String>,
        validation_service: Option<String>,
    ) -> Result<SightingRecord, AppError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<SightingRecord>, AppError>;

    /// Soft-delete: the row stays for audit but disappears from listings.
    async fn deactivate(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct SightingRow {
    id: Uuid,
    post_number: i64,
    image_url: String,
    thumbnail_url: String,
    animal_type: AnimalType,
    sex: Sex,
    size: AnimalSize,
    latitude: f64,
    longitude: f64,
    location_name: Option<String>,
    sighting_date: NaiveDate,
    description: Option<String>,
    contact_method: Option<String>,
    pending_approval: bool,
    moderation_reason: Option<String>,
    validation_service: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SightingImageRow {
    id: Uuid,
    image_url: String,
    thumbnail_url: String,
    display_order: i32,
    is_primary: bool,
}

fn row_to_record(row: SightingRow, image_rows: Vec<SightingImageRow>) -> SightingRecord {
    let images = image_rows
        .into_iter()
        .map(|r| SightingImage {
            id: r.id,
            image_url: r.image_url,
            thumbnail_url: r.thumbnail_url,
            display_order: r.display_order,
            is_primary: r.is_primary,
        })
        .collect();

    SightingRecord {
        id: row.id,
        post_number: row.post_number,
        image_url: row.image_url,
        thumbnail_url: row.thumbnail_url,
        animal_type: row.animal_type,
        sex: row.sex,
        size: row.size,
        latitude: row.latitude,
        longitude: row.longitude,
        location_name: row.location_name,
        sighting_date: row.sighting_date,
        description: row.description,
        contact_method: row.contact_method,
        pending_approval: row.pending_approval,
        moderation_reason: row.moderation_reason,
        validation_service: row.validation_service,
        is_active: row.is_active,
        created_at: row.created_at,
        images,
    }
}

#[derive(Clone)]
pub struct PostgresSightingRepository {
    pool: PgPool,
}

impl PostgresSightingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SightingRepository for PostgresSightingRepository {
    #[tracing::instrument(
        skip(self, sighting, images),
        fields(db.table = "sightings", db.operation = "insert", image_count = images.len())
    )]
    async fn create_with_images(
        &self,
        sighting: NewSighting,
        images: Vec<UploadedImageRef>,
        pending_approval: bool,
        moderation_reason: Option<String>,
        validation_service: Option<String>,
    ) -> Result<SightingRecord, AppError> {
        let primary = images.first().ok_or_else(|| {
            AppError::InvalidInput("a sighting requires at least one image".to_string())
        })?;

        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let row: SightingRow = sqlx::query_as::<Postgres, SightingRow>(
            r#"
            INSERT INTO sightings (
                id, image_url, thumbnail_url,
                animal_type, sex, size,
                latitude, longitude, location_name, sighting_date,
                description, contact_method,
                pending_approval, moderation_reason, validation_service,
                is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&primary.image_url)
        .bind(&primary.thumbnail_url)
        .bind(sighting.animal_type)
        .bind(sighting.sex)
        .bind(sighting.size)
        .bind(sighting.latitude)
        .bind(sighting.longitude)
        .bind(&sighting.location_name)
        .bind(sighting.sighting_date)
        .bind(&sighting.description)
        .bind(&sighting.contact_method)
        .bind(pending_approval)
        .bind(&moderation_reason)
        .bind(&validation_service)
        .bind(true)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        let mut image_rows = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let image_row: SightingImageRow = sqlx::query_as::<Postgres, SightingImageRow>(
                r#"
                INSERT INTO sighting_images (
                    id, sighting_id, image_url, thumbnail_url, display_order, is_primary
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, image_url, thumbnail_url, display_order, is_primary
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&image.image_url)
            .bind(&image.thumbnail_url)
            .bind(index as i32)
            .bind(index == 0)
            .fetch_one(&mut **tx)
            .await?;

            image_rows.push(image_row);
        }

        tx.commit().await?;

        tracing::info!(
            sighting_id = %id,
            post_number = row.post_number,
            pending_approval,
            "Sighting persisted"
        );

        Ok(row_to_record(row, image_rows))
    }

    #[tracing::instrument(skip(self), fields(db.table = "sightings", db.operation = "select"))]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<SightingRecord>, AppError> {
        let row: Option<SightingRow> =
            sqlx::query_as::<Postgres, SightingRow>("SELECT * FROM sightings WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let image_rows: Vec<SightingImageRow> = sqlx::query_as::<Postgres, SightingImageRow>(
            r#"
            SELECT id, image_url, thumbnail_url, display_order, is_primary
            FROM sighting_images
            WHERE sighting_id = $1
            ORDER BY display_order
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row_to_record(row, image_rows)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "sightings", db.operation = "update"))]
    async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE sightings SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("sighting {} not found", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_record_keeps_image_order() {
        let sighting_id = Uuid::new_v4();
        let row = SightingRow {
            id: sighting_id,
            post_number: 42,
            image_url: "https://cdn.example.com/posts/a.jpg".to_string(),
            thumbnail_url: "https://cdn.example.com/posts/a_thumb.jpg".to_string(),
            animal_type: AnimalType::Dog,
            sex: Sex::Unknown,
            size: AnimalSize::Medium,
            latitude: -33.45,
            longitude: -70.66,
            location_name: Some("Parque Forestal".to_string()),
            sighting_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            description: None,
            contact_method: None,
            pending_approval: false,
            moderation_reason: None,
            validation_service: None,
            is_active: true,
            created_at: Utc::now(),
        };

        let image_rows = (0..3)
            .map(|i| SightingImageRow {
                id: Uuid::new_v4(),
                image_url: format!("https://cdn.example.com/posts/{}.jpg", i),
                thumbnail_url: format!("https://cdn.example.com/posts/{}_thumb.jpg", i),
                display_order: i,
                is_primary: i == 0,
            })
            .collect();

        let record = row_to_record(row, image_rows);

        assert_eq!(record.post_number, 42);
        assert_eq!(record.images.len(), 3);
        assert!(record.images[0].is_primary);
        assert!(!record.images[2].is_primary);
        let orders: Vec<i32> = record.images.iter().map(|i| i.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }
}
