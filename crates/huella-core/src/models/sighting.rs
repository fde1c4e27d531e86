//! Sighting post model.
//!
//! A sighting owns an ordered sequence of image references
//! (`display_order` 0..N-1, the first marked primary). Records are only
//! ever created whole: the post row and all its image rows commit together
//! or not at all.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "animal_type", rename_all = "lowercase"))]
pub enum AnimalType {
    Dog,
    Cat,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "sex", rename_all = "lowercase"))]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "animal_size", rename_all = "lowercase"))]
pub enum AnimalSize {
    Small,
    Medium,
    Large,
}

/// Public URLs of one uploaded image pair. Ownership transfers to the
/// persistence layer once the post transaction commits; if it never
/// commits the stored objects are orphaned and cleaned up out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImageRef {
    pub image_url: String,
    pub thumbnail_url: String,
}

/// Caller-supplied fields of a sighting submission, before moderation and
/// upload have run.
#[derive(Debug, Clone)]
pub struct NewSighting {
    pub animal_type: AnimalType,
    pub sex: Sex,
    pub size: AnimalSize,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: Option<String>,
    pub sighting_date: NaiveDate,
    pub description: Option<String>,
    pub contact_method: Option<String>,
}

/// One persisted image row belonging to a sighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingImage {
    pub id: Uuid,
    pub image_url: String,
    pub thumbnail_url: String,
    pub display_order: i32,
    pub is_primary: bool,
}

/// A fully persisted sighting post with its ordered images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SightingRecord {
    pub id: Uuid,
    /// Stable public identifier assigned by the database.
    pub post_number: i64,
    /// Primary image URLs, duplicated on the post row for older readers.
    pub image_url: String,
    pub thumbnail_url: String,
    pub animal_type: AnimalType,
    pub sex: Sex,
    pub size: AnimalSize,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: Option<String>,
    pub sighting_date: NaiveDate,
    pub description: Option<String>,
    pub contact_method: Option<String>,
    pub pending_approval: bool,
    pub moderation_reason: Option<String>,
    pub validation_service: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub images: Vec<SightingImage>,
}
