use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub generations_today: i32,
    pub last_generation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = colorings)]
#[diesel(belongs_to(Profile, foreign_key = user_id))]
pub struct Coloring {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub age_group: String,
    pub style: String,
    pub favorites_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = colorings)]
pub struct NewColoring {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub image_url: String,
    pub tags: Vec<String>,
    pub age_group: String,
    pub style: String,
}

#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = favorites)]
#[diesel(belongs_to(Coloring))]
#[diesel(belongs_to(Profile, foreign_key = user_id))]
#[diesel(primary_key(user_id, coloring_id))]
pub struct Favorite {
    pub user_id: Uuid,
    pub coloring_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = favorites)]
pub struct NewFavorite {
    pub user_id: Uuid,
    pub coloring_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = library_entries)]
#[diesel(belongs_to(Coloring))]
#[diesel(belongs_to(Profile, foreign_key = user_id))]
#[diesel(primary_key(user_id, coloring_id))]
pub struct LibraryEntry {
    pub user_id: Uuid,
    pub coloring_id: Uuid,
    pub is_favorite: bool,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = library_entries)]
pub struct NewLibraryEntry {
    pub user_id: Uuid,
    pub coloring_id: Uuid,
}

/// Row shape of `user_library_view`. The view can in principle surface NULLs
/// (outer union arms), so every projected column is optional here and the
/// reader enforces the non-null invariant explicitly.
#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = user_library_view)]
pub struct UserLibraryRow {
    pub user_id: Uuid,
    pub coloring_id: Option<Uuid>,
    pub prompt: Option<String>,
    pub tags: Option<Vec<String>>,
    pub age_group: Option<String>,
    pub style: Option<String>,
    pub favorites_count: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub added_at: Option<DateTime<Utc>>,
    pub library_favorite: Option<bool>,
    pub is_global_favorite: Option<bool>,
    pub owned: Option<bool>,
}
