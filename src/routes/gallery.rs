use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::OptionalUser,
    domain::{AgeGroup, ColoringStyle},
    error::{AppError, AppResult},
    models::Coloring,
    schema::{colorings, favorites},
    state::AppState,
};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 50;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub age_groups: Option<String>,
    pub styles: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortBy {
    Newest,
    Popular,
}

struct ValidatedGalleryQuery {
    page: i64,
    limit: i64,
    search: Option<String>,
    age_groups: Vec<AgeGroup>,
    styles: Vec<ColoringStyle>,
    sort_by: SortBy,
}

fn validate_query(params: GalleryQuery) -> AppResult<ValidatedGalleryQuery> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::validation("Numer strony musi być dodatni."));
    }
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::validation(
            "Rozmiar strony musi być od 1 do 50.",
        ));
    }

    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let age_groups = parse_csv(params.age_groups.as_deref(), AgeGroup::parse)
        .ok_or_else(|| AppError::validation("Nieznana grupa wiekowa."))?;
    if age_groups.len() > AgeGroup::ALL.len() {
        return Err(AppError::validation("Za dużo grup wiekowych."));
    }
    let styles = parse_csv(params.styles.as_deref(), ColoringStyle::parse)
        .ok_or_else(|| AppError::validation("Nieznany styl kolorowanki."))?;
    if styles.len() > ColoringStyle::ALL.len() {
        return Err(AppError::validation("Za dużo stylów."));
    }

    let sort_by = match params.sort_by.as_deref() {
        None | Some("newest") => SortBy::Newest,
        Some("popular") => SortBy::Popular,
        Some(_) => return Err(AppError::validation("Nieznane sortowanie.")),
    };

    Ok(ValidatedGalleryQuery {
        page,
        limit,
        search,
        age_groups,
        styles,
        sort_by,
    })
}

/// Parses a comma-separated filter list. `None` result means an unknown
/// member was present; an absent or empty parameter is an empty filter.
fn parse_csv<T>(raw: Option<&str>, parse: impl Fn(&str) -> Option<T>) -> Option<Vec<T>> {
    let Some(raw) = raw else {
        return Some(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(parse)
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryListItem {
    pub id: Uuid,
    pub prompt: String,
    pub tags: Vec<String>,
    pub age_group: String,
    pub style: String,
    pub favorites_count: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorited: Option<bool>,
}

#[derive(Queryable)]
struct GalleryListRow {
    id: Uuid,
    prompt: String,
    tags: Vec<String>,
    age_group: String,
    style: String,
    favorites_count: i32,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct GalleryResponse {
    pub data: Vec<GalleryListItem>,
    pub pagination: Pagination,
}

type BoxedColorings<'a> = colorings::BoxedQuery<'a, diesel::pg::Pg>;

fn filtered_colorings(params: &ValidatedGalleryQuery) -> BoxedColorings<'_> {
    let mut query = colorings::table.into_boxed();

    if !params.age_groups.is_empty() {
        let groups: Vec<&str> = params.age_groups.iter().map(|g| g.as_str()).collect();
        query = query.filter(colorings::age_group.eq_any(groups));
    }
    if !params.styles.is_empty() {
        let styles: Vec<&str> = params.styles.iter().map(|s| s.as_str()).collect();
        query = query.filter(colorings::style.eq_any(styles));
    }
    if let Some(search) = params.search.as_ref() {
        let pattern = format!("%{search}%");
        query = query.filter(
            colorings::prompt
                .ilike(pattern)
                .or(colorings::tags.contains(vec![search.clone()])),
        );
    }

    query
}

/// The requesting user's favorited coloring ids. Degrades to an empty set on
/// error so an anonymous-safe read never fails because of the annotation.
fn favorite_ids(conn: &mut PgConnection, user_id: Uuid) -> HashSet<Uuid> {
    match favorites::table
        .filter(favorites::user_id.eq(user_id))
        .select(favorites::coloring_id)
        .load::<Uuid>(conn)
    {
        Ok(ids) => ids.into_iter().collect(),
        Err(err) => {
            warn!(%user_id, error = %err, "favorite lookup failed, continuing without favorites");
            HashSet::new()
        }
    }
}

pub async fn list_gallery(
    State(state): State<AppState>,
    Query(params): Query<GalleryQuery>,
    OptionalUser(user): OptionalUser,
) -> AppResult<Json<GalleryResponse>> {
    let params = validate_query(params)?;
    let mut conn = state.db()?;

    let total: i64 = filtered_colorings(&params).count().get_result(&mut conn)?;

    let mut query = filtered_colorings(&params).select((
        colorings::id,
        colorings::prompt,
        colorings::tags,
        colorings::age_group,
        colorings::style,
        colorings::favorites_count,
        colorings::created_at,
    ));
    query = match params.sort_by {
        SortBy::Newest => query.order(colorings::created_at.desc()),
        SortBy::Popular => query
            .order(colorings::favorites_count.desc())
            .then_order_by(colorings::created_at.desc()),
    };

    let offset = (params.page - 1) * params.limit;
    let rows: Vec<GalleryListRow> = query
        .limit(params.limit)
        .offset(offset)
        .load(&mut conn)?;

    let favorited = user
        .as_ref()
        .map(|user| favorite_ids(&mut conn, user.user_id));

    let data = rows
        .into_iter()
        .map(|row| GalleryListItem {
            is_favorited: favorited.as_ref().map(|ids| ids.contains(&row.id)),
            id: row.id,
            prompt: row.prompt,
            tags: row.tags,
            age_group: row.age_group,
            style: row.style,
            favorites_count: row.favorites_count,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(GalleryResponse {
        data,
        pagination: Pagination {
            page: params.page,
            limit: params.limit,
            total,
            total_pages: (total + params.limit - 1) / params.limit,
        },
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColoringDetailResponse {
    pub id: Uuid,
    pub image_url: String,
    pub prompt: String,
    pub tags: Vec<String>,
    pub age_group: String,
    pub style: String,
    pub favorites_count: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorited: Option<bool>,
}

pub async fn get_coloring(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    OptionalUser(user): OptionalUser,
) -> AppResult<Json<ColoringDetailResponse>> {
    let mut conn = state.db()?;

    let coloring: Coloring = colorings::table.find(id).first(&mut conn)?;

    let is_favorited = user
        .as_ref()
        .map(|user| favorite_ids(&mut conn, user.user_id).contains(&coloring.id));

    Ok(Json(ColoringDetailResponse {
        id: coloring.id,
        image_url: coloring.image_url,
        prompt: coloring.prompt,
        tags: coloring.tags,
        age_group: coloring.age_group,
        style: coloring.style,
        favorites_count: coloring.favorites_count,
        created_at: coloring.created_at,
        is_favorited,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColoringImageResponse {
    pub id: Uuid,
    pub image_url: String,
}

/// Single-record image fetch backing lazy loading in list views. Served from
/// the process-local cache when possible; colorings are immutable so cached
/// entries never go stale.
pub async fn get_coloring_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ColoringImageResponse>> {
    if let Some(image_url) = state.image_cache.get(id) {
        return Ok(Json(ColoringImageResponse { id, image_url }));
    }

    let mut conn = state.db()?;
    let image_url: String = colorings::table
        .find(id)
        .select(colorings::image_url)
        .first(&mut conn)?;

    state.image_cache.insert(id, image_url.clone());
    Ok(Json(ColoringImageResponse { id, image_url }))
}
