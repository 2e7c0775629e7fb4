use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult, ErrorCode},
    models::{NewLibraryEntry, UserLibraryRow},
    schema::{colorings, library_entries, user_library_view},
    state::AppState,
};

use super::gallery::Pagination;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 50;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub favorites_only: Option<bool>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LibrarySort {
    Added,
    Created,
}

struct ValidatedLibraryQuery {
    page: i64,
    limit: i64,
    favorites_only: bool,
    sort_by: LibrarySort,
}

fn validate_query(params: LibraryQuery) -> AppResult<ValidatedLibraryQuery> {
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
    let sort_by = match params.sort_by.as_deref() {
        None | Some("created") => LibrarySort::Created,
        Some("added") => LibrarySort::Added,
        Some(_) => return Err(AppError::validation("Nieznane sortowanie.")),
    };

    Ok(ValidatedLibraryQuery {
        page,
        limit,
        favorites_only: params.favorites_only.unwrap_or(false),
        sort_by,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryListItem {
    pub id: Uuid,
    pub prompt: String,
    pub tags: Vec<String>,
    pub age_group: String,
    pub style: String,
    pub favorites_count: i32,
    pub created_at: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
    pub is_library_favorite: bool,
    pub is_global_favorite: bool,
    pub owned: bool,
}

#[derive(Serialize)]
pub struct LibraryResponse {
    pub data: Vec<LibraryListItem>,
    pub pagination: Pagination,
}

/// Every projected column must be present for a library row. The view is an
/// inner join under the hood, so a NULL here means the view definition and
/// the reader disagree; that is a hard error, not a row to skip.
fn map_row(row: UserLibraryRow) -> AppResult<LibraryListItem> {
    let (Some(id), Some(prompt), Some(age_group), Some(style), Some(favorites_count), Some(created_at), Some(added_at)) = (
        row.coloring_id,
        row.prompt,
        row.age_group,
        row.style,
        row.favorites_count,
        row.created_at,
        row.added_at,
    ) else {
        error!(user_id = %row.user_id, "library view row with null required fields");
        return Err(AppError::internal(
            "Nieprawidłowe dane kolorowanki w bibliotece.",
        ));
    };

    Ok(LibraryListItem {
        id,
        prompt,
        tags: row.tags.unwrap_or_default(),
        age_group,
        style,
        favorites_count,
        created_at,
        added_at,
        is_library_favorite: row.library_favorite.unwrap_or(false),
        is_global_favorite: row.is_global_favorite.unwrap_or(false),
        owned: row.owned.unwrap_or(false),
    })
}

pub async fn list_library(
    State(state): State<AppState>,
    Query(params): Query<LibraryQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<LibraryResponse>> {
    let params = validate_query(params)?;
    let mut conn = state.db()?;

    let base = || {
        let mut query = user_library_view::table
            .filter(user_library_view::user_id.eq(user.user_id))
            .into_boxed();
        if params.favorites_only {
            query = query.filter(user_library_view::library_favorite.eq(true));
        }
        query
    };

    let total: i64 = base().count().get_result(&mut conn)?;

    let mut query = base();
    query = match params.sort_by {
        LibrarySort::Added => query.order(user_library_view::added_at.desc()),
        LibrarySort::Created => query.order(user_library_view::created_at.desc()),
    };

    let offset = (params.page - 1) * params.limit;
    let rows: Vec<UserLibraryRow> = query
        .limit(params.limit)
        .offset(offset)
        .load(&mut conn)?;

    let data = rows
        .into_iter()
        .map(map_row)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(LibraryResponse {
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
pub struct SaveToLibraryResponse {
    pub saved: bool,
}

/// Saves someone else's coloring into the user's library. The user's own
/// colorings are already implicit members, so saving them is rejected.
pub async fn save_to_library(
    State(state): State<AppState>,
    Path(coloring_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<(StatusCode, Json<SaveToLibraryResponse>)> {
    let mut conn = state.db()?;

    let owner_id: Uuid = colorings::table
        .find(coloring_id)
        .select(colorings::user_id)
        .first(&mut conn)?;

    if owner_id == user.user_id {
        return Err(AppError::validation(
            "Twoje własne kolorowanki są już w bibliotece.",
        ));
    }

    let inserted = diesel::insert_into(library_entries::table)
        .values(&NewLibraryEntry {
            user_id: user.user_id,
            coloring_id,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    info!(user_id = %user.user_id, %coloring_id, newly_saved = inserted > 0, "coloring saved to library");

    let status = if inserted > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(SaveToLibraryResponse { saved: true })))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLibraryFavoriteResponse {
    pub is_favorite: bool,
}

/// Flips the library-local favorite flag. Requires an explicit library
/// entry; implicit (owned) members have nothing to flip.
pub async fn toggle_library_favorite(
    State(state): State<AppState>,
    Path(coloring_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<ToggleLibraryFavoriteResponse>> {
    let mut conn = state.db()?;

    let current: bool = library_entries::table
        .filter(library_entries::user_id.eq(user.user_id))
        .filter(library_entries::coloring_id.eq(coloring_id))
        .select(library_entries::is_favorite)
        .first(&mut conn)
        .map_err(|err| match err {
            diesel::result::Error::NotFound => AppError::new(
                ErrorCode::NotFound,
                "Kolorowanka nie została znaleziona w Twojej bibliotece.",
            ),
            other => AppError::from(other),
        })?;

    let next = !current;
    diesel::update(
        library_entries::table
            .filter(library_entries::user_id.eq(user.user_id))
            .filter(library_entries::coloring_id.eq(coloring_id)),
    )
    .set(library_entries::is_favorite.eq(next))
    .execute(&mut conn)?;

    Ok(Json(ToggleLibraryFavoriteResponse { is_favorite: next }))
}

/// Removes a saved coloring from the library. Ownership is a hard guard:
/// a user's own generated colorings cannot leave their library.
pub async fn remove_from_library(
    State(state): State<AppState>,
    Path(coloring_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;

    let owner_id: Uuid = colorings::table
        .find(coloring_id)
        .select(colorings::user_id)
        .first(&mut conn)?;

    if owner_id == user.user_id {
        warn!(user_id = %user.user_id, %coloring_id, "attempt to remove own coloring from library");
        return Err(AppError::cannot_remove_own());
    }

    let deleted = diesel::delete(
        library_entries::table
            .filter(library_entries::user_id.eq(user.user_id))
            .filter(library_entries::coloring_id.eq(coloring_id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::new(
            ErrorCode::NotFound,
            "Kolorowanka nie została znaleziona w Twojej bibliotece.",
        ));
    }

    info!(user_id = %user.user_id, %coloring_id, "coloring removed from library");
    Ok(StatusCode::NO_CONTENT)
}
