use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::NewFavorite,
    schema::{colorings, favorites},
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFavoriteResponse {
    pub is_favorite: bool,
    pub favorites_count: i32,
}

/// Toggles the requesting user's global favorite on a coloring.
///
/// The denormalized `favorites_count` is recomputed from the favorites
/// relation inside the same transaction rather than incremented, so
/// concurrent toggles always settle on the true row count.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(coloring_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<ToggleFavoriteResponse>> {
    let user_id = user.user_id;
    let mut conn = state.db()?;

    let response = conn.transaction::<_, AppError, _>(|conn| {
        let exists: i64 = colorings::table
            .filter(colorings::id.eq(coloring_id))
            .count()
            .get_result(conn)?;
        if exists == 0 {
            return Err(AppError::not_found());
        }

        let already_favorited: i64 = favorites::table
            .filter(favorites::user_id.eq(user_id))
            .filter(favorites::coloring_id.eq(coloring_id))
            .count()
            .get_result(conn)?;

        let is_favorite = if already_favorited > 0 {
            diesel::delete(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::coloring_id.eq(coloring_id)),
            )
            .execute(conn)?;
            false
        } else {
            diesel::insert_into(favorites::table)
                .values(&NewFavorite {
                    user_id,
                    coloring_id,
                })
                .execute(conn)?;
            true
        };

        let favorites_count: i64 = favorites::table
            .filter(favorites::coloring_id.eq(coloring_id))
            .count()
            .get_result(conn)?;
        let favorites_count = i32::try_from(favorites_count)
            .map_err(|_| AppError::internal("favorites count out of range"))?;

        diesel::update(colorings::table.filter(colorings::id.eq(coloring_id)))
            .set(colorings::favorites_count.eq(favorites_count))
            .execute(conn)?;

        Ok(ToggleFavoriteResponse {
            is_favorite,
            favorites_count,
        })
    })?;

    info!(
        %user_id,
        %coloring_id,
        is_favorite = response.is_favorite,
        favorites_count = response.favorites_count,
        "global favorite toggled"
    );

    Ok(Json(response))
}
