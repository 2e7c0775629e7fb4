use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    ai::{self, GatewayError},
    auth::AuthenticatedUser,
    domain::{AgeGroup, ColoringStyle},
    error::{AppError, AppResult},
    models::{Coloring, NewColoring},
    quota,
    schema::colorings::dsl,
    state::AppState,
};

const MAX_PROMPT_LENGTH: usize = 500;
const MAX_BATCH_COUNT: i32 = 5;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    pub age_group: String,
    pub style: String,
    #[serde(default = "default_count")]
    pub count: i32,
}

fn default_count() -> i32 {
    1
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub colorings: Vec<ColoringResponse>,
    pub remaining_generations: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColoringResponse {
    pub id: Uuid,
    pub image_url: String,
    pub prompt: String,
    pub tags: Vec<String>,
    pub age_group: String,
    pub style: String,
    pub favorites_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Coloring> for ColoringResponse {
    fn from(coloring: Coloring) -> Self {
        Self {
            id: coloring.id,
            image_url: coloring.image_url,
            prompt: coloring.prompt,
            tags: coloring.tags,
            age_group: coloring.age_group,
            style: coloring.style,
            favorites_count: coloring.favorites_count,
            created_at: coloring.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationLimitResponse {
    pub remaining: i32,
    pub limit: i32,
    pub resets_at: DateTime<Utc>,
}

struct ValidatedRequest {
    prompt: String,
    age_group: AgeGroup,
    style: ColoringStyle,
    count: i32,
}

fn validate_request(payload: GenerateRequest) -> AppResult<ValidatedRequest> {
    let prompt = payload.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::validation("Opis kolorowanki nie może być pusty."));
    }
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        return Err(AppError::validation(
            "Opis kolorowanki może mieć najwyżej 500 znaków.",
        ));
    }
    if payload.count < 1 || payload.count > MAX_BATCH_COUNT {
        return Err(AppError::validation(
            "Liczba kolorowanek musi być od 1 do 5.",
        ));
    }
    let age_group = AgeGroup::parse(&payload.age_group)
        .ok_or_else(|| AppError::validation("Nieznana grupa wiekowa."))?;
    let style = ColoringStyle::parse(&payload.style)
        .ok_or_else(|| AppError::validation("Nieznany styl kolorowanki."))?;

    Ok(ValidatedRequest {
        prompt,
        age_group,
        style,
        count: payload.count,
    })
}

/// The full generation flow: validate, reserve quota, moderate, fan out the
/// model calls, persist, report remaining quota.
///
/// Quota is reserved before any model call so denied requests cost nothing.
/// A batch that produces no rows refunds its reservation.
pub async fn generate_colorings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let request = validate_request(payload)?;
    let user_id = user.user_id;

    {
        let mut conn = state.db()?;
        let allowed = quota::reserve_generations(&mut conn, user_id, request.count)?;
        if !allowed {
            return Err(AppError::daily_limit_exceeded());
        }
    }

    let verdict = ai::moderation::check_prompt_safety(state.gateway.as_ref(), &request.prompt).await;
    if !verdict.safe {
        warn!(
            %user_id,
            reason = verdict.reason.as_deref().unwrap_or(""),
            "unsafe prompt rejected"
        );
        return Err(AppError::unsafe_content());
    }

    info!(
        %user_id,
        prompt_length = request.prompt.len(),
        age_group = request.age_group.as_str(),
        style = request.style.as_str(),
        count = request.count,
        "starting generation"
    );

    let gateway = state.gateway.as_ref();
    let image_futures = (0..request.count).map(|_| {
        ai::image::synthesize_image(gateway, &request.prompt, request.age_group, request.style)
    });
    let (images, tags) = tokio::join!(
        try_join_all(image_futures),
        ai::tags::synthesize_tags(gateway, &request.prompt),
    );

    let images = match images {
        Ok(images) => images,
        Err(err) => {
            refund_reservation(&state, user_id, request.count);
            return Err(map_generation_error(err));
        }
    };

    let rows: Vec<NewColoring> = images
        .into_iter()
        .map(|image| NewColoring {
            id: Uuid::new_v4(),
            user_id,
            prompt: request.prompt.clone(),
            image_url: image.to_data_url(),
            tags: tags.clone(),
            age_group: request.age_group.as_str().to_string(),
            style: request.style.as_str().to_string(),
        })
        .collect();

    let mut conn = state.db()?;
    let saved = match persist_batch(&mut conn, rows) {
        Ok(saved) => saved,
        Err(err) => {
            drop(conn);
            refund_reservation(&state, user_id, request.count);
            return Err(err);
        }
    };

    let remaining = quota::remaining_generations(&mut conn, user_id)?;

    info!(
        %user_id,
        generated = saved.len(),
        remaining,
        "generation request completed"
    );

    Ok(Json(GenerateResponse {
        colorings: saved.into_iter().map(ColoringResponse::from).collect(),
        remaining_generations: remaining,
    }))
}

pub async fn generation_limit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<GenerationLimitResponse>> {
    let mut conn = state.db()?;
    let remaining = quota::remaining_generations(&mut conn, user.user_id)?;

    Ok(Json(GenerationLimitResponse {
        remaining,
        limit: quota::DAILY_LIMIT,
        resets_at: quota::next_reset_time()?,
    }))
}

/// Inserts a generated batch. When an insert fails mid-batch, the siblings
/// already written for this request are deleted so a failed batch leaves no
/// rows behind.
pub fn persist_batch(conn: &mut PgConnection, rows: Vec<NewColoring>) -> AppResult<Vec<Coloring>> {
    let mut saved: Vec<Coloring> = Vec::with_capacity(rows.len());
    for row in rows {
        match diesel::insert_into(dsl::colorings)
            .values(&row)
            .get_result::<Coloring>(conn)
        {
            Ok(coloring) => saved.push(coloring),
            Err(err) => {
                error!(user_id = %row.user_id, error = %err, "coloring insert failed, rolling back batch");
                let sibling_ids: Vec<Uuid> = saved.iter().map(|coloring| coloring.id).collect();
                if !sibling_ids.is_empty() {
                    if let Err(cleanup_err) =
                        diesel::delete(dsl::colorings.filter(dsl::id.eq_any(&sibling_ids)))
                            .execute(conn)
                    {
                        error!(error = %cleanup_err, "sibling cleanup failed");
                    }
                }
                return Err(AppError::generation_failed());
            }
        }
    }
    Ok(saved)
}

fn map_generation_error(err: GatewayError) -> AppError {
    if err.is_timeout() {
        AppError::generation_timeout()
    } else {
        AppError::generation_failed()
    }
}

/// Best effort. A failed refund is logged and swallowed so the caller still
/// sees the original generation error.
fn refund_reservation(state: &AppState, user_id: Uuid, count: i32) {
    let result = state
        .db()
        .and_then(|mut conn| quota::refund_generations(&mut conn, user_id, count));
    if let Err(err) = result {
        error!(%user_id, count, error = %err, "quota refund failed");
    }
}
