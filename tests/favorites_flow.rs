mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use diesel::prelude::*;
use malowanko::schema::{colorings, favorites};
use serde_json::json;
use uuid::Uuid;

async fn stored_favorites_count(app: &TestApp, coloring_id: Uuid) -> Result<(i32, i64)> {
    app.with_conn(move |conn| {
        let cached: i32 = colorings::table
            .find(coloring_id)
            .select(colorings::favorites_count)
            .first(conn)?;
        let actual: i64 = favorites::table
            .filter(favorites::coloring_id.eq(coloring_id))
            .count()
            .get_result(conn)?;
        Ok((cached, actual))
    })
    .await
}

#[tokio::test]
async fn toggle_recomputes_cached_count_both_ways() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let owner = app.insert_user("autor@example.com", "s3cret-haslo").await?;
    let coloring_id = app
        .insert_coloring(owner, "kot", &["kot"], "4-8", "klasyczny")
        .await?;
    app.insert_user("fan@example.com", "s3cret-haslo").await?;
    let token = app.login_token("fan@example.com", "s3cret-haslo").await?;

    let path = format!("/api/gallery/{coloring_id}/favorite");

    let response = app.post_json(&path, &json!({}), Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["isFavorite"], true);
    assert_eq!(body["favoritesCount"], 1);
    let (cached, actual) = stored_favorites_count(&app, coloring_id).await?;
    assert_eq!((cached, actual), (1, 1));

    let response = app.post_json(&path, &json!({}), Some(&token)).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["isFavorite"], false);
    assert_eq!(body["favoritesCount"], 0);
    let (cached, actual) = stored_favorites_count(&app, coloring_id).await?;
    assert_eq!((cached, actual), (0, 0));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn count_tracks_multiple_users() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let owner = app.insert_user("autor@example.com", "s3cret-haslo").await?;
    let coloring_id = app
        .insert_coloring(owner, "kot", &["kot"], "4-8", "klasyczny")
        .await?;

    let path = format!("/api/gallery/{coloring_id}/favorite");
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        app.insert_user(email, "s3cret-haslo").await?;
        let token = app.login_token(email, "s3cret-haslo").await?;
        let response = app.post_json(&path, &json!({}), Some(&token)).await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let (cached, actual) = stored_favorites_count(&app, coloring_id).await?;
    assert_eq!((cached, actual), (3, 3));

    // One user un-favorites; the cached value follows the row count.
    let token = app.login_token("b@example.com", "s3cret-haslo").await?;
    let response = app.post_json(&path, &json!({}), Some(&token)).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["favoritesCount"], 2);
    let (cached, actual) = stored_favorites_count(&app, coloring_id).await?;
    assert_eq!((cached, actual), (2, 2));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn unknown_coloring_and_anonymous_toggles_are_rejected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("fan@example.com", "s3cret-haslo").await?;
    let token = app.login_token("fan@example.com", "s3cret-haslo").await?;

    let missing = Uuid::new_v4();
    let response = app
        .post_json(
            &format!("/api/gallery/{missing}/favorite"),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let response = app
        .post_json(&format!("/api/gallery/{missing}/favorite"), &json!({}), None)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}
