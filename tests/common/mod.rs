use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use http_body_util::BodyExt;
use malowanko::ai::{ChatRequest, GatewayError, GeneratedImage, ModelGateway};
use malowanko::auth::jwt::JwtService;
use malowanko::auth::password;
use malowanko::cache::ImageCache;
use malowanko::config::AppConfig;
use malowanko::db::{self, PgPool};
use malowanko::models::NewProfile;
use malowanko::routes;
use malowanko::state::AppState;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const FAKE_IMAGE_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

#[derive(Clone)]
pub enum SafetyScript {
    Safe,
    Unsafe(&'static str),
    Error,
}

#[derive(Clone)]
pub enum TagScript {
    Tags(Vec<&'static str>),
    Malformed,
    Error,
}

#[derive(Clone)]
pub enum ImageScript {
    Image,
    Timeout,
    Error,
}

/// Scripted stand-in for the model endpoints. Behavior per concern is set up
/// front and call counts are tracked so tests can assert which external
/// calls were (not) made.
pub struct FakeGateway {
    safety: StdMutex<SafetyScript>,
    tags: StdMutex<TagScript>,
    image: StdMutex<ImageScript>,
    pub safety_calls: AtomicUsize,
    pub tag_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            safety: StdMutex::new(SafetyScript::Safe),
            tags: StdMutex::new(TagScript::Tags(vec!["kot", "zwierzęta"])),
            image: StdMutex::new(ImageScript::Image),
            safety_calls: AtomicUsize::new(0),
            tag_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeGateway {
    pub fn script_safety(&self, script: SafetyScript) {
        *self.safety.lock().unwrap() = script;
    }

    pub fn script_tags(&self, script: TagScript) {
        *self.tags.lock().unwrap() = script;
    }

    pub fn script_image(&self, script: ImageScript) {
        *self.image.lock().unwrap() = script;
    }

    pub fn safety_call_count(&self) -> usize {
        self.safety_calls.load(Ordering::SeqCst)
    }

    pub fn tag_call_count(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    pub fn image_call_count(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn chat_json(&self, request: ChatRequest) -> Result<serde_json::Value, GatewayError> {
        match request.schema_name {
            "safety_check" => {
                self.safety_calls.fetch_add(1, Ordering::SeqCst);
                match self.safety.lock().unwrap().clone() {
                    SafetyScript::Safe => Ok(json!({"safe": true, "reason": ""})),
                    SafetyScript::Unsafe(reason) => {
                        Ok(json!({"safe": false, "reason": reason}))
                    }
                    SafetyScript::Error => {
                        Err(GatewayError::Transport("scripted failure".to_string()))
                    }
                }
            }
            "tags" => {
                self.tag_calls.fetch_add(1, Ordering::SeqCst);
                match self.tags.lock().unwrap().clone() {
                    TagScript::Tags(tags) => Ok(json!({ "tags": tags })),
                    TagScript::Malformed => Ok(json!({"tags": "not-an-array"})),
                    TagScript::Error => {
                        Err(GatewayError::Transport("scripted failure".to_string()))
                    }
                }
            }
            other => Err(GatewayError::Parse(format!("unexpected schema {other}"))),
        }
    }

    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, GatewayError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        match self.image.lock().unwrap().clone() {
            ImageScript::Image => Ok(GeneratedImage {
                mime_type: "image/png".to_string(),
                base64: FAKE_IMAGE_BASE64.to_string(),
            }),
            ImageScript::Timeout => Err(GatewayError::Timeout),
            ImageScript::Error => Err(GatewayError::Http {
                status: 500,
                body: "scripted failure".to_string(),
            }),
        }
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            openrouter_api_key: "test-key".to_string(),
            openrouter_base_url: "http://127.0.0.1:0".to_string(),
            app_url: "http://localhost:3000".to_string(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let gateway = Arc::new(FakeGateway::default());
        let gateway_for_state: Arc<dyn ModelGateway> = gateway.clone();
        let jwt = JwtService::from_config(&config)?;
        let image_cache = Arc::new(ImageCache::new(8));
        let state = AppState::new(pool.clone(), config, gateway_for_state, jwt, image_cache);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            gateway,
        })
    }

    pub fn gateway(&self) -> Arc<FakeGateway> {
        self.gateway.clone()
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    pub async fn insert_user(&self, email: &str, password_text: &str) -> Result<Uuid> {
        let email = email.to_string();
        let password_text = password_text.to_string();
        self.with_conn(move |conn| {
            let password_hash = password::hash_password(&password_text)?;
            let profile = NewProfile {
                id: Uuid::new_v4(),
                email,
                password_hash,
            };
            diesel::insert_into(malowanko::schema::profiles::table)
                .values(&profile)
                .execute(conn)
                .context("failed to insert profile")?;
            Ok(profile.id)
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn insert_coloring(
        &self,
        user_id: Uuid,
        prompt: &str,
        tags: &[&str],
        age_group: &str,
        style: &str,
    ) -> Result<Uuid> {
        let prompt = prompt.to_string();
        let tags: Vec<String> = tags.iter().map(|tag| tag.to_string()).collect();
        let age_group = age_group.to_string();
        let style = style.to_string();
        self.with_conn(move |conn| {
            let coloring = malowanko::models::NewColoring {
                id: Uuid::new_v4(),
                user_id,
                prompt,
                image_url: format!("data:image/png;base64,{FAKE_IMAGE_BASE64}"),
                tags,
                age_group,
                style,
            };
            diesel::insert_into(malowanko::schema::colorings::table)
                .values(&coloring)
                .execute(conn)
                .context("failed to insert coloring")?;
            Ok(coloring.id)
        })
        .await
    }

    pub async fn login_token(&self, email: &str, password_text: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/login",
                &LoginPayload {
                    email,
                    password: password_text,
                },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let builder = Request::builder().method(Method::DELETE).uri(path);
        let builder = if let Some(token) = token {
            builder.header("authorization", format!("Bearer {token}"))
        } else {
            builder
        };
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn body_to_json(body: Body) -> Result<serde_json::Value> {
    let bytes = body_to_vec(body).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("database preparation task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE library_entries, favorites, colorings, profiles RESTART IDENTITY CASCADE",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
