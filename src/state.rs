use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    ai::ModelGateway,
    auth::jwt::JwtService,
    cache::ImageCache,
    config::AppConfig,
    db::PgPool,
    error::{AppError, AppResult},
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn ModelGateway>,
    pub jwt: JwtService,
    pub image_cache: Arc<ImageCache>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: AppConfig,
        gateway: Arc<dyn ModelGateway>,
        jwt: JwtService,
        image_cache: Arc<ImageCache>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            gateway,
            jwt,
            image_cache,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
