use axum::Router;
use sqlx::PgPool;

use crate::Config;

mod health;
mod points;
mod uplink;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(uplink::router())
        .merge(points::router())
        .merge(health::router())
        .with_state((pool, config))
}
