use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::models::proposal;

/// Periodically move overdue IN_REVIEW proposals to EXPIRED.
pub fn spawn_expiry_sweep(pool: PgPool, every: Duration) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            run_expiry_sweep(&pool).await;
        }
    });
}

/// One sweep pass; failures are logged and retried on the next tick.
pub async fn run_expiry_sweep(pool: &PgPool) {
    let today = Utc::now().date_naive();
    match proposal::expire_overdue(pool, today).await {
        Ok(ids) if ids.is_empty() => log::debug!("Expiry sweep: nothing to expire"),
        Ok(ids) => log::info!("Expiry sweep: expired proposals {ids:?}"),
        Err(e) => log::error!("Expiry sweep failed: {e}"),
    }
}
