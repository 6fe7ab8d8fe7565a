use std::time::Duration;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpResponse, HttpServer, cookie::Key, middleware, web};
use rand::Rng;

use consenso::config::AppConfig;
use consenso::storage::LocalBlobStore;
use consenso::{db, handlers, scheduler};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let pool = match db::init_pool(&config.database_url, config.db_max_connections).await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Cannot connect to the database: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&pool).await {
        log::error!("{e}");
        std::process::exit(1);
    }
    if let Err(e) = db::seed_admin(&pool, &config).await {
        log::error!("Seeding the admin account failed: {e}");
        std::process::exit(1);
    }

    let secret_key = match &config.session_key {
        Some(key) => Key::from(key.as_bytes()),
        None => Key::generate(),
    };

    let signing_key = match &config.storage_signing_key {
        Some(key) => key.as_bytes().to_vec(),
        None => rand::rng().random::<[u8; 32]>().to_vec(),
    };
    let store = LocalBlobStore::new(&config.storage_dir, signing_key);
    if let Err(e) = store.ensure_root().await {
        log::error!("Storage directory {} is not usable: {e}", config.storage_dir);
        std::process::exit(1);
    }

    let sweep_every = Duration::from_secs(config.expiry_sweep_secs.max(1));
    scheduler::spawn_expiry_sweep(pool.clone(), sweep_every);

    let bind_addr = config.bind_addr.clone();
    log::info!("Starting server at http://{bind_addr}");

    let pool = web::Data::new(pool);
    let store = web::Data::new(store);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        let session_mw =
            SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                .cookie_secure(false)
                .cookie_http_only(true)
                .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(pool.clone())
            .app_data(store.clone())
            .app_data(config.clone())
            .app_data(handlers::json_config())
            .app_data(handlers::query_config())
            .app_data(handlers::path_config())
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                let html = include_str!("../templates/errors/404.html");
                HttpResponse::NotFound()
                    .content_type("text/html; charset=utf-8")
                    .body(html)
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
