use actix_multipart::form::MultipartFormConfig;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpResponse, HttpServer, cookie::Key, middleware, web};
use std::io;

use abstractbook::config::AppConfig;
use abstractbook::storage::LocalFileStorage;
use abstractbook::{audit, auth, db, routes, uploads};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    std::fs::create_dir_all(&config.cache_dir)?;
    std::fs::create_dir_all(&config.storage_dir)?;

    let pool = db::init_pool(&config.database_url)
        .await
        .map_err(io::Error::other)?;
    db::run_migrations(&pool).await.map_err(io::Error::other)?;

    if let Some(admin_password) = &config.admin_password {
        let admin_hash = auth::password::hash_password(admin_password).map_err(io::Error::other)?;
        db::seed_admin(&pool, &admin_hash).await.map_err(io::Error::other)?;
    }

    audit::cleanup_old_entries(&pool).await;

    let storage = LocalFileStorage::new(&config.storage_dir);
    if let Err(e) = uploads::purge_unclaimed(&pool, &storage, config.unclaimed_file_ttl).await {
        log::warn!("Unclaimed upload purge failed: {e}");
    }

    // Session encryption key; SESSION_KEY keeps sessions valid across restarts
    let secret_key = match &config.session_key {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    if config.latex_enabled {
        log::info!("LaTeX book generation enabled ({})", config.xelatex_path.display());
    } else {
        log::info!("LaTeX book generation disabled");
    }

    let bind_addr = config.bind_addr.clone();
    let max_upload_bytes = config.max_upload_bytes;
    let pool = web::Data::new(pool);
    let config = web::Data::new(config);
    let storage = web::Data::new(storage);

    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(storage.clone())
            .app_data(MultipartFormConfig::default().total_limit(max_upload_bytes))
            .configure(routes::configure)
            .default_service(web::to(|| async { HttpResponse::NotFound().body("Not Found") }))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
