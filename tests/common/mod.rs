//! Shared infrastructure for integration tests.
//!
//! Tests run against the Postgres server named by `TEST_DATABASE_URL`. Each
//! `TestDb` gets a fresh schema with migrations applied, plus its own cache
//! and storage directories. Without the variable, tests return early.

#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

use abstractbook::auth::password;
use abstractbook::config::AppConfig;
use abstractbook::db::MIGRATOR;
use abstractbook::models::contribution::{self, NewContribution, NewPerson};
use abstractbook::models::{event, permission, user};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const MANAGER_USER: &str = "manager";
pub const OTHER_USER: &str = "visitor";
pub const TEST_PASS: &str = "correct horse battery staple";

// ============================================================================
// DATABASE SETUP
// ============================================================================

pub struct TestDb {
    pub pool: PgPool,
    pub config: AppConfig,
    pub schema: String,
    pub dir: TempDir,
}

impl TestDb {
    /// `None` when no test database is configured.
    pub async fn new() -> Option<TestDb> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping database test");
            return None;
        };

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .expect("Failed to connect to TEST_DATABASE_URL");
        sqlx::query(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .expect("Failed to create test schema");
        admin.close().await;

        let search_path = schema.clone();
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .after_connect(move |conn, _meta| {
                let sql = format!("SET search_path TO {search_path}");
                Box::pin(async move {
                    sqlx::query(&sql).execute(conn).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .expect("Failed to connect test pool");
        MIGRATOR.run(&pool).await.expect("Failed to run migrations");

        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&url, dir.path());
        Some(TestDb { pool, config, schema, dir })
    }

    pub async fn teardown(self) {
        let _ = sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.pool)
            .await;
        self.pool.close().await;
    }
}

pub fn test_config(database_url: &str, dir: &Path) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        session_key: None,
        latex_enabled: false,
        xelatex_path: "xelatex".into(),
        latex_timeout: Duration::from_secs(30),
        cache_dir: dir.join("cache"),
        storage_dir: dir.join("files"),
        max_upload_bytes: 1024 * 1024,
        unclaimed_file_ttl: Duration::from_secs(3600),
        admin_password: None,
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub async fn create_user(pool: &PgPool, username: &str, perms: &[&str]) -> i64 {
    let hash = password::hash_password(TEST_PASS).expect("Failed to hash password");
    let id = user::create(pool, username, &hash, username)
        .await
        .expect("Failed to create user");
    for code in perms {
        permission::grant(pool, id, code).await.expect("Failed to grant permission");
    }
    id
}

/// An event managed by `MANAGER_USER`, plus a second user without rights.
pub async fn managed_event(pool: &PgPool, published: bool) -> i64 {
    let manager = create_user(pool, MANAGER_USER, &[]).await;
    create_user(pool, OTHER_USER, &[]).await;
    let event_id = event::create(pool, "Neutrino Days 2026", false)
        .await
        .expect("Failed to create event");
    event::add_manager(pool, event_id, manager).await.expect("Failed to add manager");
    contribution::set_published(pool, event_id, published)
        .await
        .expect("Failed to set published");
    event_id
}

pub async fn add_contribution(pool: &PgPool, event_id: i64, friendly_id: i64, title: &str) -> i64 {
    let new = NewContribution {
        friendly_id,
        title: title.to_string(),
        description: format!("Abstract of {title} with 100% more $pecial characters."),
        submitter_name: Some("Ada Submitter".to_string()),
        submitter_email: Some("ada@example.org".to_string()),
        ..NewContribution::default()
    };
    let persons = [NewPerson {
        name: "Grace Speaker".to_string(),
        affiliation: "CERN".to_string(),
        email: "grace@example.org".to_string(),
        is_speaker: true,
        is_author: true,
    }];
    contribution::create(pool, event_id, &new, &persons)
        .await
        .expect("Failed to create contribution")
}

// ============================================================================
// HTTP HELPERS
// ============================================================================

/// Build the application service for a `TestDb`.
macro_rules! test_app {
    ($db:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::from(&[7u8; 64]),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new($db.pool.clone()))
                .app_data(actix_web::web::Data::new($db.config.clone()))
                .app_data(actix_web::web::Data::new(
                    abstractbook::storage::LocalFileStorage::new(&$db.config.storage_dir),
                ))
                .configure(abstractbook::routes::configure),
        )
        .await
    };
}

/// A signed-in browser: session cookie and the CSRF token stored in it.
pub struct Browser {
    pub cookie: Cookie<'static>,
    pub csrf: String,
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "id")
        .map(|c| c.into_owned())
}

pub fn csrf_from_html(html: &str) -> String {
    let re = regex::Regex::new(r#"name="csrf_token" value="([0-9a-f]{64})""#).unwrap();
    re.captures(html)
        .map(|c| c[1].to_string())
        .expect("No CSRF token in page")
}

/// Sign in through the login form and return the browser state.
macro_rules! login {
    ($app:expr, $username:expr) => {{
        let resp = actix_web::test::call_service(
            &$app,
            actix_web::test::TestRequest::get().uri("/login").to_request(),
        )
        .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
        let cookie = common::session_cookie(&resp).expect("No session cookie on login page");
        let html = String::from_utf8(actix_web::test::read_body(resp).await.to_vec()).unwrap();
        let csrf = common::csrf_from_html(&html);

        let req = actix_web::test::TestRequest::post()
            .uri("/login")
            .cookie(cookie.clone())
            .set_form([
                ("username", $username),
                ("password", common::TEST_PASS),
                ("csrf_token", csrf.as_str()),
                ("next", "/"),
            ])
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::SEE_OTHER, "login failed");
        let cookie = common::session_cookie(&resp).unwrap_or(cookie);
        common::Browser { cookie, csrf }
    }};
}

/// `multipart/form-data` body with one `file` part.
pub fn multipart_file(filename: &str, content_type: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----abstractbook-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
