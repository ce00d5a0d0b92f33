//! Book of abstracts export tests: covers the public PDF and the TeX archive.
//!
//! - Unpublished contributions hide the book
//! - Custom PDF vs generated PDF selection, including the `latex=1` preview
//! - TeX zip for managers

#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use std::io::Read;

use abstractbook::models::file::{self, FileContext, NewFile};
use abstractbook::models::{contribution, event};
use abstractbook::storage::LocalFileStorage;
use common::*;

fn pdf_uri(event_id: i64) -> String {
    format!("/event/{event_id}/book-of-abstracts.pdf")
}

/// Attach a custom BOA directly through the models.
async fn attach_custom_boa(db: &TestDb, event_id: i64, content: &[u8]) {
    let storage = LocalFileStorage::new(&db.config.storage_dir);
    let key = storage.store(content).await.unwrap();
    let stored = file::create(
        &db.pool,
        &NewFile {
            filename: "Proceedings.pdf",
            content_type: "application/pdf",
            size: content.len() as i64,
            storage_key: &key,
            context: &FileContext::new("event", event_id, "boa"),
        },
    )
    .await
    .unwrap();
    assert!(file::claim(&db.pool, stored.id).await.unwrap());
    event::set_custom_boa(&db.pool, event_id, Some(stored.id)).await.unwrap();
}

#[cfg(unix)]
fn fake_xelatex(dir: &std::path::Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-xelatex");
    std::fs::write(
        &path,
        "#!/bin/sh\ntest -f book-of-abstracts.tex || exit 3\nprintf '%%PDF-1.5 generated' > book-of-abstracts.pdf\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[actix_rt::test]
async fn test_export_requires_published_contributions() {
    let Some(db) = TestDb::new().await else { return };
    let event_id = managed_event(&db.pool, false).await;
    attach_custom_boa(&db, event_id, b"%PDF custom").await;
    let app = test_app!(db);

    let req = test::TestRequest::get().uri(&pdf_uri(event_id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    contribution::set_published(&db.pool, event_id, true).await.unwrap();
    let req = test::TestRequest::get().uri(&pdf_uri(event_id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    db.teardown().await;
}

#[actix_rt::test]
async fn test_export_without_custom_boa_or_latex_is_not_found() {
    let Some(db) = TestDb::new().await else { return };
    let event_id = managed_event(&db.pool, true).await;
    let app = test_app!(db);

    let req = test::TestRequest::get().uri(&pdf_uri(event_id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    db.teardown().await;
}

#[actix_rt::test]
async fn test_export_serves_custom_boa_inline() {
    let Some(db) = TestDb::new().await else { return };
    let event_id = managed_event(&db.pool, true).await;
    attach_custom_boa(&db, event_id, b"%PDF-1.7 custom book").await;
    let app = test_app!(db);

    let req = test::TestRequest::get().uri(&pdf_uri(event_id)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("Content-Type").unwrap(), "application/pdf");
    let disposition = resp.headers().get("Content-Disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.starts_with("inline"), "{disposition}");
    assert!(disposition.contains("Proceedings.pdf"), "{disposition}");
    assert_eq!(test::read_body(resp).await.as_ref(), b"%PDF-1.7 custom book");

    db.teardown().await;
}

#[actix_rt::test]
async fn test_unknown_event_is_not_found() {
    let Some(db) = TestDb::new().await else { return };
    let app = test_app!(db);

    let req = test::TestRequest::get().uri(&pdf_uri(999_999)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get().uri("/event/not-a-number/book-of-abstracts.pdf").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    db.teardown().await;
}

#[actix_rt::test]
async fn test_protected_event_is_hidden_from_visitors() {
    let Some(db) = TestDb::new().await else { return };
    let event_id = managed_event(&db.pool, true).await;
    sqlx::query("UPDATE events SET is_protected = TRUE WHERE id = $1")
        .bind(event_id)
        .execute(&db.pool)
        .await
        .unwrap();
    attach_custom_boa(&db, event_id, b"%PDF custom").await;
    let app = test_app!(db);

    let req = test::TestRequest::get().uri(&pdf_uri(event_id)).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let manager = login!(app, MANAGER_USER);
    let req = test::TestRequest::get()
        .uri(&pdf_uri(event_id))
        .cookie(manager.cookie.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    db.teardown().await;
}

#[cfg(unix)]
#[actix_rt::test]
async fn test_latex_preview_overrides_custom_boa_for_managers() {
    let Some(mut db) = TestDb::new().await else { return };
    let event_id = managed_event(&db.pool, true).await;
    add_contribution(&db.pool, event_id, 1, "Sterile neutrinos").await;
    attach_custom_boa(&db, event_id, b"%PDF-1.7 custom book").await;
    db.config.latex_enabled = true;
    db.config.xelatex_path = fake_xelatex(db.dir.path());
    let app = test_app!(db);

    // Anonymous callers asking for the preview still get the custom PDF
    let req = test::TestRequest::get().uri(&format!("{}?latex=1", pdf_uri(event_id))).to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body.as_ref(), b"%PDF-1.7 custom book");

    let manager = login!(app, MANAGER_USER);

    // Only `latex=1` asks for the preview
    let req = test::TestRequest::get()
        .uri(&format!("{}?latex=true", pdf_uri(event_id)))
        .cookie(manager.cookie.clone())
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body.as_ref(), b"%PDF-1.7 custom book");

    let req = test::TestRequest::get()
        .uri(&format!("{}?latex=1", pdf_uri(event_id)))
        .cookie(manager.cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("Content-Type").unwrap(), "application/pdf");
    let disposition = resp.headers().get("Content-Disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.contains("book-of-abstracts.pdf"), "{disposition}");
    assert_eq!(test::read_body(resp).await.as_ref(), b"%PDF-1.5 generated");

    // The generated book is cached for the next request
    let cached = abstractbook::models::boa_settings::get_cache_path(&db.pool, event_id)
        .await
        .unwrap();
    assert_eq!(cached.as_deref(), Some(format!("boa-{event_id}-0.pdf").as_str()));
    assert!(db.config.cache_dir.join(format!("boa-{event_id}-0.pdf")).exists());

    db.teardown().await;
}

#[actix_rt::test]
async fn test_tex_export_is_a_zip_with_the_source() {
    let Some(db) = TestDb::new().await else { return };
    let event_id = managed_event(&db.pool, false).await;
    add_contribution(&db.pool, event_id, 7, "Dark matter & friends").await;
    let app = test_app!(db);
    let manager = login!(app, MANAGER_USER);

    let req = test::TestRequest::get()
        .uri(&format!("/event/{event_id}/manage/abstracts/boa.zip"))
        .cookie(manager.cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("Content-Type").unwrap(), "application/zip");
    let disposition = resp.headers().get("Content-Disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"), "{disposition}");

    let bytes = test::read_body(resp).await;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
    let mut tex = String::new();
    archive
        .by_name("book-of-abstracts.tex")
        .unwrap()
        .read_to_string(&mut tex)
        .unwrap();
    assert!(tex.contains("Neutrino Days 2026"));
    assert!(tex.contains(r"Dark matter \& friends"));
    assert!(tex.contains(r"100\% more \$pecial"));

    db.teardown().await;
}
