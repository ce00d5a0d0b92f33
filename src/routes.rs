use actix_web::{HttpResponse, middleware::from_fn, web};

use crate::auth::middleware::{
    require_auth, require_contributions_published, require_event_access, require_event_manager,
};
use crate::handlers::{auth_handlers, boa_handlers};

/// All application routes. Middleware registered last with `.wrap` runs
/// first, so authentication wraps the event checks.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/login", web::get().to(auth_handlers::login_page))
        .route("/login", web::post().to(auth_handlers::login_submit))
        .route("/logout", web::post().to(auth_handlers::logout))
        // Management scope before the public event scope: both match /event/{id}.
        .service(
            web::scope("/event/{event_id}/manage/abstracts")
                .wrap(from_fn(require_event_manager))
                .wrap(from_fn(require_auth))
                .route("/boa/settings", web::get().to(boa_handlers::settings_form))
                .route("/boa/settings", web::post().to(boa_handlers::save_settings))
                .route("/boa/upload-file", web::post().to(boa_handlers::upload_file))
                .route("/boa/custom", web::post().to(boa_handlers::set_custom_boa))
                .route("/boa/custom", web::delete().to(boa_handlers::delete_custom_boa))
                .route("/boa.zip", web::get().to(boa_handlers::export_boa_tex)),
        )
        .service(
            web::scope("/event/{event_id}")
                .wrap(from_fn(require_contributions_published))
                .wrap(from_fn(require_event_access))
                .route("/book-of-abstracts.pdf", web::get().to(boa_handlers::export_boa)),
        );
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Book of abstracts service")
}
