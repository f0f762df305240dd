//! Image hosting for members

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, http::header, web};
use rand::{Rng, distributions::Alphanumeric};
use tera::Context;

use crate::AppState;
use crate::controllers::read_upload;
use crate::db::{Database, is_unique_violation};
use crate::errors::{AppError, AppResult};
use crate::forms::FormErrors;
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::require_login;
use crate::models::{Image, User};
use crate::templates::render;

/// 5 MB
const IMAGE_LIMIT_BYTES: usize = 5 * 1000 * 1000;

const SLUG_LENGTH: usize = 10;

/// Fresh slugs tried before giving up on an upload
const SLUG_ATTEMPTS: usize = 5;

/// Served images never run script or load other resources
const IMAGE_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'; sandbox";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/images/")
            .route(web::get().to(image_list))
            .route(web::post().to(image_upload)),
    );
    cfg.service(
        web::resource("/images/{slug:[A-Za-z0-9_-]+}.{ext:[a-z]+}").route(web::get().to(image_raw)),
    );
    cfg.service(web::resource("/images/{slug}/delete/").route(web::post().to(image_delete)));
}

/// Content type for a stored extension, `None` when uploads of that kind are refused
pub fn image_content_type(extension: &str) -> Option<&'static str> {
    match extension {
        "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn random_slug() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LENGTH)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

/// Insert an image under the first slug from `next_slug` that is not taken
fn store_image(
    db: &Database,
    data: &[u8],
    extension: &str,
    user_id: i64,
    mut next_slug: impl FnMut() -> String,
) -> rusqlite::Result<Image> {
    let mut attempt = 1;
    loop {
        match db.create_image(&next_slug(), data, extension, Some(user_id)) {
            Err(e) if is_unique_violation(&e) && attempt < SLUG_ATTEMPTS => {
                log::warn!("Image slug collision, retrying");
                attempt += 1;
            }
            result => return result,
        }
    }
}

fn list_page(state: &AppState, req: &HttpRequest, user: &User, errors: &FormErrors) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("image_list", &state.db.list_images_by_user(user.id)?);
    context.insert("errors", errors);
    render(state, req, "images.html", context)
}

async fn image_list(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;
    list_page(&state, &req, &user, &FormErrors::new())
}

async fn image_upload(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;

    let mut errors = FormErrors::new();
    let Some(file) = read_upload(payload, "file", IMAGE_LIMIT_BYTES).await? else {
        errors.add("file", "This field is required.");
        return list_page(&state, &req, &user, &errors);
    };

    let extension = file.extension().unwrap_or_default();
    if image_content_type(&extension).is_none() {
        errors.add("file", "Unsupported image type.");
    } else if file.too_big {
        errors.add("file", "Image too big. Limit is 5MB.");
    }
    if !errors.is_empty() {
        log::warn!("Rejected image upload {:?} from {}", file.filename, user.username);
        return list_page(&state, &req, &user, &errors);
    }

    let image = store_image(&state.db, &file.data, &extension, user.id, random_slug)?;
    log::info!("Image {} uploaded by {}", image.path(), user.username);

    Ok(flash::redirect(
        &req,
        "/images/",
        vec![FlashMessage::success(format!("Image uploaded: {}", image.path()))],
    ))
}

async fn image_raw(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (slug, ext) = path.into_inner();
    let image = state.db.get_image_by_slug(&slug)?.ok_or(AppError::NotFound)?;
    if image.extension != ext {
        return Err(AppError::NotFound);
    }
    let content_type = image_content_type(&image.extension).unwrap_or("application/octet-stream");

    let mut builder = HttpResponse::Ok();
    builder
        .content_type(content_type)
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .insert_header((header::CONTENT_SECURITY_POLICY, IMAGE_CSP));
    // SVG may carry script, never shown inline
    if image.extension == "svg" {
        builder.insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.svg\"", image.slug),
        ));
    }
    Ok(builder.body(image.data))
}

async fn image_delete(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;
    let image = state.db.get_image_by_slug(&path)?.ok_or(AppError::NotFound)?;

    if image.uploaded_by != Some(user.id) && !user.is_superuser {
        return Err(AppError::PermissionDenied);
    }

    state.db.delete_image(image.id)?;
    Ok(flash::redirect(&req, "/images/", vec![FlashMessage::info("Image deleted.")]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::multipart_body;
    use crate::test_support::{TestApp, body_text, flash_messages};
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn test_random_slug() {
        let slug = random_slug();
        assert_eq!(slug.len(), SLUG_LENGTH);
        assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[actix_web::test]
    async fn test_upload_and_serve() {
        let app = TestApp::new();
        let user = app.create_user("gregory", false);
        let cookie = app.login(&user);
        let service = test::init_service(app.app()).await;

        let (content_type, body) = multipart_body("file", "diagram.PNG", b"\x89PNG fake");
        let req = test::TestRequest::post()
            .uri("/images/")
            .cookie(cookie.clone())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert!(flash_messages(&resp)[0].starts_with("Image uploaded: /images/"));

        let images = app.db().list_images_by_user(user.id).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].extension, "png");

        let resp = test::call_service(
            &service,
            test::TestRequest::get().uri(&images[0].path()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(test::read_body(resp).await.as_ref(), b"\x89PNG fake");

        let req = test::TestRequest::get()
            .uri("/images/")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert!(body_text(resp).await.contains(&images[0].slug));
    }

    #[actix_web::test]
    async fn test_upload_rejects_unknown_type() {
        let app = TestApp::new();
        let user = app.create_user("gregory", false);
        let service = test::init_service(app.app()).await;

        let (content_type, body) = multipart_body("file", "notes.txt", b"hello");
        let req = test::TestRequest::post()
            .uri("/images/")
            .cookie(app.login(&user))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&service, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Unsupported image type."));
        assert_eq!(app.db().count_images().unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_svg_is_sandboxed_download() {
        let app = TestApp::new();
        let user = app.create_user("gregory", false);
        let cookie = app.login(&user);
        let service = test::init_service(app.app()).await;

        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>fetch('/broadcast/',{method:'POST'})</script></svg>"#;
        let (content_type, body) = multipart_body("file", "x.svg", svg);
        let req = test::TestRequest::post()
            .uri("/images/")
            .cookie(cookie)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::FOUND);

        let image = app.db().list_images_by_user(user.id).unwrap().remove(0);
        let resp = test::call_service(
            &service,
            test::TestRequest::get().uri(&image.path()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let csp = resp.headers().get(header::CONTENT_SECURITY_POLICY).unwrap().to_str().unwrap();
        assert!(csp.contains("sandbox"));
        assert!(csp.contains("default-src 'none'"));
        let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
        assert!(disposition.starts_with("attachment"));
    }

    #[actix_web::test]
    async fn test_slug_collision_retries() {
        let app = TestApp::new();
        let user = app.create_user("gregory", false);
        app.db().create_image("abc", b"one", "png", Some(user.id)).unwrap();

        let mut slugs = vec!["def", "abc", "abc"];
        let image = store_image(app.db(), b"two", "png", user.id, || slugs.pop().unwrap().to_string()).unwrap();
        assert_eq!(image.slug, "def");
        assert_eq!(app.db().count_images().unwrap(), 2);

        let err = store_image(app.db(), b"three", "png", user.id, || "abc".to_string()).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[actix_web::test]
    async fn test_wrong_extension_is_not_found() {
        let app = TestApp::new();
        app.db().create_image("abc", b"data", "png", None).unwrap();
        let service = test::init_service(app.app()).await;

        let resp = test::call_service(&service, test::TestRequest::get().uri("/images/abc.gif").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_only_owner_deletes() {
        let app = TestApp::new();
        let owner = app.create_user("gregory", false);
        let other = app.create_user("ada", false);
        app.db().create_image("abc", b"data", "png", Some(owner.id)).unwrap();
        let service = test::init_service(app.app()).await;

        let req = test::TestRequest::post()
            .uri("/images/abc/delete/")
            .cookie(app.login(&other))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/images/abc/delete/")
            .cookie(app.login(&owner))
            .to_request();
        assert_eq!(test::call_service(&service, req).await.status(), StatusCode::FOUND);
        assert_eq!(app.db().count_images().unwrap(), 0);
    }
}
