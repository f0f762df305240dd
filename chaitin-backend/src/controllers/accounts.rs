//! Member accounts: sign-up, login, profile editing, avatar and public profile pages

use actix_multipart::Multipart;
use actix_web::cookie::Cookie;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use tera::Context;

use crate::AppState;
use crate::controllers::images::image_content_type;
use crate::controllers::read_upload;
use crate::db::is_unique_violation;
use crate::errors::{AppError, AppResult};
use crate::forms::{FormErrors, LoginForm, UserCreationForm, UserUpdateForm};
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::{
    current_user, extract_token, removal_cookie, require_login, session_cookie,
};
use crate::models::User;
use crate::passwords::{hash_password, verify_password};
use crate::templates::render;

/// Accepted as 1MB, measured loosely
const AVATAR_LIMIT_BYTES: usize = 1_200_000;

const MSG_USERNAME_TAKEN: &str = "A user with that username already exists.";
const MSG_BAD_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/accounts/login/")
            .route(web::get().to(login_page))
            .route(web::post().to(login)),
    );
    cfg.service(web::resource("/accounts/logout/").route(web::post().to(logout)));
    cfg.service(
        web::resource("/accounts/create/")
            .route(web::get().to(user_create_page))
            .route(web::post().to(user_create)),
    );
    cfg.service(
        web::resource("/accounts/edit/")
            .route(web::get().to(user_update_page))
            .route(web::post().to(user_update)),
    );
    cfg.service(
        web::resource("/accounts/edit/photo/")
            .route(web::get().to(avatar_page))
            .route(web::post().to(avatar_upload)),
    );
    cfg.service(web::resource("/accounts/edit/photo/remove/").route(web::post().to(avatar_remove)));
    cfg.service(
        web::resource("/accounts/delete/")
            .route(web::get().to(user_delete_page))
            .route(web::post().to(user_delete)),
    );
    cfg.service(web::resource("/~{username}/").route(web::get().to(user_detail)));
    cfg.service(web::resource("/~{username}/avatar/").route(web::get().to(user_avatar)));
}

#[derive(Debug, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

/// Only local paths are followed after login
fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        next
    } else {
        "/"
    }
}

fn with_cookie(mut resp: HttpResponse, cookie: Cookie<'static>) -> AppResult<HttpResponse> {
    resp.add_cookie(&cookie)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(resp)
}

/// Open a session for `user` and redirect with it attached
fn start_session(
    state: &AppState,
    req: &HttpRequest,
    user: &User,
    location: &str,
    messages: Vec<FlashMessage>,
) -> AppResult<HttpResponse> {
    let session = state.db.create_session(user.id)?;
    log::info!("User {} logged in", user.username);
    with_cookie(
        flash::redirect(req, location, messages),
        session_cookie(&session.token),
    )
}

fn login_form_page(
    state: &AppState,
    req: &HttpRequest,
    form: &LoginForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, req, "login.html", context)
}

async fn login_page(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    let form = LoginForm {
        next: query.into_inner().next.unwrap_or_default(),
        ..Default::default()
    };
    login_form_page(&state, &req, &form, &FormErrors::new())
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let user = state
        .db
        .get_user_by_username(form.username.trim())?
        .filter(|user| verify_password(&form.password, &user.password_hash));

    let Some(user) = user else {
        log::warn!("Failed login for {:?}", form.username);
        let mut errors = FormErrors::new();
        errors.add("__all__", MSG_BAD_LOGIN);
        return login_form_page(&state, &req, &form, &errors);
    };

    start_session(&state, &req, &user, safe_next(&form.next), Vec::new())
}

async fn logout(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    if let Some(token) = extract_token(&req) {
        state.db.delete_session(&token)?;
    }
    with_cookie(
        flash::redirect(&req, "/", vec![FlashMessage::info("logged out")]),
        removal_cookie(),
    )
}

fn user_create_form_page(
    state: &AppState,
    req: &HttpRequest,
    form: &UserCreationForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, req, "user_create.html", context)
}

async fn user_create_page(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    user_create_form_page(&state, &req, &UserCreationForm::default(), &FormErrors::new())
}

async fn user_create(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<UserCreationForm>,
) -> AppResult<HttpResponse> {
    let (username, email, password) = match form.clean() {
        Ok(fields) => fields,
        Err(errors) => return user_create_form_page(&state, &req, &form, &errors),
    };

    let mut errors = FormErrors::new();
    if state.db.get_user_by_username(&username)?.is_some() {
        errors.add("username", MSG_USERNAME_TAKEN);
        return user_create_form_page(&state, &req, &form, &errors);
    }

    let password_hash = hash_password(&password)?;
    let user = match state.db.create_user(&username, &email, &password_hash, false) {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            errors.add("username", MSG_USERNAME_TAKEN);
            return user_create_form_page(&state, &req, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    };
    log::info!("New member {}", user.username);

    start_session(
        &state,
        &req,
        &user,
        "/",
        vec![FlashMessage::success("welcome to Chaitin School :)")],
    )
}

fn user_update_form_page(
    state: &AppState,
    req: &HttpRequest,
    form: &UserUpdateForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, req, "user_update.html", context)
}

async fn user_update_page(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;
    let form = UserUpdateForm {
        username: user.username,
        email: user.email,
        full_name: user.full_name,
        about: user.about,
        is_public: user.is_public.then(|| "on".to_string()),
    };
    user_update_form_page(&state, &req, &form, &FormErrors::new())
}

async fn user_update(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<UserUpdateForm>,
) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;

    let profile = match form.clean() {
        Ok(profile) => profile,
        Err(errors) => return user_update_form_page(&state, &req, &form, &errors),
    };

    let mut errors = FormErrors::new();
    let taken = state
        .db
        .get_user_by_username(&profile.username)?
        .is_some_and(|other| other.id != user.id);
    if taken {
        errors.add("username", MSG_USERNAME_TAKEN);
        return user_update_form_page(&state, &req, &form, &errors);
    }

    match state.db.update_user_profile(user.id, &profile) {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => {
            errors.add("username", MSG_USERNAME_TAKEN);
            return user_update_form_page(&state, &req, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(flash::redirect(
        &req,
        "/accounts/edit/",
        vec![FlashMessage::success("profile updated")],
    ))
}

fn avatar_form_page(
    state: &AppState,
    req: &HttpRequest,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("errors", errors);
    render(state, req, "user_avatar.html", context)
}

async fn avatar_page(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    require_login(&state, &req)?;
    avatar_form_page(&state, &req, &FormErrors::new())
}

async fn avatar_upload(
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;

    let mut errors = FormErrors::new();
    let Some(file) = read_upload(payload, "file", AVATAR_LIMIT_BYTES).await? else {
        errors.add("file", "This field is required.");
        return avatar_form_page(&state, &req, &errors);
    };

    let extension = file.extension().unwrap_or_default();
    // No svg for avatars
    if extension == "svg" || image_content_type(&extension).is_none() {
        errors.add("file", "Unsupported image type.");
    } else if file.too_big {
        errors.add("file", "Photo too big. Limit is 1MB.");
    }
    if !errors.is_empty() {
        return avatar_form_page(&state, &req, &errors);
    }

    state.db.set_user_avatar(user.id, &file.data, &extension)?;
    Ok(flash::redirect(&req, "/accounts/edit/photo/", Vec::new()))
}

async fn avatar_remove(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;
    state.db.set_user_avatar(user.id, &[], "")?;
    Ok(flash::redirect(&req, "/accounts/edit/photo/", Vec::new()))
}

async fn user_delete_page(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    require_login(&state, &req)?;
    render(&state, &req, "user_delete.html", Context::new())
}

async fn user_delete(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let user = require_login(&state, &req)?;
    state.db.delete_user(user.id)?;
    log::info!("Deleted account {}", user.username);
    with_cookie(flash::redirect(&req, "/", Vec::new()), removal_cookie())
}

/// Profiles are visible to members, and to everyone once made public
fn visible_profile(state: &AppState, req: &HttpRequest, username: &str) -> AppResult<User> {
    let profile = state
        .db
        .get_user_by_username(username)?
        .ok_or(AppError::NotFound)?;
    if profile.is_public || current_user(state, req)?.is_some() {
        Ok(profile)
    } else {
        Err(AppError::PermissionDenied)
    }
}

async fn user_detail(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let profile = visible_profile(&state, &req, &path)?;

    let mut context = Context::new();
    context.insert("mentorship_list", &state.db.list_mentorships_by_mentor(profile.id)?);
    context.insert("has_avatar", &profile.has_avatar());
    context.insert("profile", &profile);
    render(&state, &req, "user_detail.html", context)
}

async fn user_avatar(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let profile = visible_profile(&state, &req, &path)?;
    if !profile.has_avatar() {
        return Err(AppError::NotFound);
    }
    let content_type = image_content_type(&profile.avatar_ext).unwrap_or("application/octet-stream");
    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .body(profile.avatar_data))
}
