//! List broadcast form and unsubscribe links

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tera::Context;
use uuid::Uuid;

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::forms::{BroadcastForm, FormErrors, NO_ICS};
use crate::mailing::send_broadcast;
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::require_superuser;
use crate::templates::render;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/broadcast/")
            .route(web::get().to(broadcast))
            .route(web::post().to(broadcast_post)),
    );
    cfg.service(
        web::resource("/unsubscribe/{key}/")
            .route(web::get().to(unsubscribe))
            .route(web::post().to(unsubscribe_one_click)),
    );
}

/// Option of the calendar attachment select
#[derive(Serialize)]
struct IcsChoice {
    value: String,
    label: String,
}

fn ics_choices(state: &AppState) -> AppResult<Vec<IcsChoice>> {
    let mut choices = vec![IcsChoice {
        value: NO_ICS.to_string(),
        label: "NO ICS".to_string(),
    }];
    choices.extend(
        state
            .db
            .list_scheduled_workshops()?
            .into_iter()
            .map(|w| IcsChoice { value: w.slug, label: w.title }),
    );
    Ok(choices)
}

fn broadcast_context(state: &AppState, choices: &[IcsChoice]) -> AppResult<Context> {
    let mut subscriptions = state.db.list_subscriptions()?;
    subscriptions.sort_by_key(|s| s.created_at);

    let mut context = Context::new();
    context.insert("ics_choices", choices);
    context.insert("dry_run_email", &state.config.email.broadcast_preview);
    context.insert("subscriptions_count", &subscriptions.len());
    context.insert("subscriptions_list", &subscriptions);
    Ok(context)
}

async fn broadcast(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let choices = ics_choices(&state)?;

    let mut context = broadcast_context(&state, &choices)?;
    context.insert(
        "form",
        &BroadcastForm {
            ics_attachment: NO_ICS.to_string(),
            ..Default::default()
        },
    );
    context.insert("errors", &FormErrors::new());
    render(&state, &req, "broadcast.html", context)
}

async fn broadcast_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<BroadcastForm>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let choices = ics_choices(&state)?;
    let slugs: Vec<String> = choices
        .iter()
        .filter(|c| c.value != NO_ICS)
        .map(|c| c.value.clone())
        .collect();

    let clean = match form.clean(&slugs) {
        Ok(clean) => clean,
        Err(errors) => {
            let mut context = broadcast_context(&state, &choices)?;
            context.insert("form", &form.into_inner());
            context.insert("errors", &errors);
            return render(&state, &req, "broadcast.html", context);
        }
    };

    let sent = send_broadcast(&state.db, state.mailer.as_ref(), &state.config, &clean).await?;

    Ok(flash::redirect(
        &req,
        "/broadcast/",
        vec![FlashMessage::success(format!("{} emails sent.", sent))],
    ))
}

fn parse_key(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

async fn unsubscribe(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let key = parse_key(&path)?;

    let message = match state.db.unsubscribe(&key)? {
        Some(email) => {
            log::info!("Unsubscribed {}", email);
            FlashMessage::success(format!("{} deleted from mailing list.", email))
        }
        None => FlashMessage::info("Invalid link."),
    };

    Ok(flash::redirect(&req, "/", vec![message]))
}

/// One-click unsubscribe from a mail client (List-Unsubscribe-Post)
async fn unsubscribe_one_click(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let key = parse_key(&path)?;
    if let Some(email) = state.db.unsubscribe(&key)? {
        log::info!("Unsubscribed {} (one-click)", email);
    }

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Unsubscribed."))
}
