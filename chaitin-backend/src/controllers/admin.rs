//! Superuser back-office: record counts, per-model listings, post and workshop editing

use std::cmp::Reverse;
use std::collections::HashMap;

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tera::Context;

use crate::AppState;
use crate::db::{ContactTable, Database, is_unique_violation};
use crate::errors::{AppError, AppResult};
use crate::forms::{FormErrors, PostForm, WorkshopForm};
use crate::middleware::flash::{self, FlashMessage};
use crate::middleware::session_auth::require_superuser;
use crate::models::{Post, Workshop};
use crate::templates::render;

const INPUT_DATETIME: &str = "%Y-%m-%dT%H:%M";
const DISPLAY_DATETIME: &str = "%Y-%m-%d %H:%M";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/admin/").route(web::get().to(admin_index)));
    cfg.service(
        web::resource("/admin/posts/new/")
            .route(web::get().to(post_new))
            .route(web::post().to(post_create)),
    );
    cfg.service(
        web::resource("/admin/posts/{id}/")
            .route(web::get().to(post_edit))
            .route(web::post().to(post_update)),
    );
    cfg.service(web::resource("/admin/posts/{id}/delete/").route(web::post().to(post_delete)));
    cfg.service(
        web::resource("/admin/workshops/new/")
            .route(web::get().to(workshop_new))
            .route(web::post().to(workshop_create)),
    );
    cfg.service(
        web::resource("/admin/workshops/{id}/")
            .route(web::get().to(workshop_edit))
            .route(web::post().to(workshop_update)),
    );
    cfg.service(
        web::resource("/admin/workshops/{id}/delete/").route(web::post().to(workshop_delete)),
    );
    cfg.service(
        web::resource("/admin/subscriptions/{id}/delete/")
            .route(web::post().to(subscription_delete)),
    );
    cfg.service(web::resource("/admin/{model}/").route(web::get().to(admin_list)));
}

/// Back-office sections, addressed by their kebab-case name in URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum AdminModel {
    Subscriptions,
    Posts,
    Workshops,
    Attendances,
    Submissions,
    Feedback,
    Proposals,
    Requests,
    Incidents,
    EmailRecords,
    Users,
    Mentorships,
    Images,
}

impl AdminModel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Subscriptions => "Subscriptions",
            Self::Posts => "Posts",
            Self::Workshops => "Workshops",
            Self::Attendances => "Attendances",
            Self::Submissions => "Submissions",
            Self::Feedback => "Feedback",
            Self::Proposals => "Proposals",
            Self::Requests => "Requests",
            Self::Incidents => "Incident reports",
            Self::EmailRecords => "Email records",
            Self::Users => "Users",
            Self::Mentorships => "Mentorships",
            Self::Images => "Images",
        }
    }

    /// Whether the back-office offers a create form
    pub fn editable(&self) -> bool {
        matches!(self, Self::Posts | Self::Workshops)
    }

    pub fn count(&self, db: &Database) -> AppResult<i64> {
        let count = match self {
            Self::Subscriptions => db.count_subscriptions()?,
            Self::Posts => db.count_posts()?,
            Self::Workshops => db.count_workshops()?,
            Self::Attendances => db.list_attendances()?.len() as i64,
            Self::Submissions => db.count_contact_rows(ContactTable::Submissions)?,
            Self::Feedback => db.count_contact_rows(ContactTable::Feedback)?,
            Self::Proposals => db.count_contact_rows(ContactTable::Proposals)?,
            Self::Requests => db.count_contact_rows(ContactTable::Requests)?,
            Self::Incidents => db.count_contact_rows(ContactTable::Incidents)?,
            Self::EmailRecords => db.count_email_records()?,
            Self::Users => db.count_users()?,
            Self::Mentorships => db.count_mentorships()?,
            Self::Images => db.count_images()?,
        };
        Ok(count)
    }
}

#[derive(Debug, Serialize)]
struct ModelSummary {
    name: String,
    label: &'static str,
    count: i64,
    editable: bool,
}

#[derive(Debug, Default, Serialize)]
struct AdminRow {
    cells: Vec<String>,
    edit_path: Option<String>,
    delete_path: Option<String>,
}

impl AdminRow {
    fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            ..Default::default()
        }
    }

    fn edit(mut self, path: String) -> Self {
        self.edit_path = Some(path);
        self
    }

    fn delete(mut self, path: String) -> Self {
        self.delete_path = Some(path);
        self
    }
}

#[derive(Debug, Serialize)]
struct AdminTable {
    name: String,
    label: &'static str,
    editable: bool,
    columns: &'static [&'static str],
    rows: Vec<AdminRow>,
}

fn fmt_utc(at: &Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format(DISPLAY_DATETIME).to_string())
        .unwrap_or_default()
}

fn fmt_naive(at: &Option<NaiveDateTime>) -> String {
    at.map(|at| at.format(DISPLAY_DATETIME).to_string())
        .unwrap_or_default()
}

fn fmt_opt(value: &Option<impl ToString>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn fmt_bool(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

/// Listing columns and rows, newest id first unless the model says otherwise
fn admin_table(db: &Database, model: AdminModel) -> AppResult<AdminTable> {
    let (columns, rows): (&'static [&'static str], Vec<AdminRow>) = match model {
        AdminModel::Subscriptions => {
            let mut list = db.list_subscriptions()?;
            list.sort_by_key(|s| Reverse(s.id));
            let rows = list
                .into_iter()
                .map(|s| {
                    AdminRow::new(vec![
                        s.id.to_string(),
                        s.email,
                        s.created_at.format(DISPLAY_DATETIME).to_string(),
                        s.unsubscribe_key.to_string(),
                    ])
                    .delete(format!("/admin/subscriptions/{}/delete/", s.id))
                })
                .collect();
            (&["id", "email", "created at", "unsubscribe key"][..], rows)
        }
        AdminModel::Posts => {
            let rows = db
                .list_posts()?
                .into_iter()
                .map(|p| {
                    AdminRow::new(vec![p.id.to_string(), p.title, p.slug, fmt_utc(&p.published_at)])
                        .edit(format!("/admin/posts/{}/", p.id))
                        .delete(format!("/admin/posts/{}/delete/", p.id))
                })
                .collect();
            (&["id", "title", "slug", "published at"][..], rows)
        }
        AdminModel::Workshops => {
            let mut list = db.list_workshops()?;
            list.sort_by_key(|w| Reverse(w.id));
            let rows = list
                .into_iter()
                .map(|w| {
                    AdminRow::new(vec![w.id.to_string(), w.title, w.slug, fmt_naive(&w.scheduled_at)])
                        .edit(format!("/admin/workshops/{}/", w.id))
                        .delete(format!("/admin/workshops/{}/delete/", w.id))
                })
                .collect();
            (&["id", "title", "slug", "scheduled at"][..], rows)
        }
        AdminModel::Attendances => {
            let titles: HashMap<i64, String> = db
                .list_workshops()?
                .into_iter()
                .map(|w| (w.id, w.title))
                .collect();
            let rows = db
                .list_attendances()?
                .into_iter()
                .map(|a| {
                    let workshop = a
                        .workshop_id
                        .and_then(|id| titles.get(&id).cloned())
                        .unwrap_or_else(|| "-".to_string());
                    AdminRow::new(vec![
                        a.id.to_string(),
                        workshop,
                        a.email,
                        fmt_bool(a.rsvp),
                        a.created_at.format(DISPLAY_DATETIME).to_string(),
                    ])
                })
                .collect();
            (&["id", "workshop", "email", "rsvp", "created at"][..], rows)
        }
        AdminModel::Submissions => {
            let rows = db
                .list_submissions()?
                .into_iter()
                .map(|s| AdminRow::new(vec![s.id.to_string(), s.submitter, s.email, s.links, s.title, s.when]))
                .collect();
            (&["id", "submitter", "email", "links", "title", "when"][..], rows)
        }
        AdminModel::Feedback => {
            let rows = db
                .list_feedback()?
                .into_iter()
                .map(|f| AdminRow::new(vec![f.id.to_string(), f.comment]))
                .collect();
            (&["id", "comment"][..], rows)
        }
        AdminModel::Proposals => {
            let rows = db
                .list_proposals()?
                .into_iter()
                .map(|p| AdminRow::new(vec![p.id.to_string(), p.email, p.topic]))
                .collect();
            (&["id", "email", "topic"][..], rows)
        }
        AdminModel::Requests => {
            let rows = db
                .list_requests()?
                .into_iter()
                .map(|r| AdminRow::new(vec![r.id.to_string(), fmt_opt(&r.email), r.topic]))
                .collect();
            (&["id", "email", "topic"][..], rows)
        }
        AdminModel::Incidents => {
            let rows = db
                .list_incidents()?
                .into_iter()
                .map(|i| {
                    AdminRow::new(vec![
                        i.id.to_string(),
                        fmt_opt(&i.name),
                        fmt_opt(&i.email),
                        i.description,
                        fmt_opt(&i.occurred_at),
                        i.created_at.format(DISPLAY_DATETIME).to_string(),
                    ])
                })
                .collect();
            (&["id", "name", "email", "description", "occurred at", "reported at"][..], rows)
        }
        AdminModel::EmailRecords => {
            let mut list = db.list_email_records()?;
            list.sort_by_key(|r| Reverse(r.id));
            let rows = list
                .into_iter()
                .map(|r| {
                    AdminRow::new(vec![r.id.to_string(), r.email, fmt_opt(&r.subscription_id), r.subject])
                })
                .collect();
            (&["id", "email", "subscription", "subject"][..], rows)
        }
        AdminModel::Users => {
            let rows = db
                .list_users()?
                .into_iter()
                .map(|u| {
                    AdminRow::new(vec![
                        u.id.to_string(),
                        u.username,
                        u.email,
                        fmt_bool(u.is_superuser),
                        u.date_joined.format(DISPLAY_DATETIME).to_string(),
                    ])
                })
                .collect();
            (&["id", "username", "email", "superuser", "date joined"][..], rows)
        }
        AdminModel::Mentorships => {
            let rows = db
                .list_mentorships()?
                .into_iter()
                .map(|m| AdminRow::new(vec![m.id.to_string(), m.title, m.slug, m.mentor_username]))
                .collect();
            (&["id", "title", "slug", "mentor"][..], rows)
        }
        AdminModel::Images => {
            let rows = db
                .list_images()?
                .into_iter()
                .map(|i| {
                    AdminRow::new(vec![
                        i.id.to_string(),
                        i.path(),
                        fmt_opt(&i.uploaded_by),
                        i.uploaded_at.format(DISPLAY_DATETIME).to_string(),
                    ])
                })
                .collect();
            (&["id", "path", "uploaded by", "uploaded at"][..], rows)
        }
    };

    Ok(AdminTable {
        name: model.to_string(),
        label: model.label(),
        editable: model.editable(),
        columns,
        rows,
    })
}

async fn admin_index(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;

    let models = AdminModel::iter()
        .map(|model| {
            Ok(ModelSummary {
                name: model.to_string(),
                label: model.label(),
                count: model.count(&state.db)?,
                editable: model.editable(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let mut context = Context::new();
    context.insert("models", &models);
    render(&state, &req, "admin/index.html", context)
}

async fn admin_list(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let model: AdminModel = path.parse().map_err(|_| AppError::NotFound)?;

    let mut context = Context::new();
    context.insert("table", &admin_table(&state.db, model)?);
    render(&state, &req, "admin/list.html", context)
}

// ============================================
// Posts
// ============================================

impl From<&Post> for PostForm {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            slug: post.slug.clone(),
            body: post.body.clone(),
            published_at: post
                .published_at
                .map(|at| at.format(INPUT_DATETIME).to_string())
                .unwrap_or_default(),
        }
    }
}

fn post_form_page(
    state: &AppState,
    req: &HttpRequest,
    object_id: Option<i64>,
    form: &PostForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("object_id", &object_id);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, req, "admin/post_form.html", context)
}

async fn post_new(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    post_form_page(&state, &req, None, &PostForm::default(), &FormErrors::new())
}

async fn post_create(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let admin = require_superuser(&state, &req)?;
    let input = match form.clean(Some(admin.id)) {
        Ok(input) => input,
        Err(errors) => return post_form_page(&state, &req, None, &form, &errors),
    };

    let post = match state.db.create_post(&input) {
        Ok(post) => post,
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("slug", "Post with this Slug already exists.");
            return post_form_page(&state, &req, None, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(flash::redirect(
        &req,
        "/admin/posts/",
        vec![FlashMessage::success(format!("The post “{}” was added successfully.", post.title))],
    ))
}

async fn post_edit(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let post = state.db.get_post(*path)?.ok_or(AppError::NotFound)?;
    post_form_page(&state, &req, Some(post.id), &PostForm::from(&post), &FormErrors::new())
}

async fn post_update(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let post = state.db.get_post(*path)?.ok_or(AppError::NotFound)?;

    let input = match form.clean(post.author_id) {
        Ok(input) => input,
        Err(errors) => return post_form_page(&state, &req, Some(post.id), &form, &errors),
    };

    match state.db.update_post(post.id, &input) {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("slug", "Post with this Slug already exists.");
            return post_form_page(&state, &req, Some(post.id), &form, &errors);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(flash::redirect(
        &req,
        "/admin/posts/",
        vec![FlashMessage::success(format!("The post “{}” was changed successfully.", input.title))],
    ))
}

async fn post_delete(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let post = state.db.get_post(*path)?.ok_or(AppError::NotFound)?;
    state.db.delete_post(post.id)?;
    Ok(flash::redirect(
        &req,
        "/admin/posts/",
        vec![FlashMessage::success(format!("The post “{}” was deleted successfully.", post.title))],
    ))
}

// ============================================
// Workshops
// ============================================

impl From<&Workshop> for WorkshopForm {
    fn from(workshop: &Workshop) -> Self {
        Self {
            title: workshop.title.clone(),
            slug: workshop.slug.clone(),
            body: workshop.body.clone(),
            scheduled_at: workshop
                .scheduled_at
                .map(|at| at.format(INPUT_DATETIME).to_string())
                .unwrap_or_default(),
            location_name: workshop.location_name.clone(),
            location_address: workshop.location_address.clone(),
            location_url: workshop.location_url.clone(),
            is_confirmed: workshop.is_confirmed.then(|| "on".to_string()),
        }
    }
}

fn workshop_form_page(
    state: &AppState,
    req: &HttpRequest,
    object_id: Option<i64>,
    form: &WorkshopForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("object_id", &object_id);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, req, "admin/workshop_form.html", context)
}

async fn workshop_new(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    workshop_form_page(&state, &req, None, &WorkshopForm::default(), &FormErrors::new())
}

async fn workshop_create(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<WorkshopForm>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let input = match form.clean() {
        Ok(input) => input,
        Err(errors) => return workshop_form_page(&state, &req, None, &form, &errors),
    };

    let workshop = match state.db.create_workshop(&input) {
        Ok(workshop) => workshop,
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("slug", "Workshop with this Slug already exists.");
            return workshop_form_page(&state, &req, None, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    };
    log::info!("Workshop {} created", workshop.slug);

    Ok(flash::redirect(
        &req,
        "/admin/workshops/",
        vec![FlashMessage::success(format!(
            "The workshop “{}” was added successfully.",
            workshop.title
        ))],
    ))
}

async fn workshop_edit(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let workshop = state.db.get_workshop(*path)?.ok_or(AppError::NotFound)?;
    workshop_form_page(
        &state,
        &req,
        Some(workshop.id),
        &WorkshopForm::from(&workshop),
        &FormErrors::new(),
    )
}

async fn workshop_update(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
    form: web::Form<WorkshopForm>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let workshop = state.db.get_workshop(*path)?.ok_or(AppError::NotFound)?;

    let input = match form.clean() {
        Ok(input) => input,
        Err(errors) => return workshop_form_page(&state, &req, Some(workshop.id), &form, &errors),
    };

    match state.db.update_workshop(workshop.id, &input) {
        Ok(()) => {}
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("slug", "Workshop with this Slug already exists.");
            return workshop_form_page(&state, &req, Some(workshop.id), &form, &errors);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(flash::redirect(
        &req,
        "/admin/workshops/",
        vec![FlashMessage::success(format!(
            "The workshop “{}” was changed successfully.",
            input.title
        ))],
    ))
}

async fn workshop_delete(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    let workshop = state.db.get_workshop(*path)?.ok_or(AppError::NotFound)?;
    state.db.delete_workshop(workshop.id)?;
    Ok(flash::redirect(
        &req,
        "/admin/workshops/",
        vec![FlashMessage::success(format!(
            "The workshop “{}” was deleted successfully.",
            workshop.title
        ))],
    ))
}

async fn subscription_delete(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    require_superuser(&state, &req)?;
    if !state.db.delete_subscription(*path)? {
        return Err(AppError::NotFound);
    }
    Ok(flash::redirect(
        &req,
        "/admin/subscriptions/",
        vec![FlashMessage::success("The subscription was deleted successfully.")],
    ))
}
