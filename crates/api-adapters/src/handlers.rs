//! # Handlers
//!
//! Each handler extracts the request, calls one service operation and
//! renders a template or redirects. Validation failures re-render the form
//! with status 422; every other error becomes an error page.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use domains::form::{AdvertSubmission, ApplicationSubmission};
use domains::{AdvertId, AppError, ApplicationId};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::metrics;
use crate::router::AppState;
use crate::views::{
    AdvertCard, AdvertFormView, ApplicationFormView, ApplicationView, DeleteTemplate,
    FormTemplate, IndexTemplate, MenuTemplate, ViewTemplate,
};

type HandlerResult = Result<Response, ApiError>;

fn render(template: impl Template) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(format!("template rendering failed: {e}")))
}

fn parse_advert_id(raw: &str) -> Result<AdvertId, AppError> {
    raw.parse::<i64>()
        .map(AdvertId)
        .map_err(|_| AppError::not_found("Advert", raw))
}

fn parse_application_id(raw: &str) -> Result<ApplicationId, AppError> {
    Uuid::parse_str(raw)
        .map(ApplicationId)
        .map_err(|_| AppError::not_found("Application", raw))
}

/// Attaches the caller's name so the error page keeps the header state.
fn failed(user: &CurrentUser) -> impl Fn(AppError) -> ApiError + '_ {
    move |error| ApiError::for_user(error, user.name())
}

pub async fn home() -> Redirect {
    Redirect::to("/advert")
}

pub async fn index(State(state): State<AppState>, user: CurrentUser) -> HandlerResult {
    list(&state, &user, 1).await
}

pub async fn index_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(page): Path<String>,
) -> HandlerResult {
    let page = page
        .parse::<i64>()
        .map_err(|_| AppError::not_found("Page", &page))
        .map_err(failed(&user))?;
    list(&state, &user, page).await
}

async fn list(state: &AppState, user: &CurrentUser, page: i64) -> HandlerResult {
    let page = state
        .adverts
        .list_page(page, state.listing.per_page)
        .await
        .map_err(failed(user))?;
    let html = render(IndexTemplate::new(&page, user.name())).map_err(failed(user))?;
    Ok(html.into_response())
}

pub async fn menu(State(state): State<AppState>) -> HandlerResult {
    let adverts = state.adverts.recent_adverts(state.listing.menu_limit).await?;
    let html = render(MenuTemplate {
        adverts: adverts.iter().map(AdvertCard::from_advert).collect(),
    })?;
    Ok(html.into_response())
}

pub async fn view(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_advert_id(&id).map_err(failed(&user))?;
    render_view(&state, &user, id, ApplicationFormView::default(), StatusCode::OK).await
}

async fn render_view(
    state: &AppState,
    user: &CurrentUser,
    id: AdvertId,
    application_form: ApplicationFormView,
    status: StatusCode,
) -> HandlerResult {
    let details = state.adverts.view(id).await.map_err(failed(user))?;
    let html = render(ViewTemplate {
        advert: AdvertCard::from_advert(&details.advert),
        applications: details
            .applications
            .iter()
            .map(ApplicationView::from_application)
            .collect(),
        application_form,
        signed_in: user.name(),
    })
    .map_err(failed(user))?;
    Ok((status, html).into_response())
}

pub async fn apply(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Form(submission): Form<ApplicationSubmission>,
) -> HandlerResult {
    let id = parse_advert_id(&id).map_err(failed(&user))?;
    match state
        .applications
        .submit(id, user.identity(), &submission)
        .await
    {
        Ok(_) => {
            state.metrics.applications_recorded.inc();
            Ok(Redirect::to(&format!("/advert/view/{id}")).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let form =
                ApplicationFormView::rejected(&submission.author, &submission.content, &errors);
            render_view(&state, &user, id, form, StatusCode::UNPROCESSABLE_ENTITY).await
        }
        Err(e) => Err(failed(&user)(e)),
    }
}

fn render_form(
    user: &CurrentUser,
    heading: &str,
    action: String,
    form: &services::AdvertForm,
    status: StatusCode,
) -> HandlerResult {
    let html = render(FormTemplate {
        heading: heading.to_string(),
        action,
        form: AdvertFormView::from_form(form),
        signed_in: user.name(),
    })
    .map_err(failed(user))?;
    Ok((status, html).into_response())
}

pub async fn add_form(State(state): State<AppState>, user: CurrentUser) -> HandlerResult {
    let form = state
        .adverts
        .new_form(user.identity())
        .await
        .map_err(failed(&user))?;
    render_form(&user, "New advert", "/advert/add".into(), &form, StatusCode::OK)
}

pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(pairs): Form<Vec<(String, String)>>,
) -> HandlerResult {
    let submission = AdvertSubmission::from_pairs(pairs);
    match state.adverts.create(user.identity(), &submission).await {
        Ok(id) => {
            state.metrics.adverts_created.inc();
            Ok(Redirect::to(&format!("/advert/view/{id}")).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let form = state
                .adverts
                .new_form(user.identity())
                .await
                .map_err(failed(&user))?
                .rejected(submission, errors);
            render_form(
                &user,
                "New advert",
                "/advert/add".into(),
                &form,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
        Err(e) => Err(failed(&user)(e)),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_advert_id(&id).map_err(failed(&user))?;
    let form = state
        .adverts
        .edit_form(user.identity(), id)
        .await
        .map_err(failed(&user))?;
    render_form(&user, "Edit advert", format!("/advert/edit/{id}"), &form, StatusCode::OK)
}

pub async fn edit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> HandlerResult {
    let id = parse_advert_id(&id).map_err(failed(&user))?;
    let submission = AdvertSubmission::from_pairs(pairs);
    match state.adverts.update(user.identity(), id, &submission).await {
        Ok(id) => {
            state.metrics.adverts_updated.inc();
            Ok(Redirect::to(&format!("/advert/view/{id}")).into_response())
        }
        Err(AppError::Validation(errors)) => {
            let form = state
                .adverts
                .edit_form(user.identity(), id)
                .await
                .map_err(failed(&user))?
                .rejected(submission, errors);
            render_form(
                &user,
                "Edit advert",
                format!("/advert/edit/{id}"),
                &form,
                StatusCode::UNPROCESSABLE_ENTITY,
            )
        }
        Err(e) => Err(failed(&user)(e)),
    }
}

pub async fn delete_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_advert_id(&id).map_err(failed(&user))?;
    let advert = state
        .adverts
        .delete_form(user.identity(), id)
        .await
        .map_err(failed(&user))?;
    let html = render(DeleteTemplate {
        advert: AdvertCard::from_advert(&advert),
        signed_in: user.name(),
    })
    .map_err(failed(&user))?;
    Ok(html.into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_advert_id(&id).map_err(failed(&user))?;
    state
        .adverts
        .delete(user.identity(), id)
        .await
        .map_err(failed(&user))?;
    state.metrics.adverts_deleted.inc();
    Ok(Redirect::to("/advert").into_response())
}

pub async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_application_id(&id).map_err(failed(&user))?;
    let advert_id = state
        .applications
        .withdraw(user.identity(), id)
        .await
        .map_err(failed(&user))?;
    state.metrics.applications_withdrawn.inc();
    Ok(Redirect::to(&format!("/advert/view/{advert_id}")).into_response())
}

pub async fn metrics(State(state): State<AppState>) -> HandlerResult {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Internal(format!("metrics encoding failed: {e}")))?;
    Ok(([(header::CONTENT_TYPE, metrics::CONTENT_TYPE)], body).into_response())
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::new(AppError::not_found("Page", uri.path()))
}
