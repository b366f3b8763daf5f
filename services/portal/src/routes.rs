//! Portal routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    accounts::{self, DUPLICATE_EMAIL, UpdateOutcome},
    csrf::csrf_guard,
    error::AppResult,
    forms::Form,
    repositories::StoreError,
    session::Session,
    state::AppState,
    templates::Page,
};

/// Submitted `application/x-www-form-urlencoded` pairs
type Submission = axum::Form<Vec<(String, String)>>;

/// Create the router for the portal
pub fn create_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/signup", post(signup_user))
        .route("/dashboard", get(show_dashboard).post(update_user))
        .route("/login", get(show_login).post(login_user))
        .route("/logout", post(logout_user))
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), csrf_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.users.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "service": "portal"
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "service": "portal"
                })),
            )
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

fn render(state: &AppState, session: &mut Session, page: Page, form: &Form) -> AppResult<Response> {
    Ok(state.templates.render(page, session, form)?.into_response())
}

/// Landing page: signup for a new visitor, the dashboard otherwise
pub async fn home(State(state): State<AppState>, mut session: Session) -> impl IntoResponse {
    let response = if session.is_new() {
        render(&state, &mut session, Page::Signup, &Form::default())
    } else {
        Ok(Redirect::to("/dashboard").into_response())
    };
    (session.save(), response)
}

pub async fn signup_user(
    State(state): State<AppState>,
    mut session: Session,
    axum::Form(values): Submission,
) -> impl IntoResponse {
    let response = signup(&state, &mut session, Form::new(values)).await;
    (session.save(), response)
}

async fn signup(state: &AppState, session: &mut Session, mut form: Form) -> AppResult<Response> {
    match accounts::process_signup(&mut form, state.users.as_ref()).await {
        Ok(Some(id)) => {
            info!("New user {} signed up", id);
            session.sign_in(id);
            session.add_flash("Your signup was successful.");
            Ok(Redirect::to("/dashboard").into_response())
        }
        Ok(None) => render(state, session, Page::Signup, &form),
        Err(StoreError::DuplicateEmail) => {
            form.errors.add("email", DUPLICATE_EMAIL);
            render(state, session, Page::Signup, &form)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn show_dashboard(
    State(state): State<AppState>,
    mut session: Session,
) -> impl IntoResponse {
    let response = match accounts::load_dashboard(session.user_id(), state.users.as_ref()).await {
        Some(form) => render(&state, &mut session, Page::Dashboard, &form),
        None => render(&state, &mut session, Page::Login, &Form::default()),
    };
    (session.save(), response)
}

pub async fn update_user(
    State(state): State<AppState>,
    mut session: Session,
    axum::Form(values): Submission,
) -> impl IntoResponse {
    let response = update(&state, &mut session, Form::new(values)).await;
    (session.save(), response)
}

async fn update(state: &AppState, session: &mut Session, mut form: Form) -> AppResult<Response> {
    let Some(user_id) = session.user_id() else {
        return render(state, session, Page::Login, &Form::default());
    };

    match accounts::process_update(&mut form, user_id, state.users.as_ref()).await? {
        UpdateOutcome::Invalid => render(state, session, Page::Dashboard, &form),
        UpdateOutcome::Updated => {
            session.add_flash("User information updated successfully.");
            render(state, session, Page::Dashboard, &form)
        }
        UpdateOutcome::UnknownUser => render(state, session, Page::Login, &Form::default()),
    }
}

pub async fn show_login(State(state): State<AppState>, mut session: Session) -> impl IntoResponse {
    let response = render(&state, &mut session, Page::Login, &Form::default());
    (session.save(), response)
}

pub async fn login_user(
    State(state): State<AppState>,
    mut session: Session,
    axum::Form(values): Submission,
) -> impl IntoResponse {
    let response = login(&state, &mut session, Form::new(values)).await;
    (session.save(), response)
}

async fn login(state: &AppState, session: &mut Session, mut form: Form) -> AppResult<Response> {
    match accounts::process_login(&mut form, state.users.as_ref()).await? {
        Some(id) => {
            info!("User {} logged in", id);
            session.sign_in(id);
            session.add_flash("Logged in successfully.");
            Ok(Redirect::to("/dashboard").into_response())
        }
        None => render(state, session, Page::Login, &form),
    }
}

pub async fn logout_user(mut session: Session) -> impl IntoResponse {
    if let Some(id) = session.user_id() {
        info!("User {} logged out", id);
    }
    session.sign_out();
    session.add_flash("You've been logged out successfully!");
    (session.save(), Redirect::to("/login"))
}
