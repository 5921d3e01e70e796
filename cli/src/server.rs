use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use nutritrack_core::goals::GOAL_CATALOG;
use nutritrack_core::menu::{FOOD_CATALOG, plan_total};
use nutritrack_core::models::{
    EntryCategory, LogEntry, NewProfile, Profile, Sex, today_string, validate_category,
    validate_date_str, validate_registration,
};
use nutritrack_core::service::{LoginOutcome, NutriService, RegisterOutcome, Session};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    service: Arc<NutriService>,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl AppState {
    /// Runs `f` against the session behind the request's bearer token.
    /// The sessions lock is held across the call, so store writes from
    /// concurrent requests are serialized.
    fn with_session<T>(
        &self,
        headers: &HeaderMap,
        f: impl FnOnce(&NutriService, &mut Session) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let token = session_token(headers).ok_or_else(unauthorized)?;
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(&token).ok_or_else(unauthorized)?;
        f(&self.service, session)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
    display_name: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    username: String,
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

#[derive(Deserialize)]
struct ProfileRequest {
    weight_kg: f64,
    height_cm: f64,
    age: i64,
    sex: String,
    activity: String,
    #[serde(default)]
    goals: Vec<String>,
}

#[derive(Deserialize)]
struct AddLogRequest {
    date: Option<String>,
    name: String,
    calories: i64,
    category: Option<String>,
    amount: Option<f64>,
    unit: Option<String>,
}

#[derive(Deserialize)]
struct LogPlanRequest {
    date: Option<String>,
}

#[derive(Deserialize)]
struct RewriteDayRequest {
    entries: Vec<RewriteEntry>,
}

/// One replacement row for a day rewrite. The day comes from the URL,
/// so these carry no date of their own.
#[derive(Deserialize)]
struct RewriteEntry {
    name: String,
    calories: i64,
    category: String,
    amount: Option<f64>,
    unit: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("Invalid or missing session token".to_string())
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

/// Account and store operations that cannot run without the backing
/// worksheet report 503 with the underlying reason.
fn store_unavailable(err: anyhow::Error) -> ApiError {
    ApiError::Unavailable(format!("{err:#}"))
}

// --- Middleware ---

async fn require_session(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let known = session_token(request.headers()).is_some_and(|token| {
        state
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&token)
    });

    if !known {
        return unauthorized().into_response();
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

// --- Public handlers ---

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "offline": state.service.is_offline(),
    }))
}

async fn list_goals() -> Json<Vec<serde_json::Value>> {
    let goals = GOAL_CATALOG
        .iter()
        .map(|(name, delta)| {
            serde_json::json!({
                "name": name,
                "calorie_delta": delta,
            })
        })
        .collect();
    Json(goals)
}

async fn list_foods() -> Json<Vec<serde_json::Value>> {
    let foods = FOOD_CATALOG
        .iter()
        .map(|item| {
            serde_json::json!({
                "name": item.name,
                "calories": item.calories,
                "meal_type": item.meal_type.as_str(),
                "tags": item.tags,
            })
        })
        .collect();
    Json(foods)
}

async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    validate_registration(&req.username, &req.password, &req.display_name)
        .map_err(|e| bad_request(&e))?;

    let outcome = state
        .service
        .register(&req.username, &req.password, &req.display_name)
        .map_err(store_unavailable)?;

    match outcome {
        RegisterOutcome::Created { .. } => {
            let value = serde_json::to_value(&outcome).context("failed to serialize outcome")?;
            Ok((StatusCode::CREATED, Json(value)))
        }
        RegisterOutcome::DuplicateUser { message } => Err(ApiError::Conflict(message)),
    }
}

async fn login_user(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state
        .service
        .login(&req.username, &req.password)
        .map_err(store_unavailable)?
    {
        LoginOutcome::Approved { session, warning } => {
            let response = LoginResponse {
                token: session.id.clone(),
                username: session.username.clone(),
                display_name: session.display_name.clone(),
                warning,
            };
            state
                .sessions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(session.id.clone(), session);
            Ok(Json(response))
        }
        LoginOutcome::Pending => Err(ApiError::Forbidden(
            "Account is awaiting admin approval".to_string(),
        )),
        LoginOutcome::InvalidCredentials => Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        )),
    }
}

// --- Session handlers ---

async fn logout_user(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = session_token(&headers) {
        state
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token);
    }
    StatusCode::NO_CONTENT
}

async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Profile>, ApiError> {
    state.with_session(&headers, |_, session| {
        session
            .profile
            .clone()
            .map(Json)
            .ok_or_else(|| ApiError::NotFound("No profile saved yet".to_string()))
    })
}

async fn put_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sex = Sex::parse(&req.sex).map_err(|e| bad_request(&e))?;
    if req.weight_kg <= 0.0 {
        return Err(ApiError::BadRequest(
            "weight_kg must be greater than 0".to_string(),
        ));
    }
    if req.height_cm <= 0.0 {
        return Err(ApiError::BadRequest(
            "height_cm must be greater than 0".to_string(),
        ));
    }
    if req.age <= 0 {
        return Err(ApiError::BadRequest(
            "age must be greater than 0".to_string(),
        ));
    }

    let input = NewProfile {
        weight_kg: req.weight_kg,
        height_cm: req.height_cm,
        age: req.age,
        sex,
        activity: req.activity,
        goals: req.goals,
    };

    state.with_session(&headers, |service, session| {
        let (profile, cloud) = service.save_profile(session, &input);
        Ok(Json(serde_json::json!({
            "profile": profile,
            "cloud": cloud,
        })))
    })
}

async fn get_profile_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Profile>>, ApiError> {
    state.with_session(&headers, |service, session| {
        service
            .profile_history(&session.username)
            .map(Json)
            .map_err(store_unavailable)
    })
}

// --- Plan handlers ---

async fn get_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.with_session(&headers, |_, session| {
        let plan = session
            .plan
            .clone()
            .ok_or_else(|| ApiError::NotFound("No plan generated yet".to_string()))?;
        let total = plan_total(&plan);
        Ok(Json(serde_json::json!({ "plan": plan, "total": total })))
    })
}

async fn create_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.with_session(&headers, |service, session| {
        let plan = service.generate_plan(session).map_err(|e| bad_request(&e))?;
        let total = plan_total(&plan);
        Ok(Json(serde_json::json!({ "plan": plan, "total": total })))
    })
}

// --- Log handlers ---

async fn add_log_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddLogRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let category = match req.category.as_deref() {
        None => EntryCategory::Manual,
        Some(s) => validate_category(s).map_err(|e| bad_request(&e))?,
    };

    let date = match req.date.as_deref() {
        Some(d) => validate_date_str(d).map_err(|e| bad_request(&e))?,
        None => today_string(),
    };

    state.with_session(&headers, |service, session| {
        let (entry, cloud) = match category {
            EntryCategory::Manual | EntryCategory::Food => {
                service.log_manual(session, &date, &name, req.calories)
            }
            EntryCategory::Exercise => {
                service.log_exercise(session, &date, &name, req.calories, req.amount, req.unit)
            }
            EntryCategory::ProfileSettings => {
                return Err(ApiError::BadRequest(
                    "Use PUT /api/profile to record profile changes".to_string(),
                ));
            }
        };
        Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "entry": entry, "cloud": cloud })),
        ))
    })
}

async fn log_plan_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    headers: HeaderMap,
    Json(req): Json<LogPlanRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let date = match req.date.as_deref() {
        Some(d) => validate_date_str(d).map_err(|e| bad_request(&e))?,
        None => today_string(),
    };

    state.with_session(&headers, |service, session| {
        let (entry, cloud) = service
            .log_from_plan(session, index, &date)
            .map_err(|e| bad_request(&e))?;
        Ok((
            StatusCode::CREATED,
            Json(serde_json::json!({ "entry": entry, "cloud": cloud })),
        ))
    })
}

async fn get_day_log(
    State(state): State<AppState>,
    Path(date): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let date = validate_date_str(&date).map_err(|e| bad_request(&e))?;
    state.with_session(&headers, |service, session| {
        let report = service.day_report(session, &date);
        let value = serde_json::to_value(report).context("failed to serialize report")?;
        Ok(Json(value))
    })
}

async fn rewrite_day_log(
    State(state): State<AppState>,
    Path(date): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RewriteDayRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let date = validate_date_str(&date).map_err(|e| bad_request(&e))?;

    let mut replacement = Vec::with_capacity(req.entries.len());
    for entry in req.entries {
        let category = validate_category(&entry.category).map_err(|e| bad_request(&e))?;
        replacement.push(LogEntry {
            date: date.clone(),
            name: entry.name,
            calories: entry.calories,
            category,
            amount: entry.amount,
            unit: entry.unit,
        });
    }

    state.with_session(&headers, |service, session| {
        let (removed, cloud) = service.rewrite_day(session, &date, replacement);
        Ok(Json(serde_json::json!({
            "removed": removed,
            "cloud": cloud,
        })))
    })
}

async fn reload_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.with_session(&headers, |service, session| {
        service.reload(session).map_err(store_unavailable)?;
        Ok(Json(serde_json::json!({
            "profile_loaded": session.profile.is_some(),
            "log_entries": session.log.len(),
        })))
    })
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/goals", get(list_goals))
        .route("/api/foods", get(list_foods))
        .route("/api/auth/register", post(register_user))
        .route("/api/auth/login", post(login_user));

    let authed = Router::new()
        .route("/api/auth/logout", post(logout_user))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route("/api/profile/history", get(get_profile_history))
        .route("/api/plan", get(get_plan).post(create_plan))
        .route("/api/log", post(add_log_entry))
        .route("/api/log/plan/{index}", post(log_plan_item))
        .route("/api/log/{date}", get(get_day_log).put(rewrite_day_log))
        .route("/api/reload", post(reload_session))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    public
        .merge(authed)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(service: NutriService, port: u16, bind: &str) -> anyhow::Result<()> {
    if service.is_offline() {
        eprintln!("Warning: serving without a store. Accounts and saved data are unavailable.");
    }

    let state = AppState {
        service: Arc::new(service),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
