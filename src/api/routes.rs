//! API Routes
//!
//! HTTP endpoint definitions. Handlers only translate between the wire and
//! the auth manager / repositories; errors map to status codes in
//! [`AppError`].

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::error::{AppError, AppResult};
use crate::repository::{
    Budgets, Categories, Cursor, Merchants, PageRequest, Repository, Resource, Transaction,
    TransactionRepository, Transactions, User,
};

use super::extract::{AppForm, AppJson, AppPath, AppQuery};
use super::middleware::{auth_middleware, CurrentUser};
use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

/// OAuth2 password grant form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub grant_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordChangeRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub prev_date: Option<NaiveDate>,
    #[serde(default)]
    pub prev_id: Option<Uuid>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router.
///
/// `POST /token` and `POST /user` are public; every other route requires a
/// bearer token.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/user/me", get(current_user).delete(deactivate_self))
        .route("/user/password", put(change_password))
        .route(
            "/categories",
            get(list_resources::<Categories>).post(create_resource::<Categories>),
        )
        .route(
            "/categories/:id",
            get(get_resource::<Categories>)
                .put(update_resource::<Categories>)
                .delete(delete_resource::<Categories>),
        )
        .route(
            "/merchants",
            get(list_resources::<Merchants>).post(create_resource::<Merchants>),
        )
        .route(
            "/merchants/:id",
            get(get_resource::<Merchants>)
                .put(update_resource::<Merchants>)
                .delete(delete_resource::<Merchants>),
        )
        .route(
            "/budgets",
            get(list_resources::<Budgets>).post(create_resource::<Budgets>),
        )
        .route(
            "/budgets/:id",
            get(get_resource::<Budgets>)
                .put(update_resource::<Budgets>)
                .delete(delete_resource::<Budgets>),
        )
        .route(
            "/transactions",
            get(list_transactions).post(create_resource::<Transactions>),
        )
        .route(
            "/transactions/:id",
            get(get_resource::<Transactions>)
                .put(update_resource::<Transactions>)
                .delete(delete_resource::<Transactions>),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/token", post(login))
        .route("/user", post(sign_up))
        .merge(protected)
        .with_state(state)
}

/// Owner argument for a resource kind: the caller for owner-scoped kinds
fn owner_of<R: Resource>(user: &User) -> Option<Uuid> {
    R::OWNER_COLUMN.map(|_| user.id)
}

// =========================================================================
// POST /token
// =========================================================================

/// Exchange username and password for an access token
async fn login(
    State(state): State<AppState>,
    AppForm(form): AppForm<LoginForm>,
) -> AppResult<Json<TokenResponse>> {
    if let Some(grant_type) = form.grant_type.as_deref() {
        if grant_type != "password" {
            return Err(AppError::InvalidRequest(format!(
                "Unsupported grant_type: {}",
                grant_type
            )));
        }
    }

    let access_token = match state.auth.login(&form.username, &form.password, Utc::now()).await {
        Ok(token) => token,
        Err(AuthError::Unauthenticated) => return Err(AppError::BadCredentials),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

// =========================================================================
// /user
// =========================================================================

/// New user sign up
async fn sign_up(
    State(state): State<AppState>,
    AppJson(request): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "username and password are required".to_string(),
        ));
    }

    let hashed_password = state.auth.hash_password(&request.password).await?;
    state
        .users()
        .create(&request.username, &request.email, &hashed_password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "sign up successful. Proceed to login.".to_string(),
        }),
    ))
}

/// The authenticated caller
async fn current_user(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

/// Replace the caller's password
async fn change_password(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppJson(request): AppJson<PasswordChangeRequest>,
) -> AppResult<StatusCode> {
    if request.password.is_empty() {
        return Err(AppError::InvalidRequest("password is required".to_string()));
    }

    let hashed_password = state.auth.hash_password(&request.password).await?;
    state
        .users()
        .set_password(&user.username, &hashed_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Deactivate the caller's account. Outstanding tokens stop resolving.
async fn deactivate_self(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<StatusCode> {
    state.users().deactivate(&user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Generic resource handlers
// =========================================================================

async fn list_resources<R>(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<R::Row>>>
where
    R: Resource,
    R::Row: Serialize,
{
    let rows = Repository::<R>::new(state.pool)
        .list(owner_of::<R>(&user))
        .await?;
    Ok(Json(rows))
}

async fn get_resource<R>(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<R::Row>>
where
    R: Resource,
    R::Row: Serialize,
{
    let row = Repository::<R>::new(state.pool)
        .get(id, owner_of::<R>(&user))
        .await?;
    Ok(Json(row))
}

async fn create_resource<R>(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppJson(fields): AppJson<R::Fields>,
) -> AppResult<(StatusCode, Json<R::Row>)>
where
    R: Resource,
    R::Row: Serialize,
    R::Fields: DeserializeOwned,
{
    let id = Repository::<R>::new(state.pool)
        .create(&fields, owner_of::<R>(&user))
        .await?;
    Ok((StatusCode::CREATED, Json(R::assemble(id, fields))))
}

async fn update_resource<R>(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<R::Changes>,
) -> AppResult<StatusCode>
where
    R: Resource,
    R::Changes: DeserializeOwned,
{
    Repository::<R>::new(state.pool)
        .update(id, &changes, owner_of::<R>(&user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_resource<R>(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode>
where
    R: Resource,
{
    Repository::<R>::new(state.pool)
        .delete(id, owner_of::<R>(&user))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// GET /transactions
// =========================================================================

/// Page through the caller's transactions, newest first
async fn list_transactions(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AppQuery(query): AppQuery<TransactionListQuery>,
) -> AppResult<Json<Vec<Transaction>>> {
    let cursor = Cursor::from_parts(query.prev_date, query.prev_id)?;
    let page = PageRequest::new(cursor, query.limit);

    let rows = TransactionRepository::new(state.pool)
        .list_page(user.id, &page)
        .await?;
    Ok(Json(rows))
}
