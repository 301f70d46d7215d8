use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::{
    auth::{auth_middleware, CallerIdentity},
    config::{AuthConfig, Config},
    export::{self, ACCOUNT_FIELDS, DEFAULT_DELIMITER, TRANSACTION_FIELDS},
    models::Credential,
    remote::{LinkTokenParams, RemoteClient, RemoteError},
    report::{poll_for_report, ReportError},
    store::Store,
    sync::{fetch_all_transactions, full_history_window, SyncError},
};

#[derive(Clone)]
pub struct AppState {
    pub remote: Arc<dyn RemoteClient>,
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
    #[error(transparent)]
    Export(#[from] crate::export::ExportError),
}

/// Error policy: rejections originating at the remote API come back as a
/// 200 with a structured error payload the client UI can render; a missing
/// credential gets its own code so the UI can prompt for linking; timeouts
/// and internal failures are transport-level errors.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use crate::store::StoreError;

        match self {
            ApiError::Remote(RemoteError::Api(body))
            | ApiError::Sync(SyncError::Remote(RemoteError::Api(body)))
            | ApiError::Report(ReportError::Remote(RemoteError::Api(body))) => {
                (StatusCode::OK, Json(json!({ "error": body }))).into_response()
            }
            ApiError::Store(StoreError::CredentialNotFound(uid)) => (
                StatusCode::OK,
                Json(json!({
                    "error": {
                        "error_type": "ITEM_ERROR",
                        "error_code": "ITEM_NOT_LINKED",
                        "error_message": format!("user {} has no linked item", uid),
                        "display_message": "Link an account first",
                    }
                })),
            )
                .into_response(),
            ApiError::Report(ReportError::TimedOut { attempts }) => (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({
                    "error": format!("report was not ready after {} attempts", attempts)
                })),
            )
                .into_response(),
            other => {
                tracing::error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": other.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

fn credential_for(state: &AppState, caller: &CallerIdentity) -> Result<Credential, ApiError> {
    Ok(state.store.find_credential(&caller.uid)?)
}

#[derive(Deserialize)]
struct SetAccessTokenRequest {
    public_token: String,
}

/// Exchanges a one-time public token for an access token and persists the
/// link keyed by the caller's uid.
async fn set_access_token(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<SetAccessTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let exchange = state
        .remote
        .exchange_public_token(&request.public_token)
        .await?;

    tracing::info!(uid = %caller.uid, item_id = %exchange.item_id, "Linked item");

    state.store.save_credential(Credential::new(
        &caller.uid,
        &exchange.access_token,
        &exchange.item_id,
    ))?;

    Ok(Json(json!({
        "access_token": exchange.access_token,
        "item_id": exchange.item_id,
    })))
}

/// Synchronizes the caller's full-lookback transaction window, optionally
/// persists it, and returns the fresh data. Persistence failures are logged
/// per sub-resource and never unwind the response.
async fn transactions(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = credential_for(&state, &caller)?;
    let sync = &state.config.sync;
    let (start_date, end_date) = full_history_window(sync.lookback_days);

    let window = fetch_all_transactions(
        state.remote.as_ref(),
        &credential.access_token,
        start_date,
        end_date,
        sync.page_size,
        sync.max_pages,
    )
    .await?;

    if sync.store_data {
        let outcome = state
            .store
            .save_for(&caller.uid, &window.accounts, &window.transactions);
        if let Err(e) = &outcome.accounts {
            tracing::warn!(uid = %caller.uid, error = %e, "Account persistence failed");
        }
        if let Err(e) = &outcome.transactions {
            tracing::warn!(uid = %caller.uid, error = %e, "Transaction persistence failed");
        }
    }

    Ok(Json(json!({
        "accounts": window.accounts,
        "transactions": window.transactions,
    })))
}

async fn transactions_csv(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let all = state.store.list_transactions_for(&caller.uid)?;
    let body = export::project(&all, TRANSACTION_FIELDS, DEFAULT_DELIMITER)?;
    Ok((
        [(header::CONTENT_TYPE, export::content_type(DEFAULT_DELIMITER))],
        body,
    ))
}

async fn balances_csv(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let all = state.store.list_accounts_for(&caller.uid)?;
    let body = export::project(&all, ACCOUNT_FIELDS, DEFAULT_DELIMITER)?;
    Ok((
        [(header::CONTENT_TYPE, export::content_type(DEFAULT_DELIMITER))],
        body,
    ))
}

/// Creates an asset report and polls for it within the configured budget.
async fn assets(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = credential_for(&state, &caller)?;
    let sync = &state.config.sync;

    let report_token = state
        .remote
        .create_report(&credential.access_token, sync.report_retention_days)
        .await?;

    let payload = poll_for_report(
        state.remote.as_ref(),
        &report_token,
        sync.report_attempts,
        Duration::from_secs(sync.report_interval_secs),
    )
    .await?;

    Ok(Json(json!({
        "report_token": payload.report_token,
        "report": payload.report,
    })))
}

async fn accounts(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = credential_for(&state, &caller)?;
    let accounts = state.remote.accounts(&credential.access_token).await?;
    Ok(Json(json!({ "accounts": accounts })))
}

/// Same shape as `accounts` but asks the remote for refreshed balances
/// instead of possibly cached ones.
async fn balance(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = credential_for(&state, &caller)?;
    let accounts = state.remote.balances(&credential.access_token).await?;
    Ok(Json(json!({ "accounts": accounts })))
}

/// Creates a link token the client UI needs to start a link session. This
/// is the entry point of the linking flow; `set_access_token` finishes it.
async fn create_link_token(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let remote = &state.config.remote;
    let link_token = state
        .remote
        .create_link_token(&LinkTokenParams {
            client_user_id: caller.uid.clone(),
            products: remote.products.clone(),
            country_codes: remote.country_codes.clone(),
            redirect_uri: if remote.redirect_uri.is_empty() {
                None
            } else {
                Some(remote.redirect_uri.clone())
            },
        })
        .await?;
    Ok(Json(json!({ "link_token": link_token })))
}

/// One-time public token for the caller's existing item, used to reopen
/// the link UI in update mode.
async fn create_public_token(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = credential_for(&state, &caller)?;
    let public_token = state
        .remote
        .create_public_token(&credential.access_token)
        .await?;
    Ok(Json(json!({ "public_token": public_token })))
}

/// Item metadata plus the institution it belongs to, when the item names one.
async fn item(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = credential_for(&state, &caller)?;
    let item = state.remote.item(&credential.access_token).await?;

    let institution = match item.get("institution_id").and_then(|v| v.as_str()) {
        Some(id) => Some(
            state
                .remote
                .institution(id, &state.config.remote.country_codes)
                .await?,
        ),
        None => None,
    };

    Ok(Json(json!({ "item": item, "institution": institution })))
}

async fn identity(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    let credential = credential_for(&state, &caller)?;
    let identity = state.remote.identity(&credential.access_token).await?;
    Ok(Json(json!({ "identity": identity })))
}

#[derive(Deserialize)]
struct PaymentParams {
    payment_id: String,
}

/// The payment id arrives as a request parameter; it is never process-wide
/// state shared between handlers.
async fn payment(
    State(state): State<AppState>,
    Query(params): Query<PaymentParams>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = state.remote.payment(&params.payment_id).await?;
    Ok(Json(json!({ "payment": payment })))
}

async fn info(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> impl IntoResponse {
    let item_id = state
        .store
        .find_credential(&caller.uid)
        .ok()
        .map(|c| c.item_id);

    Json(json!({
        "uid": caller.uid,
        "item_id": item_id,
        "products": state.config.remote.products,
    }))
}

pub fn router(state: AppState, auth: Arc<AuthConfig>) -> Router {
    Router::new()
        .route("/api/info", post(info))
        .route("/api/create_link_token", post(create_link_token))
        .route("/api/create_public_token", get(create_public_token))
        .route("/api/set_access_token", post(set_access_token))
        .route("/api/accounts", get(accounts))
        .route("/api/balance", get(balance))
        .route("/api/item", get(item).post(item))
        .route("/api/identity", get(identity))
        .route("/api/transactions", get(transactions).post(transactions))
        .route("/api/payment", get(payment))
        .route("/api/assets", get(assets))
        .route("/api/all/transactions/csv", get(transactions_csv))
        .route("/api/all/balances/csv", get(balances_csv))
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(auth))
        .with_state(state)
}
