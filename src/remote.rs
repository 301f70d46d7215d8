use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use time::Date;

use crate::models::{Account, Transaction};

/// Structured error payload returned by the aggregation API on rejected
/// calls. Forwarded verbatim to the client so its UI can render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error_type: String,
    pub error_code: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub display_message: Option<String>,
}

impl std::fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code, self.error_message)
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote API rejected the call ({0})")]
    Api(ApiErrorBody),
    /// Report generation has not finished. Only the report poller retries
    /// on this; everything else treats it as a plain remote failure.
    #[error("report is not ready yet")]
    NotReady,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected remote response: {0}")]
    Decode(String),
}

/// One page of the transactions window. `total_transactions` is the
/// remote's count for the whole window, not for this page.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsPage {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    pub total_transactions: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchange {
    pub access_token: String,
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report_token: String,
    pub report: serde_json::Value,
}

/// Parameters for creating a link token. `client_user_id` is the caller's
/// uid so the remote can correlate link sessions per user.
#[derive(Debug, Clone)]
pub struct LinkTokenParams {
    pub client_user_id: String,
    pub products: Vec<String>,
    pub country_codes: Vec<String>,
    pub redirect_uri: Option<String>,
}

/// Capability the pipeline uses to talk to the aggregation API. Stateless
/// request/response calls; a shared handle must be safe for concurrent use.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange, RemoteError>;

    async fn transactions_page(
        &self,
        access_token: &str,
        start_date: Date,
        end_date: Date,
        limit: i64,
        offset: i64,
    ) -> Result<TransactionsPage, RemoteError>;

    async fn create_link_token(&self, params: &LinkTokenParams) -> Result<String, RemoteError>;

    async fn create_public_token(&self, access_token: &str) -> Result<String, RemoteError>;

    async fn accounts(&self, access_token: &str) -> Result<Vec<Account>, RemoteError>;

    /// Forces a balance refresh at the institution before returning accounts,
    /// unlike `accounts` which may serve cached balances.
    async fn balances(&self, access_token: &str) -> Result<Vec<Account>, RemoteError>;

    async fn item(&self, access_token: &str) -> Result<serde_json::Value, RemoteError>;

    async fn institution(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<serde_json::Value, RemoteError>;

    async fn identity(&self, access_token: &str) -> Result<serde_json::Value, RemoteError>;

    async fn payment(&self, payment_id: &str) -> Result<serde_json::Value, RemoteError>;

    async fn create_report(
        &self,
        access_token: &str,
        days_requested: i32,
    ) -> Result<String, RemoteError>;

    async fn get_report(&self, report_token: &str) -> Result<ReportPayload, RemoteError>;
}

/// reqwest-backed client for the real aggregation API.
pub struct HttpRemoteClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl HttpRemoteClient {
    pub fn new(base_url: &str, client_id: &str, secret: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        }
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("PLAID-CLIENT-ID", &self.client_id)
            .header("PLAID-SECRET", &self.secret)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(err) if err.error_code == "PRODUCT_NOT_READY" => Err(RemoteError::NotReady),
            Ok(err) => {
                tracing::debug!(code = %err.error_code, %path, "Remote API rejected call");
                Err(RemoteError::Api(err))
            }
            Err(_) => Err(RemoteError::Decode(format!("HTTP {}: {}", status, text))),
        }
    }
}

#[derive(Serialize)]
struct TransactionsGetRequest<'a> {
    access_token: &'a str,
    start_date: Date,
    end_date: Date,
    options: TransactionsGetOptions,
}

#[derive(Serialize)]
struct TransactionsGetOptions {
    count: i64,
    offset: i64,
}

#[derive(Deserialize)]
struct AccountsGetResponse {
    accounts: Vec<Account>,
}

#[derive(Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Deserialize)]
struct PublicTokenCreateResponse {
    public_token: String,
}

#[derive(Deserialize)]
struct ItemGetResponse {
    item: serde_json::Value,
}

#[derive(Deserialize)]
struct InstitutionGetResponse {
    institution: serde_json::Value,
}

#[derive(Deserialize)]
struct AssetReportCreateResponse {
    asset_report_token: String,
}

#[derive(Deserialize)]
struct AssetReportGetResponse {
    report: serde_json::Value,
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn exchange_public_token(&self, public_token: &str) -> Result<TokenExchange, RemoteError> {
        self.post(
            "/item/public_token/exchange",
            &serde_json::json!({ "public_token": public_token }),
        )
        .await
    }

    async fn transactions_page(
        &self,
        access_token: &str,
        start_date: Date,
        end_date: Date,
        limit: i64,
        offset: i64,
    ) -> Result<TransactionsPage, RemoteError> {
        self.post(
            "/transactions/get",
            &TransactionsGetRequest {
                access_token,
                start_date,
                end_date,
                options: TransactionsGetOptions {
                    count: limit,
                    offset,
                },
            },
        )
        .await
    }

    async fn create_link_token(&self, params: &LinkTokenParams) -> Result<String, RemoteError> {
        let mut body = serde_json::json!({
            "client_name": "bankfeed",
            "language": "en",
            "country_codes": params.country_codes,
            "products": params.products,
            "user": { "client_user_id": params.client_user_id },
        });
        if let Some(uri) = &params.redirect_uri {
            body["redirect_uri"] = serde_json::json!(uri);
        }
        let response: LinkTokenCreateResponse = self.post("/link/token/create", &body).await?;
        Ok(response.link_token)
    }

    async fn create_public_token(&self, access_token: &str) -> Result<String, RemoteError> {
        let response: PublicTokenCreateResponse = self
            .post(
                "/item/public_token/create",
                &serde_json::json!({ "access_token": access_token }),
            )
            .await?;
        Ok(response.public_token)
    }

    async fn accounts(&self, access_token: &str) -> Result<Vec<Account>, RemoteError> {
        let response: AccountsGetResponse = self
            .post(
                "/accounts/get",
                &serde_json::json!({ "access_token": access_token }),
            )
            .await?;
        Ok(response.accounts)
    }

    async fn balances(&self, access_token: &str) -> Result<Vec<Account>, RemoteError> {
        let response: AccountsGetResponse = self
            .post(
                "/accounts/balance/get",
                &serde_json::json!({ "access_token": access_token }),
            )
            .await?;
        Ok(response.accounts)
    }

    async fn item(&self, access_token: &str) -> Result<serde_json::Value, RemoteError> {
        let response: ItemGetResponse = self
            .post(
                "/item/get",
                &serde_json::json!({ "access_token": access_token }),
            )
            .await?;
        Ok(response.item)
    }

    async fn institution(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<serde_json::Value, RemoteError> {
        let response: InstitutionGetResponse = self
            .post(
                "/institutions/get_by_id",
                &serde_json::json!({
                    "institution_id": institution_id,
                    "country_codes": country_codes,
                }),
            )
            .await?;
        Ok(response.institution)
    }

    async fn identity(&self, access_token: &str) -> Result<serde_json::Value, RemoteError> {
        self.post(
            "/identity/get",
            &serde_json::json!({ "access_token": access_token }),
        )
        .await
    }

    async fn payment(&self, payment_id: &str) -> Result<serde_json::Value, RemoteError> {
        self.post(
            "/payment_initiation/payment/get",
            &serde_json::json!({ "payment_id": payment_id }),
        )
        .await
    }

    async fn create_report(
        &self,
        access_token: &str,
        days_requested: i32,
    ) -> Result<String, RemoteError> {
        let response: AssetReportCreateResponse = self
            .post(
                "/asset_report/create",
                &serde_json::json!({
                    "access_tokens": [access_token],
                    "days_requested": days_requested,
                }),
            )
            .await?;
        Ok(response.asset_report_token)
    }

    async fn get_report(&self, report_token: &str) -> Result<ReportPayload, RemoteError> {
        let response: AssetReportGetResponse = self
            .post(
                "/asset_report/get",
                &serde_json::json!({ "asset_report_token": report_token }),
            )
            .await?;
        Ok(ReportPayload {
            report_token: report_token.to_string(),
            report: response.report,
        })
    }
}
