use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::upstream::{
    encode_query, ProxyResult, UpstreamClient, CREATE_ORDER_PATH, GET_ORDER_PATH,
    LIST_ORDERS_PATH,
};
use crate::{
    amount_or_default, auth_header, string_or_default, Credentials, OrderPayload, RequestParts,
    DEFAULT_ACCOUNT, DEFAULT_CONCEPT, DEFAULT_EMAIL, DEFAULT_NAME, DEFAULT_PHONE,
};

const ERR_INVALID_JSON: &str = "Body JSON inválido";
const ERR_MISSING_ORDER_ID: &str = "Falta order_id";

#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            upstream: UpstreamClient::new(config.upstream_url.clone()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(&GatewayConfig::from_env())
    }

    pub fn for_tests(base_url: impl Into<String>) -> Self {
        Self {
            upstream: UpstreamClient::new(base_url),
        }
    }
}

/// Caller credentials shared by all three operations. `auth` carries a
/// pre-built token that bypasses signing, used for manual testing.
#[derive(Debug, Default, Deserialize)]
struct CallerAuth {
    #[serde(rename = "clientKey", default)]
    client_key: Option<String>,
    #[serde(rename = "secretHash", default)]
    secret_hash: Option<String>,
    #[serde(default)]
    auth: Option<String>,
}

impl CallerAuth {
    fn credentials(&self) -> Credentials {
        Credentials {
            client_key: self.client_key.clone().unwrap_or_default(),
            secret_hash: self.secret_hash.clone().unwrap_or_default(),
        }
    }

    /// A caller-supplied token is used verbatim; otherwise the request
    /// components computed for the outbound call are signed.
    fn token_for(&self, parts: &RequestParts) -> String {
        match &self.auth {
            Some(token) if !token.is_empty() => token.clone(),
            _ => auth_header(parts, &self.credentials()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CreateOrderRequest {
    #[serde(flatten)]
    caller: CallerAuth,
    #[serde(default)]
    amount: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    concept: Option<String>,
    #[serde(default)]
    account: Option<String>,
}

impl CreateOrderRequest {
    /// Trust-boundary coercion: every missing or unusable field takes
    /// its literal default; creation never hard-fails on input.
    fn payload(&self) -> OrderPayload {
        OrderPayload {
            amount: amount_or_default(coerce_amount(self.amount.as_ref())),
            name: string_or_default(self.name.clone(), DEFAULT_NAME),
            phone: string_or_default(self.phone.clone(), DEFAULT_PHONE),
            email: string_or_default(self.email.clone(), DEFAULT_EMAIL),
            concept: string_or_default(self.concept.clone(), DEFAULT_CONCEPT),
            account: string_or_default(self.account.clone(), DEFAULT_ACCOUNT),
        }
    }
}

fn coerce_amount(value: Option<&serde_json::Value>) -> Option<f64> {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetOrderRequest {
    #[serde(flatten)]
    caller: CallerAuth,
    #[serde(default)]
    order_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListOrdersRequest {
    #[serde(flatten)]
    caller: CallerAuth,
    #[serde(default)]
    account: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

pub fn app() -> Router {
    app_with_state(AppState::from_env())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/api/orden", post(create_order_handler))
        .route("/api/order/get", post(get_order_handler))
        .route("/api/orders", post(list_orders_handler))
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn create_order_handler(State(state): State<AppState>, body: String) -> Response {
    let req = match serde_json::from_str::<CreateOrderRequest>(&body) {
        Ok(req) => req,
        Err(err) => {
            warn!(error = %err, "rejected create-order body");
            return bad_request(ERR_INVALID_JSON);
        }
    };

    let payload = req.payload();
    let order_json = match serde_json::to_string(&payload) {
        Ok(json) => json,
        Err(err) => {
            warn!(error = %err, "failed to serialize order payload");
            return internal_error("No se pudo serializar la orden");
        }
    };

    let parts = RequestParts::post(CREATE_ORDER_PATH, order_json);
    let token = req.caller.token_for(&parts);
    let result = state.upstream.send(&parts, &token).await;
    info!(
        operation = "create_order",
        upstream_status = result.status,
        ok = result.ok,
        "proxied order creation"
    );
    proxy_response(result)
}

async fn get_order_handler(State(state): State<AppState>, body: String) -> Response {
    let req = match serde_json::from_str::<GetOrderRequest>(&body) {
        Ok(req) => req,
        Err(err) => {
            warn!(error = %err, "rejected get-order body");
            return bad_request(ERR_INVALID_JSON);
        }
    };

    let order_id = match req.order_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return bad_request(ERR_MISSING_ORDER_ID),
    };

    let query = encode_query(&[("order_id", order_id.as_str())]);
    let parts = RequestParts::get(GET_ORDER_PATH, query);
    let token = req.caller.token_for(&parts);
    let result = state.upstream.send(&parts, &token).await;
    info!(
        operation = "get_order",
        upstream_status = result.status,
        ok = result.ok,
        "proxied order lookup"
    );
    proxy_response(result)
}

async fn list_orders_handler(State(state): State<AppState>, body: String) -> Response {
    let req = match serde_json::from_str::<ListOrdersRequest>(&body) {
        Ok(req) => req,
        Err(err) => {
            warn!(error = %err, "rejected list-orders body");
            return bad_request(ERR_INVALID_JSON);
        }
    };

    let account = string_or_default(req.account.clone(), DEFAULT_ACCOUNT);
    let query = encode_query(&[("account", account.as_str())]);
    let parts = RequestParts::get(LIST_ORDERS_PATH, query);
    let token = req.caller.token_for(&parts);
    let result = state.upstream.send(&parts, &token).await;
    info!(
        operation = "list_orders",
        account = %account,
        upstream_status = result.status,
        ok = result.ok,
        "proxied order listing"
    );
    proxy_response(result)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../public/index.html"))
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, "No encontrado").into_response()
}

/// Transport failures surface as 500; everything else is relayed inside
/// a 200 envelope with the upstream status preserved in the body.
fn proxy_response(result: ProxyResult) -> Response {
    let status = if result.error.is_some() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(result)).into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            ok: false,
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            ok: false,
            error: message.to_string(),
        }),
    )
        .into_response()
}
