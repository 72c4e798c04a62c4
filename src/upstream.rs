use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{HttpMethod, RequestParts};

pub const CREATE_ORDER_PATH: &str = "/marketplace/apps/conekta/order/v3";
pub const GET_ORDER_PATH: &str = "/marketplace/apps/conekta/order/get";
pub const LIST_ORDERS_PATH: &str = "/private/apps/orders";

/// Uniform envelope relayed to the caller regardless of which upstream
/// operation ran. Non-2xx upstream statuses are preserved here as-is;
/// `error` is only set for transport-level failures.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyResult {
    pub status: u16,
    pub body: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProxyResult {
    pub fn from_status(status: u16, body: String) -> Self {
        Self {
            status,
            body,
            ok: (200..300).contains(&status),
            error: None,
        }
    }

    /// DNS/connection/TLS failures map to a 500-equivalent result with
    /// the error message attached. Never retried.
    pub fn transport_error(message: String) -> Self {
        Self {
            status: 500,
            body: String::new(),
            ok: false,
            error: Some(message),
        }
    }

    /// Structured view of the upstream body. An unparsable body is "no
    /// data", not an error.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// URL-encodes `key=value` pairs joined with `&`. The same string feeds
/// both the signature and the request line, so it is built once.
pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    base_url: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    /// Performs the single outbound call for a prepared request. The
    /// method, path, query and body must be exactly the components the
    /// token was signed over.
    pub async fn send(&self, parts: &RequestParts, auth: &str) -> ProxyResult {
        let mut url = format!("{}{}", self.base_url, parts.path);
        if !parts.query.is_empty() {
            url.push('?');
            url.push_str(&parts.query);
        }
        debug!(method = parts.method.as_str(), url = %url, "forwarding request upstream");

        let request = match parts.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(parts.body.clone()),
        }
        .header(AUTHORIZATION, auth);

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %url, error = %err, "upstream request failed");
                return ProxyResult::transport_error(err.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => ProxyResult::from_status(status, body),
            Err(err) => {
                warn!(url = %url, error = %err, "failed to read upstream body");
                ProxyResult::transport_error(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    use super::*;

    #[test]
    fn ok_is_true_exactly_for_2xx_statuses() {
        for (status, expected) in [
            (199, false),
            (200, true),
            (250, true),
            (299, true),
            (300, false),
            (404, false),
            (500, false),
        ] {
            let result = ProxyResult::from_status(status, String::new());
            assert_eq!(result.ok, expected, "status {status}");
        }
    }

    #[test]
    fn transport_error_is_a_500_equivalent() {
        let result = ProxyResult::transport_error("connection refused".to_string());
        assert_eq!(result.status, 500);
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn transport_error_serializes_with_error_field() {
        let result = ProxyResult::transport_error("dns failure".to_string());
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "dns failure");
    }

    #[test]
    fn relayed_result_omits_the_error_field() {
        let result = ProxyResult::from_status(404, "not found".to_string());
        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn unparsable_body_is_no_data() {
        let result = ProxyResult::from_status(200, "<html>oops</html>".to_string());
        assert!(result.json_body().is_none());
        let result = ProxyResult::from_status(200, r#"{"id":"ord_1"}"#.to_string());
        assert_eq!(result.json_body().expect("json")["id"], "ord_1");
    }

    #[test]
    fn query_values_are_url_encoded() {
        assert_eq!(encode_query(&[("order_id", "ord_1")]), "order_id=ord_1");
        assert_eq!(
            encode_query(&[("account", "a b&c")]),
            "account=a+b%26c"
        );
        assert_eq!(encode_query(&[]), "");
    }

    #[tokio::test]
    async fn get_sends_query_and_authorization_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(GET_ORDER_PATH)
                    .query_param("order_id", "ord_1")
                    .header("authorization", "DynamiCore ck:1:deadbeef");
                then.status(200).body(r#"{"id":"ord_1"}"#);
            })
            .await;

        let client = UpstreamClient::new(server.base_url());
        let parts = RequestParts::get(GET_ORDER_PATH, encode_query(&[("order_id", "ord_1")]));
        let result = client.send(&parts, "DynamiCore ck:1:deadbeef").await;

        mock.assert_async().await;
        assert_eq!(result.status, 200);
        assert!(result.ok);
        assert_eq!(result.body, r#"{"id":"ord_1"}"#);
    }

    #[tokio::test]
    async fn post_forwards_the_exact_signed_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(CREATE_ORDER_PATH)
                    .header("content-type", "application/json")
                    .body(r#"{"amount":18.0}"#);
                then.status(201).body("created");
            })
            .await;

        let client = UpstreamClient::new(server.base_url());
        let parts = RequestParts::post(CREATE_ORDER_PATH, r#"{"amount":18.0}"#);
        let result = client.send(&parts, "token").await;

        mock.assert_async().await;
        assert_eq!(result.status, 201);
        assert!(result.ok);
    }

    #[tokio::test]
    async fn upstream_non_2xx_is_relayed_not_treated_as_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(LIST_ORDERS_PATH);
                then.status(403).body(r#"{"message":"forbidden"}"#);
            })
            .await;

        let client = UpstreamClient::new(server.base_url());
        let parts = RequestParts::get(LIST_ORDERS_PATH, encode_query(&[("account", "95476")]));
        let result = client.send(&parts, "token").await;

        assert_eq!(result.status, 403);
        assert!(!result.ok);
        assert_eq!(result.body, r#"{"message":"forbidden"}"#);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn connection_failure_becomes_transport_error() {
        // Nothing listens on this port.
        let client = UpstreamClient::new("http://127.0.0.1:1");
        let parts = RequestParts::get(GET_ORDER_PATH, String::new());
        let result = client.send(&parts, "token").await;

        assert_eq!(result.status, 500);
        assert!(!result.ok);
        assert!(result.error.is_some());
    }
}
