use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, info};

/// The only `payment_status` that confirms a checkout session.
pub const PAID: &str = "paid";

/// Whether `id` has the shape of a Checkout session id: `cs_` followed by
/// letters, digits and underscores.
pub fn is_session_id(id: &str) -> bool {
    id.strip_prefix("cs_")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

/// Creates and retrieves hosted checkout sessions.
pub trait CheckoutGateway: Send + Sync {
    fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> impl Future<Output = Result<CreatedSession>> + Send;

    fn retrieve_session(&self, session_id: &str) -> impl Future<Output = Result<CheckoutSession>> + Send;
}

/// One line item, quantity one, plus the metadata echoed back on confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub name: String,
    /// Minor currency units.
    pub unit_amount: i64,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: String,
    /// Minor currency units.
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PAID
    }

    /// Non-empty metadata value for `key`.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Email given at checkout, from metadata first, then the session itself.
    pub fn email(&self) -> Option<&str> {
        self.meta("customerEmail")
            .or(self.customer_email.as_deref())
            .or(self.customer_details.as_ref().and_then(|d| d.email.as_deref()))
    }
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Deserialize)]
struct StripeError {
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    currency: String,
}

impl StripeClient {
    pub fn new(api_base: &str, secret_key: &str, currency: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            currency: currency.to_string(),
        }
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            bail!("Stripe is not configured (missing secret key)");
        }
        Ok(())
    }

    async fn parse<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let message = resp
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or_else(|| "no error message".to_string());
        bail!("Stripe returned {status}: {message}")
    }

    /// The session id always lands in a single path segment.
    fn session_url(&self, session_id: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}/v1/checkout/sessions", self.api_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Stripe API base {} cannot carry a path", self.api_base))?
            .push(session_id);
        Ok(url)
    }
}

/// Stripe's form encoding of a one-item payment session.
pub fn session_form(request: &CheckoutSessionRequest, currency: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("line_items[0][price_data][currency]".to_string(), currency.to_string()),
        ("line_items[0][price_data][unit_amount]".to_string(), request.unit_amount.to_string()),
        ("line_items[0][price_data][product_data][name]".to_string(), request.name.clone()),
    ];
    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }
    for (k, v) in &request.metadata {
        form.push((format!("metadata[{k}]"), v.clone()));
    }
    form
}

impl CheckoutGateway for StripeClient {
    async fn create_session(&self, request: &CheckoutSessionRequest) -> Result<CreatedSession> {
        self.ensure_configured()?;
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&session_form(request, &self.currency))
            .send()
            .await?;
        let session: CreatedSession = Self::parse(resp).await?;
        info!("Created checkout session {} for {}", session.id, request.name);
        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession> {
        self.ensure_configured()?;
        if !is_session_id(session_id) {
            bail!("Invalid checkout session id");
        }
        let url = self.session_url(session_id)?;
        let resp = self.http.get(url).bearer_auth(&self.secret_key).send().await?;
        let session: CheckoutSession = Self::parse(resp).await?;
        debug!("Retrieved checkout session {} ({})", session.id, session.payment_status);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_carries_line_item_and_metadata() {
        let request = CheckoutSessionRequest {
            name: "Tuesday Futsal".to_string(),
            unit_amount: 1200,
            success_url: "https://pickup.example/payment-success?session_id={CHECKOUT_SESSION_ID}".to_string(),
            cancel_url: "https://pickup.example/games/7".to_string(),
            customer_email: Some("ana@example.com".to_string()),
            metadata: BTreeMap::from([
                ("gameId".to_string(), "7".to_string()),
                ("customerName".to_string(), "Ana".to_string()),
            ]),
        };
        let form = session_form(&request, "usd");
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1200"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(get("metadata[gameId]"), Some("7"));
        assert_eq!(get("customer_email"), Some("ana@example.com"));
    }

    #[test]
    fn session_email_prefers_metadata() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "amount_total": 1200,
            "customer_email": "stripe@example.com",
            "metadata": { "customerEmail": "meta@example.com", "seasonId": "" }
        }))
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.email(), Some("meta@example.com"));
        assert_eq!(session.meta("seasonId"), None);
    }

    #[test]
    fn session_email_falls_back_to_customer_details() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_2",
            "payment_status": "unpaid",
            "customer_details": { "email": "details@example.com" }
        }))
        .unwrap();

        assert!(!session.is_paid());
        assert_eq!(session.email(), Some("details@example.com"));
    }

    #[tokio::test]
    async fn unconfigured_client_refuses_calls() {
        let client = StripeClient::new("https://api.stripe.com", "", "usd");
        let err = client.retrieve_session("cs_test_1").await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn session_ids_are_checked() {
        assert!(is_session_id("cs_test_a1B2c3"));
        assert!(!is_session_id("cs_"));
        assert!(!is_session_id("pi_123"));
        assert!(!is_session_id("cs_x/../../customers/cus_123"));
        assert!(!is_session_id("cs_x?expand=customer"));
    }

    #[test]
    fn session_id_stays_in_one_path_segment() {
        let client = StripeClient::new("https://api.stripe.com/", "sk_test_1", "usd");

        let url = client.session_url("cs_test_1").unwrap();
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/checkout/sessions/cs_test_1");

        let url = client.session_url("cs_x/../../customers/cus_123").unwrap();
        assert_eq!(url.path(), "/v1/checkout/sessions/cs_x%2F..%2F..%2Fcustomers%2Fcus_123");
    }

    #[tokio::test]
    async fn malformed_session_id_is_refused_before_any_request() {
        let client = StripeClient::new("http://127.0.0.1:9", "sk_test_1", "usd");
        let err = client.retrieve_session("cs_x/../customers").await.unwrap_err();
        assert!(err.to_string().contains("Invalid checkout session id"));
    }
}
