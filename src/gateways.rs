use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Outcome of a gateway verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Paid,
    Failed,
}

#[derive(Debug, Clone)]
pub struct PaymentInit {
    pub authorization_url: String,
    pub reference: String,
}

#[async_trait]
pub trait PaymentProvider {
    /// Starts a transaction for an order; the customer finishes it on the
    /// gateway's hosted page and comes back with the reference.
    async fn initialize(&self, order_id: Uuid, amount: i64, email: &str) -> Result<PaymentInit>;

    async fn verify(&self, reference: &str) -> Result<PaymentOutcome>;
}

pub struct HttpPaymentProvider {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    callback_base: String,
}

impl HttpPaymentProvider {
    pub fn new(api_base: String, secret_key: String, callback_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            secret_key,
            callback_base,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    status: bool,
    data: Option<InitializeData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    data: Option<VerifyData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn initialize(&self, order_id: Uuid, amount: i64, email: &str) -> Result<PaymentInit> {
        let body = ::serde_json::json!({
            "amount": amount,
            "email": email,
            "reference": order_id.to_string(),
            "callback_url": format!("{}/orders/{}/payment", self.callback_base, order_id),
        });

        let res: InitializeResponse = self
            .http
            .post(format!("{}/transaction/initialize", self.api_base))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match (res.status, res.data) {
            (true, Some(data)) => Ok(PaymentInit {
                authorization_url: data.authorization_url,
                reference: data.reference,
            }),
            (_, _) => Err(anyhow!(
                "gateway rejected initialize: {}",
                res.message.unwrap_or_else(|| "no message".to_string())
            )),
        }
    }

    async fn verify(&self, reference: &str) -> Result<PaymentOutcome> {
        let res: VerifyResponse = self
            .http
            .get(format!("{}/transaction/verify/{}", self.api_base, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await?
            .json()
            .await?;

        match (res.status, res.data) {
            (true, Some(data)) if data.status == "success" => Ok(PaymentOutcome::Paid),
            (true, Some(_)) => Ok(PaymentOutcome::Failed),
            (_, _) => Err(anyhow!(
                "gateway rejected verify: {}",
                res.message.unwrap_or_else(|| "no message".to_string())
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum NotificationKind {
    OrderPlaced,
    OrderStatusChanged,
    NewMessage,
    ReviewReceived,
    BookingUpdated,
    QuestionAsked,
}

/// Fire and forget. Dispatch failures are the caller's to swallow; the
/// primary write never waits on, or fails because of, a notification.
#[async_trait]
pub trait NotificationDispatcher {
    async fn dispatch(&self, user_id: &str, kind: NotificationKind, payload: ::serde_json::Value);
}

pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn dispatch(&self, user_id: &str, kind: NotificationKind, payload: ::serde_json::Value) {
        info!(user_id, ?kind, %payload, "notification dispatched");
    }
}

/// Email delivery is a placeholder in this system.
#[async_trait]
pub trait EmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

pub struct NoopEmailSender;

#[async_trait]
impl EmailSender for NoopEmailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        info!(to, subject, "email sending is not wired up; dropping");
        Ok(())
    }
}
