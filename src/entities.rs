use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    Physical,
    Digital,
    Service,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub vendor_id: String,
    pub vendor_name: String,
    pub name: String,
    pub description: String,
    /// Price in minor currency units.
    pub price: i64,
    pub kind: ProductKind,
    pub status: ProductStatus,
    pub rating: f64,
    pub review_count: u32,
    pub views: u64,
    pub needs_rating_resync: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The full transition table for orders. Every status write goes
    /// through here; there are no ad hoc per-route checks.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;

        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn is_cancellable(self) -> bool {
        self.can_transition(OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer_id: String,
    pub vendor_id: String,
    pub items: Vec<OrderItem>,
    pub total: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Pending,
    Closed,
}

impl ConversationStatus {
    /// Explicit status updates may move between any of the three states;
    /// the interesting rule is the implicit one: any new message reopens
    /// the conversation (see `Handler::send_message`).
    pub fn can_transition(self, next: ConversationStatus) -> bool {
        self != next
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub vendor_id: String,
    pub customer_id: String,
    pub product_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub subject: String,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Customer,
    Vendor,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub sender_role: SenderRole,
    pub content: String,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}

/// What a review or helpful-mark points at. Products and services share
/// one review collection; the discriminator keeps the queries honest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ReviewTarget {
    Product(Uuid),
    Service(Uuid),
}

impl ReviewTarget {
    pub fn id(self) -> Uuid {
        match self {
            ReviewTarget::Product(id) | ReviewTarget::Service(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub target: ReviewTarget,
    pub customer_id: String,
    pub rating: u8,
    pub body: String,
    pub helpful_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingSchedule,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn can_transition(self, next: BookingStatus) -> bool {
        use BookingStatus::*;

        matches!(
            (self, next),
            (PendingSchedule, Scheduled)
                | (PendingSchedule, Cancelled)
                | (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (InProgress, Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingNote {
    pub sender_role: SenderRole,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBooking {
    pub id: Uuid,
    pub customer_id: String,
    pub vendor_id: String,
    pub service_id: Uuid,
    pub status: BookingStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub messages: Vec<BookingNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReply {
    pub responder_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: String,
    pub customer_id: String,
    pub body: String,
    pub helpful_count: u32,
    pub replies: Vec<QuestionReply>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkTarget {
    Question,
    Review,
}

/// One "found this helpful" vote. Unique per (target, user) — the store
/// enforces it with a unique index, the mock with a linear scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpfulMark {
    pub id: Uuid,
    pub target_kind: MarkTarget,
    pub target_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorProfile {
    pub vendor_id: String,
    pub store_name: String,
    pub description: String,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_lifecycle_follows_the_table() {
        use OrderStatus::*;

        assert!(Pending.can_transition(Processing));
        assert!(Processing.can_transition(Shipped));
        assert!(Shipped.can_transition(Delivered));

        assert!(Pending.is_cancellable());
        assert!(Processing.is_cancellable());
        assert!(!Shipped.is_cancellable());
        assert!(!Delivered.is_cancellable());
        assert!(!Cancelled.is_cancellable());

        assert!(!Shipped.can_transition(Processing));
        assert!(!Cancelled.can_transition(Pending));
    }

    #[test]
    fn booking_lifecycle_follows_the_table() {
        use BookingStatus::*;

        assert!(PendingSchedule.can_transition(Scheduled));
        assert!(Scheduled.can_transition(InProgress));
        assert!(InProgress.can_transition(Completed));
        assert!(Scheduled.can_transition(Cancelled));

        assert!(!InProgress.can_transition(Cancelled));
        assert!(!Completed.can_transition(InProgress));
        assert!(!Cancelled.can_transition(Scheduled));
    }

    #[test]
    fn review_target_serializes_with_discriminator() {
        let id = Uuid::new_v4();
        let v = serde_json::to_value(ReviewTarget::Product(id)).unwrap();

        assert_eq!(v["kind"], "product");
        assert_eq!(v["id"], id.to_string());
    }
}
