use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{
    BookingNote, BookingStatus, ConversationStatus, MarkTarget, OrderStatus, PaymentStatus,
    ProductKind, ProductStatus, QuestionReply, SenderRole,
};

// Uuids serialize as their hyphenated string form, so every lookup is a
// string-equality filter (`id.to_string()`) on the unique `id` index.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProductModel {
    pub id: Uuid,
    pub vendor_id: String,
    pub vendor_name: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub kind: ProductKind,
    pub status: ProductStatus,
    pub rating: f64,
    pub review_count: i64,
    pub views: i64,
    pub needs_rating_resync: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOrderItemModel {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOrderModel {
    pub id: Uuid,
    pub customer_id: String,
    pub vendor_id: String,
    pub items: Vec<MongoOrderItemModel>,
    pub total: i64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConversationModel {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessageModel {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub sender_role: SenderRole,
    pub content: String,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MongoReviewTargetKind {
    Product,
    Service,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoReviewModel {
    pub id: Uuid,
    pub target_kind: MongoReviewTargetKind,
    pub target_id: Uuid,
    pub customer_id: String,
    pub rating: i32,
    pub body: String,
    pub helpful_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoBookingModel {
    pub id: Uuid,
    pub customer_id: String,
    pub vendor_id: String,
    pub service_id: Uuid,
    pub status: BookingStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub messages: Vec<BookingNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionModel {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: String,
    pub customer_id: String,
    pub body: String,
    pub helpful_count: i64,
    pub replies: Vec<QuestionReply>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoHelpfulMarkModel {
    pub id: Uuid,
    pub target_kind: MarkTarget,
    pub target_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoVendorProfileModel {
    pub id: String,
    pub store_name: String,
    pub description: String,
    pub contact_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
