use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::entities::{
    BookingNote, BookingStatus, Conversation, ConversationStatus, HelpfulMark, Message, Order,
    OrderStatus, PaymentStatus, Product, ProductStatus, Question, QuestionReply, Review,
    ReviewTarget, SenderRole, ServiceBooking, VendorProfile,
};

pub mod mock;
pub mod mongo;

pub type Result<T> = ::std::result::Result<T, RepositoryError>;

#[derive(Debug)]
pub enum RepositoryError {
    NotFound,
    NoUnique { matched: u32 },
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "cannot find object."),
            RepositoryError::NoUnique { matched } => write!(
                f,
                "expected unique object, found non-unique objects (matched: {})",
                matched
            ),
            RepositoryError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for RepositoryError {}

#[async_trait]
pub trait ProductRepository {
    /// Returns `false` when a product with the same id already exists.
    async fn insert(&self, item: Product) -> Result<bool>;
    async fn find(&self, id: Uuid) -> Result<Product>;
    async fn finds(&self, query: ProductQuery) -> Result<Vec<Product>>;
    async fn update(&self, id: Uuid, mutation: ProductMutation) -> Result<Product>;

    async fn increment_views(&self, id: Uuid) -> Result<()>;

    /// Overwrites the denormalized aggregate and clears the resync flag.
    async fn set_rating_aggregate(&self, id: Uuid, rating: f64, count: u32) -> Result<()>;
    /// Marks the aggregate as stale after a failed resync.
    async fn flag_rating_resync(&self, id: Uuid) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub vendor_id: Option<String>,
    pub status: Option<ProductStatus>,
    pub name: Option<Regex>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductMutation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub status: Option<ProductStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait OrderRepository {
    async fn insert(&self, item: Order) -> Result<bool>;
    async fn find(&self, id: Uuid) -> Result<Order>;
    async fn finds(&self, query: OrderQuery) -> Result<Vec<Order>>;
    async fn update(&self, id: Uuid, mutation: OrderMutation) -> Result<Order>;

    /// Has this customer an order for this product that already reached
    /// `status`? Used by the purchase gate on digital-product reviews.
    async fn exists_for_product(
        &self,
        customer_id: &str,
        product_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool>;
}

#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub customer_id: Option<String>,
    pub vendor_id: Option<String>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderMutation {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_reference: Option<String>,
    pub tracking_number: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait ConversationRepository {
    async fn insert(&self, item: Conversation) -> Result<bool>;
    async fn find(&self, id: Uuid) -> Result<Conversation>;
    async fn finds(&self, query: ConversationQuery) -> Result<Vec<Conversation>>;
    async fn update(&self, id: Uuid, mutation: ConversationMutation) -> Result<Conversation>;
}

#[derive(Debug, Clone, Default)]
pub struct ConversationQuery {
    pub vendor_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<ConversationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationMutation {
    pub status: Option<ConversationStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait MessageRepository {
    async fn insert(&self, item: Message) -> Result<bool>;
    async fn finds(&self, query: MessageQuery) -> Result<Vec<Message>>;

    /// Marks every unread message in the conversation that was NOT sent by
    /// `reader_role` as read, as one atomic batch. Returns the number of
    /// messages touched.
    async fn mark_read(&self, conversation_id: Uuid, reader_role: SenderRole) -> Result<u64>;
}

#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub conversation_id: Option<Uuid>,
    pub unread_only: bool,
}

#[async_trait]
pub trait ReviewRepository {
    async fn insert(&self, item: Review) -> Result<bool>;
    async fn find(&self, id: Uuid) -> Result<Review>;
    async fn finds(&self, query: ReviewQuery) -> Result<Vec<Review>>;

    async fn increment_helpful(&self, id: Uuid) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ReviewQuery {
    pub target: Option<ReviewTarget>,
    pub customer_id: Option<String>,
}

#[async_trait]
pub trait BookingRepository {
    async fn insert(&self, item: ServiceBooking) -> Result<bool>;
    async fn find(&self, id: Uuid) -> Result<ServiceBooking>;
    async fn finds(&self, query: BookingQuery) -> Result<Vec<ServiceBooking>>;
    async fn update(&self, id: Uuid, mutation: BookingMutation) -> Result<ServiceBooking>;

    async fn push_note(&self, id: Uuid, note: BookingNote) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct BookingQuery {
    pub customer_id: Option<String>,
    pub vendor_id: Option<String>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingMutation {
    pub status: Option<BookingStatus>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait QuestionRepository {
    async fn insert(&self, item: Question) -> Result<bool>;
    async fn find(&self, id: Uuid) -> Result<Question>;
    async fn finds(&self, query: QuestionQuery) -> Result<Vec<Question>>;

    async fn push_reply(&self, id: Uuid, reply: QuestionReply) -> Result<()>;
    async fn increment_helpful(&self, id: Uuid) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct QuestionQuery {
    pub product_id: Option<Uuid>,
    pub vendor_id: Option<String>,
}

#[async_trait]
pub trait HelpfulMarkRepository {
    /// Returns `false` when this user already marked this target.
    async fn insert(&self, item: HelpfulMark) -> Result<bool>;
}

#[async_trait]
pub trait VendorRepository {
    async fn upsert(&self, item: VendorProfile) -> Result<()>;
    async fn find(&self, vendor_id: &str) -> Result<VendorProfile>;
}
