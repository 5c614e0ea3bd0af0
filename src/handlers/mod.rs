use std::sync::Arc;

use thiserror::Error;

use crate::gateways::{EmailSender, NotificationDispatcher, PaymentProvider};
use crate::repositories::{
    BookingRepository, ConversationRepository, HelpfulMarkRepository, MessageRepository,
    OrderRepository, ProductRepository, QuestionRepository, RepositoryError, ReviewRepository,
    VendorRepository,
};

pub mod bookings;
pub mod catalog;
pub mod messaging;
pub mod orders;
pub mod questions;
pub mod reviews;
pub mod vendors;

pub type Result<T> = ::std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing/invalid fields or an invalid state transition.
    #[error("{0}")]
    Validation(String),

    /// Acting on someone else's resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => ServiceError::NotFound("cannot find object.".to_string()),
            e => ServiceError::Internal(::anyhow::anyhow!(e)),
        }
    }
}

/// The application layer: every operation validates, talks to the
/// repositories, and shapes a domain value. Nothing here holds state of
/// its own; all collaborators are injected.
pub struct Handler {
    pub products: Arc<dyn ProductRepository + Send + Sync>,
    pub orders: Arc<dyn OrderRepository + Send + Sync>,
    pub conversations: Arc<dyn ConversationRepository + Send + Sync>,
    pub messages: Arc<dyn MessageRepository + Send + Sync>,
    pub reviews: Arc<dyn ReviewRepository + Send + Sync>,
    pub bookings: Arc<dyn BookingRepository + Send + Sync>,
    pub questions: Arc<dyn QuestionRepository + Send + Sync>,
    pub marks: Arc<dyn HelpfulMarkRepository + Send + Sync>,
    pub vendors: Arc<dyn VendorRepository + Send + Sync>,
    pub payments: Arc<dyn PaymentProvider + Send + Sync>,
    pub notifier: Arc<dyn NotificationDispatcher + Send + Sync>,
    pub email: Arc<dyn EmailSender + Send + Sync>,
}

pub(crate) fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use uuid::Uuid;

    use super::Handler;
    use crate::entities::{
        Conversation, HelpfulMark, Message, Order, Product, Question, Review, ServiceBooking,
        VendorProfile,
    };
    use crate::gateways::{
        NoopEmailSender, NotificationDispatcher, NotificationKind, PaymentInit, PaymentOutcome,
        PaymentProvider,
    };
    use crate::repositories::mock::InMemoryRepository;

    pub struct StubPayments;

    #[async_trait]
    impl PaymentProvider for StubPayments {
        async fn initialize(
            &self,
            order_id: Uuid,
            _amount: i64,
            _email: &str,
        ) -> Result<PaymentInit> {
            Ok(PaymentInit {
                authorization_url: format!("https://pay.test/{}", order_id),
                reference: order_id.to_string(),
            })
        }

        async fn verify(&self, reference: &str) -> Result<PaymentOutcome> {
            match reference.ends_with("-failed") {
                true => Ok(PaymentOutcome::Failed),
                false => Ok(PaymentOutcome::Paid),
            }
        }
    }

    pub struct SilentNotifier;

    #[async_trait]
    impl NotificationDispatcher for SilentNotifier {
        async fn dispatch(
            &self,
            _user_id: &str,
            _kind: NotificationKind,
            _payload: ::serde_json::Value,
        ) {
        }
    }

    pub fn in_memory_handler() -> Handler {
        Handler {
            products: Arc::new(InMemoryRepository::<Product>::new()),
            orders: Arc::new(InMemoryRepository::<Order>::new()),
            conversations: Arc::new(InMemoryRepository::<Conversation>::new()),
            messages: Arc::new(InMemoryRepository::<Message>::new()),
            reviews: Arc::new(InMemoryRepository::<Review>::new()),
            bookings: Arc::new(InMemoryRepository::<ServiceBooking>::new()),
            questions: Arc::new(InMemoryRepository::<Question>::new()),
            marks: Arc::new(InMemoryRepository::<HelpfulMark>::new()),
            vendors: Arc::new(InMemoryRepository::<VendorProfile>::new()),
            payments: Arc::new(StubPayments),
            notifier: Arc::new(SilentNotifier),
            email: Arc::new(NoopEmailSender),
        }
    }
}
