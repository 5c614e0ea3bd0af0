use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    BookingMutation, BookingQuery, BookingRepository, ConversationMutation, ConversationQuery,
    ConversationRepository, HelpfulMarkRepository, MessageQuery, MessageRepository, OrderMutation,
    OrderQuery, OrderRepository, ProductMutation, ProductQuery, ProductRepository,
    QuestionQuery, QuestionRepository, RepositoryError, Result, ReviewQuery, ReviewRepository,
    VendorRepository,
};
use crate::entities::{
    BookingNote, Conversation, HelpfulMark, Message, Order, OrderStatus, Product, Question,
    QuestionReply, Review, SenderRole, ServiceBooking, VendorProfile,
};

mod helpers;

use helpers::{find_mut, find_ref};

/// Linear-scan store used by the test suite. One `Vec` per collection,
/// same trait surface as the Mongo implementation.
pub struct InMemoryRepository<T>(Mutex<Vec<T>>);

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self(Mutex::new(vec![]))
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository<Product> {
    async fn insert(&self, item: Product) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> Result<Product> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let ProductQuery {
            vendor_id,
            status,
            name,
        } = query;

        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|p| {
                vendor_id
                    .as_ref()
                    .map(|v| &p.vendor_id == v)
                    .unwrap_or(true)
            })
            .filter(|p| status.map(|s| p.status == s).unwrap_or(true))
            .filter(|p| name.as_ref().map(|r| r.is_match(&p.name)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: ProductMutation) -> Result<Product> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let ProductMutation {
            name,
            description,
            price,
            status,
            updated_at,
        } = mutation;
        if let Some(val) = name {
            item.name = val;
        }
        if let Some(val) = description {
            item.description = val;
        }
        if let Some(val) = price {
            item.price = val;
        }
        if let Some(val) = status {
            item.status = val;
        }
        if let Some(val) = updated_at {
            item.updated_at = val;
        }

        Ok(item.clone())
    }

    async fn increment_views(&self, id: Uuid) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.views += 1;
        Ok(())
    }

    async fn set_rating_aggregate(&self, id: Uuid, rating: f64, count: u32) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.rating = rating;
        item.review_count = count;
        item.needs_rating_resync = false;
        Ok(())
    }

    async fn flag_rating_resync(&self, id: Uuid) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.needs_rating_resync = true;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository<Order> {
    async fn insert(&self, item: Order) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> Result<Order> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let OrderQuery {
            customer_id,
            vendor_id,
            status,
        } = query;

        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|o| {
                customer_id
                    .as_ref()
                    .map(|c| &o.customer_id == c)
                    .unwrap_or(true)
            })
            .filter(|o| {
                vendor_id
                    .as_ref()
                    .map(|v| &o.vendor_id == v)
                    .unwrap_or(true)
            })
            .filter(|o| status.map(|s| o.status == s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: OrderMutation) -> Result<Order> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let OrderMutation {
            status,
            payment_status,
            payment_reference,
            tracking_number,
            updated_at,
        } = mutation;
        if let Some(val) = status {
            item.status = val;
        }
        if let Some(val) = payment_status {
            item.payment_status = val;
        }
        if let Some(val) = payment_reference {
            item.payment_reference = Some(val);
        }
        if let Some(val) = tracking_number {
            item.tracking_number = Some(val);
        }
        if let Some(val) = updated_at {
            item.updated_at = val;
        }

        Ok(item.clone())
    }

    async fn exists_for_product(
        &self,
        customer_id: &str,
        product_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .any(|o| {
                o.customer_id == customer_id
                    && o.status == status
                    && o.items.iter().any(|i| i.product_id == product_id)
            }))
    }
}

#[async_trait]
impl ConversationRepository for InMemoryRepository<Conversation> {
    async fn insert(&self, item: Conversation) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> Result<Conversation> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, query: ConversationQuery) -> Result<Vec<Conversation>> {
        let ConversationQuery {
            vendor_id,
            customer_id,
            status,
        } = query;

        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|c| {
                vendor_id
                    .as_ref()
                    .map(|v| &c.vendor_id == v)
                    .unwrap_or(true)
            })
            .filter(|c| {
                customer_id
                    .as_ref()
                    .map(|u| &c.customer_id == u)
                    .unwrap_or(true)
            })
            .filter(|c| status.map(|s| c.status == s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: ConversationMutation) -> Result<Conversation> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let ConversationMutation { status, updated_at } = mutation;
        if let Some(val) = status {
            item.status = val;
        }
        if let Some(val) = updated_at {
            item.updated_at = val;
        }

        Ok(item.clone())
    }
}

#[async_trait]
impl MessageRepository for InMemoryRepository<Message> {
    async fn insert(&self, item: Message) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn finds(&self, query: MessageQuery) -> Result<Vec<Message>> {
        let MessageQuery {
            conversation_id,
            unread_only,
        } = query;

        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|m| {
                conversation_id
                    .map(|c| m.conversation_id == c)
                    .unwrap_or(true)
            })
            .filter(|m| !unread_only || !m.read)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_role: SenderRole) -> Result<u64> {
        let mut guard = self.0.lock().await;
        let mut touched = 0;

        for m in guard.iter_mut() {
            if m.conversation_id == conversation_id && m.sender_role != reader_role && !m.read {
                m.read = true;
                touched += 1;
            }
        }

        Ok(touched)
    }
}

#[async_trait]
impl ReviewRepository for InMemoryRepository<Review> {
    async fn insert(&self, item: Review) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> Result<Review> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, query: ReviewQuery) -> Result<Vec<Review>> {
        let ReviewQuery {
            target,
            customer_id,
        } = query;

        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|r| target.map(|t| r.target == t).unwrap_or(true))
            .filter(|r| {
                customer_id
                    .as_ref()
                    .map(|c| &r.customer_id == c)
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn increment_helpful(&self, id: Uuid) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.helpful_count += 1;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for InMemoryRepository<ServiceBooking> {
    async fn insert(&self, item: ServiceBooking) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> Result<ServiceBooking> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, query: BookingQuery) -> Result<Vec<ServiceBooking>> {
        let BookingQuery {
            customer_id,
            vendor_id,
            status,
        } = query;

        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|b| {
                customer_id
                    .as_ref()
                    .map(|c| &b.customer_id == c)
                    .unwrap_or(true)
            })
            .filter(|b| {
                vendor_id
                    .as_ref()
                    .map(|v| &b.vendor_id == v)
                    .unwrap_or(true)
            })
            .filter(|b| status.map(|s| b.status == s).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: BookingMutation) -> Result<ServiceBooking> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let BookingMutation {
            status,
            scheduled_date,
            rating,
            updated_at,
        } = mutation;
        if let Some(val) = status {
            item.status = val;
        }
        if let Some(val) = scheduled_date {
            item.scheduled_date = Some(val);
        }
        if let Some(val) = rating {
            item.rating = Some(val);
        }
        if let Some(val) = updated_at {
            item.updated_at = val;
        }

        Ok(item.clone())
    }

    async fn push_note(&self, id: Uuid, note: BookingNote) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.messages.push(note);
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository<Question> {
    async fn insert(&self, item: Question) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn find(&self, id: Uuid) -> Result<Question> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(&self, query: QuestionQuery) -> Result<Vec<Question>> {
        let QuestionQuery {
            product_id,
            vendor_id,
        } = query;

        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|q| product_id.map(|p| q.product_id == p).unwrap_or(true))
            .filter(|q| {
                vendor_id
                    .as_ref()
                    .map(|v| &q.vendor_id == v)
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn push_reply(&self, id: Uuid, reply: QuestionReply) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.replies.push(reply);
        Ok(())
    }

    async fn increment_helpful(&self, id: Uuid) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        item.helpful_count += 1;
        Ok(())
    }
}

#[async_trait]
impl HelpfulMarkRepository for InMemoryRepository<HelpfulMark> {
    async fn insert(&self, item: HelpfulMark) -> Result<bool> {
        let mut guard = self.0.lock().await;

        let dup = guard.iter().any(|m| {
            m.target_kind == item.target_kind
                && m.target_id == item.target_id
                && m.user_id == item.user_id
        });
        if dup {
            return Ok(false);
        }

        guard.push(item);
        Ok(true)
    }
}

#[async_trait]
impl VendorRepository for InMemoryRepository<VendorProfile> {
    async fn upsert(&self, item: VendorProfile) -> Result<()> {
        let mut guard = self.0.lock().await;

        match find_mut(&mut guard, |v| v.vendor_id == item.vendor_id) {
            Ok(existing) => {
                *existing = item;
                Ok(())
            }
            Err(RepositoryError::NotFound) => {
                guard.push(item);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn find(&self, vendor_id: &str) -> Result<VendorProfile> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.vendor_id == vendor_id)?.clone())
    }
}
