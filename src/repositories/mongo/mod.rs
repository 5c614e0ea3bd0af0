use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::TRANSIENT_TRANSACTION_ERROR;
use mongodb::options::UpdateOptions;
use mongodb::{Client, Collection, Database};
use uuid::Uuid;

use super::{
    BookingMutation, BookingQuery, BookingRepository, ConversationMutation, ConversationQuery,
    ConversationRepository, HelpfulMarkRepository, MessageQuery, MessageRepository, OrderMutation,
    OrderQuery, OrderRepository, ProductMutation, ProductQuery, ProductRepository, QuestionQuery,
    QuestionRepository, Result, ReviewQuery, ReviewRepository, VendorRepository,
};
use crate::entities::{
    BookingNote, Conversation, HelpfulMark, Message, Order, OrderStatus, Product, Question,
    QuestionReply, Review, SenderRole, ServiceBooking, VendorProfile,
};

mod converters;
mod helpers;
mod models;
mod type_convert;

use converters::{convert_404_or, convert_repo_err, matched_or_404, try_unique_check};
use helpers::{initialize_coll, initialize_mark_coll, make_session, process_transaction};
use models::{
    MongoBookingModel, MongoConversationModel, MongoHelpfulMarkModel, MongoMessageModel,
    MongoOrderModel, MongoProductModel, MongoQuestionModel, MongoReviewModel,
    MongoVendorProfileModel,
};
use type_convert::status_str;

pub struct MongoProductRepository {
    coll: Collection<MongoProductModel>,
}

impl MongoProductRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("product", db).await?;

        Ok(Self {
            coll: db.collection("product"),
        })
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    async fn insert(&self, item: Product) -> Result<bool> {
        let model: MongoProductModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: Uuid) -> Result<Product> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await;

        Ok(convert_404_or(convert_repo_err(model)?)?.into())
    }

    async fn finds(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let query_doc: Document = query.into();

        let models = convert_repo_err(self.coll.find(query_doc, None).await)?
            .try_collect::<Vec<_>>()
            .await;

        Ok(convert_repo_err(models)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: ProductMutation) -> Result<Product> {
        let set: Document = mutation.into();

        let res = convert_repo_err(
            self.coll
                .update_one(doc! { "id": id.to_string() }, doc! { "$set": set }, None)
                .await,
        )?;
        matched_or_404(res.matched_count)?;

        self.find(id).await
    }

    async fn increment_views(&self, id: Uuid) -> Result<()> {
        let res = convert_repo_err(
            self.coll
                .update_one(
                    doc! { "id": id.to_string() },
                    doc! { "$inc": { "views": 1 } },
                    None,
                )
                .await,
        )?;

        matched_or_404(res.matched_count)
    }

    async fn set_rating_aggregate(&self, id: Uuid, rating: f64, count: u32) -> Result<()> {
        let res = convert_repo_err(
            self.coll
                .update_one(
                    doc! { "id": id.to_string() },
                    doc! { "$set": {
                        "rating": rating,
                        "review_count": count as i64,
                        "needs_rating_resync": false
                    } },
                    None,
                )
                .await,
        )?;

        matched_or_404(res.matched_count)
    }

    async fn flag_rating_resync(&self, id: Uuid) -> Result<()> {
        let res = convert_repo_err(
            self.coll
                .update_one(
                    doc! { "id": id.to_string() },
                    doc! { "$set": { "needs_rating_resync": true } },
                    None,
                )
                .await,
        )?;

        matched_or_404(res.matched_count)
    }
}

pub struct MongoOrderRepository {
    coll: Collection<MongoOrderModel>,
}

impl MongoOrderRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("order", db).await?;

        Ok(Self {
            coll: db.collection("order"),
        })
    }
}

#[async_trait]
impl OrderRepository for MongoOrderRepository {
    async fn insert(&self, item: Order) -> Result<bool> {
        let model: MongoOrderModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: Uuid) -> Result<Order> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await;

        Ok(convert_404_or(convert_repo_err(model)?)?.into())
    }

    async fn finds(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let query_doc: Document = query.into();

        let models = convert_repo_err(self.coll.find(query_doc, None).await)?
            .try_collect::<Vec<_>>()
            .await;

        Ok(convert_repo_err(models)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: OrderMutation) -> Result<Order> {
        let set: Document = mutation.into();

        let res = convert_repo_err(
            self.coll
                .update_one(doc! { "id": id.to_string() }, doc! { "$set": set }, None)
                .await,
        )?;
        matched_or_404(res.matched_count)?;

        self.find(id).await
    }

    async fn exists_for_product(
        &self,
        customer_id: &str,
        product_id: Uuid,
        status: OrderStatus,
    ) -> Result<bool> {
        let count = convert_repo_err(
            self.coll
                .count_documents(
                    doc! {
                        "customer_id": customer_id,
                        "status": status_str(&status),
                        "items.product_id": product_id.to_string(),
                    },
                    None,
                )
                .await,
        )?;

        Ok(count > 0)
    }
}

pub struct MongoConversationRepository {
    coll: Collection<MongoConversationModel>,
}

impl MongoConversationRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("conversation", db).await?;

        Ok(Self {
            coll: db.collection("conversation"),
        })
    }
}

#[async_trait]
impl ConversationRepository for MongoConversationRepository {
    async fn insert(&self, item: Conversation) -> Result<bool> {
        let model: MongoConversationModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: Uuid) -> Result<Conversation> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await;

        Ok(convert_404_or(convert_repo_err(model)?)?.into())
    }

    async fn finds(&self, query: ConversationQuery) -> Result<Vec<Conversation>> {
        let query_doc: Document = query.into();

        let models = convert_repo_err(self.coll.find(query_doc, None).await)?
            .try_collect::<Vec<_>>()
            .await;

        Ok(convert_repo_err(models)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: ConversationMutation) -> Result<Conversation> {
        let set: Document = mutation.into();

        let res = convert_repo_err(
            self.coll
                .update_one(doc! { "id": id.to_string() }, doc! { "$set": set }, None)
                .await,
        )?;
        matched_or_404(res.matched_count)?;

        self.find(id).await
    }
}

pub struct MongoMessageRepository {
    client: Client,
    coll: Collection<MongoMessageModel>,
}

impl MongoMessageRepository {
    pub async fn new_with(client: Client, db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("message", db).await?;

        Ok(Self {
            client,
            coll: db.collection("message"),
        })
    }
}

#[async_trait]
impl MessageRepository for MongoMessageRepository {
    async fn insert(&self, item: Message) -> Result<bool> {
        let model: MongoMessageModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn finds(&self, query: MessageQuery) -> Result<Vec<Message>> {
        let query_doc: Document = query.into();

        let models = convert_repo_err(self.coll.find(query_doc, None).await)?
            .try_collect::<Vec<_>>()
            .await;

        Ok(convert_repo_err(models)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_role: SenderRole) -> Result<u64> {
        // The one genuinely atomic multi-document write in the system:
        // all of a conversation's unread messages flip together.
        async fn transaction(
            this: &MongoMessageRepository,
            conversation_id: Uuid,
            reader_role: SenderRole,
        ) -> ::mongodb::error::Result<u64> {
            let mut session = make_session(&this.client).await?;

            let res = this
                .coll
                .update_many_with_session(
                    doc! {
                        "conversation_id": conversation_id.to_string(),
                        "sender_role": { "$ne": status_str(&reader_role) },
                        "read": false,
                    },
                    doc! { "$set": { "read": true } },
                    None,
                    &mut session,
                )
                .await?;

            process_transaction(&mut session).await?;

            Ok(res.modified_count)
        }

        let res = loop {
            let r = transaction(self, conversation_id, reader_role).await;
            if let Err(ref e) = r {
                if e.contains_label(TRANSIENT_TRANSACTION_ERROR) {
                    continue;
                }
            }

            break r;
        };

        convert_repo_err(res)
    }
}

pub struct MongoReviewRepository {
    coll: Collection<MongoReviewModel>,
}

impl MongoReviewRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("review", db).await?;

        Ok(Self {
            coll: db.collection("review"),
        })
    }
}

#[async_trait]
impl ReviewRepository for MongoReviewRepository {
    async fn insert(&self, item: Review) -> Result<bool> {
        let model: MongoReviewModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: Uuid) -> Result<Review> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await;

        Ok(convert_404_or(convert_repo_err(model)?)?.into())
    }

    async fn finds(&self, query: ReviewQuery) -> Result<Vec<Review>> {
        let query_doc: Document = query.into();

        let models = convert_repo_err(self.coll.find(query_doc, None).await)?
            .try_collect::<Vec<_>>()
            .await;

        Ok(convert_repo_err(models)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn increment_helpful(&self, id: Uuid) -> Result<()> {
        let res = convert_repo_err(
            self.coll
                .update_one(
                    doc! { "id": id.to_string() },
                    doc! { "$inc": { "helpful_count": 1 } },
                    None,
                )
                .await,
        )?;

        matched_or_404(res.matched_count)
    }
}

pub struct MongoBookingRepository {
    coll: Collection<MongoBookingModel>,
}

impl MongoBookingRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("service_booking", db).await?;

        Ok(Self {
            coll: db.collection("service_booking"),
        })
    }
}

#[async_trait]
impl BookingRepository for MongoBookingRepository {
    async fn insert(&self, item: ServiceBooking) -> Result<bool> {
        let model: MongoBookingModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: Uuid) -> Result<ServiceBooking> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await;

        Ok(convert_404_or(convert_repo_err(model)?)?.into())
    }

    async fn finds(&self, query: BookingQuery) -> Result<Vec<ServiceBooking>> {
        let query_doc: Document = query.into();

        let models = convert_repo_err(self.coll.find(query_doc, None).await)?
            .try_collect::<Vec<_>>()
            .await;

        Ok(convert_repo_err(models)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn update(&self, id: Uuid, mutation: BookingMutation) -> Result<ServiceBooking> {
        let set: Document = mutation.into();

        let res = convert_repo_err(
            self.coll
                .update_one(doc! { "id": id.to_string() }, doc! { "$set": set }, None)
                .await,
        )?;
        matched_or_404(res.matched_count)?;

        self.find(id).await
    }

    async fn push_note(&self, id: Uuid, note: BookingNote) -> Result<()> {
        let note_bson = convert_repo_err(::mongodb::bson::to_bson(&note))?;

        let res = convert_repo_err(
            self.coll
                .update_one(
                    doc! { "id": id.to_string() },
                    doc! { "$push": { "messages": note_bson } },
                    None,
                )
                .await,
        )?;

        matched_or_404(res.matched_count)
    }
}

pub struct MongoQuestionRepository {
    coll: Collection<MongoQuestionModel>,
}

impl MongoQuestionRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("question", db).await?;

        Ok(Self {
            coll: db.collection("question"),
        })
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn insert(&self, item: Question) -> Result<bool> {
        let model: MongoQuestionModel = item.into();

        try_unique_check(self.coll.insert_one(model, None).await)
    }

    async fn find(&self, id: Uuid) -> Result<Question> {
        let model = self
            .coll
            .find_one(doc! { "id": id.to_string() }, None)
            .await;

        Ok(convert_404_or(convert_repo_err(model)?)?.into())
    }

    async fn finds(&self, query: QuestionQuery) -> Result<Vec<Question>> {
        let query_doc: Document = query.into();

        let models = convert_repo_err(self.coll.find(query_doc, None).await)?
            .try_collect::<Vec<_>>()
            .await;

        Ok(convert_repo_err(models)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn push_reply(&self, id: Uuid, reply: QuestionReply) -> Result<()> {
        let reply_bson = convert_repo_err(::mongodb::bson::to_bson(&reply))?;

        let res = convert_repo_err(
            self.coll
                .update_one(
                    doc! { "id": id.to_string() },
                    doc! { "$push": { "replies": reply_bson } },
                    None,
                )
                .await,
        )?;

        matched_or_404(res.matched_count)
    }

    async fn increment_helpful(&self, id: Uuid) -> Result<()> {
        let res = convert_repo_err(
            self.coll
                .update_one(
                    doc! { "id": id.to_string() },
                    doc! { "$inc": { "helpful_count": 1 } },
                    None,
                )
                .await,
        )?;

        matched_or_404(res.matched_count)
    }
}

pub struct MongoHelpfulMarkRepository {
    coll: Collection<MongoHelpfulMarkModel>,
}

impl MongoHelpfulMarkRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_mark_coll(db).await?;

        Ok(Self {
            coll: db.collection("helpful_mark"),
        })
    }
}

#[async_trait]
impl HelpfulMarkRepository for MongoHelpfulMarkRepository {
    async fn insert(&self, item: HelpfulMark) -> Result<bool> {
        let model: MongoHelpfulMarkModel = item.into();

        // Duplicate marks trip the (target, user) unique index.
        try_unique_check(self.coll.insert_one(model, None).await)
    }
}

pub struct MongoVendorRepository {
    coll: Collection<MongoVendorProfileModel>,
}

impl MongoVendorRepository {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("vendor_profile", db).await?;

        Ok(Self {
            coll: db.collection("vendor_profile"),
        })
    }
}

#[async_trait]
impl VendorRepository for MongoVendorRepository {
    async fn upsert(&self, item: VendorProfile) -> Result<()> {
        let model: MongoVendorProfileModel = item.into();
        let set = convert_repo_err(::mongodb::bson::to_document(&model))?;

        let opts = UpdateOptions::builder().upsert(true).build();
        convert_repo_err(
            self.coll
                .update_one(doc! { "id": model.id }, doc! { "$set": set }, opts)
                .await,
        )?;

        Ok(())
    }

    async fn find(&self, vendor_id: &str) -> Result<VendorProfile> {
        let model = self.coll.find_one(doc! { "id": vendor_id }, None).await;

        Ok(convert_404_or(convert_repo_err(model)?)?.into())
    }
}
