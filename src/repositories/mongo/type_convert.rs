use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{doc, Document};

use super::models::{
    MongoBookingModel, MongoConversationModel, MongoHelpfulMarkModel, MongoMessageModel,
    MongoOrderItemModel, MongoOrderModel, MongoProductModel, MongoQuestionModel, MongoReviewModel,
    MongoReviewTargetKind, MongoVendorProfileModel,
};
use crate::entities::{
    Conversation, HelpfulMark, Message, Order, OrderItem, Product, Question, Review, ReviewTarget,
    ServiceBooking, VendorProfile,
};
use crate::repositories::{
    BookingMutation, BookingQuery, ConversationMutation, ConversationQuery, MessageQuery,
    OrderMutation, OrderQuery, ProductMutation, ProductQuery, QuestionQuery, ReviewQuery,
};

// Inserted documents go through serde, which renders UTC datetimes with a
// trailing "Z". Mutations must write the same string form.
fn datetime_str(v: &DateTime<Utc>) -> String {
    v.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(super) fn status_str<S: ::serde::Serialize>(status: &S) -> String {
    // Status enums serialize as plain snake_case strings; reuse that for
    // the filter documents so they match the stored form.
    match ::serde_json::to_value(status) {
        Ok(::serde_json::Value::String(s)) => s,
        _ => unreachable!("status enums serialize as strings"),
    }
}

impl From<Product> for MongoProductModel {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            vendor_id: p.vendor_id,
            vendor_name: p.vendor_name,
            name: p.name,
            description: p.description,
            price: p.price,
            kind: p.kind,
            status: p.status,
            rating: p.rating,
            review_count: p.review_count as i64,
            views: p.views as i64,
            needs_rating_resync: p.needs_rating_resync,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl From<MongoProductModel> for Product {
    fn from(m: MongoProductModel) -> Self {
        Self {
            id: m.id,
            vendor_id: m.vendor_id,
            vendor_name: m.vendor_name,
            name: m.name,
            description: m.description,
            price: m.price,
            kind: m.kind,
            status: m.status,
            rating: m.rating,
            review_count: m.review_count as u32,
            views: m.views as u64,
            needs_rating_resync: m.needs_rating_resync,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<OrderItem> for MongoOrderItemModel {
    fn from(i: OrderItem) -> Self {
        Self {
            product_id: i.product_id,
            name: i.name,
            quantity: i.quantity as i64,
            unit_price: i.unit_price,
        }
    }
}

impl From<MongoOrderItemModel> for OrderItem {
    fn from(m: MongoOrderItemModel) -> Self {
        Self {
            product_id: m.product_id,
            name: m.name,
            quantity: m.quantity as u32,
            unit_price: m.unit_price,
        }
    }
}

impl From<Order> for MongoOrderModel {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            customer_id: o.customer_id,
            vendor_id: o.vendor_id,
            items: o.items.into_iter().map(Into::into).collect(),
            total: o.total,
            status: o.status,
            payment_status: o.payment_status,
            payment_reference: o.payment_reference,
            tracking_number: o.tracking_number,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

impl From<MongoOrderModel> for Order {
    fn from(m: MongoOrderModel) -> Self {
        Self {
            id: m.id,
            customer_id: m.customer_id,
            vendor_id: m.vendor_id,
            items: m.items.into_iter().map(Into::into).collect(),
            total: m.total,
            status: m.status,
            payment_status: m.payment_status,
            payment_reference: m.payment_reference,
            tracking_number: m.tracking_number,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<Conversation> for MongoConversationModel {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            vendor_id: c.vendor_id,
            customer_id: c.customer_id,
            product_id: c.product_id,
            order_id: c.order_id,
            subject: c.subject,
            status: c.status,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<MongoConversationModel> for Conversation {
    fn from(m: MongoConversationModel) -> Self {
        Self {
            id: m.id,
            vendor_id: m.vendor_id,
            customer_id: m.customer_id,
            product_id: m.product_id,
            order_id: m.order_id,
            subject: m.subject,
            status: m.status,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<Message> for MongoMessageModel {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            conversation_id: msg.conversation_id,
            sender_id: msg.sender_id,
            sender_role: msg.sender_role,
            content: msg.content,
            read: msg.read,
            sent_at: msg.sent_at,
        }
    }
}

impl From<MongoMessageModel> for Message {
    fn from(m: MongoMessageModel) -> Self {
        Self {
            id: m.id,
            conversation_id: m.conversation_id,
            sender_id: m.sender_id,
            sender_role: m.sender_role,
            content: m.content,
            read: m.read,
            sent_at: m.sent_at,
        }
    }
}

impl From<ReviewTarget> for MongoReviewTargetKind {
    fn from(t: ReviewTarget) -> Self {
        match t {
            ReviewTarget::Product(_) => MongoReviewTargetKind::Product,
            ReviewTarget::Service(_) => MongoReviewTargetKind::Service,
        }
    }
}

impl From<Review> for MongoReviewModel {
    fn from(r: Review) -> Self {
        Self {
            id: r.id,
            target_kind: r.target.into(),
            target_id: r.target.id(),
            customer_id: r.customer_id,
            rating: r.rating as i32,
            body: r.body,
            helpful_count: r.helpful_count as i64,
            created_at: r.created_at,
        }
    }
}

impl From<MongoReviewModel> for Review {
    fn from(m: MongoReviewModel) -> Self {
        let target = match m.target_kind {
            MongoReviewTargetKind::Product => ReviewTarget::Product(m.target_id),
            MongoReviewTargetKind::Service => ReviewTarget::Service(m.target_id),
        };

        Self {
            id: m.id,
            target,
            customer_id: m.customer_id,
            rating: m.rating as u8,
            body: m.body,
            helpful_count: m.helpful_count as u32,
            created_at: m.created_at,
        }
    }
}

impl From<ServiceBooking> for MongoBookingModel {
    fn from(b: ServiceBooking) -> Self {
        Self {
            id: b.id,
            customer_id: b.customer_id,
            vendor_id: b.vendor_id,
            service_id: b.service_id,
            status: b.status,
            scheduled_date: b.scheduled_date,
            rating: b.rating.map(|r| r as i32),
            messages: b.messages,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl From<MongoBookingModel> for ServiceBooking {
    fn from(m: MongoBookingModel) -> Self {
        Self {
            id: m.id,
            customer_id: m.customer_id,
            vendor_id: m.vendor_id,
            service_id: m.service_id,
            status: m.status,
            scheduled_date: m.scheduled_date,
            rating: m.rating.map(|r| r as u8),
            messages: m.messages,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<Question> for MongoQuestionModel {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            product_id: q.product_id,
            vendor_id: q.vendor_id,
            customer_id: q.customer_id,
            body: q.body,
            helpful_count: q.helpful_count as i64,
            replies: q.replies,
            created_at: q.created_at,
        }
    }
}

impl From<MongoQuestionModel> for Question {
    fn from(m: MongoQuestionModel) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            vendor_id: m.vendor_id,
            customer_id: m.customer_id,
            body: m.body,
            helpful_count: m.helpful_count as u32,
            replies: m.replies,
            created_at: m.created_at,
        }
    }
}

impl From<HelpfulMark> for MongoHelpfulMarkModel {
    fn from(h: HelpfulMark) -> Self {
        Self {
            id: h.id,
            target_kind: h.target_kind,
            target_id: h.target_id,
            user_id: h.user_id,
            created_at: h.created_at,
        }
    }
}

impl From<MongoHelpfulMarkModel> for HelpfulMark {
    fn from(m: MongoHelpfulMarkModel) -> Self {
        Self {
            id: m.id,
            target_kind: m.target_kind,
            target_id: m.target_id,
            user_id: m.user_id,
            created_at: m.created_at,
        }
    }
}

impl From<VendorProfile> for MongoVendorProfileModel {
    fn from(v: VendorProfile) -> Self {
        Self {
            id: v.vendor_id,
            store_name: v.store_name,
            description: v.description,
            contact_email: v.contact_email,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

impl From<MongoVendorProfileModel> for VendorProfile {
    fn from(m: MongoVendorProfileModel) -> Self {
        Self {
            vendor_id: m.id,
            store_name: m.store_name,
            description: m.description,
            contact_email: m.contact_email,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<ProductQuery> for Document {
    fn from(
        ProductQuery {
            vendor_id,
            status,
            name,
        }: ProductQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(v) = vendor_id {
            query.insert("vendor_id", v);
        }
        if let Some(s) = status {
            query.insert("status", status_str(&s));
        }
        if let Some(r) = name {
            query.insert("name", doc! { "$regex": r.as_str() });
        }

        query
    }
}

impl From<ProductMutation> for Document {
    fn from(
        ProductMutation {
            name,
            description,
            price,
            status,
            updated_at,
        }: ProductMutation,
    ) -> Self {
        let mut set = doc! {};

        if let Some(v) = name {
            set.insert("name", v);
        }
        if let Some(v) = description {
            set.insert("description", v);
        }
        if let Some(v) = price {
            set.insert("price", v);
        }
        if let Some(v) = status {
            set.insert("status", status_str(&v));
        }
        if let Some(v) = updated_at {
            set.insert("updated_at", datetime_str(&v));
        }

        set
    }
}

impl From<OrderQuery> for Document {
    fn from(
        OrderQuery {
            customer_id,
            vendor_id,
            status,
        }: OrderQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(v) = customer_id {
            query.insert("customer_id", v);
        }
        if let Some(v) = vendor_id {
            query.insert("vendor_id", v);
        }
        if let Some(s) = status {
            query.insert("status", status_str(&s));
        }

        query
    }
}

impl From<OrderMutation> for Document {
    fn from(
        OrderMutation {
            status,
            payment_status,
            payment_reference,
            tracking_number,
            updated_at,
        }: OrderMutation,
    ) -> Self {
        let mut set = doc! {};

        if let Some(v) = status {
            set.insert("status", status_str(&v));
        }
        if let Some(v) = payment_status {
            set.insert("payment_status", status_str(&v));
        }
        if let Some(v) = payment_reference {
            set.insert("payment_reference", v);
        }
        if let Some(v) = tracking_number {
            set.insert("tracking_number", v);
        }
        if let Some(v) = updated_at {
            set.insert("updated_at", datetime_str(&v));
        }

        set
    }
}

impl From<ConversationQuery> for Document {
    fn from(
        ConversationQuery {
            vendor_id,
            customer_id,
            status,
        }: ConversationQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(v) = vendor_id {
            query.insert("vendor_id", v);
        }
        if let Some(v) = customer_id {
            query.insert("customer_id", v);
        }
        if let Some(s) = status {
            query.insert("status", status_str(&s));
        }

        query
    }
}

impl From<ConversationMutation> for Document {
    fn from(ConversationMutation { status, updated_at }: ConversationMutation) -> Self {
        let mut set = doc! {};

        if let Some(v) = status {
            set.insert("status", status_str(&v));
        }
        if let Some(v) = updated_at {
            set.insert("updated_at", datetime_str(&v));
        }

        set
    }
}

impl From<MessageQuery> for Document {
    fn from(
        MessageQuery {
            conversation_id,
            unread_only,
        }: MessageQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(v) = conversation_id {
            query.insert("conversation_id", v.to_string());
        }
        if unread_only {
            query.insert("read", false);
        }

        query
    }
}

impl From<ReviewQuery> for Document {
    fn from(
        ReviewQuery {
            target,
            customer_id,
        }: ReviewQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(t) = target {
            let kind: MongoReviewTargetKind = t.into();
            query.insert("target_kind", status_str(&kind));
            query.insert("target_id", t.id().to_string());
        }
        if let Some(v) = customer_id {
            query.insert("customer_id", v);
        }

        query
    }
}

impl From<BookingQuery> for Document {
    fn from(
        BookingQuery {
            customer_id,
            vendor_id,
            status,
        }: BookingQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(v) = customer_id {
            query.insert("customer_id", v);
        }
        if let Some(v) = vendor_id {
            query.insert("vendor_id", v);
        }
        if let Some(s) = status {
            query.insert("status", status_str(&s));
        }

        query
    }
}

impl From<BookingMutation> for Document {
    fn from(
        BookingMutation {
            status,
            scheduled_date,
            rating,
            updated_at,
        }: BookingMutation,
    ) -> Self {
        let mut set = doc! {};

        if let Some(v) = status {
            set.insert("status", status_str(&v));
        }
        if let Some(v) = scheduled_date {
            set.insert("scheduled_date", datetime_str(&v));
        }
        if let Some(v) = rating {
            set.insert("rating", v as i32);
        }
        if let Some(v) = updated_at {
            set.insert("updated_at", datetime_str(&v));
        }

        set
    }
}

impl From<QuestionQuery> for Document {
    fn from(
        QuestionQuery {
            product_id,
            vendor_id,
        }: QuestionQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(v) = product_id {
            query.insert("product_id", v.to_string());
        }
        if let Some(v) = vendor_id {
            query.insert("vendor_id", v);
        }

        query
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mongodb::bson::{to_bson, Bson};

    use super::*;

    #[test]
    fn mutation_timestamps_match_the_inserted_form() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 12, 30, 45).unwrap();
        assert_eq!(to_bson(&at).unwrap(), Bson::String(datetime_str(&at)));

        let set = Document::from(ProductMutation {
            updated_at: Some(at),
            ..Default::default()
        });
        assert_eq!(set.get_str("updated_at").unwrap(), datetime_str(&at));
    }
}
