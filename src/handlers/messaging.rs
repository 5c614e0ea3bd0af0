use chrono::Utc;
use uuid::Uuid;

use super::{Handler, Result, ServiceError};
use crate::entities::{Conversation, ConversationStatus, Message, SenderRole};
use crate::gateways::NotificationKind;
use crate::repositories::{ConversationMutation, ConversationQuery, MessageQuery};

pub struct NewConversation {
    pub customer_id: String,
    pub vendor_id: String,
    pub subject: String,
    pub product_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
}

impl Handler {
    pub async fn open_conversation(&self, input: NewConversation) -> Result<Conversation> {
        if input.subject.trim().is_empty() {
            return Err(ServiceError::Validation("subject is required".to_string()));
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            vendor_id: input.vendor_id,
            customer_id: input.customer_id,
            product_id: input.product_id,
            order_id: input.order_id,
            subject: input.subject,
            status: ConversationStatus::Open,
            created_at: now,
            updated_at: now,
        };

        self.conversations.insert(conversation.clone()).await?;
        Ok(conversation)
    }

    pub async fn list_conversations(&self, query: ConversationQuery) -> Result<Vec<Conversation>> {
        Ok(self.conversations.finds(query).await?)
    }

    /// Appends a message and, when the thread was parked as pending or
    /// closed, reopens it. The sender must be the conversation party the
    /// claimed role names.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        sender_role: SenderRole,
        content: String,
    ) -> Result<Message> {
        if content.trim().is_empty() {
            return Err(ServiceError::Validation("message content is required".to_string()));
        }

        let conversation = self.conversations.find(conversation_id).await?;

        let expected = match sender_role {
            SenderRole::Customer => &conversation.customer_id,
            SenderRole::Vendor => &conversation.vendor_id,
        };
        if expected != sender_id {
            return Err(ServiceError::Forbidden(
                "sender is not a party to this conversation".to_string(),
            ));
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender_id.to_string(),
            sender_role,
            content,
            read: false,
            sent_at: Utc::now(),
        };
        self.messages.insert(message.clone()).await?;

        let mutation = ConversationMutation {
            status: match conversation.status {
                ConversationStatus::Open => None,
                _ => Some(ConversationStatus::Open),
            },
            updated_at: Some(message.sent_at),
        };
        self.conversations.update(conversation_id, mutation).await?;

        let recipient = match sender_role {
            SenderRole::Customer => &conversation.vendor_id,
            SenderRole::Vendor => &conversation.customer_id,
        };
        self.notifier
            .dispatch(
                recipient,
                NotificationKind::NewMessage,
                ::serde_json::json!({ "conversationId": conversation_id }),
            )
            .await;

        Ok(message)
    }

    pub async fn list_messages(
        &self,
        requester_id: &str,
        conversation_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Message>> {
        let conversation = self.conversations.find(conversation_id).await?;
        if conversation.customer_id != requester_id && conversation.vendor_id != requester_id {
            return Err(ServiceError::Forbidden(
                "conversation belongs to other parties".to_string(),
            ));
        }

        Ok(self
            .messages
            .finds(MessageQuery {
                conversation_id: Some(conversation_id),
                unread_only,
            })
            .await?)
    }

    /// One atomic batch: everything the counterpart sent becomes read.
    pub async fn mark_conversation_read(
        &self,
        requester_id: &str,
        conversation_id: Uuid,
        reader_role: SenderRole,
    ) -> Result<u64> {
        let conversation = self.conversations.find(conversation_id).await?;

        let expected = match reader_role {
            SenderRole::Customer => &conversation.customer_id,
            SenderRole::Vendor => &conversation.vendor_id,
        };
        if expected != requester_id {
            return Err(ServiceError::Forbidden(
                "reader is not a party to this conversation".to_string(),
            ));
        }

        Ok(self.messages.mark_read(conversation_id, reader_role).await?)
    }

    pub async fn set_conversation_status(
        &self,
        requester_id: &str,
        conversation_id: Uuid,
        next: ConversationStatus,
    ) -> Result<Conversation> {
        let conversation = self.conversations.find(conversation_id).await?;
        if conversation.customer_id != requester_id && conversation.vendor_id != requester_id {
            return Err(ServiceError::Forbidden(
                "conversation belongs to other parties".to_string(),
            ));
        }

        if !conversation.status.can_transition(next) {
            return Err(ServiceError::Validation(format!(
                "conversation is already {:?}",
                next
            )));
        }

        let mutation = ConversationMutation {
            status: Some(next),
            updated_at: Some(Utc::now()),
        };

        Ok(self.conversations.update(conversation_id, mutation).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::in_memory_handler;

    fn thread(customer: &str, vendor: &str) -> NewConversation {
        NewConversation {
            customer_id: customer.to_string(),
            vendor_id: vendor.to_string(),
            subject: "Where is my order?".to_string(),
            product_id: None,
            order_id: None,
        }
    }

    #[tokio::test]
    async fn sending_requires_matching_party_and_role() {
        let h = in_memory_handler();
        let conv = h.open_conversation(thread("c-1", "v-1")).await.unwrap();

        // right id, wrong role
        let res = h
            .send_message(conv.id, "c-1", SenderRole::Vendor, "hi".to_string())
            .await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));

        // stranger
        let res = h
            .send_message(conv.id, "c-9", SenderRole::Customer, "hi".to_string())
            .await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));

        // nothing was stored either way
        let msgs = h.list_messages("c-1", conv.id, false).await.unwrap();
        assert!(msgs.is_empty());
    }

    #[tokio::test]
    async fn empty_messages_are_rejected() {
        let h = in_memory_handler();
        let conv = h.open_conversation(thread("c-1", "v-1")).await.unwrap();

        let res = h
            .send_message(conv.id, "c-1", SenderRole::Customer, "   ".to_string())
            .await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn any_message_reopens_a_closed_thread() {
        let h = in_memory_handler();
        let conv = h.open_conversation(thread("c-1", "v-1")).await.unwrap();

        h.set_conversation_status("v-1", conv.id, ConversationStatus::Closed)
            .await
            .unwrap();

        h.send_message(conv.id, "c-1", SenderRole::Customer, "still there?".to_string())
            .await
            .unwrap();

        let conv = h.conversations.find(conv.id).await.unwrap();
        assert_eq!(conv.status, ConversationStatus::Open);
    }

    #[tokio::test]
    async fn mark_read_only_touches_the_counterpart_messages() {
        let h = in_memory_handler();
        let conv = h.open_conversation(thread("c-1", "v-1")).await.unwrap();

        h.send_message(conv.id, "c-1", SenderRole::Customer, "q1".to_string())
            .await
            .unwrap();
        h.send_message(conv.id, "c-1", SenderRole::Customer, "q2".to_string())
            .await
            .unwrap();
        h.send_message(conv.id, "v-1", SenderRole::Vendor, "a1".to_string())
            .await
            .unwrap();

        let touched = h
            .mark_conversation_read("v-1", conv.id, SenderRole::Vendor)
            .await
            .unwrap();
        assert_eq!(touched, 2);

        let unread = h.list_messages("c-1", conv.id, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].sender_role, SenderRole::Vendor);
    }

    #[tokio::test]
    async fn status_updates_reject_no_ops_and_strangers() {
        let h = in_memory_handler();
        let conv = h.open_conversation(thread("c-1", "v-1")).await.unwrap();

        let res = h
            .set_conversation_status("c-1", conv.id, ConversationStatus::Open)
            .await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let res = h
            .set_conversation_status("x-1", conv.id, ConversationStatus::Closed)
            .await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));
    }
}
