use chrono::Utc;
use uuid::Uuid;

use super::{Handler, Result, ServiceError};
use crate::entities::{HelpfulMark, MarkTarget, Question, QuestionReply};
use crate::gateways::NotificationKind;
use crate::repositories::QuestionQuery;

impl Handler {
    pub async fn ask_question(
        &self,
        customer_id: &str,
        product_id: Uuid,
        body: String,
    ) -> Result<Question> {
        if body.trim().is_empty() {
            return Err(ServiceError::Validation("question text is required".to_string()));
        }

        let product = self.products.find(product_id).await?;

        let question = Question {
            id: Uuid::new_v4(),
            product_id,
            vendor_id: product.vendor_id.clone(),
            customer_id: customer_id.to_string(),
            body,
            helpful_count: 0,
            replies: vec![],
            created_at: Utc::now(),
        };
        self.questions.insert(question.clone()).await?;

        self.notifier
            .dispatch(
                &product.vendor_id,
                NotificationKind::QuestionAsked,
                ::serde_json::json!({ "questionId": question.id, "productId": product_id }),
            )
            .await;

        Ok(question)
    }

    pub async fn reply_question(
        &self,
        vendor_id: &str,
        question_id: Uuid,
        body: String,
    ) -> Result<Question> {
        if body.trim().is_empty() {
            return Err(ServiceError::Validation("reply text is required".to_string()));
        }

        let question = self.questions.find(question_id).await?;
        if question.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "question was asked of another vendor".to_string(),
            ));
        }

        let reply = QuestionReply {
            responder_id: vendor_id.to_string(),
            body,
            created_at: Utc::now(),
        };
        self.questions.push_reply(question_id, reply).await?;

        self.notifier
            .dispatch(
                &question.customer_id,
                NotificationKind::QuestionAsked,
                ::serde_json::json!({ "questionId": question_id, "replied": true }),
            )
            .await;

        Ok(self.questions.find(question_id).await?)
    }

    /// First mark per user increments and records; a second attempt is a
    /// validation error with the counter untouched.
    pub async fn mark_question_helpful(&self, user_id: &str, question_id: Uuid) -> Result<Question> {
        self.questions.find(question_id).await?;

        let mark = HelpfulMark {
            id: Uuid::new_v4(),
            target_kind: MarkTarget::Question,
            target_id: question_id,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        if !self.marks.insert(mark).await? {
            return Err(ServiceError::Validation(
                "already marked as helpful".to_string(),
            ));
        }

        self.questions.increment_helpful(question_id).await?;
        Ok(self.questions.find(question_id).await?)
    }

    pub async fn list_questions(&self, query: QuestionQuery) -> Result<Vec<Question>> {
        Ok(self.questions.finds(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ProductKind;
    use crate::handlers::catalog::NewProduct;
    use crate::handlers::testing::in_memory_handler;

    async fn seeded_question(h: &Handler) -> Question {
        let product = h
            .create_product(NewProduct {
                vendor_id: "v-1".to_string(),
                name: "Lamp".to_string(),
                description: "".to_string(),
                price: 100,
                kind: ProductKind::Physical,
            })
            .await
            .unwrap();

        h.ask_question("c-1", product.id, "Does it dim?".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn questions_inherit_the_product_vendor() {
        let h = in_memory_handler();
        let q = seeded_question(&h).await;

        assert_eq!(q.vendor_id, "v-1");
    }

    #[tokio::test]
    async fn only_the_product_vendor_replies() {
        let h = in_memory_handler();
        let q = seeded_question(&h).await;

        let res = h.reply_question("v-2", q.id, "Yes".to_string()).await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));

        let replied = h.reply_question("v-1", q.id, "Yes".to_string()).await.unwrap();
        assert_eq!(replied.replies.len(), 1);
        assert_eq!(replied.replies[0].responder_id, "v-1");
    }

    #[tokio::test]
    async fn helpful_marks_count_once_per_user() {
        let h = in_memory_handler();
        let q = seeded_question(&h).await;

        let marked = h.mark_question_helpful("u-1", q.id).await.unwrap();
        assert_eq!(marked.helpful_count, 1);

        let res = h.mark_question_helpful("u-1", q.id).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let unchanged = h.questions.find(q.id).await.unwrap();
        assert_eq!(unchanged.helpful_count, 1);
    }

    #[tokio::test]
    async fn question_marks_do_not_collide_with_review_marks() {
        let h = in_memory_handler();
        let q = seeded_question(&h).await;

        // same user id, different target kind, same uuid space
        h.mark_question_helpful("u-1", q.id).await.unwrap();
        let res = h.mark_review_helpful("u-1", q.id).await;

        // the review does not exist; the mark namespace stays separate
        assert!(matches!(res, Err(ServiceError::NotFound(_))));
    }
}
