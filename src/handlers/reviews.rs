use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use super::{round_to_tenth, Handler, Result, ServiceError};
use crate::entities::{
    HelpfulMark, MarkTarget, OrderStatus, ProductKind, Review, ReviewTarget,
};
use crate::gateways::NotificationKind;
use crate::repositories::ReviewQuery;

impl Handler {
    /// Records a rating and refreshes the target's denormalized aggregate.
    ///
    /// Digital products are gated on a delivered purchase; every target
    /// accepts at most one review per customer. The duplicate check is a
    /// read-before-insert, so two simultaneous submissions can both pass —
    /// the aggregate self-heals on the next write.
    pub async fn submit_review(
        &self,
        customer_id: &str,
        target: ReviewTarget,
        rating: u8,
        body: String,
    ) -> Result<Review> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let product = self.products.find(target.id()).await?;

        if let ReviewTarget::Product(product_id) = target {
            if product.kind == ProductKind::Digital {
                let purchased = self
                    .orders
                    .exists_for_product(customer_id, product_id, OrderStatus::Delivered)
                    .await?;
                if !purchased {
                    return Err(ServiceError::Forbidden(
                        "only verified purchasers can review this product".to_string(),
                    ));
                }
            }
        }

        let existing = self
            .reviews
            .finds(ReviewQuery {
                target: Some(target),
                customer_id: Some(customer_id.to_string()),
            })
            .await?;
        if !existing.is_empty() {
            return Err(ServiceError::Validation(
                "you have already reviewed this item".to_string(),
            ));
        }

        let review = Review {
            id: Uuid::new_v4(),
            target,
            customer_id: customer_id.to_string(),
            rating,
            body,
            helpful_count: 0,
            created_at: Utc::now(),
        };
        self.reviews.insert(review.clone()).await?;

        self.resync_rating_aggregate(target).await;

        self.notifier
            .dispatch(
                &product.vendor_id,
                NotificationKind::ReviewReceived,
                ::serde_json::json!({ "targetId": target.id(), "rating": rating }),
            )
            .await;

        Ok(review)
    }

    pub async fn list_reviews(&self, target: ReviewTarget) -> Result<Vec<Review>> {
        Ok(self
            .reviews
            .finds(ReviewQuery {
                target: Some(target),
                customer_id: None,
            })
            .await?)
    }

    /// One helpful vote per user per review; the second attempt is a
    /// validation error and the counter stays put.
    pub async fn mark_review_helpful(&self, user_id: &str, review_id: Uuid) -> Result<Review> {
        self.reviews.find(review_id).await?;

        let mark = HelpfulMark {
            id: Uuid::new_v4(),
            target_kind: MarkTarget::Review,
            target_id: review_id,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        if !self.marks.insert(mark).await? {
            return Err(ServiceError::Validation(
                "already marked as helpful".to_string(),
            ));
        }

        self.reviews.increment_helpful(review_id).await?;
        self.reviews.find(review_id).await.map_err(Into::into)
    }

    /// Full recomputation: mean of every stored rating, rounded to one
    /// decimal. Failure never reaches the caller; the target is flagged
    /// for reconciliation instead and the flag clears on the next
    /// successful pass.
    pub(super) async fn resync_rating_aggregate(&self, target: ReviewTarget) {
        let result = async {
            let all = self
                .reviews
                .finds(ReviewQuery {
                    target: Some(target),
                    customer_id: None,
                })
                .await?;

            let count = all.len() as u32;
            let mean = match count {
                0 => 0.0,
                _ => all.iter().map(|r| r.rating as f64).sum::<f64>() / count as f64,
            };

            self.products
                .set_rating_aggregate(target.id(), round_to_tenth(mean), count)
                .await
        };

        if let Err(e) = result.await {
            warn!(target_id = %target.id(), error = %e, "rating resync failed; flagging");
            if let Err(e) = self.products.flag_rating_resync(target.id()).await {
                warn!(target_id = %target.id(), error = %e, "could not even flag the resync");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{OrderItem, ProductStatus};
    use crate::handlers::catalog::NewProduct;
    use crate::handlers::orders::NewOrder;
    use crate::handlers::testing::in_memory_handler;

    async fn seeded_product(h: &Handler, kind: ProductKind) -> Uuid {
        h.create_product(NewProduct {
            vendor_id: "v-1".to_string(),
            name: "Thing".to_string(),
            description: "".to_string(),
            price: 900,
            kind,
        })
        .await
        .unwrap()
        .id
    }

    async fn delivered_order(h: &Handler, customer: &str, product_id: Uuid) {
        let placed = h
            .create_order(NewOrder {
                customer_id: customer.to_string(),
                vendor_id: "v-1".to_string(),
                items: vec![OrderItem {
                    product_id,
                    name: "Thing".to_string(),
                    quantity: 1,
                    unit_price: 900,
                }],
                customer_email: "c@example.test".to_string(),
            })
            .await
            .unwrap();

        let id = placed.order.id;
        h.update_order_status("v-1", id, crate::entities::OrderStatus::Processing, None)
            .await
            .unwrap();
        h.update_order_status(
            "v-1",
            id,
            crate::entities::OrderStatus::Shipped,
            Some("TRK".to_string()),
        )
        .await
        .unwrap();
        h.update_order_status("v-1", id, crate::entities::OrderStatus::Delivered, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn out_of_range_ratings_are_rejected() {
        let h = in_memory_handler();
        let pid = seeded_product(&h, ProductKind::Physical).await;

        for rating in [0, 6] {
            let res = h
                .submit_review("c-1", ReviewTarget::Product(pid), rating, "".to_string())
                .await;
            assert!(matches!(res, Err(ServiceError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn aggregate_is_the_rounded_mean_of_all_ratings() {
        let h = in_memory_handler();
        let pid = seeded_product(&h, ProductKind::Physical).await;

        for (customer, rating) in [("c-1", 5), ("c-2", 4), ("c-3", 4)] {
            h.submit_review(customer, ReviewTarget::Product(pid), rating, "".to_string())
                .await
                .unwrap();
        }

        let product = h.products.find(pid).await.unwrap();
        // (5 + 4 + 4) / 3 = 4.333... -> 4.3
        assert_eq!(product.rating, 4.3);
        assert_eq!(product.review_count, 3);
        assert!(!product.needs_rating_resync);
    }

    #[tokio::test]
    async fn digital_products_require_a_delivered_purchase() {
        let h = in_memory_handler();
        let pid = seeded_product(&h, ProductKind::Digital).await;

        let res = h
            .submit_review("c-1", ReviewTarget::Product(pid), 5, "".to_string())
            .await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));

        delivered_order(&h, "c-1", pid).await;

        h.submit_review("c-1", ReviewTarget::Product(pid), 5, "great".to_string())
            .await
            .unwrap();

        // second attempt by the same buyer
        let res = h
            .submit_review("c-1", ReviewTarget::Product(pid), 4, "again".to_string())
            .await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn one_review_per_customer_per_target() {
        let h = in_memory_handler();
        let pid = seeded_product(&h, ProductKind::Physical).await;

        h.submit_review("c-1", ReviewTarget::Product(pid), 3, "ok".to_string())
            .await
            .unwrap();
        let res = h
            .submit_review("c-1", ReviewTarget::Product(pid), 5, "changed my mind".to_string())
            .await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let reviews = h.list_reviews(ReviewTarget::Product(pid)).await.unwrap();
        assert_eq!(reviews.len(), 1);
    }

    #[tokio::test]
    async fn double_helpful_mark_leaves_the_counter_alone() {
        let h = in_memory_handler();
        let pid = seeded_product(&h, ProductKind::Physical).await;

        let review = h
            .submit_review("c-1", ReviewTarget::Product(pid), 4, "".to_string())
            .await
            .unwrap();

        let marked = h.mark_review_helpful("u-1", review.id).await.unwrap();
        assert_eq!(marked.helpful_count, 1);

        let res = h.mark_review_helpful("u-1", review.id).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let unchanged = h.reviews.find(review.id).await.unwrap();
        assert_eq!(unchanged.helpful_count, 1);

        // a different user still counts
        let marked = h.mark_review_helpful("u-2", review.id).await.unwrap();
        assert_eq!(marked.helpful_count, 2);
    }

    #[tokio::test]
    async fn archived_products_still_resolve_for_listing_reviews() {
        let h = in_memory_handler();
        let pid = seeded_product(&h, ProductKind::Physical).await;

        h.submit_review("c-1", ReviewTarget::Product(pid), 4, "".to_string())
            .await
            .unwrap();
        h.archive_product("v-1", pid).await.unwrap();

        let product = h.products.find(pid).await.unwrap();
        assert_eq!(product.status, ProductStatus::Archived);
        assert_eq!(
            h.list_reviews(ReviewTarget::Product(pid)).await.unwrap().len(),
            1
        );
    }
}
