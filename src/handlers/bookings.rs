use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use super::{Handler, Result, ServiceError};
use crate::entities::{
    BookingNote, BookingStatus, ProductKind, ProductStatus, Review, ReviewTarget, SenderRole,
    ServiceBooking,
};
use crate::gateways::NotificationKind;
use crate::repositories::{BookingMutation, BookingQuery, ReviewQuery};

impl Handler {
    pub async fn create_booking(&self, customer_id: &str, service_id: Uuid) -> Result<ServiceBooking> {
        let service = self.products.find(service_id).await?;

        if service.kind != ProductKind::Service {
            return Err(ServiceError::Validation(
                "bookings are only available for services".to_string(),
            ));
        }
        if service.status != ProductStatus::Active {
            return Err(ServiceError::Validation("service is not available".to_string()));
        }

        let now = Utc::now();
        let booking = ServiceBooking {
            id: Uuid::new_v4(),
            customer_id: customer_id.to_string(),
            vendor_id: service.vendor_id.clone(),
            service_id,
            status: BookingStatus::PendingSchedule,
            scheduled_date: None,
            rating: None,
            messages: vec![],
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(booking.clone()).await?;

        self.notifier
            .dispatch(
                &service.vendor_id,
                NotificationKind::BookingUpdated,
                ::serde_json::json!({ "bookingId": booking.id, "status": booking.status }),
            )
            .await;

        Ok(booking)
    }

    pub async fn schedule_booking(
        &self,
        vendor_id: &str,
        booking_id: Uuid,
        date: DateTime<Utc>,
    ) -> Result<ServiceBooking> {
        let booking = self.bookings.find(booking_id).await?;
        if booking.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "booking belongs to another vendor".to_string(),
            ));
        }

        if !booking.status.can_transition(BookingStatus::Scheduled) {
            return Err(ServiceError::Validation(format!(
                "cannot schedule a booking in status {:?}",
                booking.status
            )));
        }
        if date <= Utc::now() {
            return Err(ServiceError::Validation(
                "scheduled date must be in the future".to_string(),
            ));
        }

        let mutation = BookingMutation {
            status: Some(BookingStatus::Scheduled),
            scheduled_date: Some(date),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self.bookings.update(booking_id, mutation).await?;

        self.notifier
            .dispatch(
                &updated.customer_id,
                NotificationKind::BookingUpdated,
                ::serde_json::json!({ "bookingId": updated.id, "status": updated.status }),
            )
            .await;

        Ok(updated)
    }

    /// Vendor-side progress through the lifecycle (in progress, completed).
    pub async fn update_booking_status(
        &self,
        vendor_id: &str,
        booking_id: Uuid,
        next: BookingStatus,
    ) -> Result<ServiceBooking> {
        let booking = self.bookings.find(booking_id).await?;
        if booking.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "booking belongs to another vendor".to_string(),
            ));
        }

        if !booking.status.can_transition(next) {
            return Err(ServiceError::Validation(format!(
                "cannot move booking from {:?} to {:?}",
                booking.status, next
            )));
        }

        let mutation = BookingMutation {
            status: Some(next),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self.bookings.update(booking_id, mutation).await?;

        self.notifier
            .dispatch(
                &updated.customer_id,
                NotificationKind::BookingUpdated,
                ::serde_json::json!({ "bookingId": updated.id, "status": updated.status }),
            )
            .await;

        Ok(updated)
    }

    /// Either party may cancel while the work has not started.
    pub async fn cancel_booking(&self, requester_id: &str, booking_id: Uuid) -> Result<ServiceBooking> {
        let booking = self.bookings.find(booking_id).await?;
        if booking.customer_id != requester_id && booking.vendor_id != requester_id {
            return Err(ServiceError::Forbidden(
                "booking belongs to other parties".to_string(),
            ));
        }

        if !booking.status.can_transition(BookingStatus::Cancelled) {
            return Err(ServiceError::Validation(format!(
                "cannot cancel a booking in status {:?}",
                booking.status
            )));
        }

        let mutation = BookingMutation {
            status: Some(BookingStatus::Cancelled),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        Ok(self.bookings.update(booking_id, mutation).await?)
    }

    /// Bookings carry their own embedded message thread, separate from
    /// the conversation system.
    pub async fn add_booking_note(
        &self,
        booking_id: Uuid,
        sender_id: &str,
        sender_role: SenderRole,
        content: String,
    ) -> Result<ServiceBooking> {
        if content.trim().is_empty() {
            return Err(ServiceError::Validation("note content is required".to_string()));
        }

        let booking = self.bookings.find(booking_id).await?;
        let expected = match sender_role {
            SenderRole::Customer => &booking.customer_id,
            SenderRole::Vendor => &booking.vendor_id,
        };
        if expected != sender_id {
            return Err(ServiceError::Forbidden(
                "sender is not a party to this booking".to_string(),
            ));
        }

        let note = BookingNote {
            sender_role,
            content,
            sent_at: Utc::now(),
        };
        self.bookings.push_note(booking_id, note).await?;

        Ok(self.bookings.find(booking_id).await?)
    }

    /// A completed, unrated booking can be rated exactly once. The rating
    /// also lands as a service review so the aggregate keeps one source.
    pub async fn rate_booking(
        &self,
        customer_id: &str,
        booking_id: Uuid,
        rating: u8,
        feedback: String,
    ) -> Result<ServiceBooking> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let booking = self.bookings.find(booking_id).await?;
        if booking.customer_id != customer_id {
            return Err(ServiceError::Forbidden(
                "booking belongs to another customer".to_string(),
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(ServiceError::Validation(
                "only completed bookings can be rated".to_string(),
            ));
        }
        if booking.rating.is_some() {
            return Err(ServiceError::Validation(
                "booking has already been rated".to_string(),
            ));
        }

        let mutation = BookingMutation {
            rating: Some(rating),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self.bookings.update(booking_id, mutation).await?;

        self.record_service_review(customer_id, booking.service_id, rating, feedback)
            .await;

        Ok(updated)
    }

    // Best-effort: the booking rating is the primary write; mirroring it
    // into the review collection and the aggregate must not undo it.
    async fn record_service_review(
        &self,
        customer_id: &str,
        service_id: Uuid,
        rating: u8,
        feedback: String,
    ) {
        let target = ReviewTarget::Service(service_id);

        let insert = async {
            let existing = self
                .reviews
                .finds(ReviewQuery {
                    target: Some(target),
                    customer_id: Some(customer_id.to_string()),
                })
                .await?;
            if existing.is_empty() {
                self.reviews
                    .insert(Review {
                        id: Uuid::new_v4(),
                        target,
                        customer_id: customer_id.to_string(),
                        rating,
                        body: feedback,
                        helpful_count: 0,
                        created_at: Utc::now(),
                    })
                    .await?;
            }
            Ok::<_, crate::repositories::RepositoryError>(())
        };

        if let Err(e) = insert.await {
            warn!(%service_id, error = %e, "could not mirror booking rating into reviews");
        }

        self.resync_rating_aggregate(target).await;
    }

    pub async fn list_bookings(&self, query: BookingQuery) -> Result<Vec<ServiceBooking>> {
        Ok(self.bookings.finds(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::handlers::catalog::NewProduct;
    use crate::handlers::testing::in_memory_handler;

    async fn seeded_service(h: &Handler) -> Uuid {
        h.create_product(NewProduct {
            vendor_id: "v-1".to_string(),
            name: "Deep clean".to_string(),
            description: "".to_string(),
            price: 5000,
            kind: ProductKind::Service,
        })
        .await
        .unwrap()
        .id
    }

    async fn completed_booking(h: &Handler, customer: &str) -> Uuid {
        let sid = seeded_service(h).await;
        let booking = h.create_booking(customer, sid).await.unwrap();

        h.schedule_booking("v-1", booking.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        h.update_booking_status("v-1", booking.id, BookingStatus::InProgress)
            .await
            .unwrap();
        h.update_booking_status("v-1", booking.id, BookingStatus::Completed)
            .await
            .unwrap();

        booking.id
    }

    #[tokio::test]
    async fn only_active_services_can_be_booked() {
        let h = in_memory_handler();

        let physical = h
            .create_product(NewProduct {
                vendor_id: "v-1".to_string(),
                name: "Lamp".to_string(),
                description: "".to_string(),
                price: 100,
                kind: ProductKind::Physical,
            })
            .await
            .unwrap();
        assert!(matches!(
            h.create_booking("c-1", physical.id).await,
            Err(ServiceError::Validation(_))
        ));

        let sid = seeded_service(&h).await;
        h.archive_product("v-1", sid).await.unwrap();
        assert!(matches!(
            h.create_booking("c-1", sid).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn scheduling_requires_a_future_date() {
        let h = in_memory_handler();
        let sid = seeded_service(&h).await;
        let booking = h.create_booking("c-1", sid).await.unwrap();

        let res = h
            .schedule_booking("v-1", booking.id, Utc::now() - Duration::hours(1))
            .await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn in_progress_bookings_cannot_be_cancelled() {
        let h = in_memory_handler();
        let sid = seeded_service(&h).await;
        let booking = h.create_booking("c-1", sid).await.unwrap();

        h.schedule_booking("v-1", booking.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        h.update_booking_status("v-1", booking.id, BookingStatus::InProgress)
            .await
            .unwrap();

        let res = h.cancel_booking("c-1", booking.id).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn rating_is_gated_on_completion_and_happens_once() {
        let h = in_memory_handler();
        let sid = seeded_service(&h).await;
        let pending = h.create_booking("c-1", sid).await.unwrap();

        let res = h.rate_booking("c-1", pending.id, 5, "".to_string()).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let bid = completed_booking(&h, "c-2").await;
        let rated = h.rate_booking("c-2", bid, 4, "solid work".to_string()).await.unwrap();
        assert_eq!(rated.rating, Some(4));

        let res = h.rate_booking("c-2", bid, 5, "".to_string()).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn booking_rating_feeds_the_service_aggregate() {
        let h = in_memory_handler();
        let bid = completed_booking(&h, "c-1").await;
        let booking = h.bookings.find(bid).await.unwrap();

        h.rate_booking("c-1", bid, 5, "great".to_string()).await.unwrap();

        let service = h.products.find(booking.service_id).await.unwrap();
        assert_eq!(service.rating, 5.0);
        assert_eq!(service.review_count, 1);
    }

    #[tokio::test]
    async fn notes_require_a_matching_party() {
        let h = in_memory_handler();
        let sid = seeded_service(&h).await;
        let booking = h.create_booking("c-1", sid).await.unwrap();

        let res = h
            .add_booking_note(booking.id, "c-9", SenderRole::Customer, "hello".to_string())
            .await;
        assert!(matches!(res, Err(ServiceError::Forbidden(_))));

        let updated = h
            .add_booking_note(booking.id, "c-1", SenderRole::Customer, "hello".to_string())
            .await
            .unwrap();
        assert_eq!(updated.messages.len(), 1);
    }
}
