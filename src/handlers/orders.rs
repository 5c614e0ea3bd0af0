use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use super::{Handler, Result, ServiceError};
use crate::entities::{Order, OrderItem, OrderStatus, PaymentStatus};
use crate::gateways::{NotificationKind, PaymentInit, PaymentOutcome};
use crate::repositories::{OrderMutation, OrderQuery};

pub struct NewOrder {
    pub customer_id: String,
    pub vendor_id: String,
    pub items: Vec<OrderItem>,
    /// Where the gateway sends its receipt; auth is out of scope so the
    /// caller supplies it.
    pub customer_email: String,
}

pub struct PlacedOrder {
    pub order: Order,
    pub payment: Option<PaymentInit>,
}

impl Handler {
    pub async fn create_order(&self, input: NewOrder) -> Result<PlacedOrder> {
        if input.items.is_empty() {
            return Err(ServiceError::Validation("order has no items".to_string()));
        }
        for item in &input.items {
            if item.quantity == 0 {
                return Err(ServiceError::Validation(
                    "item quantity must be at least 1".to_string(),
                ));
            }
            if item.unit_price < 0 {
                return Err(ServiceError::Validation("item price cannot be negative".to_string()));
            }
        }

        let total = input
            .items
            .iter()
            .map(|i| i.unit_price * i.quantity as i64)
            .sum();

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: input.customer_id,
            vendor_id: input.vendor_id.clone(),
            items: input.items,
            total,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        };

        self.orders.insert(order.clone()).await?;

        // The order stands even when the gateway is down; the customer can
        // retry payment from the order page.
        let payment = match self
            .payments
            .initialize(order.id, order.total, &input.customer_email)
            .await
        {
            Ok(init) => Some(init),
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "payment initialize failed");
                None
            }
        };

        self.notifier
            .dispatch(
                &input.vendor_id,
                NotificationKind::OrderPlaced,
                ::serde_json::json!({ "orderId": order.id, "total": order.total }),
            )
            .await;

        if let Err(e) = self
            .email
            .send(
                &input.customer_email,
                "Order received",
                &format!("Your order {} has been placed.", order.id),
            )
            .await
        {
            warn!(order_id = %order.id, error = %e, "order confirmation email failed");
        }

        Ok(PlacedOrder { order, payment })
    }

    pub async fn get_order(&self, requester_id: &str, order_id: Uuid) -> Result<Order> {
        let order = self.orders.find(order_id).await?;

        if order.customer_id != requester_id && order.vendor_id != requester_id {
            return Err(ServiceError::Forbidden(
                "order belongs to another account".to_string(),
            ));
        }

        Ok(order)
    }

    pub async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        Ok(self.orders.finds(query).await?)
    }

    /// Vendor-side fulfilment. Every move is checked against the order
    /// transition table; shipping additionally needs a tracking number.
    pub async fn update_order_status(
        &self,
        vendor_id: &str,
        order_id: Uuid,
        next: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<Order> {
        let order = self.orders.find(order_id).await?;
        if order.vendor_id != vendor_id {
            return Err(ServiceError::Forbidden(
                "order belongs to another vendor".to_string(),
            ));
        }

        if !order.status.can_transition(next) {
            return Err(ServiceError::Validation(format!(
                "cannot move order from {:?} to {:?}",
                order.status, next
            )));
        }

        if next == OrderStatus::Shipped && tracking_number.is_none() && order.tracking_number.is_none()
        {
            return Err(ServiceError::Validation(
                "shipping requires a tracking number".to_string(),
            ));
        }

        let mutation = OrderMutation {
            status: Some(next),
            tracking_number,
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self.orders.update(order_id, mutation).await?;

        self.notifier
            .dispatch(
                &updated.customer_id,
                NotificationKind::OrderStatusChanged,
                ::serde_json::json!({ "orderId": updated.id, "status": updated.status }),
            )
            .await;

        Ok(updated)
    }

    /// Customer-side cancellation: only while the vendor has not shipped.
    /// Cancelling also marks the payment refunded.
    /// `admin` skips the ownership check; platform staff may cancel any
    /// order that is still in a cancellable status.
    pub async fn cancel_order(&self, actor_id: &str, order_id: Uuid, admin: bool) -> Result<Order> {
        let order = self.orders.find(order_id).await?;
        if !admin && order.customer_id != actor_id {
            return Err(ServiceError::Forbidden(
                "order belongs to another customer".to_string(),
            ));
        }

        if !order.status.is_cancellable() {
            return Err(ServiceError::Validation(format!(
                "cannot cancel an order in status {:?}",
                order.status
            )));
        }

        let mutation = OrderMutation {
            status: Some(OrderStatus::Cancelled),
            payment_status: Some(PaymentStatus::Refunded),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self.orders.update(order_id, mutation).await?;

        self.notifier
            .dispatch(
                &updated.vendor_id,
                NotificationKind::OrderStatusChanged,
                ::serde_json::json!({ "orderId": updated.id, "status": updated.status }),
            )
            .await;

        Ok(updated)
    }

    /// Called when the customer returns from the gateway with a reference.
    pub async fn confirm_payment(&self, order_id: Uuid, reference: &str) -> Result<Order> {
        let order = self.orders.find(order_id).await?;

        let outcome = self.payments.verify(reference).await?;
        let payment_status = match outcome {
            PaymentOutcome::Paid => PaymentStatus::Paid,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        };

        let mutation = OrderMutation {
            payment_status: Some(payment_status),
            payment_reference: Some(reference.to_string()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        Ok(self.orders.update(order.id, mutation).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::in_memory_handler;

    fn order_input(customer: &str, vendor: &str) -> NewOrder {
        NewOrder {
            customer_id: customer.to_string(),
            vendor_id: vendor.to_string(),
            items: vec![OrderItem {
                product_id: Uuid::new_v4(),
                name: "Lamp".to_string(),
                quantity: 2,
                unit_price: 1500,
            }],
            customer_email: "c@example.test".to_string(),
        }
    }

    #[tokio::test]
    async fn totals_are_summed_from_items() {
        let h = in_memory_handler();

        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();
        assert_eq!(placed.order.total, 3000);
        assert_eq!(placed.order.status, OrderStatus::Pending);
        assert!(placed.payment.is_some());
    }

    #[tokio::test]
    async fn empty_or_zero_quantity_orders_are_rejected() {
        let h = in_memory_handler();

        let mut input = order_input("c-1", "v-1");
        input.items.clear();
        assert!(matches!(
            h.create_order(input).await,
            Err(ServiceError::Validation(_))
        ));

        let mut input = order_input("c-1", "v-1");
        input.items[0].quantity = 0;
        assert!(matches!(
            h.create_order(input).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn cancelling_a_pending_order_refunds_it() {
        let h = in_memory_handler();
        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();

        let cancelled = h.cancel_order("c-1", placed.order.id, false).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn admins_can_cancel_another_customers_order() {
        let h = in_memory_handler();
        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();

        let cancelled = h.cancel_order("staff-1", placed.order.id, true).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn shipped_orders_cannot_be_cancelled() {
        let h = in_memory_handler();
        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();
        let id = placed.order.id;

        h.update_order_status("v-1", id, OrderStatus::Processing, None)
            .await
            .unwrap();
        h.update_order_status("v-1", id, OrderStatus::Shipped, Some("TRK-1".to_string()))
            .await
            .unwrap();

        let res = h.cancel_order("c-1", id, false).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));

        let order = h.get_order("c-1", id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn shipping_without_a_tracking_number_is_rejected() {
        let h = in_memory_handler();
        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();
        let id = placed.order.id;

        h.update_order_status("v-1", id, OrderStatus::Processing, None)
            .await
            .unwrap();

        let res = h.update_order_status("v-1", id, OrderStatus::Shipped, None).await;
        assert!(matches!(res, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn strangers_cannot_read_or_cancel() {
        let h = in_memory_handler();
        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();

        assert!(matches!(
            h.get_order("c-2", placed.order.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            h.cancel_order("c-2", placed.order.id, false).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            h.update_order_status("v-2", placed.order.id, OrderStatus::Processing, None)
                .await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn payment_confirmation_records_the_reference() {
        let h = in_memory_handler();
        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();
        let reference = placed.payment.unwrap().reference;

        let order = h.confirm_payment(placed.order.id, &reference).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.payment_reference.as_deref(), Some(reference.as_str()));
    }

    #[tokio::test]
    async fn failed_verification_marks_the_payment_failed() {
        let h = in_memory_handler();
        let placed = h.create_order(order_input("c-1", "v-1")).await.unwrap();

        let order = h
            .confirm_payment(placed.order.id, "ref-failed")
            .await
            .unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Failed);
    }
}
