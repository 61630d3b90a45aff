//! Event fixtures shared across test suites.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use storefront_notifications::domain::events::{
    LineItem, OrderCreated, OrderId, OrderLifecycleEvent, OrderStatusChanged, ShippingAddress,
};
use uuid::Uuid;

/// Fixed timestamp used across tests.
///
/// # Panics
///
/// Never; the date is a valid constant.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// A valid order-created event for `order_id`, addressed to `email`, with a
/// single line item priced at `total_price`.
///
/// # Panics
///
/// Panics if the arguments make the event invalid (empty id or email).
#[must_use]
pub fn order_created_event(order_id: &str, email: &str, total_price: Decimal) -> OrderLifecycleEvent {
    OrderLifecycleEvent::created(
        OrderId::new(order_id),
        OrderCreated {
            recipient_email: email.to_owned(),
            order_code: format!("SF-{order_id}"),
            description: "Please ring twice".to_owned(),
            shipping_address: ShippingAddress {
                full_name: "Ayse Yilmaz".to_owned(),
                line1: "Bagdat Cad. 12".to_owned(),
                line2: Some("Daire 4".to_owned()),
                district: Some("Kadikoy".to_owned()),
                city: "Istanbul".to_owned(),
                postal_code: Some("34710".to_owned()),
                country: "Turkey".to_owned(),
            },
            order_date: fixed_now(),
            user_display_name: "Ayse Yilmaz".to_owned(),
            line_items: vec![LineItem {
                product_name: "Ceramic teapot".to_owned(),
                quantity: 1,
                unit_price: total_price,
            }],
            total_price,
        },
        Uuid::new_v4(),
        fixed_now(),
    )
    .expect("fixture order-created event is valid")
}

/// A valid order-status-changed event.
///
/// # Panics
///
/// Panics if `order_id`, `status`, or `message` is empty.
#[must_use]
pub fn order_status_changed_event(order_id: &str, status: &str, message: &str) -> OrderLifecycleEvent {
    OrderLifecycleEvent::status_changed(
        OrderId::new(order_id),
        OrderStatusChanged {
            status: status.to_owned(),
            message: message.to_owned(),
        },
        Uuid::new_v4(),
        fixed_now(),
    )
    .expect("fixture order-status-changed event is valid")
}

/// Broker message body of [`order_created_event`].
#[must_use]
pub fn order_created_message(order_id: &str, email: &str, total_price: Decimal) -> serde_json::Value {
    order_created_event(order_id, email, total_price).to_message()
}
