//! Domain events for the order-notification context.
//!
//! An `OrderLifecycleEvent` is emitted by the order workflow once a state
//! transition has been committed. Events are immutable: they can only be
//! built through the validating constructors or decoded from a broker
//! message, and expose read-only accessors.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_core::error::DomainError;
use storefront_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

use crate::error::ConsumeError;

/// Event type identifier for order creation.
pub const ORDER_CREATED_EVENT_TYPE: &str = "OrderCreated";

/// Event type identifier for order status changes.
pub const ORDER_STATUS_CHANGED_EVENT_TYPE: &str = "OrderStatusChanged";

/// Opaque order identifier, stable for the order's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wraps an order identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of the shipping address at the time the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient name.
    pub full_name: String,
    /// Street address.
    pub line1: String,
    /// Apartment, suite, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// District or neighbourhood.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    /// City.
    pub city: String,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country.
    pub country: String,
}

impl ShippingAddress {
    /// Returns the address as printable lines, skipping empty parts.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.full_name.clone(), self.line1.clone()];
        if let Some(line2) = self.line2.as_deref().filter(|s| !s.trim().is_empty()) {
            lines.push(line2.to_owned());
        }
        let locality = [
            self.district.as_deref(),
            Some(self.city.as_str()),
            self.postal_code.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        lines.push(locality);
        lines.push(self.country.clone());
        lines
    }

    fn validate(&self) -> Result<(), DomainError> {
        require("shipping_address.full_name", &self.full_name)?;
        require("shipping_address.line1", &self.line1)?;
        require("shipping_address.city", &self.city)?;
        require("shipping_address.country", &self.country)
    }
}

/// One purchased product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product display name.
    pub product_name: String,
    /// Units ordered.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Decimal,
}

impl LineItem {
    /// Price of the whole line, or `None` if it does not fit in a `Decimal`.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Payload of an order-created event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// Customer address the confirmation is sent to.
    pub recipient_email: String,
    /// Customer-facing order code.
    pub order_code: String,
    /// Free-text order note. Exempt from the non-empty check applied to the
    /// other text fields; a missing key decodes as `""`.
    #[serde(default)]
    pub description: String,
    /// Where the order ships.
    pub shipping_address: ShippingAddress,
    /// When the order was placed.
    pub order_date: DateTime<Utc>,
    /// Customer display name.
    pub user_display_name: String,
    /// Ordered products.
    pub line_items: Vec<LineItem>,
    /// Order total.
    pub total_price: Decimal,
}

impl OrderCreated {
    fn validate(&self) -> Result<(), DomainError> {
        require("recipient_email", &self.recipient_email)?;
        if !self.recipient_email.contains('@') {
            return Err(DomainError::Validation(format!(
                "recipient_email is not an address: {}",
                self.recipient_email
            )));
        }
        require("order_code", &self.order_code)?;
        require("user_display_name", &self.user_display_name)?;
        self.shipping_address.validate()?;
        if self.line_items.is_empty() {
            return Err(DomainError::Validation(
                "line_items must not be empty".to_owned(),
            ));
        }
        for item in &self.line_items {
            require("line_items.product_name", &item.product_name)?;
            if item.quantity == 0 {
                return Err(DomainError::Validation(format!(
                    "line item {} has zero quantity",
                    item.product_name
                )));
            }
            if item.line_total().is_none() {
                return Err(DomainError::Validation(format!(
                    "line item {} total overflows",
                    item.product_name
                )));
            }
        }
        if self.total_price.is_sign_negative() {
            return Err(DomainError::Validation(format!(
                "total_price must not be negative: {}",
                self.total_price
            )));
        }
        Ok(())
    }
}

/// Payload of an order-status-changed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    /// New status code (e.g. `Shipped`).
    pub status: String,
    /// Human-readable description of the change.
    pub message: String,
}

impl OrderStatusChanged {
    fn validate(&self) -> Result<(), DomainError> {
        require("status", &self.status)?;
        require("message", &self.message)
    }
}

/// Payload-free discriminant of an order lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleKind {
    /// The order was placed.
    Created,
    /// The order moved to a new status.
    StatusChanged,
}

impl LifecycleKind {
    /// Broker event type carrying this kind.
    #[must_use]
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Created => ORDER_CREATED_EVENT_TYPE,
            Self::StatusChanged => ORDER_STATUS_CHANGED_EVENT_TYPE,
        }
    }

    /// Resolves a broker event type.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            ORDER_CREATED_EVENT_TYPE => Some(Self::Created),
            ORDER_STATUS_CHANGED_EVENT_TYPE => Some(Self::StatusChanged),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventKind {
    /// An order was placed.
    Created(OrderCreated),
    /// An order changed status.
    StatusChanged(OrderStatusChanged),
}

impl OrderEventKind {
    /// Returns the discriminant.
    #[must_use]
    pub fn lifecycle_kind(&self) -> LifecycleKind {
        match self {
            Self::Created(_) => LifecycleKind::Created,
            Self::StatusChanged(_) => LifecycleKind::StatusChanged,
        }
    }
}

/// One notable, committed state change of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLifecycleEvent {
    metadata: EventMetadata,
    order_id: OrderId,
    kind: OrderEventKind,
}

/// Broker wire format for order lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEventMessage<P> {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Correlation ID of the transition.
    pub correlation_id: Uuid,
    /// The order this event belongs to.
    pub order_id: String,
    /// When the transition was committed.
    pub occurred_at: DateTime<Utc>,
    /// Kind-specific payload.
    pub payload: P,
}

impl OrderLifecycleEvent {
    /// Builds an order-created event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a required field is missing or empty.
    pub fn created(
        order_id: OrderId,
        payload: OrderCreated,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let event = Self {
            metadata: EventMetadata::new(ORDER_CREATED_EVENT_TYPE, correlation_id, occurred_at),
            order_id,
            kind: OrderEventKind::Created(payload),
        };
        event.validate()?;
        Ok(event)
    }

    /// Builds an order-status-changed event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a required field is missing or empty.
    pub fn status_changed(
        order_id: OrderId,
        payload: OrderStatusChanged,
        correlation_id: Uuid,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let event = Self {
            metadata: EventMetadata::new(
                ORDER_STATUS_CHANGED_EVENT_TYPE,
                correlation_id,
                occurred_at,
            ),
            order_id,
            kind: OrderEventKind::StatusChanged(payload),
        };
        event.validate()?;
        Ok(event)
    }

    /// Checks the per-kind payload invariant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        require("order_id", self.order_id.as_str())?;
        match &self.kind {
            OrderEventKind::Created(payload) => payload.validate(),
            OrderEventKind::StatusChanged(payload) => payload.validate(),
        }
    }

    /// Decodes and validates a broker message body.
    ///
    /// # Errors
    ///
    /// Returns `ConsumeError::UnknownEventType` for an unrecognised type,
    /// `ConsumeError::Malformed` if the body does not deserialize, and
    /// `ConsumeError::InvalidEvent` if it violates the payload invariant.
    pub fn decode(event_type: &str, payload: &serde_json::Value) -> Result<Self, ConsumeError> {
        let kind = LifecycleKind::from_event_type(event_type)
            .ok_or_else(|| ConsumeError::UnknownEventType(event_type.to_owned()))?;
        let event = match kind {
            LifecycleKind::Created => {
                Self::from_message(kind, parse::<OrderCreated>(payload)?, OrderEventKind::Created)
            }
            LifecycleKind::StatusChanged => Self::from_message(
                kind,
                parse::<OrderStatusChanged>(payload)?,
                OrderEventKind::StatusChanged,
            ),
        };
        event
            .validate()
            .map_err(|e| ConsumeError::InvalidEvent(e.to_string()))?;
        Ok(event)
    }

    fn from_message<P>(
        kind: LifecycleKind,
        message: OrderEventMessage<P>,
        wrap: fn(P) -> OrderEventKind,
    ) -> Self {
        Self {
            metadata: EventMetadata {
                event_id: message.event_id,
                event_type: kind.event_type().to_owned(),
                correlation_id: message.correlation_id,
                occurred_at: message.occurred_at,
            },
            order_id: OrderId::new(message.order_id),
            kind: wrap(message.payload),
        }
    }

    /// Encodes the event as a broker message body.
    #[must_use]
    pub fn to_message(&self) -> serde_json::Value {
        let message = OrderEventMessage {
            event_id: self.metadata.event_id,
            correlation_id: self.metadata.correlation_id,
            order_id: self.order_id.to_string(),
            occurred_at: self.metadata.occurred_at,
            payload: self.to_payload(),
        };
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(message).expect("OrderEventMessage serialization is infallible")
    }

    /// The order this event belongs to.
    #[must_use]
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Kind-specific payload.
    #[must_use]
    pub fn kind(&self) -> &OrderEventKind {
        &self.kind
    }

    /// Payload-free discriminant.
    #[must_use]
    pub fn lifecycle_kind(&self) -> LifecycleKind {
        self.kind.lifecycle_kind()
    }

    /// When the transition was committed.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.metadata.occurred_at
    }
}

impl DomainEvent for OrderLifecycleEvent {
    fn event_type(&self) -> &'static str {
        self.lifecycle_kind().event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        let payload = match &self.kind {
            OrderEventKind::Created(payload) => serde_json::to_value(payload),
            OrderEventKind::StatusChanged(payload) => serde_json::to_value(payload),
        };
        payload.expect("OrderEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

fn parse<P: for<'de> Deserialize<'de>>(
    payload: &serde_json::Value,
) -> Result<OrderEventMessage<P>, ConsumeError> {
    OrderEventMessage::<P>::deserialize(payload).map_err(|e| ConsumeError::Malformed(e.to_string()))
}

fn require(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
