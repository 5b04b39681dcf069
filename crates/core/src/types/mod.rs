//! Canonical order types.

mod event;
mod order;
mod status;

pub use event::{OrderCreated, OrderEvent, StatusTransition};
pub use order::{Address, Customer, Financials, Order, OrderItem, TimelineEntry};
pub use status::{OrderStatus, PaymentStatus};
