//! Pure checkout rules shared by the services: identity, sizes, quantities,
//! money and the fulfillment workflow. Nothing in here touches the store.

pub mod identity;
pub mod money;
pub mod quantity;
pub mod size;
pub mod status;

pub use identity::{CheckoutMode, CheckoutSession, Identity, Owner};
pub use quantity::Quantity;
pub use size::Size;
pub use status::OrderStatus;
