pub mod audit_logs;
pub mod cart_items;
pub mod carts;
pub mod checkout_draft_items;
pub mod checkout_drafts;
pub mod order_items;
pub mod orders;
pub mod products;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use checkout_draft_items::Entity as CheckoutDraftItems;
pub use checkout_drafts::Entity as CheckoutDrafts;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
