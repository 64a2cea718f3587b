//! External collaborator traits and in-memory implementations.
//!
//! Everything the orchestration services depend on but do not own lives
//! here: the cart, the product catalog, shipping rates, the payment
//! gateway, and outbound notifications. Each collaborator is a trait with
//! an in-memory implementation used by tests and the development server.

pub mod cart;
pub mod catalog;
pub mod gateway;
pub mod notify;
pub mod shipping;

pub use cart::{CartLine, CartService, InMemoryCartService};
pub use catalog::{CatalogService, InMemoryCatalogService};
pub use gateway::{PaymentGateway, SimulatedPaymentGateway};
pub use notify::{InMemoryNotificationService, NotificationService};
pub use shipping::{InMemoryShippingService, ShippingMethod, ShippingService};
