//! Simulated messaging vendor.
//!
//! Delivery: pluggable per-message strategy (random success/failure by default).
//! Vendor: API-key check, request validation, per-minute request window,
//! single and batch send with cosmetic latency.

pub mod delivery;
pub mod vendor;

pub use delivery::{DeliveryStrategy, SimulatedDelivery, VendorFailure};
pub use vendor::{VendorError, VendorService};
