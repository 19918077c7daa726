//! nJinn job status events and their delivery.
//!
//! - [`WebhookEvent`] — the `{id, result?, status, timestamp}` payload sent
//!   for every job state transition.
//! - [`EventClock`] — wall-clock origin plus monotonic elapsed time, used to
//!   stamp events.
//! - [`delivery`] — the [`StatusNotifier`] seam and its HTTP implementation,
//!   [`WebhookDelivery`].

pub mod clock;
pub mod delivery;
pub mod event;

pub use clock::EventClock;
pub use delivery::webhook::{WebhookConfig, WebhookDelivery, WebhookError};
pub use delivery::StatusNotifier;
pub use event::{WebhookEvent, WebhookStatus};
