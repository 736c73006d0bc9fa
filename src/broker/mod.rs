pub mod engine;
pub mod retained;
pub mod subscription;

pub use engine::{Broker, Dispatch, SharedBroker};
pub use retained::{RetainedEntry, RetainedStore};
pub use subscription::{Subscription, SubscriptionTable};
