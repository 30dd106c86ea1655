//! Model module - The observable object graph mirrored to the client.
//!
//! Domain code owns model objects inside a [`ModelStore`] and announces
//! changes through a [`ChangeSet`]. The synchronization layer only sees
//! handles and [`ModelNotification`]s.

mod listeners;
mod object;
mod store;

pub use listeners::{ModelListener, ModelNotification, PropertyFilter, Subscription};
pub use object::{AsAny, ChangeSet, ModelObject};
pub use store::ModelStore;
