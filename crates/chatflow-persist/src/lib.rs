pub mod error;
pub mod memory;
pub mod models;
pub mod store;

#[cfg(feature = "mongodb")]
pub mod mongo;

pub use error::{Result, StoreError};
pub use memory::MemorySessionStore;
pub use models::{AwaitingDetails, SessionDocument};
pub use store::SessionStore;

#[cfg(feature = "mongodb")]
pub use mongo::MongoSessionStore;
