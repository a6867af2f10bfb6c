mod trait_store;
mod types;

pub use trait_store::{SessionStore, StoreError};
pub use types::{SessionKind, UserSession};
