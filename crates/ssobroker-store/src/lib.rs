//! # ssobroker-store
//!
//! Expiring key/value session store used by the ssobroker exchange engine.
//!
//! Every entry carries its own deadline. Reads re-check the deadline on each
//! access, so an expired entry behaves as absent whether or not it has been
//! physically removed yet. A background sweeper may reclaim memory, but no
//! read ever depends on it having run.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use ssobroker_store::{InMemorySessionStore, SessionStore, SessionValue};
//!
//! let store = InMemorySessionStore::new();
//! store.put("code.app1.abc", SessionValue::UserId(1), Duration::from_secs(10)).await?;
//!
//! // Single-use read: only one concurrent caller gets the value.
//! let user = store.take("code.app1.abc").await?;
//! ```

mod error;
mod memory;
mod sweeper;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemorySessionStore;
pub use sweeper::spawn_sweeper;
pub use traits::{SessionStore, SessionValue};

/// Type alias for a shareable session store instance.
pub type DynSessionStore = std::sync::Arc<dyn SessionStore>;
