//! Browser-driven loading for pages that paginate with a "load more" control.
//!
//! Uses chromiumoxide (CDP) behind the [`BrowserSession`] trait so the
//! expansion loop can run against any session implementation.

mod chrome;
mod config;
mod loader;
mod session;

pub use chrome::ChromeSession;
pub use config::{BrowserEngineConfig, LoadMoreConfig};
pub use loader::{is_hidden, DynamicLoader};
pub use session::{BrowserSession, SessionError};
