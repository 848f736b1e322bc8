//! Data models

mod activity_log;
mod endpoint;
mod event_log;
mod organization;
mod policy;
mod router;

pub use activity_log::*;
pub use endpoint::*;
pub use event_log::*;
pub use organization::*;
pub use policy::*;
pub use router::*;
