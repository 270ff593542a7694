//! Network session supervision
//!
//! The supervisor owns the connect/reconnect loop and is the only producer
//! of banners. It is split in two:
//!
//! - [`Supervisor`]: synchronous event handlers that update the connection
//!   state, post banners and return directives
//! - [`supervise`]: the async runner driving a link and a messaging session
//!   through those handlers
//!
//! ```text
//!              Attempt             Established
//! Disconnected ------> Connecting ------------> Connected
//!      ^                   |                        |
//!      +------ Failed -----+--------- Lost ---------+
//! ```

mod banners;
mod classify;
mod runner;
mod state;
mod supervisor;

pub use banners::Status;
pub use classify::{KeywordRule, KeywordTable};
pub use runner::{supervise, RestartRequested, Stage, SupervisorHooks};
pub use state::{ConnectionEvent, ConnectionState};
pub use supervisor::{Directive, Discard, FailurePolicy, SessionParams, Supervisor};
