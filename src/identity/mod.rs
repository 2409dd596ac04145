//! Identity and session management: who the caller is, and for how long.
//! Keep the public surface thin and split implementation across sub-modules.

mod clock;
mod principal;
mod provider;
mod request_context;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use principal::Owner;
pub use provider::AuthProvider;
pub use request_context::RequestContext;
pub use session::{Session, SessionManager, SessionToken, DEFAULT_SESSION_TTL};
