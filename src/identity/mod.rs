//! Caller identity: who a request is made for, and how numeric caller ids map to apps.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod request_context;

pub use principal::{AppIdentity, UNKNOWN_IDENTITY};
pub use provider::{IdentityResolver, StaticIdentityResolver};
pub use request_context::{RequestContext, RequestKind};
