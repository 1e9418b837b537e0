pub mod gate;
pub mod identity;

pub use gate::{AuthGate, Panel, Role};
pub use identity::{IdentityService, PasswordIdentity, Session, SessionListener};
