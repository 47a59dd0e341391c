//! Session domain: token secrets, identity, wire grants, and teardown.

pub mod grant;
pub mod identity;
pub mod invalidator;
pub mod record;
pub mod secret;

pub use grant::*;
pub use identity::*;
pub use invalidator::*;
pub use record::*;
pub use secret::*;
