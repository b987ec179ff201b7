pub mod authenticator;
pub mod events;
pub mod session;
pub mod two_fa;

pub use authenticator::Authenticator;
pub use events::{SecurityEvents, TracingEvents};
pub use session::SessionValidator;
pub use two_fa::{TwoFactorService, TwoFactorSetup};
