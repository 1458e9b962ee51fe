//! Authentication against an external OpenID Connect provider.
//!
//! - [`config`]: client settings derived from [`Settings`](crate::settings::Settings).
//! - [`provider`]: the [`IdentityProvider`] seam and its `openidconnect` implementation.
//! - [`session`]: the two credential cookies and their attributes.
//! - [`gate`]: the per-request authorization state machine.

pub mod config;
pub mod gate;
pub mod provider;
pub mod session;

pub use config::OidcConfig;
pub use gate::{AuthError, Authorization, Gate, Identity};
pub use provider::{IdentityClaims, IdentityProvider, OidcProvider, ProviderError, TokenSet};
pub use session::{IssuedSession, Session};
