//! OAuth provider integration and account linking.

pub mod linking;
pub mod provider;
pub mod state;

pub use linking::{LinkAction, LinkOutcome, LinkingConfig, OAuthLinkService};
pub use provider::{HttpProviderClient, ProviderClient, ProviderEndpoints, ProviderProfile, ProviderToken};
pub use state::OAuthState;
