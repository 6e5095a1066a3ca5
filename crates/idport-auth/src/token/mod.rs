//! Token issuance, verification, and rotation.

pub mod jwt;
pub mod service;

pub use jwt::{AccessTokenClaims, Jwk, Jwks, JwtError, JwtService, SigningAlgorithm, SigningKeyPair};
pub use service::{TokenPair, TokenService, TokenServiceConfig};
