//! `careerforge-auth` — authentication boundary for the job system.
//!
//! Every surface that acts on a job resolves a [`UserId`] from a bearer
//! token first; ownership decisions downstream trust only that identity,
//! never anything the client supplies.

pub mod claims;
pub mod jwt;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
