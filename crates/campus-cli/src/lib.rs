//! # campus-cli: Operator CLI for Campus Resource Moderation
//!
//! Provides the `campus` command-line interface.
//!
//! ## Subcommands
//!
//! - `campus token issue`: mint a bearer token for a phone identity and role.
//! - `campus token inspect`: verify a token and print its claims.
//! - `campus secret generate`: print a fresh hex secret for
//!   `CAMPUS_TOKEN_SECRET`.
//!
//! ```bash
//! export CAMPUS_TOKEN_SECRET=$(campus secret generate)
//! campus token issue --phone 13800000001 --role admin --ttl-secs 3600
//! ```

pub mod secret;
pub mod token;
