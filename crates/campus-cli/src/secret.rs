//! # Secret Subcommand
//!
//! Generates random HMAC secrets suitable for `CAMPUS_TOKEN_SECRET`.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroize;

/// Arguments for the `campus secret` subcommand.
#[derive(Args, Debug)]
pub struct SecretArgs {
    #[command(subcommand)]
    pub command: SecretCommand,
}

/// Secret subcommands.
#[derive(Subcommand, Debug)]
pub enum SecretCommand {
    /// Print a new random secret, hex-encoded.
    Generate {
        /// Secret length in bytes before encoding.
        #[arg(long, default_value_t = 32)]
        bytes: usize,
    },
}

/// Execute the secret subcommand.
pub fn run_secret(args: &SecretArgs) -> Result<u8> {
    match &args.command {
        SecretCommand::Generate { bytes } => {
            println!("{}", generate_hex(*bytes)?);
            Ok(0)
        }
    }
}

/// Generate `len` random bytes and hex-encode them.
///
/// The hex form is what gets configured, so its length (twice `len`) must
/// clear the server's minimum secret length.
pub fn generate_hex(len: usize) -> Result<String> {
    if !(8..=1024).contains(&len) {
        bail!("secret length must be between 8 and 1024 bytes, got {len}");
    }
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    let encoded = hex::encode(&buf);
    buf.zeroize();
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_hex_of_requested_length() {
        let s = generate_hex(32).unwrap();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(s, generate_hex(32).unwrap());
    }

    #[test]
    fn generated_secret_is_accepted_by_server() {
        let s = generate_hex(8).unwrap();
        assert!(campus_api::auth::TokenSecret::new(s.into_bytes()).is_some());
    }

    #[test]
    fn rejects_silly_lengths() {
        assert!(generate_hex(0).is_err());
        assert!(generate_hex(4096).is_err());
    }
}
