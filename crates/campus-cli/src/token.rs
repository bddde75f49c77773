//! # Token Subcommand
//!
//! Issues and inspects HMAC-signed bearer tokens using the same
//! [`SignedTokenProvider`] the API server verifies with. The secret comes
//! from `--secret` or `CAMPUS_TOKEN_SECRET`.

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use campus_api::auth::{IdentityProvider, Role, SignedTokenProvider, TokenSecret};
use campus_core::{Phone, Timestamp};

/// Arguments for the `campus token` subcommand.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// HMAC secret shared with the API server.
    #[arg(long, env = "CAMPUS_TOKEN_SECRET", hide_env_values = true, global = true)]
    pub secret: Option<String>,

    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands.
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Issue a bearer token.
    Issue {
        /// Phone identity of the caller.
        #[arg(long)]
        phone: String,
        /// Role: "user" or "admin".
        #[arg(long, value_parser = parse_role, default_value = "user")]
        role: Role,
        /// Lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u32,
    },

    /// Verify a token and print its claims.
    Inspect {
        /// The token to inspect.
        #[arg(value_name = "TOKEN")]
        token: String,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::from_name(s).ok_or_else(|| format!("unknown role '{s}', expected 'user' or 'admin'"))
}

/// Execute the token subcommand.
pub fn run_token(args: &TokenArgs) -> Result<u8> {
    let provider = provider(args.secret.as_deref())?;
    match &args.command {
        TokenCommand::Issue {
            phone,
            role,
            ttl_secs,
        } => {
            let token = issue(&provider, phone, *role, *ttl_secs, Timestamp::now())?;
            println!("{token}");
            Ok(0)
        }
        TokenCommand::Inspect { token } => match inspect(&provider, token, Timestamp::now()) {
            Ok(claims) => {
                println!("OK: token is valid");
                println!("  Phone:   {}", claims.phone);
                println!("  Role:    {}", claims.role);
                println!("  Expires: {}", claims.expires_at);
                Ok(0)
            }
            Err(e) => {
                println!("FAIL: {e}");
                Ok(1)
            }
        },
    }
}

fn provider(secret: Option<&str>) -> Result<SignedTokenProvider> {
    let secret = secret.ok_or_else(|| anyhow!("no secret: pass --secret or set CAMPUS_TOKEN_SECRET"))?;
    let secret = TokenSecret::new(secret.as_bytes().to_vec()).ok_or_else(|| {
        anyhow!(
            "secret must be at least {} bytes",
            TokenSecret::MIN_LEN
        )
    })?;
    Ok(SignedTokenProvider::new(secret))
}

/// Issue a token for `phone` in `role` valid for `ttl_secs` from `now`.
pub fn issue(
    provider: &SignedTokenProvider,
    phone: &str,
    role: Role,
    ttl_secs: u32,
    now: Timestamp,
) -> Result<String> {
    if ttl_secs == 0 {
        anyhow::bail!("ttl-secs must be at least 1");
    }
    let phone = Phone::new(phone).map_err(|e| anyhow!("invalid phone: {e}"))?;
    provider
        .issue(role, &phone, now.plus_seconds(i64::from(ttl_secs)))
        .map_err(|e| anyhow!("failed to issue token: {e}"))
}

/// Claims of a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub phone: Phone,
    pub role: Role,
    pub expires_at: Timestamp,
}

/// Verify `token` as of `now` and return its claims.
pub fn inspect(provider: &SignedTokenProvider, token: &str, now: Timestamp) -> Result<Claims> {
    let session = provider
        .resolve_at(token.trim(), now)
        .map_err(|e| anyhow!("{e}"))?;
    let expires_at = token
        .trim()
        .split('.')
        .nth(2)
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(Timestamp::from_unix_seconds)
        .ok_or_else(|| anyhow!("token has no readable expiry"))?;
    Ok(Claims {
        phone: session.identity,
        role: session.role,
        expires_at,
    })
}
