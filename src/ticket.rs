//! Precondition Tickets
//!
//! A ticket is a caller-scoped token checked before a query touches the
//! backend or the producer. The cache treats it as opaque apart from its
//! validity window.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Length of the hex token produced by [`CacheTicket::issue`]
const TOKEN_LEN: usize = 16;

// == Cache Ticket ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTicket {
    /// Who the ticket was issued to
    pub subject: String,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheTicket {
    /// Issues a ticket for `subject` valid for `ttl` from now.
    pub fn issue(subject: impl Into<String>, ttl: Duration) -> Self {
        let subject = subject.into();
        let now = Utc::now();
        let source = format!(
            "{}:{}:{}",
            subject,
            now.timestamp(),
            now.timestamp_subsec_nanos()
        );
        let digest = hex::encode(Sha256::digest(source.as_bytes()));
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            subject,
            token: digest[..TOKEN_LEN].to_string(),
            issued_at: now,
            expires_at,
        }
    }

    // == Validate ==
    /// Checks the ticket against the current time.
    ///
    /// Fails with [`CacheError::InvalidPrecondition`] when the token is empty
    /// or the window is inverted, and [`CacheError::PreconditionExpired`] once
    /// `expires_at` has passed.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Utc::now())
    }

    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(CacheError::InvalidPrecondition(
                "ticket token is empty".to_string(),
            ));
        }
        if self.expires_at < self.issued_at {
            return Err(CacheError::InvalidPrecondition(
                "ticket expires before it was issued".to_string(),
            ));
        }
        if now > self.expires_at {
            return Err(CacheError::PreconditionExpired);
        }
        Ok(())
    }
}
