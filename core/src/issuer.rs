//! Identifier and secret issuance.
//!
//! Every token has the shape `<TAG>_<lowercase hex>`. Randomness comes from
//! the thread-local, OS-seeded CSPRNG. Uniqueness is enforced by storage
//! constraints, not here.

use rand::RngCore;

/// Kind of token to issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Merchant account id.
    Restaurant,
    /// Merchant API key.
    ApiKey,
    /// Offer id.
    Offer,
    /// Reservation record id.
    Reservation,
    /// Buyer-facing redemption code.
    RedemptionCode,
}

impl TokenKind {
    /// Prefix tag.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Restaurant => "RID",
            Self::ApiKey => "KEY",
            Self::Offer => "OFF",
            Self::Reservation => "RSV",
            Self::RedemptionCode => "RES",
        }
    }

    /// Number of random bytes behind the hex suffix.
    #[must_use]
    pub const fn entropy_bytes(self) -> usize {
        match self {
            Self::ApiKey => 16,
            Self::RedemptionCode => 8,
            Self::Restaurant | Self::Offer | Self::Reservation => 6,
        }
    }
}

/// Source of fresh tokens.
pub trait TokenIssuer: Send + Sync {
    /// Issue a new token of the given kind.
    fn issue(&self, kind: TokenKind) -> String;
}

/// Production issuer backed by `rand::thread_rng`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIssuer;

impl TokenIssuer for RandomIssuer {
    fn issue(&self, kind: TokenKind) -> String {
        let mut bytes = vec![0_u8; kind.entropy_bytes()];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("{}_{}", kind.tag(), hex::encode(bytes))
    }
}
