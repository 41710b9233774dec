//! Application state for Axum handlers.

use std::sync::Arc;

use foody_core::Marketplace;

use crate::qr::{PngQr, QrRenderer};

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    market: Marketplace,
    qr: Arc<dyn QrRenderer>,
    recovery_secret: Option<Arc<str>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("market", &self.market)
            .field("recovery_enabled", &self.recovery_secret.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State with the PNG QR renderer and key recovery disabled.
    #[must_use]
    pub fn new(market: Marketplace) -> Self {
        Self {
            market,
            qr: Arc::new(PngQr::default()),
            recovery_secret: None,
        }
    }

    /// Replace the QR renderer.
    #[must_use]
    pub fn with_qr(mut self, qr: Arc<dyn QrRenderer>) -> Self {
        self.qr = qr;
        self
    }

    /// Enable key recovery behind `secret`. Blank secrets leave it disabled.
    #[must_use]
    pub fn with_recovery_secret(mut self, secret: Option<String>) -> Self {
        self.recovery_secret = secret
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(Arc::from);
        self
    }

    /// The marketplace service.
    #[must_use]
    pub fn market(&self) -> &Marketplace {
        &self.market
    }

    /// The QR renderer.
    #[must_use]
    pub fn qr(&self) -> &dyn QrRenderer {
        self.qr.as_ref()
    }

    /// Configured recovery secret, if recovery is enabled.
    #[must_use]
    pub fn recovery_secret(&self) -> Option<&str> {
        self.recovery_secret.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foody_testing::fixtures::test_market;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_blank_recovery_secret_disables_recovery() {
        let state = AppState::new(test_market().market).with_recovery_secret(Some("  ".into()));
        assert_eq!(state.recovery_secret(), None);

        let state = state.with_recovery_secret(Some(" s3cret ".into()));
        assert_eq!(state.recovery_secret(), Some("s3cret"));
    }
}
