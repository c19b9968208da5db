// src/services/fallback.rs
use crate::errors::BrandKitError;
use log::warn;
use std::future::Future;

/// Tries `attempt` once per candidate, in order, and returns the first
/// success. Every failure is logged; if all fail the last error is returned.
pub async fn first_success<C, T, F, Fut>(
    what: &str,
    candidates: &[C],
    mut attempt: F,
) -> Result<T, BrandKitError>
where
    C: std::fmt::Display,
    F: FnMut(&C) -> Fut,
    Fut: Future<Output = Result<T, BrandKitError>>,
{
    let mut last_error = BrandKitError::NotConfigured(format!("{} candidates", what));
    for candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{} failed with {}: {}", what, candidate, e);
                last_error = e;
            }
        }
    }
    Err(last_error)
}
