//! Standalone helpers with no dependency on the session flow: random
//! draws, class-name merging for UI callers, and the geolocation seam.

use crate::error::ClientError;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Uniform draw from `min..=max`.
///
/// `min` must not exceed `max`.
#[must_use]
pub fn random_num(min: u32, max: u32) -> u32 {
    rand::thread_rng().gen_range(min..=max)
}

/// Uniform draw from the uppercase ASCII alphabet.
#[must_use]
pub fn random_char() -> char {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let index = rand::thread_rng().gen_range(0..ALPHABET.len());
    ALPHABET[index] as char
}

/// Merges whitespace-separated class lists into a single class string.
///
/// Duplicate class names keep only their last occurrence, so later inputs
/// override earlier ones.
#[must_use]
pub fn merge_classes<I, S>(classes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut merged: Vec<String> = Vec::new();

    for class in classes {
        for token in class.as_ref().split_whitespace() {
            merged.retain(|existing| existing != token);
            merged.push(token.to_string());
        }
    }

    merged.join(" ")
}

/// A geographic fix reported by a location provider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// Source of the device position. Hardware access stays outside this
/// crate; hosts plug in whatever their platform offers.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn current_position(&self) -> Result<Position, ClientError>;
}

/// Asks the provider for the current position, logging failures and
/// returning `None` instead of an error.
pub async fn current_location(provider: &dyn GeoProvider) -> Option<Position> {
    match provider.current_position().await {
        Ok(position) => Some(position),
        Err(err) => {
            error!("Failed to obtain current location: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_num_stays_in_range() {
        for _ in 0..200 {
            let value = random_num(1000, 9999);
            assert!((1000..=9999).contains(&value));
        }
    }

    #[test]
    fn random_num_handles_single_value_range() {
        assert_eq!(random_num(7, 7), 7);
    }

    #[test]
    fn random_char_is_uppercase_ascii() {
        for _ in 0..100 {
            assert!(random_char().is_ascii_uppercase());
        }
    }

    #[test]
    fn merge_classes_joins_and_splits_tokens() {
        let merged = merge_classes(["px-2 py-1", "rounded"]);
        assert_eq!(merged, "px-2 py-1 rounded");
    }

    #[test]
    fn merge_classes_keeps_last_duplicate() {
        let merged = merge_classes(["px-2 rounded", "px-2"]);
        assert_eq!(merged, "rounded px-2");
    }

    #[test]
    fn merge_classes_ignores_empty_inputs() {
        let merged = merge_classes(["", "  ", "block"]);
        assert_eq!(merged, "block");
    }

    struct FixedProvider {
        fails: bool,
    }

    #[async_trait]
    impl GeoProvider for FixedProvider {
        async fn current_position(&self) -> Result<Position, ClientError> {
            if self.fails {
                Err(ClientError::Network("no fix".to_string()))
            } else {
                Ok(Position {
                    latitude: 4.711,
                    longitude: -74.072,
                    accuracy: Some(12.0),
                })
            }
        }
    }

    #[tokio::test]
    async fn current_location_returns_position_from_provider() {
        let provider = FixedProvider { fails: false };
        let position = current_location(&provider).await.expect("position");
        assert_eq!(position.latitude, 4.711);
    }

    #[tokio::test]
    async fn current_location_swallows_provider_errors() {
        let provider = FixedProvider { fails: true };
        assert!(current_location(&provider).await.is_none());
    }
}
