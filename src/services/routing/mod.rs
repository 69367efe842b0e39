//! Travel-time oracle (C1): a pluggable provider trait with a deterministic
//! haversine fallback that always succeeds. An HTTP-backed provider is tried
//! first when configured; its failures are swallowed here and never
//! surfaced to the solver.

pub mod http_provider;

pub use http_provider::HttpMatrixProvider;

use crate::services::geo;
use crate::types::Location;
use async_trait::async_trait;

/// Travel-time matrix between locations, minutes, already clamped to
/// `[1, 120]` and rounded up.
#[derive(Debug, Clone)]
pub struct TravelMatrix {
    pub minutes: Vec<Vec<u32>>,
}

impl TravelMatrix {
    pub fn empty() -> Self {
        Self { minutes: Vec::new() }
    }

    pub fn get(&self, from: usize, to: usize) -> u32 {
        self.minutes[from][to]
    }
}

/// A travel-time provider for a batch of locations.
#[async_trait]
pub trait TravelProvider: Send + Sync {
    async fn travel_matrix(&self, locations: &[Location]) -> anyhow::Result<TravelMatrix>;

    fn name(&self) -> &str;
}

/// Always-succeeds haversine-distance fallback. Used whenever no HTTP
/// provider is configured, and whenever the HTTP provider errors on a
/// given pair.
#[derive(Debug, Default, Clone, Copy)]
pub struct HaversineFallback;

#[async_trait]
impl TravelProvider for HaversineFallback {
    async fn travel_matrix(&self, locations: &[Location]) -> anyhow::Result<TravelMatrix> {
        Ok(TravelMatrix { minutes: geo::time_matrix(locations) })
    }

    fn name(&self) -> &str {
        "haversine"
    }
}

/// Resolves a travel matrix, trying `primary` first and falling back to
/// haversine on any failure. The failure is logged, never propagated —
/// the oracle always produces a usable matrix.
pub async fn resolve_matrix(
    primary: Option<&dyn TravelProvider>,
    locations: &[Location],
) -> TravelMatrix {
    if locations.is_empty() {
        return TravelMatrix::empty();
    }
    if let Some(provider) = primary {
        match provider.travel_matrix(locations).await {
            Ok(matrix) => return matrix,
            Err(err) => {
                tracing::warn!(provider = provider.name(), error = %err, "travel provider failed, falling back to haversine");
            }
        }
    }
    HaversineFallback.travel_matrix(locations).await.expect("haversine fallback never fails")
}
