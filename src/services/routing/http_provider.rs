//! Google Maps Distance Matrix-style provider. Batches requests at the
//! API's own element-count limit and falls back to haversine per-pair when
//! an individual element comes back without a usable duration.

use super::{TravelMatrix, TravelProvider};
use crate::services::geo;
use crate::types::Location;
use async_trait::async_trait;
use serde::Deserialize;

/// Distance Matrix API allows at most 25 origins/destinations per call.
const MAX_BATCH_SIZE: usize = 25;

pub struct HttpMatrixProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpMatrixProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://maps.googleapis.com/maps/api/distancematrix/json".to_string(),
        }
    }

    #[cfg(test)]
    fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), api_key: api_key.into(), base_url: base_url.into() }
    }

    async fn fetch_batch(&self, origins: &[Location], destinations: &[Location]) -> anyhow::Result<DistanceMatrixResponse> {
        let origins_param = format_points(origins);
        let destinations_param = format_points(destinations);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("origins", origins_param.as_str()),
                ("destinations", destinations_param.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<DistanceMatrixResponse>()
            .await?;
        Ok(response)
    }
}

fn format_points(points: &[Location]) -> String {
    points.iter().map(|p| format!("{},{}", p.lat, p.lon)).collect::<Vec<_>>().join("|")
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    status: String,
    duration: Option<DistanceMatrixDuration>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixDuration {
    value: u64,
}

#[async_trait]
impl TravelProvider for HttpMatrixProvider {
    async fn travel_matrix(&self, locations: &[Location]) -> anyhow::Result<TravelMatrix> {
        let n = locations.len();
        let mut minutes = vec![vec![0u32; n]; n];

        for origin_chunk in (0..n).collect::<Vec<_>>().chunks(MAX_BATCH_SIZE) {
            for dest_chunk in (0..n).collect::<Vec<_>>().chunks(MAX_BATCH_SIZE) {
                let origins: Vec<Location> = origin_chunk.iter().map(|&i| locations[i]).collect();
                let destinations: Vec<Location> = dest_chunk.iter().map(|&i| locations[i]).collect();

                let response = self.fetch_batch(&origins, &destinations).await?;
                if response.status != "OK" {
                    anyhow::bail!("distance matrix request failed: {}", response.status);
                }

                for (row_idx, row) in response.rows.iter().enumerate() {
                    let i = origin_chunk[row_idx];
                    for (col_idx, element) in row.elements.iter().enumerate() {
                        let j = dest_chunk[col_idx];
                        if i == j {
                            continue;
                        }
                        minutes[i][j] = if element.status == "OK" {
                            if let Some(duration) = &element.duration {
                                ((duration.value as f64 / 60.0).ceil() as u32).clamp(1, 120)
                            } else {
                                geo::travel_time_minutes(&locations[i], &locations[j])
                            }
                        } else {
                            geo::travel_time_minutes(&locations[i], &locations[j])
                        };
                    }
                }
            }
        }

        Ok(TravelMatrix { minutes })
    }

    fn name(&self) -> &str {
        "google-distance-matrix"
    }
}
