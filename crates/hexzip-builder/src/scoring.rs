// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Claimant scoring shared by the duplicate and orphan resolvers.

Every metric is normalised against the largest value among the
candidates being compared, so scores are only meaningful within one
comparison.
*/

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::geometry::LonLat;
use crate::grid::haversine_km;
use crate::index::ZctaRecord;
use crate::types::ZctaId;

/// Weights of the duplicate-resolution score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub area: f64,
    pub population: f64,
    pub proximity: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            area: 0.3,
            population: 0.4,
            proximity: 0.3,
        }
    }
}

impl ScoreWeights {
    /// Each weight finite and non-negative, at least one positive
    pub fn check(&self) -> Result<(), String> {
        let weights = [
            ("area", self.area),
            ("population", self.population),
            ("proximity", self.proximity),
        ];
        if let Some((name, w)) = weights.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(format!("{} weight must be a finite, non-negative number (got {})", name, w));
        }
        if weights.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
            return Err("at least one score weight must be positive".to_string());
        }
        Ok(())
    }
}

/// `value / max`, or 0 when the maximum is 0
pub fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// `1 - distance / max_distance`, or 1 when every candidate is at distance 0
pub fn proximity(distance: f64, max_distance: f64) -> f64 {
    if max_distance > 0.0 {
        1.0 - distance / max_distance
    } else {
        1.0
    }
}

/// Score of one claimant for one cell
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimantScore {
    pub zcta: ZctaId,
    pub distance_km: f64,
    pub score: f64,
}

/// Highest score first; equal scores go to the lowest ZCTA id
fn by_rank(a: &ClaimantScore, b: &ClaimantScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.zcta.cmp(&b.zcta))
}

/// Score every claimant of a cell, best first
pub fn score_claimants(
    weights: &ScoreWeights,
    cell_center: LonLat,
    claimants: &[&ZctaRecord],
) -> Vec<ClaimantScore> {
    let max_area = claimants.iter().map(|r| r.area_km2).fold(0.0, f64::max);
    let max_pop = claimants.iter().map(|r| r.population as f64).fold(0.0, f64::max);
    let distances: Vec<f64> = claimants
        .iter()
        .map(|r| haversine_km(cell_center, r.centroid))
        .collect();
    let max_distance = distances.iter().copied().fold(0.0, f64::max);

    let mut scores: Vec<ClaimantScore> = claimants
        .iter()
        .zip(distances)
        .map(|(record, distance_km)| {
            let score = weights.area * normalize(record.area_km2, max_area)
                + weights.population * normalize(record.population as f64, max_pop)
                + weights.proximity * proximity(distance_km, max_distance);
            ClaimantScore {
                zcta: record.zcta.clone(),
                distance_km,
                score,
            }
        })
        .collect();
    scores.sort_by(by_rank);
    scores
}

/// Winning claimant of a cell
pub fn pick_winner(
    weights: &ScoreWeights,
    cell_center: LonLat,
    claimants: &[&ZctaRecord],
) -> Option<ClaimantScore> {
    score_claimants(weights, cell_center, claimants).into_iter().next()
}
