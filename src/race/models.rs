use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::shared::AppError;

/// Finishing positions that are scored and required on every submission.
/// Add a variant to track more places.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum PositionLabel {
    P1,
    P2,
    P3,
}

/// Position label (`p1`, `p2`, ...) to driver identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionMap(BTreeMap<String, String>);

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, driver: impl Into<String>) {
        self.0.insert(label.into(), driver.into());
    }

    pub fn get(&self, label: PositionLabel) -> Option<&str> {
        self.0.get(label.as_ref()).map(String::as_str)
    }

    /// Whether the driver is listed at any position, tracked or not
    pub fn contains_driver(&self, driver: &str) -> bool {
        self.0.values().any(|placed| placed == driver)
    }

    /// Tracked labels that are absent or blank
    pub fn missing_labels(&self) -> Vec<PositionLabel> {
        PositionLabel::iter()
            .filter(|label| self.get(*label).map_or(true, |d| d.trim().is_empty()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PositionMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, driver)| (label.into(), driver.into()))
                .collect(),
        )
    }
}

/// Official finishing order for one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    pub race_id: String,
    pub positions: PositionMap,
    pub updated_at: DateTime<Utc>,
}

impl RaceResult {
    pub fn new(race_id: impl Into<String>, positions: PositionMap) -> Self {
        Self {
            race_id: race_id.into(),
            positions,
            updated_at: Utc::now(),
        }
    }
}

/// Body of `POST /results`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResultRequest {
    pub race_id: Option<String>,
    pub result: Option<PositionMap>,
}

/// Checks a `{ raceId, <field>: { p1, p2, p3 } }` body and returns its parts
pub fn require_race_positions(
    race_id: Option<String>,
    positions: Option<PositionMap>,
    field: &str,
) -> Result<(String, PositionMap), AppError> {
    let race_id = race_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing raceId".to_string()))?;
    let positions =
        positions.ok_or_else(|| AppError::Validation(format!("Missing {}", field)))?;

    let missing = positions.missing_labels();
    if !missing.is_empty() {
        let labels: Vec<String> = missing.iter().map(ToString::to_string).collect();
        return Err(AppError::Validation(format!(
            "Missing {} positions: {}",
            field,
            labels.join(", ")
        )));
    }

    Ok((race_id, positions))
}
