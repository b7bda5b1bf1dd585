use strum::IntoEnumIterator;

use crate::race::{PositionLabel, PositionMap};

/// Points for a driver predicted at exactly the position they finished
pub const EXACT_POSITION_POINTS: u32 = 3;
/// Points for a driver listed anywhere else in the result
pub const PARTIAL_CREDIT_POINTS: u32 = 1;

/// Scores a prediction against the official result.
///
/// Each tracked position is judged on its own: exact match earns
/// [`EXACT_POSITION_POINTS`], a driver listed anywhere else in the result (extra
/// labels such as `p4` included) earns [`PARTIAL_CREDIT_POINTS`], anything else
/// earns nothing. Tracked positions missing from either map contribute zero.
pub fn score(predicted: &PositionMap, actual: &PositionMap) -> u32 {
    PositionLabel::iter()
        .filter_map(|label| {
            let actual_driver = actual.get(label)?;
            let predicted_driver = predicted.get(label)?;
            Some(position_points(predicted_driver, actual_driver, actual))
        })
        .sum()
}

fn position_points(predicted_driver: &str, actual_driver: &str, actual: &PositionMap) -> u32 {
    if predicted_driver == actual_driver {
        EXACT_POSITION_POINTS
    } else if actual.contains_driver(predicted_driver) {
        PARTIAL_CREDIT_POINTS
    } else {
        0
    }
}

/// Highest score a single prediction can earn
pub fn max_score() -> u32 {
    EXACT_POSITION_POINTS * PositionLabel::iter().count() as u32
}
