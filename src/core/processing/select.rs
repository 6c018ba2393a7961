use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::params::BalancedWeights;
use crate::error::{Error, Result};
use crate::io::catalog::Scene;
use crate::types::SelectionMode;

/// Weighted score of cloud cover and scene age; lower is better.
pub fn balanced_score(scene: &Scene, now: DateTime<Utc>, weights: &BalancedWeights) -> f64 {
    let age_seconds = (now - scene.acquired).num_milliseconds() as f64 / 1000.0;
    let age_days = age_seconds / weights.day_seconds;
    weights.cloud_weight * scene.cloud_cover + weights.recency_weight * age_days
}

fn compare(a: &Scene, b: &Scene, mode: SelectionMode, now: DateTime<Utc>, weights: &BalancedWeights) -> Ordering {
    match mode {
        SelectionMode::LeastCloud => a
            .cloud_cover
            .total_cmp(&b.cloud_cover)
            .then_with(|| b.acquired.cmp(&a.acquired)),
        SelectionMode::MostRecent => b
            .acquired
            .cmp(&a.acquired)
            .then_with(|| a.cloud_cover.total_cmp(&b.cloud_cover)),
        SelectionMode::Balanced => {
            balanced_score(a, now, weights).total_cmp(&balanced_score(b, now, weights))
        }
    }
}

/// Pick the best scene under `mode`. Exact ties keep the earliest candidate.
pub fn select_scene<'a>(
    scenes: &'a [Scene],
    mode: SelectionMode,
    now: DateTime<Utc>,
    weights: &BalancedWeights,
) -> Result<&'a Scene> {
    let mut best: Option<&Scene> = None;
    for scene in scenes {
        best = match best {
            Some(current) if compare(scene, current, mode, now, weights) != Ordering::Less => Some(current),
            _ => Some(scene),
        };
    }
    let selected = best.ok_or(Error::NoImageryFound)?;
    info!(
        "Selected scene {} ({}, {:.1}% cloud) using {} from {} candidates",
        selected.id,
        selected.acquired.format("%Y-%m-%d"),
        selected.cloud_cover,
        mode,
        scenes.len()
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    fn scene(id: &str, days_ago: i64, cloud: f64) -> Scene {
        Scene::new(id, now() - Duration::days(days_ago), cloud)
    }

    #[test]
    fn test_least_cloud_breaks_ties_by_recency() {
        let scenes = vec![scene("a", 10, 5.0), scene("b", 2, 5.0), scene("c", 1, 20.0)];
        let s = select_scene(&scenes, SelectionMode::LeastCloud, now(), &BalancedWeights::default()).unwrap();
        assert_eq!(s.id, "b");
    }

    #[test]
    fn test_least_cloud_is_lexicographic_minimum() {
        let scenes: Vec<Scene> = (0..12)
            .map(|i| scene(&format!("s{}", i), (i * 7) % 11, ((i * 13) % 5) as f64 * 10.0))
            .collect();
        let s = select_scene(&scenes, SelectionMode::LeastCloud, now(), &BalancedWeights::default()).unwrap();
        for other in &scenes {
            let key = |x: &Scene| (x.cloud_cover, -x.acquired.timestamp());
            assert!(key(s) <= key(other));
        }
    }

    #[test]
    fn test_most_recent_breaks_ties_by_cloud() {
        let scenes = vec![scene("a", 3, 1.0), scene("b", 1, 40.0), scene("c", 1, 10.0)];
        let s = select_scene(&scenes, SelectionMode::MostRecent, now(), &BalancedWeights::default()).unwrap();
        assert_eq!(s.id, "c");
    }

    #[test]
    fn test_balanced_score_monotonicity() {
        let w = BalancedWeights::default();
        let base = balanced_score(&scene("a", 5, 10.0), now(), &w);
        assert!(balanced_score(&scene("b", 5, 20.0), now(), &w) >= base);
        assert!(balanced_score(&scene("c", 2, 10.0), now(), &w) <= base);
        assert!((base - (0.6 * 10.0 + 0.4 * 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_balanced_trades_cloud_for_age() {
        // 0.6*10 + 0.4*20 = 14.0 against 0.6*20 + 0.4*1 = 12.4
        let scenes = vec![scene("old_clear", 20, 10.0), scene("new_cloudy", 1, 20.0)];
        let s = select_scene(&scenes, SelectionMode::Balanced, now(), &BalancedWeights::default()).unwrap();
        assert_eq!(s.id, "new_cloudy");
    }

    #[test]
    fn test_exact_tie_keeps_first() {
        let scenes = vec![scene("first", 3, 5.0), scene("second", 3, 5.0)];
        for mode in [SelectionMode::LeastCloud, SelectionMode::MostRecent, SelectionMode::Balanced] {
            let s = select_scene(&scenes, mode, now(), &BalancedWeights::default()).unwrap();
            assert_eq!(s.id, "first");
        }
    }

    #[test]
    fn test_empty_input_is_no_imagery() {
        assert!(matches!(
            select_scene(&[], SelectionMode::LeastCloud, now(), &BalancedWeights::default()),
            Err(Error::NoImageryFound)
        ));
    }
}
