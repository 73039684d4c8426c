//! Signal fusion across the active strategies.
//!
//! Resolution is deterministic and depends only on the configured strategy
//! order carried by the signal slice, never on evaluation order.

use crate::domain::signal::{Direction, Signal, StrategyMode};

/// Resolve one effective direction from the active strategies' votes for the
/// same symbol/timestamp. `signals` must be ordered by the configured
/// strategy order.
///
/// - `Any`: the first non-flat vote wins, unless both long and short appear
///   anywhere; a conflict resolves to flat.
/// - `All`: every vote must be the same non-flat direction.
pub fn combine(signals: &[Signal], mode: StrategyMode) -> Direction {
    match mode {
        StrategyMode::Any => {
            let has_long = signals.iter().any(|s| s.direction == Direction::Long);
            let has_short = signals.iter().any(|s| s.direction == Direction::Short);
            if has_long && has_short {
                return Direction::Flat;
            }
            signals
                .iter()
                .map(|s| s.direction)
                .find(|d| !d.is_flat())
                .unwrap_or(Direction::Flat)
        }
        StrategyMode::All => {
            let mut directions = signals.iter().map(|s| s.direction);
            let Some(first) = directions.next() else {
                return Direction::Flat;
            };
            if !first.is_flat() && directions.all(|d| d == first) {
                first
            } else {
                Direction::Flat
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::StrategyKind;
    use chrono::NaiveDate;

    fn signal(strategy: StrategyKind, direction: Direction) -> Signal {
        Signal {
            strategy,
            direction,
            ts: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn any_takes_first_non_flat() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Flat),
            signal(StrategyKind::Reversal, Direction::Long),
        ];
        assert_eq!(combine(&signals, StrategyMode::Any), Direction::Long);
    }

    #[test]
    fn any_long_flat_is_long() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Long),
            signal(StrategyKind::Reversal, Direction::Flat),
        ];
        assert_eq!(combine(&signals, StrategyMode::Any), Direction::Long);
    }

    #[test]
    fn any_conflict_is_flat() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Long),
            signal(StrategyKind::Reversal, Direction::Short),
        ];
        assert_eq!(combine(&signals, StrategyMode::Any), Direction::Flat);
    }

    #[test]
    fn any_conflict_is_flat_regardless_of_order() {
        let signals = vec![
            signal(StrategyKind::Reversal, Direction::Short),
            signal(StrategyKind::Trend, Direction::Long),
        ];
        assert_eq!(combine(&signals, StrategyMode::Any), Direction::Flat);
    }

    #[test]
    fn any_all_flat_is_flat() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Flat),
            signal(StrategyKind::Reversal, Direction::Flat),
        ];
        assert_eq!(combine(&signals, StrategyMode::Any), Direction::Flat);
    }

    #[test]
    fn all_agreement_passes() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Short),
            signal(StrategyKind::Reversal, Direction::Short),
        ];
        assert_eq!(combine(&signals, StrategyMode::All), Direction::Short);
    }

    #[test]
    fn all_disagreement_is_flat() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Long),
            signal(StrategyKind::Reversal, Direction::Short),
        ];
        assert_eq!(combine(&signals, StrategyMode::All), Direction::Flat);
    }

    #[test]
    fn all_partial_flat_is_flat() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Long),
            signal(StrategyKind::Reversal, Direction::Flat),
        ];
        assert_eq!(combine(&signals, StrategyMode::All), Direction::Flat);
    }

    #[test]
    fn all_unanimous_flat_is_flat() {
        let signals = vec![
            signal(StrategyKind::Trend, Direction::Flat),
            signal(StrategyKind::Reversal, Direction::Flat),
        ];
        assert_eq!(combine(&signals, StrategyMode::All), Direction::Flat);
    }

    #[test]
    fn single_strategy_passes_through() {
        let signals = vec![signal(StrategyKind::Trend, Direction::Long)];
        assert_eq!(combine(&signals, StrategyMode::Any), Direction::Long);
        assert_eq!(combine(&signals, StrategyMode::All), Direction::Long);
    }

    #[test]
    fn empty_is_flat() {
        assert_eq!(combine(&[], StrategyMode::Any), Direction::Flat);
        assert_eq!(combine(&[], StrategyMode::All), Direction::Flat);
    }
}
