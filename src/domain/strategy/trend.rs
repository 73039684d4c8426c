//! Trend-following strategy: EMA crossover confirmed by MACD and volume.
//!
//! Long: (ema_short - ema_long) flips from <= 0 to > 0 between the previous
//! and current bar, MACD histogram is positive, and volume is at least
//! min_volume_factor × its moving average. Short is the mirror image.
//! No crossover, or a crossover without both confirmations, votes flat.

use crate::domain::signal::Direction;
use crate::domain::snapshot::IndicatorSnapshot;

use super::TrendParams;

pub fn evaluate(
    params: &TrendParams,
    prev: &IndicatorSnapshot,
    curr: &IndicatorSnapshot,
) -> Direction {
    let prev_diff = prev.ema_short - prev.ema_long;
    let curr_diff = curr.ema_short - curr.ema_long;

    let volume_confirms = curr.volume >= params.min_volume_factor * curr.volume_ma;

    let crossed_up = prev_diff <= 0.0 && curr_diff > 0.0;
    if crossed_up && curr.macd_histogram > 0.0 && volume_confirms {
        return Direction::Long;
    }

    let crossed_down = prev_diff >= 0.0 && curr_diff < 0.0;
    if crossed_down && curr.macd_histogram < 0.0 && volume_confirms {
        return Direction::Short;
    }

    Direction::Flat
}
