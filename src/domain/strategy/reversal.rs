//! Mean-reversion strategy: RSI extremes at the Bollinger band edges.
//!
//! Long: RSI below the oversold threshold while the close sits at or below
//! the lower band. Short: RSI above the overbought threshold while the close
//! sits at or above the upper band. Anything else votes flat.

use crate::domain::signal::Direction;
use crate::domain::snapshot::IndicatorSnapshot;

use super::ReversalParams;

pub fn evaluate(params: &ReversalParams, curr: &IndicatorSnapshot) -> Direction {
    if curr.rsi < params.rsi_oversold && curr.close <= curr.bb_lower {
        return Direction::Long;
    }
    if curr.rsi > params.rsi_overbought && curr.close >= curr.bb_upper {
        return Direction::Short;
    }
    Direction::Flat
}
