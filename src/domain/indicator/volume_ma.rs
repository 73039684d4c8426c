//! Simple moving average of volume.
//!
//! Rolling mean over n volumes; the Trend strategy compares each bar's
//! volume against this floor. Warmup: n-1 bars.

use crate::domain::bar::Bar;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_volume_ma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::VolumeMa(period);

    if period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: bars
                .iter()
                .map(|b| IndicatorPoint {
                    ts: b.ts,
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                })
                .collect(),
        };
    }

    let warmup = period - 1;
    let mut values = Vec::with_capacity(bars.len());
    let mut rolling_sum = 0.0;

    for i in 0..bars.len() {
        rolling_sum += bars[i].volume as f64;
        if i >= period {
            rolling_sum -= bars[i - period].volume as f64;
        }

        let valid = i >= warmup;
        values.push(IndicatorPoint {
            ts: bars[i].ts,
            valid,
            value: IndicatorValue::Simple(if valid {
                rolling_sum / period as f64
            } else {
                0.0
            }),
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
