//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::InstrumentId;

/// OHLCV bar for one instrument over one fixed interval.
///
/// `open_ts` must be strictly increasing across a run; the event loop rejects
/// sequences that violate this instead of reordering them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub instrument_id: InstrumentId,
    pub open_ts: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Basic OHLC sanity check: high bounds everything, low bounds everything,
    /// prices positive, volume non-negative.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > Decimal::ZERO
            && self.close > Decimal::ZERO
            && self.volume >= Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_bar() -> Bar {
        Bar {
            instrument_id: InstrumentId::new("EUR/USD.SIM"),
            open_ts: Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap(),
            open: dec!(1.1200),
            high: dec!(1.1250),
            low: dec!(1.1180),
            close: dec!(1.1230),
            volume: dec!(50000),
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = dec!(1.1100);
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_non_positive_close() {
        let mut bar = sample_bar();
        bar.low = Decimal::ZERO;
        bar.close = Decimal::ZERO;
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_serializes_decimals_as_strings() {
        let json = serde_json::to_string(&sample_bar()).unwrap();
        assert!(json.contains("\"close\":\"1.1230\""));
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(deser, sample_bar());
    }
}
