/// Market regime classification, supplementing the core comparator engine
/// with the coarse trend/volatility read that exit and strategy logic
/// condition on (spec §4.5 "regime change", §4.6 "regime change exit").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Regime {
    Trending,
    Ranging,
    Volatile,
    Quiet,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RegimeReading {
    pub regime: Regime,
    /// How decisively the thresholds were cleared, in `[0, 1]`.
    pub confidence: f64,
}

pub trait RegimeDetector {
    fn classify(&self, adx: f64, atr_percentile: f64) -> RegimeReading;
}

/// Threshold-based detector: ADX above `adx_trend_threshold` wins first
/// (a strong trend can coexist with high ATR), then ATR percentile splits
/// the remainder into volatile/quiet/ranging.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdRegimeDetector {
    pub adx_trend_threshold: f64,
    pub atr_volatile_percentile: f64,
    pub atr_quiet_percentile: f64,
}

impl Default for ThresholdRegimeDetector {
    fn default() -> Self {
        Self {
            adx_trend_threshold: 25.0,
            atr_volatile_percentile: 0.8,
            atr_quiet_percentile: 0.2,
        }
    }
}

impl RegimeDetector for ThresholdRegimeDetector {
    fn classify(&self, adx: f64, atr_percentile: f64) -> RegimeReading {
        if adx >= self.adx_trend_threshold {
            let confidence = ((adx - self.adx_trend_threshold) / self.adx_trend_threshold)
                .clamp(0.0, 1.0);
            return RegimeReading {
                regime: Regime::Trending,
                confidence,
            };
        }

        if atr_percentile >= self.atr_volatile_percentile {
            let span = (1.0 - self.atr_volatile_percentile).max(f64::EPSILON);
            let confidence = ((atr_percentile - self.atr_volatile_percentile) / span).clamp(0.0, 1.0);
            return RegimeReading {
                regime: Regime::Volatile,
                confidence,
            };
        }

        if atr_percentile <= self.atr_quiet_percentile {
            let span = self.atr_quiet_percentile.max(f64::EPSILON);
            let confidence = ((self.atr_quiet_percentile - atr_percentile) / span).clamp(0.0, 1.0);
            return RegimeReading {
                regime: Regime::Quiet,
                confidence,
            };
        }

        RegimeReading {
            regime: Regime::Ranging,
            confidence: 1.0
                - ((atr_percentile - self.atr_quiet_percentile)
                    / (self.atr_volatile_percentile - self.atr_quiet_percentile))
                    .clamp(0.0, 1.0),
        }
    }
}
