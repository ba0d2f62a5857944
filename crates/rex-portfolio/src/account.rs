use crate::fixedpoint::Micros;

/// Snapshot returned by `BrokerClient::account_info()` (spec §4.8).
#[derive(Clone, Debug, PartialEq)]
pub struct AccountSnapshot {
    pub balance: Micros,
    pub equity: Micros,
    pub margin: Micros,
    pub free_margin: Micros,
    pub currency: String,
}

impl AccountSnapshot {
    /// Current drawdown as a percentage of balance (spec §4.4: `(balance -
    /// equity) / balance * 100`). Zero if balance is non-positive — there is
    /// nothing to draw down from.
    pub fn drawdown_pct(&self) -> f64 {
        if self.balance.raw() <= 0 {
            return 0.0;
        }
        let drawdown = self.balance - self.equity;
        drawdown.to_f64() / self.balance.to_f64() * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(balance: f64, equity: f64) -> AccountSnapshot {
        AccountSnapshot {
            balance: Micros::from_f64(balance),
            equity: Micros::from_f64(equity),
            margin: Micros::ZERO,
            free_margin: Micros::from_f64(balance),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn drawdown_is_zero_when_equity_meets_balance() {
        let s = snapshot(10_000.0, 10_000.0);
        assert_eq!(s.drawdown_pct(), 0.0);
    }

    #[test]
    fn drawdown_reflects_unrealized_loss() {
        let s = snapshot(10_000.0, 9_500.0);
        assert!((s.drawdown_pct() - 5.0).abs() < 1e-9);
    }
}
