use rex_schemas::Bar;

use crate::Series;

/// On-balance volume: a running total of volume, added when close rises and
/// subtracted when close falls; unchanged on a flat close.
pub fn obv(bars: &[Bar]) -> Series {
    let mut out = vec![None; bars.len()];
    if bars.is_empty() {
        return out;
    }

    let mut running = 0.0;
    out[0] = Some(running);

    for i in 1..bars.len() {
        running += match bars[i].close.partial_cmp(&bars[i - 1].close) {
            Some(std::cmp::Ordering::Greater) => bars[i].volume,
            Some(std::cmp::Ordering::Less) => -bars[i].volume,
            _ => 0.0,
        };
        out[i] = Some(running);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bar;

    #[test]
    fn rising_closes_accumulate_volume() {
        let mut bars = vec![bar(1.0), bar(2.0), bar(3.0)];
        for b in bars.iter_mut() {
            b.volume = 100.0;
        }
        let out = obv(&bars);
        assert_eq!(out, vec![Some(0.0), Some(100.0), Some(200.0)]);
    }

    #[test]
    fn falling_close_subtracts_volume() {
        let mut bars = vec![bar(3.0), bar(2.0)];
        bars[1].volume = 50.0;
        let out = obv(&bars);
        assert_eq!(out, vec![Some(0.0), Some(-50.0)]);
    }
}
