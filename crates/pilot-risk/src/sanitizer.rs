//! The recommendation sanitizer.

use crate::policy::RiskPolicy;
use pilot_core::{Direction, Price, Recommendation};
use rust_decimal::Decimal;
use tracing::debug;

/// Clamp a raw recommendation to the risk policy, or degrade it to no-trade.
///
/// Deterministic and side-effect-free: the same inputs always produce the
/// same output. `last_close` is the close of the most recent primary-frame
/// candle and cross-checks the quoted price.
///
/// Sanitized output with an actionable direction always satisfies the
/// directional ordering invariant and a reward:risk of at least
/// `policy.min_risk_reward`.
pub fn sanitize(
    raw: &Recommendation,
    current: Price,
    last_close: Option<Price>,
    policy: &RiskPolicy,
) -> Recommendation {
    if !raw.direction.is_actionable() {
        return Recommendation::no_trade(&raw.symbol, "advisor returned no direction");
    }
    if raw.confidence < policy.min_confidence {
        debug!(
            symbol = %raw.symbol,
            confidence = raw.confidence,
            threshold = policy.min_confidence,
            "confidence below trade eligibility"
        );
        return Recommendation::no_trade(&raw.symbol, "confidence below threshold");
    }
    if !current.is_positive() {
        return Recommendation::no_trade(&raw.symbol, "no market price");
    }
    if let Some(close) = last_close {
        match current.deviation_from(close) {
            Some(gap) if gap <= policy.max_quote_candle_gap => {}
            _ => {
                return Recommendation::no_trade(&raw.symbol, "quote diverges from candle close");
            }
        }
    }

    let sign = Decimal::from(raw.direction.sign());

    // Entry levels from the advisor are advisory only. Anything further
    // from the market than the deviation bound is replaced with a small
    // offset from the live price in the direction's favorable sense.
    let entry = match raw.entry.deviation_from(current) {
        Some(dev) if raw.entry.is_positive() && dev <= policy.max_entry_deviation => raw.entry,
        _ => {
            debug!(
                symbol = %raw.symbol,
                advised = %raw.entry,
                current = %current,
                "overriding advisor entry price"
            );
            current.offset_frac(sign * policy.entry_nudge)
        }
    };

    // The bracket is always recomputed from the final entry; advisor stop
    // and target levels are discarded entirely.
    let stop = entry.offset_frac(-sign * policy.stop_distance);
    let risk = entry.distance(stop);
    let target = Price::new(entry.inner() + sign * policy.reward_multiple * risk);

    let sanitized = Recommendation {
        symbol: raw.symbol.clone(),
        direction: raw.direction,
        entry,
        stop,
        target,
        confidence: raw.confidence,
        rationale: raw.rationale.clone(),
        strategy: raw.strategy,
    };

    if risk <= Decimal::ZERO || !stop.is_positive() || !target.is_positive() {
        return Recommendation::no_trade(&raw.symbol, "degenerate bracket");
    }
    let reward = target.distance(entry);
    if reward / risk < policy.min_risk_reward || !sanitized.prices_ordered() {
        return Recommendation::no_trade(&raw.symbol, "risk:reward below minimum");
    }

    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_core::ExecutionStrategy;
    use rust_decimal_macros::dec;

    fn raw(direction: Direction, entry: Decimal, confidence: u8) -> Recommendation {
        Recommendation {
            symbol: "ETHUSD".to_string(),
            direction,
            entry: Price::new(entry),
            stop: Price::ZERO,
            target: Price::ZERO,
            confidence,
            rationale: "momentum continuation".to_string(),
            strategy: ExecutionStrategy::Market,
        }
    }

    #[test]
    fn test_far_entry_is_overridden() {
        // Recommended entry 2.4% above market: distrust it and nudge off
        // the live price instead.
        let policy = RiskPolicy::default();
        let current = Price::new(dec!(2738.24));
        let out = sanitize(&raw(Direction::Long, dec!(2805.05), 85), current, None, &policy);

        assert_eq!(out.direction, Direction::Long);
        assert_eq!(out.entry.inner(), dec!(2742.34736));
        assert_eq!(out.stop.inner().round_dp(2), dec!(2728.64));
        // 1:2 reward:risk from the overridden entry.
        assert_eq!(out.target.inner().round_dp(2), dec!(2769.77));
        assert!(out.prices_ordered());
    }

    #[test]
    fn test_near_entry_is_kept() {
        let policy = RiskPolicy::default();
        let current = Price::new(dec!(2738.24));
        let advised = dec!(2740.00); // 0.06% away, inside the bound
        let out = sanitize(&raw(Direction::Long, advised, 85), current, None, &policy);
        assert_eq!(out.entry.inner(), advised);
    }

    #[test]
    fn test_short_bracket_orientation() {
        let policy = RiskPolicy::default();
        let current = Price::new(dec!(2738.24));
        let out = sanitize(&raw(Direction::Short, dec!(2600), 90), current, None, &policy);

        assert_eq!(out.direction, Direction::Short);
        assert!(out.entry < current);
        assert!(out.target < out.entry && out.entry < out.stop);
    }

    #[test]
    fn test_low_confidence_degrades_to_no_trade() {
        let policy = RiskPolicy::default();
        let out = sanitize(
            &raw(Direction::Long, dec!(2740), 55),
            Price::new(dec!(2738.24)),
            None,
            &policy,
        );
        assert_eq!(out.direction, Direction::None);
        assert_eq!(out.confidence, 0);
    }

    #[test]
    fn test_no_direction_degrades_to_no_trade() {
        let policy = RiskPolicy::default();
        let out = sanitize(
            &raw(Direction::None, dec!(2740), 99),
            Price::new(dec!(2738.24)),
            None,
            &policy,
        );
        assert!(!out.is_actionable());
    }

    #[test]
    fn test_zero_price_degrades_to_no_trade() {
        let policy = RiskPolicy::default();
        let out = sanitize(&raw(Direction::Long, dec!(2740), 85), Price::ZERO, None, &policy);
        assert!(!out.is_actionable());
    }

    #[test]
    fn test_quote_candle_divergence_degrades_to_no_trade() {
        let policy = RiskPolicy::default();
        let out = sanitize(
            &raw(Direction::Long, dec!(2740), 85),
            Price::new(dec!(2738.24)),
            Some(Price::new(dec!(1900))), // 30% away from the quote
            &policy,
        );
        assert!(!out.is_actionable());
    }

    #[test]
    fn test_misconfigured_reward_multiple_rejects() {
        let policy = RiskPolicy {
            reward_multiple: dec!(1.0), // below the 1.5 floor
            ..RiskPolicy::default()
        };
        let out = sanitize(
            &raw(Direction::Long, dec!(2740), 85),
            Price::new(dec!(2738.24)),
            None,
            &policy,
        );
        assert!(!out.is_actionable());
    }

    #[test]
    fn test_deterministic() {
        let policy = RiskPolicy::default();
        let input = raw(Direction::Short, dec!(2805.05), 77);
        let current = Price::new(dec!(2738.24));
        let a = sanitize(&input, current, None, &policy);
        let b = sanitize(&input, current, None, &policy);
        assert_eq!(a, b);
    }

    #[test]
    fn test_invariants_over_price_sweep() {
        // Pseudo-random sweep over prices and directions; every actionable
        // output must satisfy ordering and the R:R floor.
        let policy = RiskPolicy::default();
        let mut seed: u64 = 0x5eed_cafe;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let current = Price::new(Decimal::from(1 + (seed >> 40)) / dec!(16));
            let advised = Price::new(current.inner() * (Decimal::ONE + Decimal::from((seed >> 8) % 100) / dec!(1000)));
            let direction = if seed % 2 == 0 { Direction::Long } else { Direction::Short };
            let confidence = (seed % 101) as u8;

            let out = sanitize(
                &raw(direction, advised.inner(), confidence),
                current,
                None,
                &policy,
            );
            if out.is_actionable() {
                assert!(out.prices_ordered(), "ordering violated at current={current}");
                let risk = out.entry.distance(out.stop);
                let reward = out.target.distance(out.entry);
                assert!(reward / risk >= policy.min_risk_reward);
                assert!(
                    out.entry.deviation_from(current).unwrap() <= policy.max_entry_deviation,
                    "entry deviation bound violated"
                );
            }
        }
    }
}
