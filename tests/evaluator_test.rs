//! Integration tests for the signal evaluator.
//!
//! Tests cover:
//! - Entry/exit scenarios with scripted indicator values
//! - Data gates (short history, missing latest bar, missing window)
//! - Failure isolation between instruments (errors and panics)
//! - Long-only and short-enabled policies
//! - End-to-end evaluation with the native indicator service

mod common;

use approx::assert_relative_eq;
use common::*;
use pullback::adapters::native_indicators::NativeIndicators;
use pullback::domain::allocation::Holdings;
use pullback::domain::error::SignalError;
use pullback::domain::evaluator::{DecisionReason, SignalEvaluator};
use pullback::domain::policy::StrategyPolicy;

fn policy(tracked: &[&str], allow_short: bool) -> StrategyPolicy {
    StrategyPolicy {
        instruments: instruments(tracked),
        allow_short,
        ..StrategyPolicy::default()
    }
}

fn spy_evaluator(fast: f64, slow: f64, vwap: f64) -> SignalEvaluator<ScriptedIndicators> {
    SignalEvaluator::new(
        policy(&["SPY"], false),
        ScriptedIndicators::new().values("SPY", fast, slow, vwap),
    )
}

mod scenarios {
    use super::*;

    #[test]
    fn flat_uptrend_pullback_enters_long() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 10.0 / 59.0), 107.0))]);
        let evaluator = spy_evaluator(108.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.0));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::EnterLong);
        assert_relative_eq!(outcome.allocation.get("SPY").unwrap(), 0.10);
    }

    #[test]
    fn long_below_slow_ema_stops_out() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 0.1), 104.0))]);
        let evaluator = spy_evaluator(108.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::StopLoss);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn stop_loss_wins_over_trend_break() {
        // Both the stop and the trend break conditions hold.
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 0.1), 100.0))]);
        let evaluator = spy_evaluator(104.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::StopLoss);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn long_in_trend_is_unchanged() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 0.1), 112.0))]);
        let evaluator = spy_evaluator(109.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::Maintain);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.10));
    }

    #[test]
    fn long_with_crossed_emas_breaks_trend() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 0.1), 107.0))]);
        let evaluator = spy_evaluator(104.5, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::TrendBreak);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn flat_without_setup_remains_flat() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 0.1), 110.0))]);
        let evaluator = spy_evaluator(108.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new());
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::RemainFlat);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn dust_holding_counts_as_flat() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 0.1), 107.0))]);
        let evaluator = spy_evaluator(108.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 1e-10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::EnterLong);
    }
}

mod data_gates {
    use super::*;

    #[test]
    fn short_history_holds_current_position() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(49, 100.0, 0.1), 104.0))]);
        let evaluator = spy_evaluator(108.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert_eq!(
            outcome.decisions["SPY"].reason,
            DecisionReason::Hold(SignalError::InsufficientHistory {
                bars: 49,
                minimum: 50
            })
        );
        assert_eq!(outcome.allocation.get("SPY"), Some(0.10));
    }

    #[test]
    fn short_history_with_unknown_holding_is_flat() {
        let steps = timeline(&[("SPY", generate_bars(10, 100.0, 0.1))]);
        let evaluator = spy_evaluator(108.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new());
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn missing_latest_bar_holds() {
        // QQQ has one more bar than SPY, so the final step lacks SPY.
        let steps = timeline(&[
            ("SPY", generate_bars(60, 100.0, 0.1)),
            ("QQQ", generate_bars(61, 200.0, 0.1)),
        ]);
        let evaluator = SignalEvaluator::new(
            policy(&["SPY"], false),
            ScriptedIndicators::new().values("SPY", 108.0, 105.0, 106.0),
        );

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert_eq!(
            outcome.decisions["SPY"].reason,
            DecisionReason::Hold(SignalError::MissingLatestBar)
        );
        assert_eq!(outcome.allocation.get("SPY"), Some(0.10));
    }

    #[test]
    fn instrument_absent_from_feed_holds() {
        let steps = timeline(&[("QQQ", generate_bars(60, 200.0, 0.1))]);
        let evaluator = SignalEvaluator::new(
            policy(&["SPY", "QQQ"], false),
            ScriptedIndicators::new().values("QQQ", 208.0, 205.0, 206.0),
        );

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.2));
        assert_eq!(outcome.allocation.get("SPY"), Some(0.2));
        assert!(matches!(
            outcome.decisions["SPY"].reason,
            DecisionReason::Hold(SignalError::InsufficientHistory { bars: 0, .. })
        ));
    }

    #[test]
    fn non_finite_indicator_holds() {
        let steps = timeline(&[("SPY", generate_bars(60, 100.0, 0.1))]);
        let evaluator = spy_evaluator(108.0, f64::NAN, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert!(matches!(
            outcome.decisions["SPY"].reason,
            DecisionReason::Hold(SignalError::InvalidNumericResult {
                field: "ema_slow",
                ..
            })
        ));
        assert_eq!(outcome.allocation.get("SPY"), Some(0.10));
    }

    #[test]
    fn non_finite_close_holds() {
        let steps = timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, 0.1), f64::NAN))]);
        let evaluator = spy_evaluator(108.0, 105.0, 106.0);

        let outcome = evaluator.evaluate(&steps, &Holdings::new());
        assert!(matches!(
            outcome.decisions["SPY"].reason,
            DecisionReason::Hold(SignalError::InvalidNumericResult { field: "close", .. })
        ));
    }
}

mod failure_isolation {
    use super::*;

    fn two_instrument_steps() -> Vec<pullback::domain::timeline::Step> {
        timeline(&[
            ("SPY", with_last_close(generate_bars(60, 100.0, 0.1), 107.0)),
            ("QQQ", generate_bars(60, 200.0, 0.1)),
        ])
    }

    #[test]
    fn indicator_failure_holds_only_that_instrument() {
        let evaluator = SignalEvaluator::new(
            policy(&["SPY", "QQQ"], false),
            ScriptedIndicators::new()
                .values("SPY", 108.0, 105.0, 106.0)
                .with("QQQ", Script::Fail),
        );

        let holdings = Holdings::new().with("QQQ", 0.10);
        let outcome = evaluator.evaluate(&two_instrument_steps(), &holdings);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.10));
        assert_eq!(outcome.allocation.get("QQQ"), Some(0.10));
        assert!(matches!(
            outcome.decisions["QQQ"].reason,
            DecisionReason::Hold(SignalError::IndicatorComputation { .. })
        ));
    }

    #[test]
    fn panicking_indicator_is_contained() {
        let evaluator = SignalEvaluator::new(
            policy(&["SPY", "QQQ"], false),
            ScriptedIndicators::new()
                .values("SPY", 108.0, 105.0, 106.0)
                .with("QQQ", Script::Panic),
        );

        let holdings = Holdings::new().with("QQQ", 0.05);
        let allocation = evaluator.run(&two_instrument_steps(), &holdings);
        assert_eq!(allocation.get("SPY"), Some(0.10));
        assert_eq!(allocation.get("QQQ"), Some(0.05));
    }
}

mod short_policy {
    use super::*;

    fn downtrend_steps(last_close: f64) -> Vec<pullback::domain::timeline::Step> {
        timeline(&[("SPY", with_last_close(generate_bars(60, 100.0, -0.1), last_close))])
    }

    #[test]
    fn long_only_never_enters_short() {
        let evaluator = SignalEvaluator::new(
            policy(&["SPY"], false),
            ScriptedIndicators::new().values("SPY", 92.0, 95.0, 94.0),
        );
        let outcome = evaluator.evaluate(&downtrend_steps(93.0), &Holdings::new());
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::RemainFlat);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn short_enabled_enters_short() {
        let evaluator = SignalEvaluator::new(
            policy(&["SPY"], true),
            ScriptedIndicators::new().values("SPY", 92.0, 95.0, 94.0),
        );
        let outcome = evaluator.evaluate(&downtrend_steps(93.0), &Holdings::new());
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::EnterShort);
        assert_eq!(outcome.allocation.get("SPY"), Some(-0.10));
    }

    #[test]
    fn short_stop_above_slow_ema() {
        let evaluator = SignalEvaluator::new(
            policy(&["SPY"], true),
            ScriptedIndicators::new().values("SPY", 92.0, 95.0, 94.0),
        );
        let outcome = evaluator.evaluate(&downtrend_steps(96.0), &Holdings::new().with("SPY", -0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::StopLoss);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn short_above_vwap_breaks_trend() {
        let evaluator = SignalEvaluator::new(
            policy(&["SPY"], true),
            ScriptedIndicators::new().values("SPY", 92.0, 95.0, 94.0),
        );
        let outcome = evaluator.evaluate(&downtrend_steps(94.5), &Holdings::new().with("SPY", -0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::TrendBreak);
    }

    #[test]
    fn negative_holding_flattened_under_long_only() {
        let evaluator = SignalEvaluator::new(
            policy(&["SPY"], false),
            ScriptedIndicators::new().values("SPY", 92.0, 95.0, 94.0),
        );
        let outcome = evaluator.evaluate(&downtrend_steps(90.0), &Holdings::new().with("SPY", -0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::PolicyCorrection);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }
}

mod native_indicators {
    use super::*;

    /// 59 bars rising 0.17 per minute, then a dip between the two EMAs
    /// whose bar range puts its typical price below the close.
    fn pullback_bars(last_close: f64) -> Vec<Bar> {
        let mut bars = generate_bars(60, 100.0, 0.17);
        let last = bars.last_mut().unwrap();
        last.close = last_close;
        last.open = last_close;
        last.high = last_close + 0.1;
        last.low = last_close - 1.0;
        bars
    }

    #[test]
    fn pullback_in_uptrend_enters_long() {
        let steps = timeline(&[("SPY", pullback_bars(108.7))]);
        let evaluator = SignalEvaluator::new(policy(&["SPY"], false), NativeIndicators);

        let outcome = evaluator.evaluate(&steps, &Holdings::new());
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::EnterLong);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.10));
    }

    #[test]
    fn break_below_slow_ema_stops_out() {
        let steps = timeline(&[("SPY", pullback_bars(107.0))]);
        let evaluator = SignalEvaluator::new(policy(&["SPY"], false), NativeIndicators);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert_eq!(outcome.decisions["SPY"].reason, DecisionReason::StopLoss);
        assert_eq!(outcome.allocation.get("SPY"), Some(0.0));
    }

    #[test]
    fn zero_volume_bar_holds() {
        let mut bars = pullback_bars(108.7);
        bars.last_mut().unwrap().volume = 0;
        let steps = timeline(&[("SPY", bars)]);
        let evaluator = SignalEvaluator::new(policy(&["SPY"], false), NativeIndicators);

        let outcome = evaluator.evaluate(&steps, &Holdings::new().with("SPY", 0.10));
        assert!(matches!(
            outcome.decisions["SPY"].reason,
            DecisionReason::Hold(SignalError::IndicatorComputation { .. })
        ));
        assert_eq!(outcome.allocation.get("SPY"), Some(0.10));
    }
}
