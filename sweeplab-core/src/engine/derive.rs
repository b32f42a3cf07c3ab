//! Signal column → lookahead-safe position column.
//!
//! Rules:
//! - Warm-up `W` is the largest leading-`NaN` count over the frame's indicator
//!   columns. Markers inside the warm-up are discarded.
//! - The position on day `t` is the most recent marker strictly before `t`,
//!   forward-filled. A marker computed from day `T`'s close therefore first
//!   affects day `T + 1`.
//! - Days before the first usable marker takes effect are unknown (`None`),
//!   never flat.

use crate::domain::{IndicatorFrame, Position, PositionSeries, SignalMarker, SignalVocabulary};

use super::EngineError;

/// Reject frames whose signal column mixes point and level markers.
pub fn check_vocabulary(
    signal: &[Option<SignalMarker>],
) -> Result<Option<SignalVocabulary>, EngineError> {
    let mut seen: Option<SignalVocabulary> = None;
    for (index, marker) in signal.iter().enumerate() {
        let Some(marker) = marker else { continue };
        let vocab = marker.vocabulary();
        match seen {
            None => seen = Some(vocab),
            Some(v) if v != vocab => {
                return Err(EngineError::MixedVocabulary { index });
            }
            Some(_) => {}
        }
    }
    Ok(seen)
}

/// Derive the per-day position series from an indicator frame.
pub fn derive_positions(frame: &IndicatorFrame) -> Result<PositionSeries, EngineError> {
    check_vocabulary(&frame.signal)?;

    let n = frame.len();
    let warmup = frame.warmup().min(n);
    let mut positions: PositionSeries = vec![None; n];
    let mut held: Option<Position> = None;

    for t in warmup..n {
        positions[t] = held;
        if let Some(marker) = frame.signal[t] {
            held = Some(marker.implied_position());
        }
    }

    Ok(positions)
}

/// First day whose position is known, i.e. `max(W, F + 1)` where `F` is the
/// first marker at or after the warm-up. `None` when no usable marker exists.
pub fn resolved_from(frame: &IndicatorFrame) -> Option<usize> {
    let warmup = frame.warmup();
    frame
        .signal
        .iter()
        .enumerate()
        .skip(warmup)
        .find(|(_, m)| m.is_some())
        .map(|(first, _)| first + 1)
        .filter(|&cutoff| cutoff < frame.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IndicatorColumn;
    use proptest::prelude::*;

    use SignalMarker::*;

    fn frame(warmup: usize, signal: Vec<Option<SignalMarker>>) -> IndicatorFrame {
        let n = signal.len();
        let values = (0..n)
            .map(|i| if i < warmup { f64::NAN } else { i as f64 })
            .collect();
        IndicatorFrame::new(vec![IndicatorColumn::new("ind", values)], signal)
    }

    #[test]
    fn positions_lag_markers_by_one_day() {
        let f = frame(0, vec![Some(Buy), None, Some(Sell), None, None]);
        let p = derive_positions(&f).unwrap();
        assert_eq!(
            p,
            vec![
                None,
                Some(Position::Invested),
                Some(Position::Invested),
                Some(Position::Flat),
                Some(Position::Flat),
            ]
        );
    }

    #[test]
    fn warmup_days_are_unknown_and_markers_discarded() {
        // Marker at index 1 lies inside the warm-up and is ignored.
        let f = frame(3, vec![None, Some(Buy), None, None, Some(Sell), None, None]);
        let p = derive_positions(&f).unwrap();
        assert_eq!(&p[..5], &[None, None, None, None, None]);
        assert_eq!(p[5], Some(Position::Flat));
        assert_eq!(p[6], Some(Position::Flat));
        assert_eq!(resolved_from(&f), Some(5));
    }

    #[test]
    fn level_markers_forward_fill() {
        let f = frame(
            1,
            vec![None, Some(Bullish), Some(Bullish), None, Some(Bearish), None],
        );
        let p = derive_positions(&f).unwrap();
        assert_eq!(
            p,
            vec![
                None,
                None,
                Some(Position::Invested),
                Some(Position::Invested),
                Some(Position::Invested),
                Some(Position::Flat),
            ]
        );
    }

    #[test]
    fn no_markers_means_all_unknown() {
        let f = frame(2, vec![None; 6]);
        let p = derive_positions(&f).unwrap();
        assert!(p.iter().all(Option::is_none));
        assert_eq!(resolved_from(&f), None);
    }

    #[test]
    fn marker_on_last_day_never_takes_effect() {
        let f = frame(0, vec![None, None, Some(Buy)]);
        assert!(derive_positions(&f).unwrap().iter().all(Option::is_none));
        assert_eq!(resolved_from(&f), None);
    }

    #[test]
    fn mixed_vocabulary_is_rejected() {
        let f = frame(0, vec![Some(Buy), None, Some(Bearish)]);
        let err = derive_positions(&f).unwrap_err();
        assert!(matches!(err, EngineError::MixedVocabulary { index: 2 }));
    }

    fn arb_marker() -> impl Strategy<Value = Option<SignalMarker>> {
        prop_oneof![
            4 => Just(None),
            1 => Just(Some(Buy)),
            1 => Just(Some(Sell)),
        ]
    }

    proptest! {
        #[test]
        fn cutoff_separates_unknown_from_known(
            signal in prop::collection::vec(arb_marker(), 1..120),
            warmup in 0usize..40,
        ) {
            let f = frame(warmup, signal.clone());
            let p = derive_positions(&f).unwrap();
            let n = signal.len();
            let w = warmup.min(n);
            let first = (w..n).find(|&i| signal[i].is_some());
            let cutoff = first.map(|f| (f + 1).max(w)).unwrap_or(n);

            for (t, pos) in p.iter().enumerate() {
                if t < cutoff {
                    prop_assert!(pos.is_none(), "day {} before cutoff {} is known", t, cutoff);
                } else {
                    prop_assert!(pos.is_some(), "day {} after cutoff {} is unknown", t, cutoff);
                }
            }
        }

        #[test]
        fn position_equals_most_recent_prior_marker(
            signal in prop::collection::vec(arb_marker(), 1..120),
            warmup in 0usize..40,
        ) {
            let f = frame(warmup, signal.clone());
            let p = derive_positions(&f).unwrap();
            let w = warmup.min(signal.len());
            for t in 0..signal.len() {
                let expected = (w..t)
                    .rev()
                    .find_map(|i| signal[i])
                    .map(|m| m.implied_position());
                let expected = if t < w { None } else { expected };
                prop_assert_eq!(p[t], expected);
            }
        }
    }
}
