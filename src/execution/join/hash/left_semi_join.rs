use super::{JoinEmission, ScanControl};
use crate::types::tuple::Tuple;

/// LEFT SEMI: each left row appears at most once, with left columns only.
/// With the left side streamed the first match emits and stops the bucket
/// scan. With the left side stored, emission waits for the sweep so that
/// a stored row probed by several streamed rows still comes out once.
pub(crate) struct LeftSemiJoinEmission {
    pub(crate) stored_is_left: bool,
}

impl JoinEmission for LeftSemiJoinEmission {
    fn on_match(&self, streamed: &Tuple, _stored: &Tuple, out: &mut Vec<Tuple>) -> ScanControl {
        if self.stored_is_left {
            ScanControl::Continue
        } else {
            out.push(streamed.clone());
            ScanControl::Stop
        }
    }

    fn on_probe_end(&self, _streamed: &Tuple, _matched: bool, _out: &mut Vec<Tuple>) {}

    fn needs_sweep(&self) -> bool {
        self.stored_is_left
    }

    fn on_sweep(&self, stored: &Tuple, was_matched: bool, out: &mut Vec<Tuple>) {
        if was_matched {
            out.push(stored.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::DataValue;

    #[test]
    fn test_streamed_left_emits_once_and_stops() {
        let emission = LeftSemiJoinEmission {
            stored_is_left: false,
        };
        let streamed = Tuple::new(vec![DataValue::Int64(1)]);
        let stored = Tuple::new(vec![DataValue::Int64(2)]);
        let mut out = Vec::new();

        assert_eq!(
            emission.on_match(&streamed, &stored, &mut out),
            ScanControl::Stop
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].values, vec![DataValue::Int64(1)]);
        assert!(!emission.needs_sweep());
    }

    #[test]
    fn test_stored_left_emits_matched_in_sweep() {
        let emission = LeftSemiJoinEmission {
            stored_is_left: true,
        };
        let streamed = Tuple::new(vec![DataValue::Int64(1)]);
        let stored = Tuple::new(vec![DataValue::Int64(2)]);
        let mut out = Vec::new();

        // matches only mark; the sweep emits
        assert_eq!(
            emission.on_match(&streamed, &stored, &mut out),
            ScanControl::Continue
        );
        assert!(out.is_empty());

        assert!(emission.needs_sweep());
        emission.on_sweep(&stored, true, &mut out);
        emission.on_sweep(&stored, false, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].values, vec![DataValue::Int64(2)]);
    }
}
