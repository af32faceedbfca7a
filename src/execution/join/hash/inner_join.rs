use super::{concat_rows, JoinEmission, ScanControl};
use crate::types::tuple::Tuple;

/// Emits one joined row per filtered match, nothing else.
pub(crate) struct InnerJoinEmission {
    pub(crate) stored_is_left: bool,
}

impl JoinEmission for InnerJoinEmission {
    fn on_match(&self, streamed: &Tuple, stored: &Tuple, out: &mut Vec<Tuple>) -> ScanControl {
        out.push(concat_rows(self.stored_is_left, streamed, stored));
        ScanControl::Continue
    }

    fn on_probe_end(&self, _streamed: &Tuple, _matched: bool, _out: &mut Vec<Tuple>) {}

    fn on_sweep(&self, _stored: &Tuple, _was_matched: bool, _out: &mut Vec<Tuple>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::DataValue;

    #[test]
    fn test_inner_emits_only_matches() {
        let emission = InnerJoinEmission {
            stored_is_left: false,
        };
        let streamed = Tuple::new(vec![DataValue::Int64(1)]);
        let stored = Tuple::new(vec![DataValue::Int64(2)]);
        let mut out = Vec::new();

        assert_eq!(
            emission.on_match(&streamed, &stored, &mut out),
            ScanControl::Continue
        );
        emission.on_probe_end(&streamed, false, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].values,
            vec![DataValue::Int64(1), DataValue::Int64(2)]
        );
        assert!(!emission.needs_sweep());
    }
}
