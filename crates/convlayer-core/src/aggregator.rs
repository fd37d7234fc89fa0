//! Result vectors and export tagging.
//!
//! Every evaluated window yields one result per engine. The aggregator packs
//! them into a [`ResultVector`] (index = engine index), stamps the output
//! position and the run's export flag, and counts vectors against the number
//! the active configuration promises.
//!
//! Persisting tagged vectors is not the core's business: anything that
//! implements [`ExportSink`] can receive them.

use std::fmt;

use tracing::trace;

/// Output grid coordinate of an evaluated window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowPosition {
    /// Output row
    pub row: usize,
    /// Output column
    pub col: usize,
}

impl fmt::Display for WindowPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One result per engine for one window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultVector {
    /// Results, indexed by engine
    pub values: Vec<i32>,
    /// Where the window sits in the output grid
    pub position: WindowPosition,
    /// Order within the run, from 0
    pub sequence: usize,
    /// Should be handed to the export sink
    pub export: bool,
}

impl ResultVector {
    /// Result of one engine.
    pub fn engine(&self, index: usize) -> Option<i32> {
        self.values.get(index).copied()
    }
}

/// Receiver of export-tagged result vectors.
pub trait ExportSink {
    /// Take one tagged vector.
    fn export(&mut self, vector: &ResultVector);
}

/// Export sink that keeps every vector in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    vectors: Vec<ResultVector>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Vectors received so far, in arrival order.
    pub fn vectors(&self) -> &[ResultVector] {
        &self.vectors
    }

    /// Consume the sink.
    pub fn into_vectors(self) -> Vec<ResultVector> {
        self.vectors
    }
}

impl ExportSink for MemorySink {
    fn export(&mut self, vector: &ResultVector) {
        self.vectors.push(vector.clone());
    }
}

/// Sink that drops everything; for runs that only inspect tick outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl ExportSink for DiscardSink {
    fn export(&mut self, _vector: &ResultVector) {}
}

/// Assembles per-engine results into tagged vectors.
#[derive(Debug, Clone, Default)]
pub struct OutputAggregator {
    current: ResultVector,
    engine_count: usize,
    expected: usize,
    emitted: usize,
    export: bool,
    fresh: bool,
}

impl OutputAggregator {
    /// Empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting a run of `expected` vectors from `engine_count`
    /// engines, all tagged with `export`.
    pub fn begin_run(&mut self, engine_count: usize, expected: usize, export: bool) {
        self.current.values.clear();
        self.current.values.reserve(engine_count);
        self.current.position = WindowPosition::default();
        self.current.sequence = 0;
        self.current.export = export;
        self.engine_count = engine_count;
        self.expected = expected;
        self.emitted = 0;
        self.export = export;
        self.fresh = false;
    }

    /// Pack one window's results.
    ///
    /// `results` must hold one value per engine, in engine order.
    pub fn collect(&mut self, position: WindowPosition, results: &[i32]) -> &ResultVector {
        debug_assert_eq!(results.len(), self.engine_count);
        self.current.values.clear();
        self.current.values.extend_from_slice(results);
        self.current.position = position;
        self.current.sequence = self.emitted;
        self.current.export = self.export;
        self.emitted += 1;
        self.fresh = true;
        trace!(
            "vector #{} at {position}: {:?}",
            self.current.sequence,
            self.current.values
        );
        &self.current
    }

    /// Hand out the vector collected this tick, at most once.
    pub fn take_fresh(&mut self) -> Option<ResultVector> {
        if self.fresh {
            self.fresh = false;
            Some(self.current.clone())
        } else {
            None
        }
    }

    /// Most recent vector, fresh or not.
    pub fn last(&self) -> Option<&ResultVector> {
        (self.emitted > 0).then_some(&self.current)
    }

    /// Vectors produced this run.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Vectors the run will produce.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// True once the final vector has been collected.
    pub fn is_complete(&self) -> bool {
        self.expected > 0 && self.emitted >= self.expected
    }

    /// Forget the current run.
    pub fn clear(&mut self) {
        self.begin_run(0, 0, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_stamps_sequence_and_tag() {
        let mut agg = OutputAggregator::new();
        agg.begin_run(2, 4, true);

        let v = agg.collect(WindowPosition { row: 0, col: 0 }, &[366, 460]).clone();
        assert_eq!(v.values, vec![366, 460]);
        assert_eq!(v.sequence, 0);
        assert!(v.export);

        let v = agg.collect(WindowPosition { row: 0, col: 1 }, &[411, 510]).clone();
        assert_eq!(v.sequence, 1);
        assert_eq!(v.engine(1), Some(510));
        assert_eq!(v.engine(2), None);
        assert_eq!(agg.emitted(), 2);
        assert!(!agg.is_complete());
    }

    #[test]
    fn fresh_vector_is_taken_once() {
        let mut agg = OutputAggregator::new();
        agg.begin_run(1, 1, false);
        assert!(agg.take_fresh().is_none());
        agg.collect(WindowPosition::default(), &[7]);
        assert_eq!(agg.take_fresh().map(|v| v.values), Some(vec![7]));
        assert!(agg.take_fresh().is_none());
        assert!(agg.is_complete());
        assert_eq!(agg.last().map(|v| v.sequence), Some(0));
    }

    #[test]
    fn clear_forgets_run() {
        let mut agg = OutputAggregator::new();
        agg.begin_run(1, 1, true);
        agg.collect(WindowPosition::default(), &[1]);
        agg.clear();
        assert_eq!(agg.emitted(), 0);
        assert!(!agg.is_complete());
        assert!(agg.last().is_none());
        assert!(agg.take_fresh().is_none());
    }

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        for sequence in 0..3 {
            sink.export(&ResultVector {
                sequence,
                ..ResultVector::default()
            });
        }
        let seqs: Vec<_> = sink.vectors().iter().map(|v| v.sequence).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }
}
