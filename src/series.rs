//! Time-bucketed sample storage powering interpolation queries.
//!
//! Samples are partitioned into fixed-width buckets starting at time 0, so
//! a bracketing lookup touches at most one bucket plus its immediate
//! neighbours regardless of how many samples the series holds.

use crate::types::Timestamped;

/// Default bucket width in stream time units.
pub const DEFAULT_GRANULARITY: f64 = 1000.0;

#[derive(Debug, Clone)]
struct Bucket<T> {
    start: f64,
    data: Vec<T>,
}

/// Ordered store for one connection's continuous-channel samples.
///
/// Samples must be pushed in non-decreasing timestamp order, which is what
/// the protocol guarantees for a single connection's channel. Bucket `i`
/// covers `[i*G, (i+1)*G)`; the chain is contiguous and gap-free from
/// bucket 0 to the last bucket written.
#[derive(Debug, Clone)]
pub struct SampleSeries<T> {
    granularity: f64,
    buckets: Vec<Bucket<T>>,
}

impl<T: Timestamped> SampleSeries<T> {
    pub fn new() -> Self {
        Self::with_granularity(DEFAULT_GRANULARITY)
    }

    pub fn with_granularity(granularity: f64) -> Self {
        assert!(
            granularity.is_finite() && granularity > 0.0,
            "bucket granularity must be positive"
        );
        Self {
            granularity,
            buckets: vec![Bucket {
                start: 0.0,
                data: Vec::new(),
            }],
        }
    }

    pub fn granularity(&self) -> f64 {
        self.granularity
    }

    /// Append a sample, extending the bucket chain as needed to cover its
    /// timestamp.
    pub fn push(&mut self, sample: T) {
        let ts = sample.timestamp();
        while !self.covers(ts) {
            let start = self.buckets.last().map_or(0.0, |b| b.start) + self.granularity;
            self.buckets.push(Bucket {
                start,
                data: Vec::new(),
            });
        }
        let idx = self.bucket_index(ts).min(self.buckets.len() - 1);
        self.buckets[idx].data.push(sample);
    }

    /// Return the pair of samples bracketing `ts`.
    ///
    /// Absent when `ts` is negative, when its bucket was never written, or
    /// when no sample exists on one side of `ts`. The "before" sample is
    /// borrowed from the previous bucket's last element and the "after"
    /// sample from the next bucket's first element when `ts` falls on a
    /// bucket edge; a written-but-empty covering bucket yields absent.
    pub fn bracket(&self, ts: f64) -> Option<(&T, &T)> {
        if !(ts >= 0.0) {
            return None;
        }
        let idx = self.bucket_index(ts);
        let bucket = self.buckets.get(idx)?;
        if bucket.data.is_empty() {
            return None;
        }

        let end = bucket
            .data
            .iter()
            .position(|s| s.timestamp() >= ts)
            .unwrap_or(bucket.data.len());

        if end == 0 {
            let before = idx
                .checked_sub(1)
                .and_then(|prev| self.buckets.get(prev))
                .and_then(|prev| prev.data.last())?;
            Some((before, &bucket.data[0]))
        } else if end == bucket.data.len() {
            let after = self.buckets.get(idx + 1).and_then(|next| next.data.first())?;
            Some((&bucket.data[end - 1], after))
        } else {
            Some((&bucket.data[end - 1], &bucket.data[end]))
        }
    }

    /// Iterate all samples in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buckets.iter().flat_map(|bucket| bucket.data.iter())
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.data.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.data.is_empty())
    }

    fn covers(&self, ts: f64) -> bool {
        match self.buckets.last() {
            Some(bucket) => ts < bucket.start + self.granularity,
            None => false,
        }
    }

    fn bucket_index(&self, ts: f64) -> usize {
        (ts / self.granularity) as usize
    }
}

impl<T: Timestamped> Default for SampleSeries<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PingSample;

    fn series(timestamps: &[f64]) -> SampleSeries<PingSample> {
        let mut series = SampleSeries::new();
        for &ts in timestamps {
            series.push(PingSample {
                timestamp: ts,
                ping: ts,
            });
        }
        series
    }

    #[test]
    fn bracket_returns_adjacent_samples() {
        let series = series(&[0.0, 250.0, 500.0, 750.0, 1250.0, 1500.0]);
        for probe in [10.0, 260.0, 600.0, 800.0, 1300.0] {
            let (a, b) = series.bracket(probe).expect("bracket in range");
            assert!(a.timestamp <= probe);
            assert!(b.timestamp >= probe);
            // b is the direct successor of a in iteration order
            let all: Vec<f64> = series.iter().map(|s| s.timestamp).collect();
            let pos = all.iter().position(|&t| t == a.timestamp).unwrap();
            assert_eq!(all[pos + 1], b.timestamp);
        }
    }

    #[test]
    fn bracket_absent_out_of_range() {
        let series = series(&[100.0, 200.0]);
        assert!(series.bracket(-1.0).is_none());
        assert!(series.bracket(50.0).is_none(), "no sample strictly before");
        assert!(series.bracket(201.0).is_none(), "no sample after the last");
        assert!(series.bracket(5000.0).is_none(), "bucket never written");
        assert!(series.bracket(f64::NAN).is_none());
    }

    #[test]
    fn bracket_borrows_from_adjacent_buckets() {
        let series = series(&[900.0, 1100.0]);
        // probe in the second bucket, before its first sample
        let (a, b) = series.bracket(1000.0).expect("bracket across edge");
        assert_eq!((a.timestamp, b.timestamp), (900.0, 1100.0));
        // probe in the first bucket, after its last sample
        let (a, b) = series.bracket(950.0).expect("bracket across edge");
        assert_eq!((a.timestamp, b.timestamp), (900.0, 1100.0));
    }

    #[test]
    fn bracket_absent_in_empty_gap_bucket() {
        // Bucket 1 exists (the chain is gap-free) but holds no samples.
        let series = series(&[100.0, 2500.0]);
        assert!(series.bracket(1500.0).is_none());
    }

    #[test]
    fn bracket_cost_is_bucket_local() {
        // A probe only inspects its own bucket and its direct neighbours,
        // so a distant pair never brackets across a populated chain.
        let series = series(&[100.0, 150.0, 4100.0]);
        let (a, b) = series.bracket(120.0).expect("bracket inside bucket");
        assert_eq!((a.timestamp, b.timestamp), (100.0, 150.0));
        assert!(series.bracket(2100.0).is_none());
    }

    #[test]
    fn iteration_is_ordered_and_restartable() {
        let series = series(&[0.0, 999.0, 1000.0, 2500.0]);
        let first: Vec<f64> = series.iter().map(|s| s.timestamp).collect();
        let second: Vec<f64> = series.iter().map(|s| s.timestamp).collect();
        assert_eq!(first, vec![0.0, 999.0, 1000.0, 2500.0]);
        assert_eq!(first, second);
        assert_eq!(series.len(), 4);
        assert!(!series.is_empty());
    }

    #[test]
    fn custom_granularity_changes_bucket_edges() {
        let mut series = SampleSeries::with_granularity(100.0);
        series.push(PingSample {
            timestamp: 90.0,
            ping: 1.0,
        });
        series.push(PingSample {
            timestamp: 110.0,
            ping: 2.0,
        });
        let (a, b) = series.bracket(100.0).expect("bracket across 100ms edge");
        assert_eq!((a.timestamp, b.timestamp), (90.0, 110.0));
    }

    #[test]
    fn empty_series_has_no_brackets() {
        let series: SampleSeries<PingSample> = SampleSeries::new();
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
        assert!(series.bracket(0.0).is_none());
    }
}
