//! Interval set algebra over discrete gameplay events.
//!
//! A filter is an ordered vector of closed time spans, each carrying the
//! event projections that produced it. Filters are built once from a
//! connection's event list and then combined read-only, so a sorted vector
//! with binary-search overlap lookup serves as the interval structure.

use smallvec::{SmallVec, smallvec};

use crate::types::Timestamped;

/// Payload list attached to one span. Nearly always a single element.
pub type Payload<P> = SmallVec<[P; 2]>;

/// Offsets applied around a matched event's timestamp, and whether spans
/// that touch or overlap coalesce into one.
///
/// Offsets must be non-negative; the default is a zero-width span per
/// event with no merging.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OffsetPolicy {
    pub before: f64,
    pub after: f64,
    pub merge_overlap: bool,
}

impl OffsetPolicy {
    /// Spans of `[ts - before, ts + after]`, kept separate.
    pub fn window(before: f64, after: f64) -> Self {
        assert!(
            before >= 0.0 && after >= 0.0,
            "interval offsets must be non-negative"
        );
        Self {
            before,
            after,
            merge_overlap: false,
        }
    }

    /// Spans of `[ts - before, ts + after]`, coalescing when they touch or
    /// overlap.
    pub fn merged(before: f64, after: f64) -> Self {
        Self {
            merge_overlap: true,
            ..Self::window(before, after)
        }
    }
}

/// One closed time span `[lo, hi]` with its payload list.
#[derive(Debug, Clone)]
pub struct Span<P> {
    pub lo: f64,
    pub hi: f64,
    pub payload: Payload<P>,
}

impl<P> Span<P> {
    /// Inclusive-range overlap test.
    pub fn overlaps<Q>(&self, other: &Span<Q>) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

/// A set of time spans derived from predicate-matching discrete events.
///
/// Spans are ordered by start; both span starts and span ends are
/// non-decreasing, which the overlap search relies on.
#[derive(Debug, Clone)]
pub struct IntervalFilter<P> {
    spans: Vec<Span<P>>,
}

impl<P> Default for IntervalFilter<P> {
    fn default() -> Self {
        Self { spans: Vec::new() }
    }
}

impl<P> IntervalFilter<P> {
    /// Scan an ordered event list, projecting each event through
    /// `predicate` and widening matches by `policy`.
    ///
    /// With `merge_overlap`, a span starting at or before the previous
    /// span's end extends it instead, appending its projection to the
    /// payload in arrival order.
    pub fn build<'a, E, I, F>(events: I, policy: OffsetPolicy, mut predicate: F) -> Self
    where
        E: Timestamped + 'a,
        I: IntoIterator<Item = &'a E>,
        F: FnMut(&E) -> Option<P>,
    {
        let mut spans: Vec<Span<P>> = Vec::new();
        for event in events {
            let Some(projection) = predicate(event) else {
                continue;
            };
            let ts = event.timestamp();
            let (lo, hi) = (ts - policy.before, ts + policy.after);
            if policy.merge_overlap
                && let Some(last) = spans.last_mut()
                && lo <= last.hi
            {
                last.hi = last.hi.max(hi);
                last.payload.push(projection);
                continue;
            }
            spans.push(Span {
                lo,
                hi,
                payload: smallvec![projection],
            });
        }
        Self { spans }
    }

    pub fn spans(&self) -> &[Span<P>] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Retain spans overlapping at least one span of `other`, keeping each
    /// retained span's own payload.
    pub fn intersect<Q>(&self, other: &IntervalFilter<Q>) -> IntervalFilter<P>
    where
        P: Clone,
    {
        self.intersect_with(other, |_, _: &Span<Q>| {})
    }

    /// Retain spans overlapping at least one span of `other`, folding each
    /// overlapping span of `other` into the retained payload via `merger`.
    pub fn intersect_with<Q, F>(&self, other: &IntervalFilter<Q>, mut merger: F) -> IntervalFilter<P>
    where
        P: Clone,
        F: FnMut(&mut Payload<P>, &Span<Q>),
    {
        let mut spans = Vec::new();
        for span in &self.spans {
            let overlapping = other.overlapping(span);
            if overlapping.is_empty() {
                continue;
            }
            let mut payload = span.payload.clone();
            for secondary in overlapping {
                merger(&mut payload, secondary);
            }
            spans.push(Span {
                lo: span.lo,
                hi: span.hi,
                payload,
            });
        }
        IntervalFilter { spans }
    }

    /// Retain spans overlapping none of `other`'s spans. The exact
    /// complement of [`IntervalFilter::intersect`] for fixed inputs.
    pub fn subtract<Q>(&self, other: &IntervalFilter<Q>) -> IntervalFilter<P>
    where
        P: Clone,
    {
        IntervalFilter {
            spans: self
                .spans
                .iter()
                .filter(|span| other.overlapping(span).is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Fold over the filter with the default resolution of one tick per
    /// time unit.
    pub fn fold<A, F>(&self, seed: A, step: F) -> A
    where
        F: FnMut(A, f64, &[P]) -> A,
    {
        self.fold_resolution(seed, 1.0, step)
    }

    /// Fold `step(acc, tick, payload)` over every tick of every span in
    /// ascending start order, from `lo` to `hi` inclusive, stepping by
    /// `resolution`. Only span-covered ticks are visited; nothing dense is
    /// materialized over the match duration.
    pub fn fold_resolution<A, F>(&self, seed: A, resolution: f64, mut step: F) -> A
    where
        F: FnMut(A, f64, &[P]) -> A,
    {
        assert!(
            resolution.is_finite() && resolution > 0.0,
            "fold resolution must be positive"
        );
        let mut acc = seed;
        for span in &self.spans {
            let mut tick = span.lo;
            while tick <= span.hi {
                acc = step(acc, tick, &span.payload);
                tick += resolution;
            }
        }
        acc
    }

    /// Spans of `self` overlapping `probe`, located by binary search on the
    /// ordered span vector.
    fn overlapping<Q>(&self, probe: &Span<Q>) -> &[Span<P>] {
        let start = self.spans.partition_point(|span| span.hi < probe.lo);
        let end = self.spans.partition_point(|span| span.lo <= probe.hi);
        if start < end {
            &self.spans[start..end]
        } else {
            &self.spans[..0]
        }
    }
}
