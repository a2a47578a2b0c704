//! A single source → matcher → sink loop.
//!
//! Deliveries are grouped into traces by their `trace` key and fed to one
//! [`TraceHandle`] per trace. Points are written through the
//! [`ChunkedSink`] as soon as enough of them have settled, and the
//! deliveries they cover are acknowledged. Whatever remains unsettled is
//! finished and written once the source is exhausted, or when it fails.
//!
//! A failed write negatively acknowledges the deliveries it covers, along
//! with every later delivery of that trace, and the trace restarts from
//! the redelivered observations.

pub mod error;
pub mod sink;
pub mod source;
#[cfg(test)]
mod test;

pub use error::PipelineError;
pub use sink::*;
pub use source::*;

use crate::matcher::{MapMatcher, MatchedPath, TraceHandle};
use crate::transition::{EmissionStrategy, MatchError, TransitionStrategy};

use indexmap::IndexMap;
use log::{error, info, warn};
#[cfg(feature = "tracing")]
use tracing::Level;

use std::collections::VecDeque;

/// Settled points of one trace which are written together, unless the
/// trace ends first.
pub const DEFAULT_FLUSH_RECORDS: usize = 100;

/// Counts of what one [`Pipeline::run`] processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Deliveries received, including redeliveries.
    pub deliveries: usize,

    /// Traces finished and written successfully.
    pub traces: usize,
    pub matched: usize,
    pub unmatched: usize,

    /// Writes which failed and were redelivered.
    pub failed_writes: usize,
}

#[derive(Default)]
struct OpenTrace {
    handle: TraceHandle,

    /// Deliveries not yet written, in observation order.
    deliveries: VecDeque<DeliveryId>,
    written: bool,
}

pub struct Pipeline<'m, 'n, Src, Snk, E, T>
where
    E: EmissionStrategy,
    T: TransitionStrategy,
{
    matcher: &'m MapMatcher<'n, E, T>,
    source: Src,
    sink: ChunkedSink<Snk>,
    flush_records: usize,
}

impl<'m, 'n, Src, Snk, E, T> Pipeline<'m, 'n, Src, Snk, E, T>
where
    Src: Source,
    Snk: Sink,
    E: EmissionStrategy,
    T: TransitionStrategy,
{
    pub fn new(matcher: &'m MapMatcher<'n, E, T>, source: Src, sink: ChunkedSink<Snk>) -> Self {
        Pipeline {
            matcher,
            source,
            sink,
            flush_records: DEFAULT_FLUSH_RECORDS,
        }
    }

    /// Writes the settled points of a trace once at least `records` of
    /// them are pending. A value of zero is treated as one.
    pub fn with_flush_records(mut self, records: usize) -> Self {
        self.flush_records = records.max(1);
        self
    }

    pub fn into_parts(self) -> (Src, ChunkedSink<Snk>) {
        (self.source, self.sink)
    }

    /// Runs until the source is exhausted and no redeliveries remain.
    ///
    /// Failed writes are not fatal. A corrupt trellis ends the run, as
    /// does a failing source, after every open trace has been written.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all))]
    pub fn run(&mut self) -> Result<PipelineSummary, PipelineError> {
        let mut summary = PipelineSummary::default();
        let mut traces: IndexMap<String, OpenTrace> = IndexMap::new();

        loop {
            let delivery = match self.source.receive() {
                Ok(Some(delivery)) => delivery,
                Ok(None) if traces.is_empty() => break,
                Ok(None) => {
                    info!("Source exhausted, flushing {} trace(s)", traces.len());
                    self.finish_all(&mut traces, &mut summary)?;
                    continue;
                }
                Err(err) => {
                    error!("Source failed, flushing {} trace(s): {err}", traces.len());
                    self.finish_all(&mut traces, &mut summary)?;
                    return Err(err);
                }
            };

            summary.deliveries += 1;

            let trace = delivery.event.trace.clone();
            let open = traces.entry(trace.clone()).or_default();
            open.deliveries.push_back(delivery.id);

            match self
                .matcher
                .match_point(&mut open.handle, delivery.event.observation())
            {
                Ok(_) => {}
                Err(err @ MatchError::InvalidObservation { .. }) => {
                    warn!("Trace {trace}: {err}");
                }
                Err(err) => return Err(err.into()),
            }

            if open.handle.settled().len() >= self.flush_records {
                self.flush_settled(&trace, &mut traces, &mut summary)?;
            }
        }

        info!(
            "Processed {} delivery(s) into {} trace(s), {} failed write(s)",
            summary.deliveries, summary.traces, summary.failed_writes
        );

        Ok(summary)
    }

    /// Writes the settled prefix of an open trace.
    fn flush_settled(
        &mut self,
        trace: &str,
        traces: &mut IndexMap<String, OpenTrace>,
        summary: &mut PipelineSummary,
    ) -> Result<(), PipelineError> {
        let Some(open) = traces.get_mut(trace) else {
            return Ok(());
        };

        let path = MatchedPath {
            points: open.handle.take_settled(),
            log_likelihood: 0.0,
        };

        // Settled points are a contiguous prefix, one per delivery
        let covered = path.len().min(open.deliveries.len());
        let deliveries = open.deliveries.drain(..covered).collect::<Vec<_>>();

        if self.write(trace, &path, &deliveries, summary)? {
            open.written = true;
            return Ok(());
        }

        // The rest of the trace follows on from the redelivered points
        if let Some(open) = traces.shift_remove(trace) {
            for id in open.deliveries {
                self.source.negative_acknowledge(id)?;
            }
        }

        Ok(())
    }

    fn finish_all(
        &mut self,
        traces: &mut IndexMap<String, OpenTrace>,
        summary: &mut PipelineSummary,
    ) -> Result<(), PipelineError> {
        for (trace, mut open) in traces.drain(..) {
            let path = self.matcher.finish(&mut open.handle)?;

            // Nothing was left over after the last flush
            if path.is_empty() && open.written {
                summary.traces += 1;
                continue;
            }

            let deliveries = Vec::from(open.deliveries);
            if self.write(&trace, &path, &deliveries, summary)? {
                summary.traces += 1;
            }
        }

        Ok(())
    }

    /// Writes the points of a trace, then settles the deliveries behind
    /// them. Returns whether the write succeeded.
    fn write(
        &mut self,
        trace: &str,
        path: &MatchedPath,
        deliveries: &[DeliveryId],
        summary: &mut PipelineSummary,
    ) -> Result<bool, PipelineError> {
        match self.sink.write_records(trace, &path.records()) {
            Ok(parts) => {
                info!(
                    "Wrote {} point(s) of trace {trace} ({} matched) in {parts} part(s)",
                    path.len(),
                    path.matched_count()
                );

                for id in deliveries {
                    self.source.acknowledge(*id)?;
                }

                summary.matched += path.matched_count();
                summary.unmatched += path.len() - path.matched_count();
                Ok(true)
            }
            Err(err) => {
                warn!("{err}, redelivering {} observation(s)", deliveries.len());

                for id in deliveries {
                    self.source.negative_acknowledge(*id)?;
                }

                summary.failed_writes += 1;
                Ok(false)
            }
        }
    }
}
