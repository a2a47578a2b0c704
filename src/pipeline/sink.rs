use crate::matcher::{MatchRecord, ResultDocument};
use crate::pipeline::PipelineError;

use chrono::Utc;
use log::{debug, error};

use std::io::Write;

/// Records per written part, matching the document-size limits of
/// common document stores.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A destination for result documents.
pub trait Sink {
    fn write(&mut self, document: &ResultDocument) -> Result<(), PipelineError>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, document: &ResultDocument) -> Result<(), PipelineError> {
        (**self).write(document)
    }
}

/// Writes each document as one line of JSON.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for JsonLinesSink<W> {
    fn write(&mut self, document: &ResultDocument) -> Result<(), PipelineError> {
        serde_json::to_writer(&mut self.writer, document)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        Ok(())
    }
}

/// Splits the records of a trace into parts of at most `chunk_size` records,
/// each written as its own document.
pub struct ChunkedSink<S> {
    inner: S,
    chunk_size: usize,
}

impl<S: Sink> ChunkedSink<S> {
    pub fn new(inner: S, chunk_size: usize) -> Self {
        ChunkedSink {
            inner,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Writes every part, even after a failure. Fails if any part failed.
    ///
    /// All parts of one call share a timestamp.
    pub fn write_records(
        &mut self,
        trace: &str,
        records: &[MatchRecord],
    ) -> Result<usize, PipelineError> {
        let timestamp_utc = Utc::now();

        // An empty trace is still written once, so that it is recorded
        let mut chunks = records.chunks(self.chunk_size).collect::<Vec<_>>();
        if chunks.is_empty() {
            chunks.push(&[]);
        }

        let parts = chunks.len();
        let mut failed = 0;

        for (position, chunk) in chunks.into_iter().enumerate() {
            let document = ResultDocument {
                timestamp_utc,
                trace: trace.to_string(),
                matched_data: chunk.to_vec(),
            };

            match self.inner.write(&document) {
                Ok(()) => debug!("Wrote part {}/{parts} of trace {trace}", position + 1),
                Err(err) => {
                    error!(
                        "Could not write part {}/{parts} of trace {trace}: {err}",
                        position + 1
                    );
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(PipelineError::Write {
                trace: trace.to_string(),
                failed,
                parts,
            });
        }

        Ok(parts)
    }
}
