use crate::network::GpsPoint;
use crate::pipeline::PipelineError;

use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use std::collections::VecDeque;
use std::io::{BufRead, Read};

pub type DeliveryId = u64;

/// The trace of an event which does not name one.
pub const DEFAULT_TRACE: &str = "default";

fn default_trace() -> String {
    DEFAULT_TRACE.to_string()
}

/// One observation as delivered by the upstream source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub lat: f64,
    pub lon: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default = "default_trace")]
    pub trace: String,
}

impl Event {
    pub fn observation(&self) -> GpsPoint {
        GpsPoint {
            lat: self.lat,
            lon: self.lon,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub id: DeliveryId,

    /// Zero on first delivery, incremented on each redelivery.
    pub redelivery: usize,
    pub event: Event,
}

/// An at-least-once source of observations.
///
/// Every received delivery must be settled by exactly one call to
/// [`Source::acknowledge`] or [`Source::negative_acknowledge`]. A negatively
/// acknowledged delivery is received again, up to the source's redelivery limit.
pub trait Source {
    /// The next delivery, or `None` once the source is exhausted.
    fn receive(&mut self) -> Result<Option<Delivery>, PipelineError>;

    fn acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError>;

    fn negative_acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError>;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn receive(&mut self) -> Result<Option<Delivery>, PipelineError> {
        (**self).receive()
    }

    fn acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        (**self).acknowledge(id)
    }

    fn negative_acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        (**self).negative_acknowledge(id)
    }
}

/// Tracks in-flight deliveries and schedules redeliveries.
#[derive(Debug, Default)]
struct Inflight {
    next_id: DeliveryId,
    pending: FxHashMap<DeliveryId, Delivery>,
    redeliver: VecDeque<Delivery>,
    max_redeliveries: usize,
}

impl Inflight {
    fn new(max_redeliveries: usize) -> Self {
        Inflight {
            max_redeliveries,
            ..Inflight::default()
        }
    }

    fn deliver(&mut self, event: Event) -> Delivery {
        let delivery = Delivery {
            id: self.next_id,
            redelivery: 0,
            event,
        };

        self.next_id += 1;
        self.pending.insert(delivery.id, delivery.clone());
        delivery
    }

    fn redelivered(&mut self) -> Option<Delivery> {
        let delivery = self.redeliver.pop_front()?;
        self.pending.insert(delivery.id, delivery.clone());
        Some(delivery)
    }

    fn acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        self.pending
            .remove(&id)
            .map(|_| ())
            .ok_or(PipelineError::UnknownDelivery(id))
    }

    fn negative_acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        let mut delivery = self
            .pending
            .remove(&id)
            .ok_or(PipelineError::UnknownDelivery(id))?;

        if delivery.redelivery >= self.max_redeliveries {
            error!(
                "Dropping delivery {id} of trace {} after {} redelivery(s)",
                delivery.event.trace, delivery.redelivery
            );
            return Ok(());
        }

        delivery.redelivery += 1;
        debug!("Scheduling redelivery {} of {id}", delivery.redelivery);
        self.redeliver.push_back(delivery);
        Ok(())
    }
}

/// Observations from a single JSON array document.
pub struct JsonArraySource {
    events: VecDeque<Event>,
    inflight: Inflight,
}

impl JsonArraySource {
    pub fn from_reader(reader: impl Read, max_redeliveries: usize) -> Result<Self, PipelineError> {
        let events: VecDeque<Event> = serde_json::from_reader(reader)?;
        debug!("Read {} observation(s)", events.len());

        Ok(JsonArraySource {
            events,
            inflight: Inflight::new(max_redeliveries),
        })
    }
}

impl Source for JsonArraySource {
    fn receive(&mut self) -> Result<Option<Delivery>, PipelineError> {
        if let Some(delivery) = self.inflight.redelivered() {
            return Ok(Some(delivery));
        }

        Ok(self.events.pop_front().map(|event| self.inflight.deliver(event)))
    }

    fn acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        self.inflight.acknowledge(id)
    }

    fn negative_acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        self.inflight.negative_acknowledge(id)
    }
}

/// Observations from a stream of one JSON document per line.
///
/// Blank lines are ignored. A line which cannot be decoded can never be
/// matched, so it is logged and dropped rather than redelivered.
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    buffer: String,
    inflight: Inflight,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, max_redeliveries: usize) -> Self {
        JsonLinesSource {
            reader,
            line: 0,
            buffer: String::new(),
            inflight: Inflight::new(max_redeliveries),
        }
    }

    fn next_event(&mut self) -> Result<Option<Event>, PipelineError> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }

            self.line += 1;
            let text = self.buffer.trim();
            if text.is_empty() {
                continue;
            }

            match serde_json::from_str::<Event>(text) {
                Ok(event) => return Ok(Some(event)),
                Err(err) => warn!("Dropping undecodable line {}: {err}", self.line),
            }
        }
    }
}

impl<R: BufRead> Source for JsonLinesSource<R> {
    fn receive(&mut self) -> Result<Option<Delivery>, PipelineError> {
        if let Some(delivery) = self.inflight.redelivered() {
            return Ok(Some(delivery));
        }

        Ok(self.next_event()?.map(|event| self.inflight.deliver(event)))
    }

    fn acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        self.inflight.acknowledge(id)
    }

    fn negative_acknowledge(&mut self, id: DeliveryId) -> Result<(), PipelineError> {
        self.inflight.negative_acknowledge(id)
    }
}
