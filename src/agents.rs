//! Producer/consumer simulation over a [`BoundedBuffer`].
//!
//! Every process record becomes a producer thread that sleeps through its
//! arrival and burst delays and then puts its pid into the buffer. A single
//! consumer thread takes a fixed number of items. The consumer quota does
//! not depend on the producer count, so a run can end with items left in
//! the buffer. Once one side has exited for good, waits on the other side
//! that could never be satisfied end as "stranded" instead of hanging.
//!
//! Progress is reported live as [`BufferEvent`]s on a crossbeam channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam::channel::Sender;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::{BoundedBuffer, DEFAULT_CAPACITY};
use crate::process::ProcessRecord;
use crate::sync::{Cancelled, Shutdown};
use crate::types::{Pid, TimeUnits};

/// Items the consumer takes before it stops.
pub const DEFAULT_CONSUMER_QUOTA: usize = 3;

/// Pause between two takes, in logical units.
pub const DEFAULT_CONSUME_INTERVAL_UNITS: f64 = 1.5;

/// Identity of the single consumer.
pub const CONSUMER_ID: u32 = 1;

/// Tunables for a producer/consumer run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub capacity: usize,
    pub consumer_quota: usize,
    pub consume_interval_units: f64,
    /// Wall-clock length of one logical time unit.
    pub time_unit: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            capacity: DEFAULT_CAPACITY,
            consumer_quota: DEFAULT_CONSUMER_QUOTA,
            consume_interval_units: DEFAULT_CONSUME_INTERVAL_UNITS,
            time_unit: Duration::from_secs(1),
        }
    }
}

impl SimulationConfig {
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder {
            config: SimulationConfig::default(),
        }
    }

    fn units(&self, n: TimeUnits) -> Duration {
        self.time_unit.saturating_mul(n.min(u32::MAX as u64) as u32)
    }

    fn consume_interval(&self) -> Duration {
        self.time_unit.mul_f64(self.consume_interval_units)
    }
}

/// Builder for [`SimulationConfig`].
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn consumer_quota(mut self, quota: usize) -> Self {
        self.config.consumer_quota = quota;
        self
    }

    pub fn consume_interval_units(mut self, units: f64) -> Self {
        self.config.consume_interval_units = units;
        self
    }

    pub fn time_unit(mut self, unit: Duration) -> Self {
        self.config.time_unit = unit;
        self
    }

    pub fn time_unit_ms(self, ms: u64) -> Self {
        self.time_unit(Duration::from_millis(ms))
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<SimulationConfig> {
        let interval = self.config.consume_interval_units;
        if self.config.capacity == 0 {
            bail!("buffer capacity must be positive");
        }
        if !interval.is_finite() || interval < 0.0 {
            bail!("invalid consume interval {interval}: must be finite and not negative");
        }
        // Duration::mul_f64 panics on overflow.
        if Duration::try_from_secs_f64(self.config.time_unit.as_secs_f64() * interval).is_err() {
            bail!("consume interval of {interval} units is too long");
        }
        Ok(self.config)
    }
}

/// A unit of concurrent work in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    Producer(Pid),
    Consumer(u32),
}

/// Live progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BufferEvent {
    /// A producer finished its arrival delay.
    Arrived { pid: Pid, arrival_time: TimeUnits },
    /// A producer finished its burst and is about to wait for a slot.
    WaitingToProduce { pid: Pid },
    /// A producer's item is in the buffer.
    Produced { pid: Pid, item: i32 },
    /// A producer is done.
    Finished { pid: Pid, burst_time: TimeUnits },
    /// The consumer is about to wait for an item.
    WaitingToConsume { consumer: u32 },
    /// The consumer removed an item.
    Consumed { consumer: u32, item: i32 },
    /// A unit stopped early because of shutdown.
    Interrupted { unit: Unit },
    /// A unit gave up because nobody is left on the other side.
    Stranded { unit: Unit },
}

/// Optional live event sink. A dropped receiver is ignored.
#[derive(Clone, Default)]
struct EventSink(Option<Sender<BufferEvent>>);

impl EventSink {
    fn emit(&self, event: BufferEvent) {
        debug!(?event, "event");
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}

/// One process acting as a producer.
#[derive(Debug, Clone)]
pub struct Producer {
    pub pid: Pid,
    pub arrival_time: TimeUnits,
    pub burst_time: TimeUnits,
}

impl From<&ProcessRecord> for Producer {
    fn from(p: &ProcessRecord) -> Self {
        Producer {
            pid: p.pid,
            arrival_time: p.arrival_time,
            burst_time: p.burst_time,
        }
    }
}

impl Producer {
    /// Sleep through arrival and burst, then put the pid exactly once.
    fn run(
        &self,
        config: &SimulationConfig,
        buffer: &BoundedBuffer,
        shutdown: &Shutdown,
        events: &EventSink,
    ) -> Result<i32, Cancelled> {
        shutdown.sleep(config.units(self.arrival_time))?;
        events.emit(BufferEvent::Arrived {
            pid: self.pid,
            arrival_time: self.arrival_time,
        });

        shutdown.sleep(config.units(self.burst_time))?;
        events.emit(BufferEvent::WaitingToProduce { pid: self.pid });

        let item = self.pid.0;
        buffer.put_with(item, |item| {
            events.emit(BufferEvent::Produced {
                pid: self.pid,
                item,
            })
        })?;
        events.emit(BufferEvent::Finished {
            pid: self.pid,
            burst_time: self.burst_time,
        });
        Ok(item)
    }
}

/// The single consumer: a bounded number of takes with a pause in between.
#[derive(Debug, Clone)]
pub struct Consumer {
    pub id: u32,
    pub quota: usize,
    pub interval: Duration,
}

impl Consumer {
    /// Take up to `quota` items. On cancellation, returns what was taken so
    /// far together with the error.
    ///
    /// The pause comes between takes only, so the consumer returns right
    /// after its last take. The orchestrator calls
    /// [`BoundedBuffer::consumers_finished`] as soon as this returns; from
    /// then on producers blocked on a full buffer give up as stranded.
    fn run(
        &self,
        buffer: &BoundedBuffer,
        shutdown: &Shutdown,
        events: &EventSink,
    ) -> (Vec<i32>, Result<(), Cancelled>) {
        let mut taken = Vec::with_capacity(self.quota);
        for i in 0..self.quota {
            if i > 0 {
                if let Err(e) = shutdown.sleep(self.interval) {
                    return (taken, Err(e));
                }
            }
            events.emit(BufferEvent::WaitingToConsume { consumer: self.id });
            let consumed = buffer.take_with(|item| {
                events.emit(BufferEvent::Consumed {
                    consumer: self.id,
                    item,
                })
            });
            match consumed {
                Ok(item) => taken.push(item),
                Err(e) => return (taken, Err(e)),
            }
        }
        (taken, Ok(()))
    }
}

/// Summary of a finished producer/consumer run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationOutcome {
    /// Items successfully put, in producer join order.
    pub produced: Vec<i32>,
    /// Items the consumer took, in take order.
    pub consumed: Vec<i32>,
    /// Items still in the buffer when every thread had exited.
    pub leftover: Vec<i32>,
    /// Units that stopped early because of shutdown.
    pub interrupted: Vec<Unit>,
    /// Units that could never finish because the other side had exited.
    pub stranded: Vec<Unit>,
    /// Whether shutdown was requested during the run.
    pub cancelled: bool,
}

impl SimulationOutcome {
    pub fn completed_normally(&self) -> bool {
        !self.cancelled && self.interrupted.is_empty() && self.stranded.is_empty()
    }
}

/// Cloneable handle that cancels a running simulation from another thread
/// (for example a Ctrl-C handler).
#[derive(Clone)]
pub struct CancelHandle {
    buffer: Arc<BoundedBuffer>,
    shutdown: Shutdown,
}

impl CancelHandle {
    pub fn cancel(&self) {
        info!("cancelling producer/consumer simulation");
        self.shutdown.request();
        self.buffer.shutdown();
    }
}

/// Runs a closure when dropped, including during unwinding.
struct OnExit<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnExit<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

/// Orchestrates one producer/consumer run.
pub struct ProducerConsumer {
    config: SimulationConfig,
    buffer: Arc<BoundedBuffer>,
    shutdown: Shutdown,
}

impl ProducerConsumer {
    pub fn new(config: SimulationConfig) -> Self {
        let buffer = Arc::new(BoundedBuffer::new(config.capacity));
        ProducerConsumer {
            config,
            buffer,
            shutdown: Shutdown::new(),
        }
    }

    /// The shared buffer, for inspection.
    pub fn buffer(&self) -> &BoundedBuffer {
        &self.buffer
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            buffer: self.buffer.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    fn spawn_producer(
        &self,
        producer: Producer,
        live: &Arc<AtomicUsize>,
        sink: &EventSink,
    ) -> Result<JoinHandle<Result<i32, Cancelled>>> {
        let pid = producer.pid;
        let config = self.config.clone();
        let buffer = self.buffer.clone();
        let shutdown = self.shutdown.clone();
        let sink = sink.clone();
        let live = live.clone();
        thread::Builder::new()
            .name(format!("producer-{}", pid.0))
            .spawn(move || {
                // The last producer out tells the consumer not to wait for
                // items that will never come.
                let _exit = OnExit(|| {
                    if live.fetch_sub(1, Ordering::AcqRel) == 1 {
                        debug!("last producer exited");
                        buffer.producers_finished();
                    }
                });
                producer.run(&config, &buffer, &shutdown, &sink)
            })
            .with_context(|| format!("failed to spawn producer {}", pid.0))
    }

    fn spawn_consumer(
        &self,
        sink: &EventSink,
    ) -> Result<JoinHandle<(Vec<i32>, Result<(), Cancelled>)>> {
        let consumer = Consumer {
            id: CONSUMER_ID,
            quota: self.config.consumer_quota,
            interval: self.config.consume_interval(),
        };
        let buffer = self.buffer.clone();
        let shutdown = self.shutdown.clone();
        let sink = sink.clone();
        thread::Builder::new()
            .name(format!("consumer-{}", CONSUMER_ID))
            .spawn(move || {
                let _exit = OnExit(|| {
                    debug!("consumer exited");
                    buffer.consumers_finished();
                });
                consumer.run(&buffer, &shutdown, &sink)
            })
            .context("failed to spawn consumer")
    }

    /// Early exit of `unit`: interrupted if shutdown was requested,
    /// stranded otherwise.
    fn record_early_exit(&self, outcome: &mut SimulationOutcome, sink: &EventSink, unit: Unit) {
        if self.shutdown.is_requested() {
            warn!(?unit, "interrupted");
            sink.emit(BufferEvent::Interrupted { unit });
            outcome.interrupted.push(unit);
        } else {
            warn!(?unit, "stranded: the other side of the buffer has exited");
            sink.emit(BufferEvent::Stranded { unit });
            outcome.stranded.push(unit);
        }
    }

    /// Run one producer per record plus the consumer, and join them all.
    ///
    /// `events` receives live notifications; pass `None` to only log them.
    /// Returns an error if a thread could not be spawned or panicked.
    pub fn run(
        &self,
        records: &[ProcessRecord],
        events: Option<Sender<BufferEvent>>,
    ) -> Result<SimulationOutcome> {
        let sink = EventSink(events);
        info!(
            producers = records.len(),
            capacity = self.config.capacity,
            quota = self.config.consumer_quota,
            "starting producer/consumer simulation"
        );

        let live = Arc::new(AtomicUsize::new(records.len()));
        if records.is_empty() {
            self.buffer.producers_finished();
        }

        let mut producers = Vec::with_capacity(records.len());
        let mut spawn_err = None;
        for rec in records {
            match self.spawn_producer(Producer::from(rec), &live, &sink) {
                Ok(jh) => producers.push((rec.pid, jh)),
                Err(e) => {
                    spawn_err = Some(e);
                    break;
                }
            }
        }

        let consumer_jh = if spawn_err.is_none() {
            match self.spawn_consumer(&sink) {
                Ok(jh) => Some(jh),
                Err(e) => {
                    spawn_err = Some(e);
                    None
                }
            }
        } else {
            None
        };

        if spawn_err.is_some() {
            // Release whatever did start before joining it.
            self.cancel();
        }

        let mut outcome = SimulationOutcome::default();
        let mut panicked = Vec::new();

        for (pid, jh) in producers {
            match jh.join() {
                Ok(Ok(item)) => outcome.produced.push(item),
                Ok(Err(Cancelled)) => {
                    self.record_early_exit(&mut outcome, &sink, Unit::Producer(pid))
                }
                Err(_) => panicked.push(Unit::Producer(pid)),
            }
        }

        if let Some(jh) = consumer_jh {
            match jh.join() {
                Ok((taken, res)) => {
                    outcome.consumed = taken;
                    if res.is_err() {
                        self.record_early_exit(&mut outcome, &sink, Unit::Consumer(CONSUMER_ID));
                    }
                }
                Err(_) => panicked.push(Unit::Consumer(CONSUMER_ID)),
            }
        }

        if let Some(e) = spawn_err {
            return Err(e);
        }
        if !panicked.is_empty() {
            return Err(anyhow!("simulation threads panicked: {:?}", panicked));
        }

        outcome.leftover = self.buffer.snapshot();
        outcome.cancelled = self.shutdown.is_requested();
        info!(
            produced = outcome.produced.len(),
            consumed = outcome.consumed.len(),
            leftover = outcome.leftover.len(),
            interrupted = outcome.interrupted.len(),
            stranded = outcome.stranded.len(),
            "all producers and consumer completed"
        );
        Ok(outcome)
    }
}
