//! Async driver for the carousel state machine.
//!
//! One tokio task owns the [`Carousel`] and an event channel; the poll timer,
//! the rotation timers and every in-flight fetch are separate tasks that only
//! ever send [`Event`]s. All state mutation is therefore serialized through
//! `Carousel::apply`, and each applied event publishes a fresh
//! [`DisplayState`] on a watch channel for the renderer to pick up.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use carousel_core::{
    Carousel, DisplayState, Event, FetchError, Part, StationRecord, TimerDirective, Timing,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Fetches the current set of stations and their tray assignment.
#[async_trait]
pub trait StationSource: Send + Sync + 'static {
    async fn poll_stations(&self) -> Result<Vec<StationRecord>, FetchError>;
}

/// Fetches the ordered list of parts currently in a tray. An unknown tray is
/// a valid empty result, not an error.
#[async_trait]
pub trait PartsSource: Send + Sync + 'static {
    async fn fetch_parts(&self, tray_id: &str) -> Result<Vec<Part>, FetchError>;
}

/// Asks a running [`Engine`] to stop.
#[derive(Clone)]
pub struct ShutdownHandle(watch::Sender<bool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.0.send(true);
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerClass {
    Station,
    Part,
}

pub struct Engine {
    carousel: Carousel,
    timing: Timing,
    stations: Arc<dyn StationSource>,
    parts: Arc<dyn PartsSource>,
    events_tx: mpsc::Sender<Event>,
    events_rx: Option<mpsc::Receiver<Event>>,
    display_tx: watch::Sender<DisplayState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    station_timer: Option<JoinHandle<()>>,
    part_timer: Option<JoinHandle<()>>,
    /// Trays with a part fetch already in flight; the core may request the
    /// same tray on every tick, the driver dedupes.
    in_flight_trays: HashSet<String>,
    next_seq: u64,
}

impl Engine {
    pub fn new(timing: Timing, stations: Arc<dyn StationSource>, parts: Arc<dyn PartsSource>) -> Self {
        let carousel = Carousel::new(timing);
        let (events_tx, events_rx) = mpsc::channel(32);
        let (display_tx, _) = watch::channel(carousel.display());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Engine {
            carousel,
            timing,
            stations,
            parts,
            events_tx,
            events_rx: Some(events_rx),
            display_tx,
            shutdown_tx,
            shutdown_rx,
            station_timer: None,
            part_timer: None,
            in_flight_trays: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Subscribe to the display states the engine emits. The receiver starts
    /// at the current state and observes every later transition.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display_tx.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Run until shut down. The poll timer fires in every phase so a failed
    /// engine recovers as soon as the remote answers again.
    pub async fn run(mut self) {
        let Some(mut events_rx) = self.events_rx.take() else {
            return;
        };
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut poll = tokio::time::interval(self.timing.station_poll);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(timing = ?self.timing, "carousel engine started");
        loop {
            tokio::select! {
                _ = poll.tick() => self.spawn_station_poll(),
                event = events_rx.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("carousel engine shutting down");
                        break;
                    }
                }
            }
        }
        self.stop_timer(TimerClass::Station);
        self.stop_timer(TimerClass::Part);
    }

    fn handle(&mut self, event: Event) {
        if let Event::PartsReceived { tray_id, .. } = &event {
            self.in_flight_trays.remove(tray_id);
        }

        let effects = self.carousel.apply(event);
        if let Some(tray_id) = effects.fetch_parts {
            self.spawn_parts_fetch(tray_id);
        }
        self.apply_timer(TimerClass::Station, effects.station_timer);
        self.apply_timer(TimerClass::Part, effects.part_timer);
        self.display_tx.send_replace(effects.display);
    }

    /// Fire-and-forget station poll. Overlapping polls are tolerated: the
    /// sequence number stamped here lets the core discard a stale response
    /// that arrives after a newer one was applied.
    fn spawn_station_poll(&mut self) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let source = Arc::clone(&self.stations);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = source.poll_stations().await;
            let _ = tx.send(Event::SnapshotReceived { seq, result }).await;
        });
    }

    fn spawn_parts_fetch(&mut self, tray_id: String) {
        if !self.in_flight_trays.insert(tray_id.clone()) {
            return;
        }
        let source = Arc::clone(&self.parts);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_parts(&tray_id).await;
            let _ = tx.send(Event::PartsReceived { tray_id, result }).await;
        });
    }

    /// Replace or cancel the owned handle of one timer class. A `Restart`
    /// always aborts the old task first, so no timer outlives the context
    /// that sized it.
    fn apply_timer(&mut self, class: TimerClass, directive: TimerDirective) {
        match directive {
            TimerDirective::Keep => {}
            TimerDirective::Stop => self.stop_timer(class),
            TimerDirective::Restart(period) => {
                self.stop_timer(class);
                let tx = self.events_tx.clone();
                let handle = tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // The first tick of an interval completes immediately.
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        let event = match class {
                            TimerClass::Station => Event::StationTimerFired,
                            TimerClass::Part => Event::PartTimerFired,
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                });
                match class {
                    TimerClass::Station => self.station_timer = Some(handle),
                    TimerClass::Part => self.part_timer = Some(handle),
                }
            }
        }
    }

    fn stop_timer(&mut self, class: TimerClass) {
        let slot = match class {
            TimerClass::Station => &mut self.station_timer,
            TimerClass::Part => &mut self.part_timer,
        };
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}
