//! Engine - Command loop with CPU pinning and warm-up.
//!
//! Wraps the matching engine with an event buffer so every command
//! yields the events it caused. With the `runtime` feature the engine
//! can also be driven from rtrb ring buffers.

use tracing::{info, warn};

use crate::command::{Command, Side};
use crate::config::BookConfig;
use crate::error::BookError;
use crate::events::BookEvent;
use crate::matching::MatchingEngine;

/// The engine that processes commands and collects their events.
pub struct Engine {
    /// The underlying matching engine, buffering events between commands
    pub matcher: MatchingEngine<Vec<BookEvent>>,
    /// Events the run loop could not push because the output ring was full
    dropped_events: u64,
}

impl Engine {
    /// Create an engine with `tick_levels` price levels per side.
    ///
    /// # Panics
    /// Panics if `tick_levels` is 0 or `u32::MAX`.
    pub fn new(tick_levels: u32) -> Self {
        match Self::with_config(BookConfig::new(tick_levels)) {
            Ok(engine) => engine,
            Err(err) => panic!("invalid engine config: {err}"),
        }
    }

    /// Create an engine from a validated config
    pub fn with_config(config: BookConfig) -> Result<Self, BookError> {
        Ok(Self {
            matcher: MatchingEngine::with_sink(config, Vec::new())?,
            dropped_events: 0,
        })
    }

    /// Run the engine event loop.
    ///
    /// # Arguments
    /// * `input` - Consumer end of the command ring buffer
    /// * `output` - Producer end of the output event ring buffer
    /// * `pin_to_core` - Whether to pin to the last available CPU core
    ///
    /// Returns once the command producer is dropped and the ring is drained.
    /// A failing command still forwards the events it produced before the
    /// error is returned.
    #[cfg(feature = "runtime")]
    pub fn run(
        &mut self,
        input: &mut rtrb::Consumer<Command>,
        output: &mut rtrb::Producer<BookEvent>,
        pin_to_core: bool,
    ) -> Result<(), BookError> {
        if pin_to_core {
            self.pin_to_core();
        }

        self.warm_up();
        info!(tick_levels = self.matcher.tick_levels(), "engine loop started");

        loop {
            while let Ok(cmd) = input.pop() {
                match self.process_command(cmd) {
                    Ok(events) => self.forward(output, events),
                    Err(err) => {
                        let pending = self.take_events();
                        self.forward(output, pending);
                        return Err(err);
                    }
                }
            }
            if input.is_abandoned() && input.is_empty() {
                info!("command producer gone, engine loop stopping");
                return Ok(());
            }
            std::hint::spin_loop();
        }
    }

    /// Push events to the output ring, counting the ones that do not fit.
    #[cfg(feature = "runtime")]
    fn forward(&mut self, output: &mut rtrb::Producer<BookEvent>, events: Vec<BookEvent>) {
        for event in events {
            if let Err(rtrb::PushError::Full(event)) = output.push(event) {
                self.dropped_events += 1;
                warn!(
                    ?event,
                    dropped = self.dropped_events,
                    "output ring full, book event dropped"
                );
            }
        }
    }

    /// Process a single command and return the events it produced.
    ///
    /// This is the main entry point for synchronous usage (testing, benchmarks).
    /// On `Err` the events produced before the fault stay buffered; collect
    /// them with [`Engine::take_events`].
    #[inline]
    pub fn process_command(&mut self, cmd: Command) -> Result<Vec<BookEvent>, BookError> {
        match cmd {
            Command::Add(order) => self.matcher.add(order).map(drop)?,
            Command::Match => self.matcher.match_orders().map(drop)?,
        }
        Ok(self.take_events())
    }

    /// Drain the events buffered since the last command returned.
    #[inline]
    pub fn take_events(&mut self) -> Vec<BookEvent> {
        std::mem::take(self.matcher.sink_mut())
    }

    /// Events the run loop dropped because the output ring was full
    #[inline]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    /// Pin the current thread to the last available CPU core.
    ///
    /// The last core is typically isolated from OS interrupts.
    pub fn pin_to_core(&self) {
        let Some(core) = core_affinity::get_core_ids().and_then(|ids| ids.last().copied()) else {
            warn!("no core ids available, engine thread not pinned");
            return;
        };
        if core_affinity::set_for_current(core) {
            info!(core = core.id, "engine thread pinned");
        } else {
            warn!(core = core.id, "failed to pin engine thread");
        }
    }

    /// Warm up the engine by pre-faulting memory pages.
    pub fn warm_up(&mut self) {
        self.matcher.warm_up();
    }

    #[inline]
    pub fn best_bid(&self) -> Option<u32> {
        self.matcher.best_bid()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<u32> {
        self.matcher.best_ask()
    }

    #[inline]
    pub fn spread(&self) -> Option<u32> {
        self.matcher.spread()
    }

    /// Total resting orders on both sides
    #[inline]
    pub fn order_count(&self) -> usize {
        self.matcher.order_count(Side::Bid) + self.matcher.order_count(Side::Ask)
    }

    /// Compute state hash for determinism testing.
    #[inline]
    pub fn state_hash(&self) -> u64 {
        self.matcher.state_hash()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TICK_LEVELS)
    }
}
