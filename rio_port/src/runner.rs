//! Cyclic read/write loop around one [`Port`].
//!
//! The runner is the minimal real-time driver: read, hold commands, write,
//! sleep for the rest of the cycle. Control logic lives elsewhere; this loop
//! only keeps boards refreshed and their watchdogs fed.

use crate::port::Port;
use rio_common::port::bus::Bus;
use rio_common::port::config::PortConfig;
use rio_common::port::error::PortError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Periodic driver for a configured port.
pub struct CycleRunner<B: Bus> {
    port: Port<B>,
    cycle_time: Duration,
    running: Arc<AtomicBool>,
    max_cycles: Option<u64>,
}

impl<B: Bus> CycleRunner<B> {
    /// Build a port on `bus` and apply `config` to it.
    ///
    /// # Errors
    /// Any configuration error from [`Port::configure`].
    pub fn new(bus: B, config: &PortConfig) -> Result<Self, PortError> {
        let mut port = Port::new(config.port_number, bus);
        port.configure(config)?;
        Ok(Self {
            port,
            cycle_time: Duration::from_micros(config.cycle_time_us as u64),
            running: Arc::new(AtomicBool::new(false)),
            max_cycles: None,
        })
    }

    /// Stop after `cycles` iterations instead of running until signalled.
    pub fn with_max_cycles(mut self, cycles: Option<u64>) -> Self {
        self.max_cycles = cycles;
        self
    }

    /// Shared flag; storing `false` stops the loop after the current cycle.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// The driven port.
    pub fn port(&self) -> &Port<B> {
        &self.port
    }

    /// Run until the running flag drops or the cycle limit is reached.
    /// Returns the number of completed cycles.
    pub fn run(&mut self) -> u64 {
        info!(
            "Starting port {} loop (cycle_time={}us, protocol={})",
            self.port.port_number(),
            self.cycle_time.as_micros(),
            self.port.protocol()
        );
        self.running.store(true, Ordering::SeqCst);

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let mut cycles = 0u64;
        while self.running.load(Ordering::SeqCst) {
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }
            let cycle_start = Instant::now();

            let read = self.port.read();
            let write = self.port.write();
            cycles += 1;

            let elapsed = cycle_start.elapsed();
            if elapsed > self.cycle_time {
                let violations = self.port.stats().timing_violations;
                if violations <= 10 || violations % 1000 == 0 {
                    warn!(
                        "Cycle {} overran: {}us (target {}us)",
                        cycles,
                        elapsed.as_micros(),
                        self.cycle_time.as_micros()
                    );
                }
            } else {
                std::thread::sleep(self.cycle_time - elapsed);
            }

            if !read.new_faults.is_empty() || !write.new_faults.is_empty() {
                warn!(
                    "Faulted boards: {:?}",
                    self.port.faulted_boards()
                );
            }

            if cycles % 1000 == 0 {
                let stats = self.port.stats();
                debug!(
                    "Port loop: {} cycles, read avg={}us max={}us, write avg={}us max={}us, violations={}",
                    cycles,
                    stats.avg_read_time_us(),
                    stats.max_read_time_us,
                    stats.avg_write_time_us(),
                    stats.max_write_time_us,
                    stats.timing_violations
                );
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            "Port {} loop stopped after {} cycles (violations: {})",
            self.port.port_number(),
            cycles,
            self.port.stats().timing_violations
        );
        cycles
    }
}

/// Whether the process runs under a real-time scheduling policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling process.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
