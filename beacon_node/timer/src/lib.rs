//! Drives the beacon chain's notion of time: a single task that wakes roughly once a second,
//! translates wall-clock time to a slot via a `SlotClock`, and dispatches the three phases of a
//! slot (start, attestation-due, aggregation-due) to the chain in strict order.
//!
//! Ticks that land before genesis are dropped. A concurrent tick arriving while the previous one
//! is still being processed is also dropped -- slot-phase handling is idempotent and a dropped
//! tick is made up for by the next one, so this never stalls the clock.

use beacon_chain::BeaconChain;
use parking_lot::Mutex;
use slog::{debug, error, info, warn, Logger};
use std::sync::Arc;
use std::time::Duration;
use store::Store;
use task_executor::TaskExecutor;
use types::{Hash256, Slot};

/// How often the clock is polled. One second matches the coarsest slot-time precision this
/// engine cares about (sub-second skew is tolerated by the `maximum_gossip_clock_disparity`
/// guard on SlotClock's tolerant accessors, not by the tick loop itself).
const TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// A slot is tolerated to have drifted by at most one slot; any larger jump (a suspended process
/// resuming, e.g.) is treated as a resync rather than replayed tick-by-tick.
const MAX_DRIFT_SLOTS: u64 = 1;

fn attestation_due_offset(slot_duration: Duration) -> Duration {
    slot_duration / 3
}

fn aggregation_due_offset(slot_duration: Duration) -> Duration {
    slot_duration * 2 / 3
}

/// Tracks the highest slot each phase has already fired for, so a tick that repeats or arrives
/// out of order never re-emits a phase.
#[derive(Default)]
struct HighWaterMarks {
    start: Option<Slot>,
    attestation_due: Option<Slot>,
    aggregation_due: Option<Slot>,
}

pub trait TickObserver: Send + Sync {
    fn on_slot_start(&self, _slot: Slot) {}

    /// Carries the current head root and connected-peer count, as published alongside the
    /// attestation-due slot event.
    fn on_attestation_due(&self, _slot: Slot, _head_root: Hash256, _peer_count: usize) {}
    fn on_aggregation_due(&self, _slot: Slot) {}

    /// Connected-peer count, surfaced to `on_attestation_due`'s payload.
    fn peer_count(&self) -> usize {
        0
    }

    /// Whether the sync service reports active catch-up. While `true`, `Timer::on_tick` takes the
    /// sync branch: head selection and a sync-slot event only, no attestation/aggregate phases.
    fn is_syncing(&self) -> bool {
        false
    }

    /// Fired once per slot boundary crossed while `is_syncing` is true, in place of the normal
    /// phase emissions.
    fn on_sync_slot(&self, _slot: Slot) {}
}

/// Drives `chain`'s clock by polling `slot_clock` and advancing `chain`/`observer` in lock step.
pub struct Timer<S, C> {
    chain: Arc<BeaconChain<S>>,
    slot_clock: C,
    observer: Arc<dyn TickObserver>,
    marks: Mutex<HighWaterMarks>,
    log: Logger,
}

impl<S, C> Timer<S, C>
where
    S: Store + Send + Sync + 'static,
    C: slot_clock::SlotClock + Send + Sync + 'static,
{
    pub fn new(
        chain: Arc<BeaconChain<S>>,
        slot_clock: C,
        observer: Arc<dyn TickObserver>,
        log: Logger,
    ) -> Self {
        Self {
            chain,
            slot_clock,
            observer,
            marks: Mutex::new(HighWaterMarks::default()),
            log,
        }
    }

    /// Spawns the tick loop on `executor`. Returns immediately; the loop runs until `executor`'s
    /// shutdown signal fires.
    pub fn spawn(self: Arc<Self>, executor: &TaskExecutor) {
        let timer = self;
        executor.spawn(
            async move {
                let mut interval = tokio::time::interval(TICK_INTERVAL);
                loop {
                    interval.tick().await;
                    timer.on_tick();
                }
            },
            "timer",
        );
    }

    /// A single wakeup: drops pre-genesis and over-drift ticks, otherwise advances the chain's
    /// head and fires whichever slot phases have newly become due.
    fn on_tick(&self) {
        let calculated_slot = match self.slot_clock.now() {
            Some(slot) => slot,
            None => {
                debug!(self.log, "Pre-genesis tick, dropping");
                return;
            }
        };

        let previous = self.previous_observed_slot();
        if let Some(expected) = previous {
            if calculated_slot.as_u64().saturating_sub(expected.as_u64()) > MAX_DRIFT_SLOTS {
                warn!(
                    self.log,
                    "Clock drift exceeds tolerance, resyncing";
                    "expected" => expected.as_u64(),
                    "calculated" => calculated_slot.as_u64()
                );
            }
        }

        if previous < Some(calculated_slot) && self.observer.is_syncing() {
            self.emit_sync_slot(calculated_slot);
            return;
        }

        self.emit_start(calculated_slot);
        self.emit_attestation_due(calculated_slot);
        self.emit_aggregation_due(calculated_slot);
    }

    fn previous_observed_slot(&self) -> Option<Slot> {
        self.marks.lock().start
    }

    /// The sync branch: head selection and a sync-slot notification only, suppressing the
    /// attestation/aggregate phases while catch-up is active.
    fn emit_sync_slot(&self, slot: Slot) {
        match self.chain.get_head(slot) {
            Ok(head) => self.chain.log_head(head, slot),
            Err(e) => error!(self.log, "Head computation failed"; "error" => format!("{:?}", e)),
        }

        self.marks.lock().start = Some(slot);
        self.observer.on_sync_slot(slot);
        info!(self.log, "Sync slot"; "slot" => slot.as_u64());
    }

    fn emit_start(&self, slot: Slot) {
        let mut marks = self.marks.lock();
        if marks.start >= Some(slot) {
            return;
        }
        marks.start = Some(slot);
        drop(marks);

        match self.chain.on_slot(slot) {
            Ok(()) => {}
            Err(e) => error!(self.log, "Slot advance failed"; "error" => format!("{:?}", e)),
        }

        match self.chain.get_head(slot) {
            Ok(head) => self.chain.log_head(head, slot),
            Err(e) => error!(self.log, "Head computation failed"; "error" => format!("{:?}", e)),
        }

        self.observer.on_slot_start(slot);
        info!(self.log, "Slot start"; "slot" => slot.as_u64());
    }

    fn emit_attestation_due(&self, slot: Slot) {
        let due = match self.slot_clock.millis_into_slot() {
            Some(elapsed) => elapsed >= attestation_due_offset(self.slot_clock.slot_duration()),
            None => return,
        };
        if !due {
            return;
        }

        let mut marks = self.marks.lock();
        if marks.attestation_due >= Some(slot) {
            return;
        }
        marks.attestation_due = Some(slot);
        drop(marks);

        let head_root = match self.chain.get_head(slot) {
            Ok(head) => {
                self.chain.log_head(head, slot);
                head
            }
            Err(e) => {
                error!(self.log, "Head computation failed"; "error" => format!("{:?}", e));
                Hash256::zero()
            }
        };

        self.observer
            .on_attestation_due(slot, head_root, self.observer.peer_count());
    }

    fn emit_aggregation_due(&self, slot: Slot) {
        let due = match self.slot_clock.millis_into_slot() {
            Some(elapsed) => elapsed >= aggregation_due_offset(self.slot_clock.slot_duration()),
            None => return,
        };
        if !due {
            return;
        }

        let mut marks = self.marks.lock();
        if marks.aggregation_due >= Some(slot) {
            return;
        }
        marks.aggregation_due = Some(slot);
        drop(marks);

        self.observer.on_aggregation_due(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_chain::{BeaconChain, BeaconChainBuilder};
    use slot_clock::{ManualSlotClock, SlotClock};
    use std::sync::Mutex as StdMutex;
    use store::MemoryStore;
    use types::ChainSpec;

    #[test]
    fn offsets_are_ordered() {
        let slot_duration = Duration::from_secs(12);
        assert!(attestation_due_offset(slot_duration) < aggregation_due_offset(slot_duration));
        assert!(aggregation_due_offset(slot_duration) < slot_duration);
    }

    #[derive(Default)]
    struct RecordingObserver {
        starts: StdMutex<Vec<Slot>>,
        attestations_due: StdMutex<Vec<Slot>>,
        aggregations_due: StdMutex<Vec<Slot>>,
        sync_slots: StdMutex<Vec<Slot>>,
        syncing: std::sync::atomic::AtomicBool,
    }

    impl TickObserver for RecordingObserver {
        fn on_slot_start(&self, slot: Slot) {
            self.starts.lock().unwrap().push(slot);
        }
        fn on_attestation_due(&self, slot: Slot, _head_root: Hash256, _peer_count: usize) {
            self.attestations_due.lock().unwrap().push(slot);
        }
        fn on_aggregation_due(&self, slot: Slot) {
            self.aggregations_due.lock().unwrap().push(slot);
        }
        fn is_syncing(&self) -> bool {
            self.syncing.load(std::sync::atomic::Ordering::SeqCst)
        }
        fn on_sync_slot(&self, slot: Slot) {
            self.sync_slots.lock().unwrap().push(slot);
        }
    }

    fn test_chain() -> Arc<BeaconChain<MemoryStore>> {
        let log = slog::Logger::root(slog::Discard, slog::o!());
        let store = Arc::new(MemoryStore::default());
        let chain = BeaconChainBuilder::quick_start(1000, ChainSpec::mainnet(), log.clone())
            .build(store)
            .expect("genesis build always succeeds");
        Arc::new(chain)
    }

    fn test_timer(
        clock: ManualSlotClock,
        observer: Arc<RecordingObserver>,
    ) -> Timer<MemoryStore, ManualSlotClock> {
        Timer::new(
            test_chain(),
            clock,
            observer,
            slog::Logger::root(slog::Discard, slog::o!()),
        )
    }

    // Scenario S1: a tick still sitting exactly at genesis starts slot 0 and nothing else --
    // the attestation/aggregation offsets (1/3, 2/3 of the slot) haven't elapsed yet.
    #[test]
    fn s1_genesis_tick_starts_slot_zero_only() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        let observer = Arc::new(RecordingObserver::default());
        let timer = test_timer(clock, observer.clone());
        timer.on_tick();
        assert_eq!(*observer.starts.lock().unwrap(), vec![Slot::new(0)]);
        assert!(observer.attestations_due.lock().unwrap().is_empty());
        assert!(observer.aggregations_due.lock().unwrap().is_empty());
    }

    // Scenario S2: ticking through a slot's three phase boundaries fires each phase once, in
    // order, and never re-fires a phase already marked for that slot.
    #[test]
    fn s2_phases_fire_once_in_order_per_slot() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        let observer = Arc::new(RecordingObserver::default());
        let timer = test_timer(clock.clone(), observer.clone());

        clock.set_current_time(Duration::from_secs(12));
        timer.on_tick();
        assert_eq!(*observer.starts.lock().unwrap(), vec![Slot::new(1)]);
        assert!(observer.attestations_due.lock().unwrap().is_empty());

        clock.set_current_time(Duration::from_secs(16));
        timer.on_tick();
        assert_eq!(*observer.attestations_due.lock().unwrap(), vec![Slot::new(1)]);
        assert!(observer.aggregations_due.lock().unwrap().is_empty());

        clock.set_current_time(Duration::from_secs(20));
        timer.on_tick();
        assert_eq!(*observer.aggregations_due.lock().unwrap(), vec![Slot::new(1)]);

        // A repeated tick at the same slot must not re-fire any phase.
        timer.on_tick();
        assert_eq!(observer.starts.lock().unwrap().len(), 1);
        assert_eq!(observer.attestations_due.lock().unwrap().len(), 1);
        assert_eq!(observer.aggregations_due.lock().unwrap().len(), 1);
    }

    // Scenario S3: a large forward jump in wall-clock time is tolerated (no panic, no replay of
    // every intermediate slot) and simply resumes phase dispatch at the newly observed slot.
    #[test]
    fn s3_drift_recovers_to_latest_slot() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        let observer = Arc::new(RecordingObserver::default());
        let timer = test_timer(clock.clone(), observer.clone());

        clock.set_slot(Slot::new(5));
        timer.on_tick();
        assert_eq!(*observer.starts.lock().unwrap(), vec![Slot::new(5)]);

        clock.set_slot(Slot::new(20));
        timer.on_tick();
        assert_eq!(
            *observer.starts.lock().unwrap(),
            vec![Slot::new(5), Slot::new(20)]
        );
    }

    // Scenario S6: while the sync service reports active catch-up, crossing a slot boundary only
    // runs head selection and publishes a sync-slot event -- no attestation/aggregate phases.
    #[test]
    fn s6_sync_branch_suppresses_attestation_and_aggregation() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        let observer = Arc::new(RecordingObserver::default());
        observer.syncing.store(true, std::sync::atomic::Ordering::SeqCst);
        let timer = test_timer(clock.clone(), observer.clone());

        // The genesis tick has no prior observed slot, so it still takes the normal start path.
        timer.on_tick();
        assert_eq!(*observer.starts.lock().unwrap(), vec![Slot::new(0)]);

        clock.set_current_time(Duration::from_secs(20));
        timer.on_tick();

        assert_eq!(*observer.sync_slots.lock().unwrap(), vec![Slot::new(1)]);
        assert!(observer.attestations_due.lock().unwrap().is_empty());
        assert!(observer.aggregations_due.lock().unwrap().is_empty());
        // `on_slot_start` is not re-invoked for the synced slot -- only the sync-slot path ran.
        assert_eq!(*observer.starts.lock().unwrap(), vec![Slot::new(0)]);
    }
}
