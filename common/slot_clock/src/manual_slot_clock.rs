use super::SlotClock;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use types::Slot;

/// A `SlotClock` whose "current time" is set explicitly rather than read from the OS clock.
/// Used by tests that need deterministic control over slot transitions.
#[derive(Clone)]
pub struct ManualSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    slot_duration: Duration,
    current_time: Arc<RwLock<Duration>>,
}

impl ManualSlotClock {
    pub fn set_current_time(&self, duration_since_genesis: Duration) {
        *self.current_time.write() = duration_since_genesis;
    }

    pub fn set_slot(&self, slot: Slot) {
        let slots_since_genesis = slot.as_u64().saturating_sub(self.genesis_slot.as_u64());
        self.set_current_time(self.slot_duration * slots_since_genesis as u32);
    }

    pub fn advance_slot(&self) {
        let slot = self.now().unwrap_or(self.genesis_slot);
        self.set_slot(slot + 1);
    }
}

impl SlotClock for ManualSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        Self {
            genesis_slot,
            genesis_duration,
            slot_duration,
            current_time: Arc::new(RwLock::new(Duration::from_secs(0))),
        }
    }

    fn now(&self) -> Option<Slot> {
        self.slot_of(self.duration_since_genesis()?)
    }

    fn duration_since_genesis(&self) -> Option<Duration> {
        Some(*self.current_time.read())
    }

    fn slot_of(&self, since_genesis: Duration) -> Option<Slot> {
        let slots_since_genesis = since_genesis.as_millis() / self.slot_duration.as_millis();
        Some(self.genesis_slot + slots_since_genesis as u64)
    }

    fn duration_to_next_slot(&self) -> Option<Duration> {
        let since_genesis = self.duration_since_genesis()?;
        let slot_duration_millis = self.slot_duration.as_millis();
        let millis_into_slot = since_genesis.as_millis() % slot_duration_millis;
        Some(Duration::from_millis(
            (slot_duration_millis - millis_into_slot) as u64,
        ))
    }

    fn duration_to_slot(&self, slot: Slot) -> Option<Duration> {
        let now = self.now()?;
        if slot <= now {
            return Some(Duration::from_secs(0));
        }
        let slots_until = slot - now;
        Some(self.slot_duration * slots_until as u32)
    }

    fn slot_duration(&self) -> Duration {
        self.slot_duration
    }

    fn genesis_duration(&self) -> Duration {
        self.genesis_duration
    }

    fn genesis_slot(&self) -> Slot {
        self.genesis_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_one_slot_at_a_time() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        assert_eq!(clock.now(), Some(Slot::new(0)));
        clock.advance_slot();
        assert_eq!(clock.now(), Some(Slot::new(1)));
        clock.advance_slot();
        assert_eq!(clock.now(), Some(Slot::new(2)));
    }

    #[test]
    fn duration_to_next_slot_counts_down() {
        let clock = ManualSlotClock::new(Slot::new(0), Duration::from_secs(0), Duration::from_secs(12));
        clock.set_current_time(Duration::from_secs(5));
        assert_eq!(clock.duration_to_next_slot(), Some(Duration::from_secs(7)));
    }
}
