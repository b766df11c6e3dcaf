use super::SlotClock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use types::Slot;

/// A `SlotClock` backed by the operating system's wall clock.
#[derive(Clone)]
pub struct SystemTimeSlotClock {
    genesis_slot: Slot,
    genesis_duration: Duration,
    slot_duration: Duration,
}

impl SystemTimeSlotClock {
    fn now_duration(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

impl SlotClock for SystemTimeSlotClock {
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self {
        Self {
            genesis_slot,
            genesis_duration,
            slot_duration,
        }
    }

    fn now(&self) -> Option<Slot> {
        self.slot_of(self.duration_since_genesis()?)
    }

    fn duration_since_genesis(&self) -> Option<Duration> {
        self.now_duration().checked_sub(self.genesis_duration)
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
        Some(self.slot_duration * slots_until as u32 - self.millis_into_slot().unwrap_or_default())
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
