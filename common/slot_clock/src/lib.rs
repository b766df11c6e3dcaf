mod manual_slot_clock;
mod system_time_slot_clock;

pub use manual_slot_clock::ManualSlotClock;
pub use system_time_slot_clock::SystemTimeSlotClock;

use std::time::Duration;
use types::Slot;

/// Translates wall-clock time to/from `Slot`s. Implementors are responsible for the epoch
/// ("genesis") the clock counts from and for `seconds_per_slot`.
pub trait SlotClock: Send + Sync + Sized + Clone {
    /// Creates a new clock counting slots from `genesis_slot` at `genesis_duration` (time since
    /// the unix epoch), advancing one slot every `slot_duration`.
    fn new(genesis_slot: Slot, genesis_duration: Duration, slot_duration: Duration) -> Self;

    /// The current slot, or `None` if the clock has not yet reached genesis.
    fn now(&self) -> Option<Slot>;

    /// `now()`, tolerant of clocks running up to `future_tolerance` fast and `past_tolerance`
    /// slow -- used when accepting gossip whose sender's clock may disagree slightly with ours.
    fn now_with_future_tolerance(&self, future_tolerance: Duration) -> Option<Slot> {
        self.slot_of(self.duration_since_genesis()?.saturating_sub(future_tolerance))
    }

    fn now_with_past_tolerance(&self, past_tolerance: Duration) -> Option<Slot> {
        self.slot_of(self.duration_since_genesis()? + past_tolerance)
    }

    /// Elapsed time since genesis, or `None` if genesis is in the future.
    fn duration_since_genesis(&self) -> Option<Duration>;

    /// The slot containing the given duration-since-genesis.
    fn slot_of(&self, since_genesis: Duration) -> Option<Slot>;

    /// How far into the current slot we are, or `None` pre-genesis.
    fn millis_into_slot(&self) -> Option<Duration> {
        let since_genesis = self.duration_since_genesis()?;
        let slot_duration = self.slot_duration();
        let slots_since_genesis = since_genesis.as_millis() / slot_duration.as_millis();
        Some(Duration::from_millis(
            (since_genesis.as_millis() - slots_since_genesis * slot_duration.as_millis()) as u64,
        ))
    }

    /// Time remaining until the start of the next slot, or `None` pre-genesis.
    fn duration_to_next_slot(&self) -> Option<Duration>;

    /// Time remaining until the start of `slot`. Negative durations (i.e. `slot` already passed)
    /// are reported as `Duration::from_secs(0)`.
    fn duration_to_slot(&self, slot: Slot) -> Option<Duration>;

    fn slot_duration(&self) -> Duration;

    fn genesis_duration(&self) -> Duration;

    fn genesis_slot(&self) -> Slot;
}
