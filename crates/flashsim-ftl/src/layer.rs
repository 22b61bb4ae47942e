//! Host-facing translation layer interface

use flashsim_common::{Event, Result, StatsSnapshot, Status};

/// Entry points a simulation driver calls for each host request
///
/// Each call fully resolves the request, including any merge it triggers,
/// before returning. The returned status is that of the final physical
/// operation; internal work shows up only as latency on the event and in
/// the statistics counters.
pub trait TranslationLayer {
    /// Resolve and issue a page read
    fn read(&mut self, event: &mut Event) -> Result<Status>;

    /// Place and issue a page write
    fn write(&mut self, event: &mut Event) -> Result<Status>;

    /// Discard a page
    fn trim(&mut self, event: &mut Event) -> Result<Status>;

    /// Current statistics counters
    fn stats(&self) -> StatsSnapshot;
}
