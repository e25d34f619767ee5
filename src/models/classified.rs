//! Classification result for a charging station.

use super::Site;

/// A charging station with its buffer membership.
///
/// Computed once from the full buffer set and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedStation {
    pub site: Site,

    /// True when at least one substation buffer contains the station
    pub within_buffer: bool,

    /// Ids of every substation whose buffer contains the station, in buffer order
    pub covering_substations: Vec<String>,
}

impl ClassifiedStation {
    pub fn new(site: Site, covering_substations: Vec<String>) -> Self {
        Self {
            site,
            within_buffer: !covering_substations.is_empty(),
            covering_substations,
        }
    }
}
