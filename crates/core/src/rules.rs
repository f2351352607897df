//! Network upgrade schedule.
//!
//! Upgrades are wall-clock activation timestamps fixed at node
//! configuration time. Each one gates a behavior change and is named by
//! what it changes, not when it shipped. An unset timestamp means the
//! upgrade never activates on this network.

use serde::Deserialize;
use thiserror::Error;

/// Activation timestamps (unix seconds) for the network's upgrades.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpgradeSchedule {
    /// From this time on, export-transaction inputs must be sorted and
    /// unique under the (address, asset, nonce) ordering.
    #[serde(default)]
    pub canonical_inputs_time: Option<u64>,
    /// From this time on, the export fee is `gas * base_fee` instead of the
    /// flat fee.
    #[serde(default)]
    pub dynamic_fee_time: Option<u64>,
    /// From this time on, transactions are push-gossiped to peers. Before
    /// it, all gossip entry points are no-ops.
    #[serde(default)]
    pub push_gossip_time: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("{later} activates at {later_time}, before {earlier} at {earlier_time}")]
    OutOfOrder {
        earlier: &'static str,
        earlier_time: u64,
        later: &'static str,
        later_time: u64,
    },
}

impl UpgradeSchedule {
    /// Snapshot the rules in force at `timestamp`.
    pub fn rules_at(&self, timestamp: u64) -> Rules {
        let active = |t: Option<u64>| t.is_some_and(|t| timestamp >= t);
        Rules {
            canonical_inputs: active(self.canonical_inputs_time),
            dynamic_fee: active(self.dynamic_fee_time),
            push_gossip: active(self.push_gossip_time),
        }
    }

    /// Reject schedules where a later upgrade activates before an earlier
    /// one. Upgrades build on each other; out-of-order activation is a
    /// configuration mistake, not a supported network shape.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let ordered = [
            ("canonical_inputs", self.canonical_inputs_time),
            ("dynamic_fee", self.dynamic_fee_time),
            ("push_gossip", self.push_gossip_time),
        ];
        let mut prev: Option<(&'static str, u64)> = None;
        for (name, time) in ordered {
            let Some(time) = time else { continue };
            if let Some((prev_name, prev_time)) = prev {
                if time < prev_time {
                    return Err(ScheduleError::OutOfOrder {
                        earlier: prev_name,
                        earlier_time: prev_time,
                        later: name,
                        later_time: time,
                    });
                }
            }
            prev = Some((name, time));
        }
        Ok(())
    }
}

/// The rule set in force at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rules {
    /// Export inputs must be sorted and unique.
    pub canonical_inputs: bool,
    /// Export fee is computed from gas and the current base fee.
    pub dynamic_fee: bool,
    /// Push gossip is active.
    pub push_gossip: bool,
}
