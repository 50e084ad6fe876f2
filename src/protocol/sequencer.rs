//! Request sequencer: polls the receiver's auxiliary status one request at
//! a time, paced by the primary timing report.

use std::collections::VecDeque;

use tracing::{info, warn};

use super::command::Command;
use crate::core::Dialect;

/// The auxiliary status requests, in polling order
const SCHEDULE: [Command; 24] = [
    Command::RequestSoftwareVersion,
    Command::RequestManufacturingParams,
    Command::RequestProductionParams,
    Command::RequestPpsCharacteristics,
    Command::RequestDisciplineParams(0),
    Command::RequestDisciplineParams(1),
    Command::RequestDisciplineParams(2),
    Command::RequestDisciplineParams(3),
    Command::RequestSurveyParams,
    Command::RequestReceiverConfig,
    Command::RequestIoOptions,
    Command::RequestTimingMode,
    Command::RequestDacValue,
    Command::RequestBroadcastMask,
    Command::RequestSatelliteSelection,
    Command::RequestTrackingStatus(0),
    Command::RequestEphemerisStatus(0),
    Command::RequestSignalLevels,
    Command::RequestHealth,
    Command::RequestLastFix,
    Command::RequestFilterConfig,
    Command::RequestPortConfig,
    Command::RequestSatelliteAttributes,
    Command::RequestFirmwareVersion,
];

/// What the driver should do next
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Send this request
    Send(Command),
    /// Nothing has ever been received; reopen the link with this dialect
    Reconnect(Dialect),
}

#[derive(Debug)]
pub struct RequestSequencer {
    index: usize,
    dialect: Dialect,
    follow_ups: VecDeque<Command>,
}

impl RequestSequencer {
    pub fn new(dialect: Dialect) -> Self {
        RequestSequencer {
            index: 0,
            dialect,
            follow_ups: VecDeque::new(),
        }
    }

    /// Number of requests in one full cycle
    pub fn len(&self) -> usize {
        SCHEDULE.len()
    }

    pub fn is_empty(&self) -> bool {
        SCHEDULE.is_empty()
    }

    /// Position of the next round-robin request
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current guess at the receiver's serial framing
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Queues a one-shot request ahead of the round-robin. Duplicates are dropped.
    pub fn push_follow_up(&mut self, command: Command) {
        if !self.follow_ups.contains(&command) {
            self.follow_ups.push_back(command);
        }
    }

    /// Next step. Queued follow-ups go first and do not move the round-robin.
    ///
    /// At the last schedule entry, if `anything_received` is false, the
    /// dialect is toggled and a reconnect is returned in place of the request.
    pub fn next_request(&mut self, anything_received: bool) -> Step {
        if let Some(command) = self.follow_ups.pop_front() {
            return Step::Send(command);
        }

        let index = self.index;
        self.index = (self.index + 1) % SCHEDULE.len();

        if index == SCHEDULE.len() - 1 && !anything_received {
            let previous = self.dialect;
            self.dialect = previous.toggled();
            warn!(?previous, "no receiver traffic for a full request cycle");
            info!(dialect = ?self.dialect, "switching serial dialect");
            return Step::Reconnect(self.dialect);
        }
        Step::Send(SCHEDULE[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_wraps() {
        let mut seq = RequestSequencer::new(Dialect::default());
        let first: Vec<_> = (0..seq.len()).map(|_| seq.next_request(true)).collect();
        assert_eq!(first[0], Step::Send(Command::RequestSoftwareVersion));
        assert_eq!(first[23], Step::Send(Command::RequestFirmwareVersion));
        assert_eq!(seq.index(), 0);
        assert_eq!(seq.next_request(true), Step::Send(Command::RequestSoftwareVersion));
    }

    #[test]
    fn test_follow_up_goes_first_without_advancing() {
        let mut seq = RequestSequencer::new(Dialect::default());
        seq.next_request(true);
        seq.push_follow_up(Command::RequestSurveyParams);
        seq.push_follow_up(Command::RequestSurveyParams);
        assert_eq!(seq.next_request(true), Step::Send(Command::RequestSurveyParams));
        assert_eq!(seq.index(), 1);
        assert_eq!(seq.next_request(true), Step::Send(Command::RequestManufacturingParams));
    }

    #[test]
    fn test_silent_receiver_toggles_dialect() {
        let mut seq = RequestSequencer::new(Dialect::Odd);
        for _ in 0..seq.len() - 1 {
            assert!(matches!(seq.next_request(false), Step::Send(_)));
        }
        assert_eq!(seq.next_request(false), Step::Reconnect(Dialect::None));
        assert_eq!(seq.dialect(), Dialect::None);
        assert_eq!(seq.index(), 0);

        // a full silent cycle later it flips back
        for _ in 0..seq.len() - 1 {
            seq.next_request(false);
        }
        assert_eq!(seq.next_request(false), Step::Reconnect(Dialect::Odd));
    }

    #[test]
    fn test_no_reconnect_once_traffic_seen() {
        let mut seq = RequestSequencer::new(Dialect::Odd);
        for _ in 0..seq.len() {
            assert!(matches!(seq.next_request(true), Step::Send(_)));
        }
        assert_eq!(seq.dialect(), Dialect::Odd);
    }
}
