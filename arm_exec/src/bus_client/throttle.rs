//! Per-channel rate limiting of single servo commands
//!
//! Each servo channel may be sent at most one command per period. A command
//! offered inside the period is held back, replacing any command already
//! held for that channel, and released once the period has passed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use comms_if::eqpt::ssc::ServoCommand;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Rate limiter for single servo commands.
#[derive(Debug, Clone)]
pub struct Throttle {
    period: Duration,
    channels: BTreeMap<u8, ChannelSlot>,
}

#[derive(Debug, Clone, Default)]
struct ChannelSlot {
    last_sent: Option<Instant>,
    pending: Option<ServoCommand>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            channels: BTreeMap::new(),
        }
    }

    /// Offer a command at `now`.
    ///
    /// Returns the command if it may be sent straight away, otherwise holds
    /// it until [`Throttle::due`] releases it.
    pub fn offer(&mut self, cmd: ServoCommand, now: Instant) -> Option<ServoCommand> {
        let period = self.period;
        let slot = self.channels.entry(cmd.channel).or_default();

        if slot.is_open(now, period) {
            slot.pending = None;
            slot.last_sent = Some(now);
            Some(cmd)
        } else {
            slot.pending = Some(cmd);
            None
        }
    }

    /// Take every held command whose channel may now be sent, in channel
    /// order.
    pub fn due(&mut self, now: Instant) -> Vec<ServoCommand> {
        let period = self.period;

        self.channels
            .values_mut()
            .filter(|slot| slot.pending.is_some() && slot.is_open(now, period))
            .filter_map(|slot| {
                slot.last_sent = Some(now);
                slot.pending.take()
            })
            .collect()
    }

    /// Drop any command held for `channel`.
    pub fn discard(&mut self, channel: u8) {
        if let Some(slot) = self.channels.get_mut(&channel) {
            slot.pending = None;
        }
    }

    /// Number of commands being held.
    pub fn num_pending(&self) -> usize {
        self.channels
            .values()
            .filter(|s| s.pending.is_some())
            .count()
    }
}

impl ChannelSlot {
    fn is_open(&self, now: Instant, period: Duration) -> bool {
        match self.last_sent {
            Some(t) => now.saturating_duration_since(t) >= period,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(90);

    #[test]
    fn test_last_value_wins() {
        let mut throttle = Throttle::new(PERIOD);
        let t0 = Instant::now();

        // First command on a channel goes straight out
        assert_eq!(
            throttle.offer(ServoCommand::new(0, 1500), t0),
            Some(ServoCommand::new(0, 1500))
        );

        // Later ones inside the period are held, only the newest kept
        let t1 = t0 + Duration::from_millis(10);
        assert_eq!(throttle.offer(ServoCommand::new(0, 1600), t1), None);
        assert_eq!(throttle.offer(ServoCommand::new(0, 1700), t1), None);
        assert_eq!(throttle.num_pending(), 1);

        assert!(throttle.due(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(
            throttle.due(t0 + PERIOD),
            vec![ServoCommand::new(0, 1700)]
        );
        assert_eq!(throttle.num_pending(), 0);

        // The released command restarts the period
        let t2 = t0 + PERIOD + Duration::from_millis(10);
        assert_eq!(throttle.offer(ServoCommand::new(0, 1800), t2), None);
    }

    #[test]
    fn test_channels_independent() {
        let mut throttle = Throttle::new(PERIOD);
        let t0 = Instant::now();

        assert!(throttle.offer(ServoCommand::new(2, 1500), t0).is_some());
        assert!(throttle.offer(ServoCommand::new(1, 1500), t0).is_some());
        assert!(throttle.offer(ServoCommand::new(2, 1400), t0).is_none());
        assert!(throttle.offer(ServoCommand::new(1, 1400), t0).is_none());

        // Released in channel order
        assert_eq!(
            throttle.due(t0 + Duration::from_millis(100)),
            vec![ServoCommand::new(1, 1400), ServoCommand::new(2, 1400)]
        );
    }

    #[test]
    fn test_discard() {
        let mut throttle = Throttle::new(PERIOD);
        let t0 = Instant::now();

        throttle.offer(ServoCommand::new(3, 1500), t0);
        throttle.offer(ServoCommand::new(3, 1000), t0);
        throttle.discard(3);
        throttle.discard(7);

        assert!(throttle.due(t0 + Duration::from_secs(1)).is_empty());
    }
}
