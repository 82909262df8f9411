//! Multi-Transmitter Scheduler
//!
//! Owns per-transmitter timing state, predicts the next (time, channel)
//! event across every enabled transmitter sharing the hop pattern, issues
//! retunes, and drives the `Initializing`/`Tracking` recovery state
//! machine. All timing is expressed as a plain microsecond counter rather
//! than a wall-clock type, so the same logic drives both the live event
//! loop and a simulated clock in tests.

use crate::hop::{AfcMode, AfcTable, FrequencyPlan, Hop, MAX_CHANNELS, MAX_TRANSMITTERS};
use crate::packet::Message;

/// One symbol period, in microseconds (19200 baud).
pub const SYMBOL_PERIOD_US: u64 = 62_500;
/// Fixed safety margin added to every armed timeout, on top of the
/// user-supplied `-ex` slack. Spec §9 leaves this open between 0 and 10 ms
/// across source revisions; this crate fixes it at 10 ms.
pub const FIXED_TIMEOUT_SLACK_US: u64 = 10_000;

/// Beacon period for transmitter `id`, in microseconds.
pub fn period_us(id: u8) -> u64 {
    2_562_500 + id as u64 * 62_500
}

/// Per-transmitter timing state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransmitterState {
    pub last_visit: u64,
    pub last_hop_seq: usize,
    pub next_visit: u64,
    pub next_hop_seq: usize,
    pub consecutive_missed: u32,
    pub total_messages: u64,
}

/// The scheduler's top-level mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for every enabled transmitter to be heard at least once.
    /// `deadline` is the global timeout that restarts this phase.
    Initializing { deadline: u64 },
    /// Steady-state prediction and retuning.
    Tracking,
}

/// Outcome of delivering a message to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEvent {
    /// Not yet every transmitter has been seen; still waiting.
    StillInitializing,
    /// Initialization completed on this message; tracking has begun.
    InitComplete { hop: Hop, deadline: u64 },
    /// A normal tracking update; re-armed per the retune and deadline.
    Replanned { hop: Hop, deadline: u64 },
    /// The message's `id` is not among the enabled transmitters.
    Undefined,
    /// The message's raw bytes equal the immediately prior accepted packet.
    Duplicate,
}

/// Outcome of a timeout firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutEvent {
    /// A miss was recorded and tracking continues with a new plan.
    Replanned { hop: Hop, deadline: u64 },
    /// Too many consecutive misses (or the init deadline) forced a restart.
    ReInitialized { hop: Hop, deadline: u64 },
}

fn enabled_from_mask(mask: u8) -> [bool; MAX_TRANSMITTERS] {
    let mut enabled = [false; MAX_TRANSMITTERS];
    for (i, slot) in enabled.iter_mut().enumerate() {
        *slot = mask & (1 << i) != 0;
    }
    enabled
}

/// Owns all scheduler state: per-transmitter timing, the AFC table, and the
/// init/track phase. Confined to, and mutated only by, the event loop.
pub struct Scheduler {
    plan: FrequencyPlan,
    afc: AfcTable,
    enabled: [bool; MAX_TRANSMITTERS],
    transmitters: [TransmitterState; MAX_TRANSMITTERS],
    state: SchedulerState,
    max_missed: u32,
    slack_us: u64,
    expected: Option<usize>,
    undefined_count: u64,
    reinit_count: u64,
    miss_per_channel: [[u32; MAX_CHANNELS]; MAX_TRANSMITTERS],
    last_accepted: Option<[u8; 6]>,
}

struct Plan {
    hop: Hop,
    deadline: u64,
    expected_id: usize,
}

impl Scheduler {
    pub fn new(
        plan: FrequencyPlan,
        enabled_mask: u8,
        max_missed: u32,
        extra_slack_us: u64,
        afc_mode: AfcMode,
    ) -> Self {
        Self {
            plan,
            afc: AfcTable::new(afc_mode),
            enabled: enabled_from_mask(enabled_mask),
            transmitters: [TransmitterState::default(); MAX_TRANSMITTERS],
            state: SchedulerState::Initializing { deadline: 0 },
            max_missed,
            slack_us: extra_slack_us + FIXED_TIMEOUT_SLACK_US,
            expected: None,
            undefined_count: 0,
            reinit_count: 0,
            miss_per_channel: [[0; MAX_CHANNELS]; MAX_TRANSMITTERS],
            last_accepted: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn transmitter(&self, id: u8) -> &TransmitterState {
        &self.transmitters[id as usize]
    }

    pub fn undefined_count(&self) -> u64 {
        self.undefined_count
    }

    pub fn reinit_count(&self) -> u64 {
        self.reinit_count
    }

    pub fn miss_count(&self, id: u8, channel_idx: usize) -> u32 {
        self.miss_per_channel[id as usize][channel_idx % MAX_CHANNELS]
    }

    /// The AFC table, so the packet parser can fold frequency-error
    /// measurements in as part of the same event-loop-owned state.
    pub fn afc_mut(&mut self) -> &mut AfcTable {
        &mut self.afc
    }

    pub fn frequency_plan(&self) -> &FrequencyPlan {
        &self.plan
    }

    fn max_enabled_id(&self) -> u8 {
        self.enabled
            .iter()
            .enumerate()
            .filter(|&(_, &e)| e)
            .map(|(i, _)| i as u8)
            .max()
            .unwrap_or(0)
    }

    fn all_enabled_seen(&self) -> bool {
        self.enabled
            .iter()
            .enumerate()
            .filter(|&(_, &e)| e)
            .all(|(i, _)| self.transmitters[i].total_messages > 0)
    }

    /// Clears all per-transmitter state, parks the tuner at hop-sequence 0,
    /// and arms the global init timeout. Returns the park hop and deadline
    /// for the caller to issue.
    pub fn start(&mut self, now: u64) -> (Hop, u64) {
        self.transmitters = [TransmitterState::default(); MAX_TRANSMITTERS];
        self.expected = None;
        let deadline = now + (self.plan.channel_count() as u64 + 1) * period_us(self.max_enabled_id());
        self.state = SchedulerState::Initializing { deadline };
        let channel_idx = self.plan.seq_to_hop(0);
        let hop = Hop {
            channel_idx,
            channel_freq: self.plan.channel_freq(channel_idx),
            freq_error: 0,
        };
        (hop, deadline)
    }

    /// Recomputes `next_visit`/`next_hop_seq` for every enabled transmitter
    /// from its own last-known state, and selects the transmitter with the
    /// earliest predicted arrival (ties broken by lowest id).
    fn replan(&mut self, now: u64) -> Plan {
        let channel_count = self.plan.channel_count();
        for id in 0..MAX_TRANSMITTERS {
            if !self.enabled[id] {
                continue;
            }
            let st = &mut self.transmitters[id];
            let mut next_visit = st.last_visit;
            let mut next_hop_seq = st.last_hop_seq;
            while next_visit <= now {
                next_visit += period_us(id as u8);
                next_hop_seq = (next_hop_seq + 1) % channel_count;
            }
            st.next_visit = next_visit;
            st.next_hop_seq = next_hop_seq;
        }

        let expected_id = (0..MAX_TRANSMITTERS)
            .filter(|&id| self.enabled[id])
            .min_by_key(|&id| self.transmitters[id].next_visit)
            .expect("at least one transmitter must be enabled");

        self.expected = Some(expected_id);
        let st = self.transmitters[expected_id];
        let channel_idx = self.plan.seq_to_hop(st.next_hop_seq);
        let freq_error = self.afc.average(expected_id, channel_idx);
        let hop = Hop {
            channel_idx,
            channel_freq: self.plan.channel_freq(channel_idx),
            freq_error,
        };
        let deadline = st.next_visit + SYMBOL_PERIOD_US + self.slack_us;
        Plan {
            hop,
            deadline,
            expected_id,
        }
    }

    /// Feeds a validated message into the scheduler. `current_channel_idx`
    /// is the hop channel the receiver was tuned to when this message was
    /// captured, used to recover the hop-sequence index it was received at.
    pub fn on_message(&mut self, msg: &Message, current_channel_idx: usize, now: u64) -> MessageEvent {
        if self.last_accepted == Some(msg.data) {
            return MessageEvent::Duplicate;
        }
        self.last_accepted = Some(msg.data);

        let id = msg.id as usize;
        if id >= MAX_TRANSMITTERS || !self.enabled[id] {
            self.undefined_count += 1;
            return MessageEvent::Undefined;
        }
        self.transmitters[id].total_messages += 1;

        match self.state {
            SchedulerState::Initializing { .. } => {
                if self.transmitters[id].total_messages == 1 {
                    let seq = self.plan.hop_to_seq(current_channel_idx);
                    self.transmitters[id].last_visit = now;
                    self.transmitters[id].last_hop_seq = seq;
                }
                if self.all_enabled_seen() {
                    self.state = SchedulerState::Tracking;
                    let plan = self.replan(now);
                    MessageEvent::InitComplete {
                        hop: plan.hop,
                        deadline: plan.deadline,
                    }
                } else {
                    MessageEvent::StillInitializing
                }
            }
            SchedulerState::Tracking => {
                let seq = self.plan.hop_to_seq(current_channel_idx);
                self.transmitters[id].last_visit = now;
                self.transmitters[id].last_hop_seq = seq;
                self.transmitters[id].consecutive_missed = 0;
                let plan = self.replan(now);
                MessageEvent::Replanned {
                    hop: plan.hop,
                    deadline: plan.deadline,
                }
            }
        }
    }

    /// Handles an armed timeout firing with no packet received.
    pub fn on_timeout(&mut self, now: u64) -> TimeoutEvent {
        match self.state {
            SchedulerState::Initializing { .. } => {
                self.reinit_count += 1;
                let (hop, deadline) = self.start(now);
                TimeoutEvent::ReInitialized { hop, deadline }
            }
            SchedulerState::Tracking => {
                let id = self.expected.expect("Tracking always has an expected transmitter");
                let channel_count = self.plan.channel_count();
                {
                    let st = &mut self.transmitters[id];
                    st.last_visit += period_us(id as u8);
                    st.last_hop_seq = (st.last_hop_seq + 1) % channel_count;
                    st.consecutive_missed += 1;
                }
                let missed_channel = self.plan.seq_to_hop(self.transmitters[id].last_hop_seq);
                self.miss_per_channel[id][missed_channel % MAX_CHANNELS] += 1;

                let desynced = (0..MAX_TRANSMITTERS)
                    .filter(|&i| self.enabled[i])
                    .any(|i| self.transmitters[i].consecutive_missed > self.max_missed);

                if desynced {
                    self.reinit_count += 1;
                    let (hop, deadline) = self.start(now);
                    TimeoutEvent::ReInitialized { hop, deadline }
                } else {
                    let plan = self.replan(now);
                    TimeoutEvent::Replanned {
                        hop: plan.hop,
                        deadline: plan.deadline,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hop::FrequencyPlan;

    fn msg(id: u8, salt: u8) -> Message {
        Message {
            id,
            data: [id, salt, 0, 0, 0, 0],
            sample_index: 0,
            freq_error: 0,
        }
    }

    #[test]
    fn single_transmitter_reaches_tracking_on_first_message() {
        let mut sched = Scheduler::new(FrequencyPlan::eu(), 0b0001, 5, 0, AfcMode::RunningSum);
        let (hop, _deadline) = sched.start(0);
        let parked_channel = hop.channel_idx;
        let event = sched.on_message(&msg(0, 1), parked_channel, 1_000);
        assert!(matches!(event, MessageEvent::InitComplete { .. }));
        assert_eq!(sched.state(), SchedulerState::Tracking);
    }

    #[test]
    fn undefined_id_does_not_change_state() {
        let mut sched = Scheduler::new(FrequencyPlan::eu(), 0b0001, 5, 0, AfcMode::RunningSum);
        let (hop, _) = sched.start(0);
        let event = sched.on_message(&msg(5, 1), hop.channel_idx, 1_000);
        assert_eq!(event, MessageEvent::Undefined);
        assert_eq!(sched.undefined_count(), 1);
        assert_eq!(sched.state(), SchedulerState::Initializing { deadline: sched_deadline(&sched) });
    }

    fn sched_deadline(sched: &Scheduler) -> u64 {
        match sched.state() {
            SchedulerState::Initializing { deadline } => deadline,
            _ => unreachable!(),
        }
    }

    #[test]
    fn duplicate_raw_bytes_are_dropped() {
        let mut sched = Scheduler::new(FrequencyPlan::eu(), 0b0001, 5, 0, AfcMode::RunningSum);
        let (hop, _) = sched.start(0);
        let m = msg(0, 7);
        let first = sched.on_message(&m, hop.channel_idx, 1_000);
        assert!(matches!(first, MessageEvent::InitComplete { .. }));
        let second = sched.on_message(&m, hop.channel_idx, 2_562_500 + 1_000);
        assert_eq!(second, MessageEvent::Duplicate);
    }

    #[test]
    fn three_consecutive_misses_do_not_trigger_reinit_at_default_threshold() {
        let mut sched = Scheduler::new(FrequencyPlan::eu(), 0b0001, 5, 0, AfcMode::RunningSum);
        let (hop, _) = sched.start(0);
        let event = sched.on_message(&msg(0, 1), hop.channel_idx, 1_000);
        let mut deadline = match event {
            MessageEvent::InitComplete { deadline, .. } => deadline,
            _ => unreachable!(),
        };
        for _ in 0..3 {
            let event = sched.on_timeout(deadline);
            match event {
                TimeoutEvent::Replanned { deadline: next, .. } => deadline = next,
                other => panic!("expected Replanned, got {other:?}"),
            }
        }
        assert_eq!(sched.transmitter(0).consecutive_missed, 3);
        assert_eq!(sched.state(), SchedulerState::Tracking);
    }

    #[test]
    fn exceeding_max_missed_triggers_reinit() {
        let mut sched = Scheduler::new(FrequencyPlan::eu(), 0b0001, 2, 0, AfcMode::RunningSum);
        let (hop, _) = sched.start(0);
        let event = sched.on_message(&msg(0, 1), hop.channel_idx, 1_000);
        let mut deadline = match event {
            MessageEvent::InitComplete { deadline, .. } => deadline,
            _ => unreachable!(),
        };
        for _ in 0..2 {
            match sched.on_timeout(deadline) {
                TimeoutEvent::Replanned { deadline: next, .. } => deadline = next,
                other => panic!("expected Replanned, got {other:?}"),
            }
        }
        let event = sched.on_timeout(deadline);
        assert!(matches!(event, TimeoutEvent::ReInitialized { .. }));
        assert_eq!(sched.reinit_count(), 1);
        assert!(matches!(sched.state(), SchedulerState::Initializing { .. }));
    }

    #[test]
    fn two_transmitters_interleave_and_break_ties_by_lower_id() {
        let mut sched = Scheduler::new(FrequencyPlan::eu(), 0b0011, 5, 0, AfcMode::RunningSum);
        let (hop, _) = sched.start(0);
        sched.on_message(&msg(0, 1), hop.channel_idx, 1_000);
        assert_eq!(sched.state(), SchedulerState::Initializing { deadline: sched_deadline(&sched) });
        let event = sched.on_message(&msg(1, 1), hop.channel_idx, 1_000);
        assert!(matches!(event, MessageEvent::InitComplete { .. }));
        assert_eq!(sched.state(), SchedulerState::Tracking);
    }

    #[test]
    fn next_visit_is_always_a_multiple_of_period_ahead_of_last_visit() {
        let mut sched = Scheduler::new(FrequencyPlan::eu(), 0b0001, 5, 0, AfcMode::RunningSum);
        let (hop, _) = sched.start(0);
        sched.on_message(&msg(0, 1), hop.channel_idx, 1_000);
        let st = sched.transmitter(0);
        let delta = st.next_visit - st.last_visit;
        assert_eq!(delta % period_us(0), 0);
        assert!(delta > 0);
    }
}
