//! Countdown state machine for a single focus session. The driver calls
//! [`FocusTimer::tick`] once per elapsed second while running.

use serde::Serialize;

pub const DEFAULT_DURATION_MINUTES: u32 = 25;
pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Reported once for the tick that brings the countdown to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFocus {
    pub task_id: Option<String>,
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Ticked { remaining_seconds: u32 },
    Completed(CompletedFocus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    duration_seconds: u32,
    remaining_seconds: u32,
    running: bool,
    focused_task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    pub focused_task_id: Option<String>,
    pub label: String,
}

pub fn clamp_duration_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES)
}

impl FocusTimer {
    pub fn new(duration_minutes: u32) -> Self {
        let duration_seconds = clamp_duration_minutes(duration_minutes) * 60;
        Self {
            duration_seconds,
            remaining_seconds: duration_seconds,
            running: false,
            focused_task_id: None,
        }
    }

    pub fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_seconds / 60
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn focused_task_id(&self) -> Option<&str> {
        self.focused_task_id.as_deref()
    }

    pub fn phase(&self) -> TimerPhase {
        if self.running {
            TimerPhase::Running
        } else if self.remaining_seconds == 0 {
            TimerPhase::Completed
        } else if self.remaining_seconds == self.duration_seconds {
            TimerPhase::Idle
        } else {
            TimerPhase::Paused
        }
    }

    pub fn start(&mut self) -> bool {
        if self.running || self.remaining_seconds == 0 {
            return false;
        }
        self.running = true;
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_seconds = self.duration_seconds;
    }

    pub fn set_duration(&mut self, minutes: u32) -> u32 {
        let minutes = clamp_duration_minutes(minutes);
        self.duration_seconds = minutes * 60;
        if self.running {
            self.remaining_seconds = self.remaining_seconds.min(self.duration_seconds);
        } else {
            self.remaining_seconds = self.duration_seconds;
        }
        minutes
    }

    /// Switching the credited task discards any partially run countdown.
    pub fn set_focused_task(&mut self, task_id: Option<String>) {
        self.focused_task_id = task_id;
        self.reset();
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.remaining_seconds == 0 {
            return TickOutcome::Ignored;
        }
        self.remaining_seconds -= 1;
        if self.remaining_seconds > 0 {
            return TickOutcome::Ticked {
                remaining_seconds: self.remaining_seconds,
            };
        }
        self.running = false;
        TickOutcome::Completed(CompletedFocus {
            task_id: self.focused_task_id.clone(),
            duration_seconds: self.duration_seconds,
        })
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase(),
            duration_seconds: self.duration_seconds,
            remaining_seconds: self.remaining_seconds,
            running: self.running,
            focused_task_id: self.focused_task_id.clone(),
            label: format_clock(self.remaining_seconds),
        }
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Start,
        Pause,
        Reset,
        Tick,
        SetDuration(u32),
        SetTask(Option<u8>),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Start),
            Just(Op::Pause),
            Just(Op::Reset),
            Just(Op::Tick),
            Just(Op::Tick),
            Just(Op::Tick),
            (0u32..200u32).prop_map(Op::SetDuration),
            proptest::option::of(0u8..3u8).prop_map(Op::SetTask),
        ]
    }

    #[test]
    fn new_timer_is_idle_with_full_countdown() {
        let timer = FocusTimer::new(25);
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_seconds(), 1500);
        assert_eq!(timer.snapshot().label, "25:00");
    }

    #[test]
    fn start_and_pause_are_idempotent() {
        let mut timer = FocusTimer::new(1);
        assert!(timer.start());
        let running = timer.clone();
        assert!(!timer.start());
        assert_eq!(timer, running);

        timer.tick();
        assert!(timer.pause());
        let paused = timer.clone();
        assert!(!timer.pause());
        assert_eq!(timer, paused);
        assert_eq!(timer.phase(), TimerPhase::Paused);
        assert_eq!(timer.remaining_seconds(), 59);
    }

    #[test]
    fn ticks_are_ignored_unless_running() {
        let mut timer = FocusTimer::new(1);
        assert_eq!(timer.tick(), TickOutcome::Ignored);
        assert_eq!(timer.remaining_seconds(), 60);
    }

    #[test]
    fn full_session_completes_exactly_once() {
        let mut timer = FocusTimer::new(25);
        timer.set_focused_task(Some("task-1".to_string()));
        timer.start();

        let mut completions = Vec::new();
        for _ in 0..1500 {
            if let TickOutcome::Completed(completed) = timer.tick() {
                completions.push(completed);
            }
        }
        assert_eq!(timer.remaining_seconds(), 0);
        assert!(!timer.is_running());
        assert_eq!(timer.phase(), TimerPhase::Completed);

        for _ in 0..5 {
            assert_eq!(timer.tick(), TickOutcome::Ignored);
        }
        assert!(!timer.start());
        assert_eq!(
            completions,
            vec![CompletedFocus {
                task_id: Some("task-1".to_string()),
                duration_seconds: 1500,
            }]
        );

        timer.reset();
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_seconds(), 1500);
    }

    #[test]
    fn switching_task_while_running_stops_and_resets() {
        let mut timer = FocusTimer::new(25);
        timer.set_focused_task(Some("task-1".to_string()));
        timer.start();
        for _ in 0..100 {
            timer.tick();
        }

        timer.set_focused_task(Some("task-2".to_string()));
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_seconds(), 1500);
        assert_eq!(timer.focused_task_id(), Some("task-2"));
    }

    #[test]
    fn set_duration_clamps_and_resets_when_stopped() {
        let mut timer = FocusTimer::new(25);
        assert_eq!(timer.set_duration(0), 1);
        assert_eq!(timer.remaining_seconds(), 60);
        assert_eq!(timer.set_duration(500), 120);
        assert_eq!(timer.remaining_seconds(), 7200);
    }

    #[test]
    fn set_duration_while_running_keeps_countdown_within_bounds() {
        let mut timer = FocusTimer::new(30);
        timer.start();
        timer.tick();
        timer.set_duration(45);
        assert!(timer.is_running());
        assert_eq!(timer.remaining_seconds(), 1799);

        timer.set_duration(10);
        assert_eq!(timer.remaining_seconds(), 600);
    }

    #[test]
    fn format_clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(7200), "120:00");
    }

    proptest! {
        #[test]
        fn remaining_never_exceeds_duration(
            initial in 0u32..200u32,
            ops in proptest::collection::vec(op_strategy(), 0..300)
        ) {
            let mut timer = FocusTimer::new(initial);
            for op in ops {
                match op {
                    Op::Start => { timer.start(); }
                    Op::Pause => { timer.pause(); }
                    Op::Reset => timer.reset(),
                    Op::Tick => {
                        if matches!(timer.tick(), TickOutcome::Completed(_)) {
                            prop_assert_eq!(timer.remaining_seconds(), 0);
                        }
                    }
                    Op::SetDuration(minutes) => { timer.set_duration(minutes); }
                    Op::SetTask(task) => timer.set_focused_task(task.map(|id| format!("task-{id}"))),
                }
                prop_assert!(timer.remaining_seconds() <= timer.duration_seconds());
                prop_assert!((60..=7200).contains(&timer.duration_seconds()));
                if timer.remaining_seconds() == 0 {
                    prop_assert!(!timer.is_running());
                }
            }
        }
    }
}
