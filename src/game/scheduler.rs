//! Priority-ordered event queue keyed by due instant.
//!
//! Every note fans out into independent triggers measured from the same
//! game-start origin. A single dispatch loop pops due events in order; a
//! handler may push follow-up events (the next animation tick, the settle
//! delay after the last note trigger).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::game::note::{NoteId, ScheduledNote};
use crate::game::timing_windows::{TimingProfile, fall_duration_ms};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineEvent {
    /// Plays a background note, or publishes a user-played note to the matcher.
    Sound(NoteId),
    /// Spawns the falling marker of a user-played note.
    AnimationStart(NoteId),
    /// Advances a falling marker; the last tick of a fall removes it.
    AnimationTick(NoteId),
    /// Fires once, a settle delay after the last note trigger.
    Settle,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    due_ms: f64,
    seq: u64,
    event: TimelineEvent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior: earliest due first, then FIFO.
        other
            .due_ms
            .total_cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl EventQueue {
    pub fn push(&mut self, due_ms: f64, event: TimelineEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { due_ms, seq, event });
    }

    pub fn next_due_ms(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.due_ms)
    }

    /// Pops the earliest event if it is due at or before `now_ms`.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(f64, TimelineEvent)> {
        if self.next_due_ms()? > now_ms {
            return None;
        }
        self.heap.pop().map(|e| (e.due_ms, e.event))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

/// Where and for how long a user-played note's marker falls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallPlan {
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl FallPlan {
    pub fn for_note(note: &ScheduledNote, profile: &TimingProfile) -> Self {
        let duration_ms = fall_duration_ms(note.record.start);
        Self {
            start_ms: profile.note_due_ms(note.record.start) - duration_ms,
            duration_ms,
        }
    }

    #[inline(always)]
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }

    /// Due instant of the tick after one at `now_ms`. Never overshoots the end
    /// so the final tick lands exactly on it.
    #[inline(always)]
    pub fn next_tick_ms(&self, now_ms: f64, tick_ms: f64) -> f64 {
        (now_ms + tick_ms).min(self.end_ms())
    }

    #[inline(always)]
    pub fn is_finished_at(&self, now_ms: f64) -> bool {
        now_ms >= self.end_ms()
    }
}

/// Owns the queue and the count of note triggers still outstanding.
#[derive(Debug)]
pub struct Scheduler {
    profile: TimingProfile,
    queue: EventQueue,
    pending_note_triggers: usize,
    settle_scheduled: bool,
}

impl Scheduler {
    /// Schedules every trigger for every note against the shared origin.
    pub fn new(notes: &[ScheduledNote], profile: TimingProfile) -> Self {
        let mut queue = EventQueue::default();
        for note in notes {
            queue.push(profile.note_due_ms(note.record.start), TimelineEvent::Sound(note.id));
            if note.user_played() {
                let plan = FallPlan::for_note(note, &profile);
                queue.push(plan.start_ms, TimelineEvent::AnimationStart(note.id));
            }
        }

        let mut scheduler = Self {
            profile,
            queue,
            pending_note_triggers: notes.len(),
            settle_scheduled: false,
        };
        if notes.is_empty() {
            scheduler.schedule_settle(profile.pre_roll_ms);
        }
        scheduler
    }

    pub const fn profile(&self) -> &TimingProfile {
        &self.profile
    }

    pub fn push(&mut self, due_ms: f64, event: TimelineEvent) {
        self.queue.push(due_ms, event);
    }

    pub fn pop_due(&mut self, now_ms: f64) -> Option<(f64, TimelineEvent)> {
        self.queue.pop_due(now_ms)
    }

    pub fn next_due_ms(&self) -> Option<f64> {
        self.queue.next_due_ms()
    }

    /// Records that one note trigger has fired. When it was the last one the
    /// settle event is queued and `true` is returned.
    pub fn note_trigger_fired(&mut self, now_ms: f64) -> bool {
        self.pending_note_triggers = self.pending_note_triggers.saturating_sub(1);
        if self.pending_note_triggers == 0 && !self.settle_scheduled {
            self.schedule_settle(now_ms);
            return true;
        }
        false
    }

    fn schedule_settle(&mut self, last_trigger_ms: f64) {
        self.settle_scheduled = true;
        self.queue
            .push(last_trigger_ms + self.profile.settle_ms, TimelineEvent::Settle);
    }

    /// Drops everything still queued.
    pub fn cancel_all(&mut self) {
        self.queue.clear();
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
