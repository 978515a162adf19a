//! The battle system manager.
//!
//! Owns the stack of live turn states and the queue of states still to come.
//! States never change the stack themselves: they file a request, the manager
//! turns it into an intent, and the intent is resolved on the following call
//! to [`BattleSystemManager::update`]. At most one transition happens per tick.

use crate::assets::BattleAssets;
use crate::turn::{Request, StateError, StateKind, Transition, TurnState, Wake};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Entries kept in the transition trace
const TRACE_CAPACITY: usize = 20;

/// Failure regressions allowed back to back before giving up
const FAILURE_LIMIT: u32 = 8;

/// Errors surfaced to the host
#[derive(Debug, Error)]
pub enum BattleError {
    #[error("no upcoming state to advance into")]
    EmptyQueue,

    #[error("{state} failed with nothing to fall back to: {source}")]
    Unrecoverable {
        state: StateKind,
        #[source]
        source: StateError,
    },

    #[error("{0} consecutive state failures")]
    FailureLoop(u32),

    #[error("{from} cannot advance to {to}")]
    IllegalTransition { from: StateKind, to: StateKind },
}

/// Identifies one stack entry for as long as it lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    None,
    Next,
    Previous,
    PreviousOnFail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    Advance,
    Regress,
    /// Popped after failing
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub mode: TraceMode,
    pub state: StateKind,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.mode {
            TraceMode::Advance => '+',
            TraceMode::Regress => '-',
            TraceMode::Fail => '!',
        };
        write!(f, "{sign}{}", self.state)
    }
}

#[derive(Debug)]
struct StackEntry {
    id: StateId,
    state: TurnState,
    /// Kinds this entry put at the front of the queue
    queued: usize,
}

pub struct BattleSystemManager {
    assets: BattleAssets,
    /// Top of the stack
    current: StackEntry,
    /// Everything beneath the top, bottom first
    below: Vec<StackEntry>,
    upcoming: VecDeque<StateKind>,
    intent: Intent,
    trace: VecDeque<TraceEntry>,
    next_id: u64,
    failures: u32,
}

impl BattleSystemManager {
    /// Start a game from the opening state
    pub fn new(assets: BattleAssets) -> Result<Self, BattleError> {
        Self::with_entry(assets, StateKind::GameStart)
    }

    /// Start with `kind` alone on the stack, e.g. to resume a session
    pub fn with_entry(assets: BattleAssets, kind: StateKind) -> Result<Self, BattleError> {
        let mut manager = Self {
            assets,
            current: StackEntry {
                id: StateId(0),
                state: kind.construct(),
                queued: 0,
            },
            below: Vec::new(),
            upcoming: VecDeque::new(),
            intent: Intent::None,
            trace: VecDeque::with_capacity(TRACE_CAPACITY),
            next_id: 1,
            failures: 0,
        };
        manager.record(TraceMode::Advance, kind);
        manager.wake(Wake::Advance)?;
        Ok(manager)
    }

    // ==================== Accessors ====================

    pub fn assets(&self) -> &BattleAssets {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut BattleAssets {
        &mut self.assets
    }

    pub fn current_kind(&self) -> StateKind {
        self.current.state.kind()
    }

    pub fn current_id(&self) -> StateId {
        self.current.id
    }

    /// The live top state, for hosts that render menus and selections
    pub fn current_state(&self) -> &TurnState {
        &self.current.state
    }

    pub fn height(&self) -> usize {
        self.below.len() + 1
    }

    /// Kinds on the stack, bottom first
    pub fn stack_kinds(&self) -> Vec<StateKind> {
        self.below
            .iter()
            .chain(std::iter::once(&self.current))
            .map(|e| e.state.kind())
            .collect()
    }

    /// Kinds queued to be entered next, in order
    pub fn upcoming(&self) -> Vec<StateKind> {
        self.upcoming.iter().copied().collect()
    }

    /// A transition is pending for the next tick
    pub fn is_transitioning(&self) -> bool {
        self.intent != Intent::None
    }

    pub fn trace(&self) -> impl Iterator<Item = &TraceEntry> {
        self.trace.iter()
    }

    /// The recent transitions, oldest first, as one line
    pub fn state_history(&self) -> String {
        self.trace
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// Nothing will happen until new input or a remote order arrives
    pub fn is_idle(&self) -> bool {
        if self.assets.finished {
            return true;
        }
        self.intent == Intent::None
            && self.current_kind() == StateKind::WaitForNextInstruction
            && self.assets.inbox.is_empty()
    }

    // ==================== Requests ====================

    /// Queue `kinds` ahead of the upcoming states and enter the first of them.
    ///
    /// Only the top state (`id`) may ask, only one request may be pending, and
    /// the first kind must be a successor of the top.
    pub fn request_advance(&mut self, id: StateId, kinds: &[StateKind]) -> bool {
        if !self.accepts(id) {
            return false;
        }
        let from = self.current_kind();
        let Some(&first) = kinds.first() else {
            warn!(state = %from, "advance requested with no states");
            return false;
        };
        if !from.can_advance_to(first) {
            warn!(from = %from, to = %first, "advance outside the transition table");
            return false;
        }

        self.current.queued = kinds.len();
        for &kind in kinds.iter().rev() {
            self.upcoming.push_front(kind);
        }
        self.intent = Intent::Next;
        true
    }

    /// Enter the state already at the front of the queue
    pub fn request_advance_next(&mut self, id: StateId) -> bool {
        if !self.accepts(id) {
            return false;
        }
        let from = self.current_kind();
        if self.upcoming.is_empty() {
            warn!(state = %from, "advance requested with nothing queued");
            return false;
        }
        self.current.queued = 0;
        self.intent = Intent::Next;
        true
    }

    /// Step back out of the top state
    pub fn request_regress(&mut self, id: StateId) -> bool {
        if !self.accepts(id) {
            return false;
        }
        let state = self.current_kind();
        if self.below.is_empty() {
            warn!(state = %state, "nothing beneath to regress to");
            return false;
        }
        if !state.revertible() {
            warn!(state = %state, "state cannot be reverted");
            return false;
        }
        self.intent = Intent::Previous;
        true
    }

    fn accepts(&self, id: StateId) -> bool {
        if id != self.current.id {
            warn!(?id, current = ?self.current.id, "request from a stale state ignored");
            return false;
        }
        if self.intent != Intent::None {
            warn!(state = %self.current_kind(), "a transition is already pending");
            return false;
        }
        true
    }

    fn apply(&mut self, id: StateId, request: Request) -> bool {
        match request {
            Request::Advance(kinds) => self.request_advance(id, &kinds),
            Request::AdvanceNext => self.request_advance_next(id),
            Request::Regress => self.request_regress(id),
        }
    }

    // ==================== Tick ====================

    /// Run one tick: resolve the pending intent, or let the top state poll
    pub fn update(&mut self) -> Result<(), BattleError> {
        let intent = std::mem::replace(&mut self.intent, Intent::None);
        match intent {
            Intent::None => self.tick(),
            Intent::Next => self.push_next(),
            Intent::Previous => self.pop_back(false),
            Intent::PreviousOnFail => self.pop_back(true),
        }
    }

    fn tick(&mut self) -> Result<(), BattleError> {
        self.failures = 0;
        let id = self.current.id;
        let mut t = Transition::default();
        let result = self
            .current
            .state
            .logic_mut()
            .update(&mut self.assets, &mut t);
        match result {
            Err(err) => self.fail(err, Intent::Previous),
            Ok(()) => {
                if let Some(request) = t.take() {
                    self.apply(id, request);
                }
                Ok(())
            }
        }
    }

    fn push_next(&mut self) -> Result<(), BattleError> {
        let next = *self.upcoming.front().ok_or(BattleError::EmptyQueue)?;
        let from = self.current_kind();
        if !from.can_advance_to(next) {
            return Err(BattleError::IllegalTransition { from, to: next });
        }
        self.upcoming.pop_front();

        self.current.state.logic_mut().close(&mut self.assets);
        let entry = StackEntry {
            id: StateId(self.next_id),
            state: next.construct(),
            queued: 0,
        };
        self.next_id += 1;
        let previous = std::mem::replace(&mut self.current, entry);
        self.below.push(previous);
        self.record(TraceMode::Advance, next);
        debug!(from = %from, to = %next, height = self.height(), "advanced");

        self.wake(Wake::Advance)?;
        if self.intent != Intent::PreviousOnFail {
            self.cull();
        }
        Ok(())
    }

    fn pop_back(&mut self, failed: bool) -> Result<(), BattleError> {
        let mut failed = failed;
        loop {
            let Some(beneath) = self.below.pop() else {
                break;
            };
            let mut popped = std::mem::replace(&mut self.current, beneath);
            let kind = popped.state.kind();
            let mode = if failed {
                TraceMode::Fail
            } else {
                let logic = popped.state.logic_mut();
                logic.close(&mut self.assets);
                logic.prev(&mut self.assets);
                TraceMode::Regress
            };
            failed = false;

            self.unqueue(popped.queued);
            self.upcoming.push_front(kind);
            self.record(mode, kind);
            debug!(from = %kind, to = %self.current_kind(), ?mode, "regressed");

            let top = self.current_kind();
            if !(top.skip_on_undo() && top.revertible() && !self.below.is_empty()) {
                break;
            }
        }
        self.wake(Wake::Regress)
    }

    /// Run the top state's entry hooks
    fn wake(&mut self, wake: Wake) -> Result<(), BattleError> {
        if wake == Wake::Regress {
            let queued = std::mem::take(&mut self.current.queued);
            self.unqueue(queued);
        }

        let id = self.current.id;
        let mut t = Transition::default();
        let logic = self.current.state.logic_mut();
        let result = match logic.assert_dependencies(&self.assets) {
            Ok(()) => logic.configure(&mut self.assets, wake, &mut t),
            Err(err) => Err(err),
        };
        match result {
            Err(err) => self.fail(err, Intent::PreviousOnFail),
            Ok(()) => {
                if let Some(request) = t.take() {
                    self.apply(id, request);
                }
                Ok(())
            }
        }
    }

    /// Back out of the failed top state with `retreat`.
    ///
    /// A state that failed to wake is dropped without its `prev` hook; one
    /// that failed mid-update regresses normally.
    fn fail(&mut self, err: StateError, retreat: Intent) -> Result<(), BattleError> {
        let state = self.current_kind();
        error!(state = %state, error = %err, history = %self.state_history(), "state failed");
        if self.below.is_empty() {
            return Err(BattleError::Unrecoverable { state, source: err });
        }
        self.failures += 1;
        if self.failures > FAILURE_LIMIT {
            return Err(BattleError::FailureLoop(self.failures));
        }
        self.intent = retreat;
        Ok(())
    }

    /// Drop everything under the nearest non-revertible entry beneath the top
    fn cull(&mut self) {
        if let Some(floor) = self.below.iter().rposition(|e| !e.state.kind().revertible()) {
            self.below.drain(..floor);
        }
    }

    fn unqueue(&mut self, count: usize) {
        let count = count.min(self.upcoming.len());
        self.upcoming.drain(..count);
    }

    fn record(&mut self, mode: TraceMode, state: StateKind) {
        if self.trace.len() == TRACE_CAPACITY {
            self.trace.pop_front();
        }
        self.trace.push_back(TraceEntry { mode, state });
    }
}
