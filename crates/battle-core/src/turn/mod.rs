//! Turn decision states.
//!
//! A turn is a stack of small states, each owning one slice of the decision:
//! picking a unit, walking it, choosing a command, choosing a target, and so
//! on. States never switch themselves; they file a request on a `Transition`
//! handle and the `BattleSystemManager` carries it out on the next tick.
//!
//! The set of states is closed (`StateKind`) and every legal forward edge is
//! listed in `StateKind::successors`.

mod states;

use crate::assets::BattleAssets;
use crate::command::RatificationError;
use std::fmt;
use thiserror::Error;

pub use states::{
    AnimateEvents, AnimateMoveUnit, CheckBoardState, ChooseAttackTarget, ChooseMapTarget,
    CommandMenu, DropLocation, FactoryMenu, FieldMenu, GameEnd, GameLose, GameStart, GameWin,
    MoveUnit, PickUnit, PlayerCard, RatifyIssuedOrder, ResetPerspective, ShowUnitAttackRange,
    StandbyPhase, TextCutscene, TurnChange, TurnEnd, TurnStart, WaitForNextInstruction,
};

/// Every decision state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    // ==================== Game flow ====================
    GameStart,
    TextCutscene,
    TurnStart,
    ResetPerspective,
    PlayerCard,
    StandbyPhase,
    CheckBoardState,
    TurnEnd,
    TurnChange,
    GameWin,
    GameLose,
    GameEnd,

    // ==================== Order assembly ====================
    PickUnit,
    ShowUnitAttackRange,
    FieldMenu,
    FactoryMenu,
    MoveUnit,
    CommandMenu,
    ChooseAttackTarget,
    ChooseMapTarget,
    DropLocation,

    // ==================== Resolution ====================
    AnimateMoveUnit,
    RatifyIssuedOrder,
    AnimateEvents,
    WaitForNextInstruction,
}

impl StateKind {
    pub const ALL: [StateKind; 25] = [
        StateKind::GameStart,
        StateKind::TextCutscene,
        StateKind::TurnStart,
        StateKind::ResetPerspective,
        StateKind::PlayerCard,
        StateKind::StandbyPhase,
        StateKind::CheckBoardState,
        StateKind::TurnEnd,
        StateKind::TurnChange,
        StateKind::GameWin,
        StateKind::GameLose,
        StateKind::GameEnd,
        StateKind::PickUnit,
        StateKind::ShowUnitAttackRange,
        StateKind::FieldMenu,
        StateKind::FactoryMenu,
        StateKind::MoveUnit,
        StateKind::CommandMenu,
        StateKind::ChooseAttackTarget,
        StateKind::ChooseMapTarget,
        StateKind::DropLocation,
        StateKind::AnimateMoveUnit,
        StateKind::RatifyIssuedOrder,
        StateKind::AnimateEvents,
        StateKind::WaitForNextInstruction,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StateKind::GameStart => "GameStart",
            StateKind::TextCutscene => "TextCutscene",
            StateKind::TurnStart => "TurnStart",
            StateKind::ResetPerspective => "ResetPerspective",
            StateKind::PlayerCard => "PlayerCard",
            StateKind::StandbyPhase => "StandbyPhase",
            StateKind::CheckBoardState => "CheckBoardState",
            StateKind::TurnEnd => "TurnEnd",
            StateKind::TurnChange => "TurnChange",
            StateKind::GameWin => "GameWin",
            StateKind::GameLose => "GameLose",
            StateKind::GameEnd => "GameEnd",
            StateKind::PickUnit => "PickUnit",
            StateKind::ShowUnitAttackRange => "ShowUnitAttackRange",
            StateKind::FieldMenu => "FieldMenu",
            StateKind::FactoryMenu => "FactoryMenu",
            StateKind::MoveUnit => "MoveUnit",
            StateKind::CommandMenu => "CommandMenu",
            StateKind::ChooseAttackTarget => "ChooseAttackTarget",
            StateKind::ChooseMapTarget => "ChooseMapTarget",
            StateKind::DropLocation => "DropLocation",
            StateKind::AnimateMoveUnit => "AnimateMoveUnit",
            StateKind::RatifyIssuedOrder => "RatifyIssuedOrder",
            StateKind::AnimateEvents => "AnimateEvents",
            StateKind::WaitForNextInstruction => "WaitForNextInstruction",
        }
    }

    /// Whether the player may step back out of this state
    pub fn revertible(self) -> bool {
        matches!(
            self,
            StateKind::ShowUnitAttackRange
                | StateKind::FieldMenu
                | StateKind::FactoryMenu
                | StateKind::MoveUnit
                | StateKind::CommandMenu
                | StateKind::ChooseAttackTarget
                | StateKind::ChooseMapTarget
                | StateKind::DropLocation
                | StateKind::AnimateMoveUnit
                | StateKind::AnimateEvents
        )
    }

    /// Pure waypoints that stepping back walks straight past
    pub fn skip_on_undo(self) -> bool {
        matches!(
            self,
            StateKind::TextCutscene
                | StateKind::ResetPerspective
                | StateKind::PlayerCard
                | StateKind::AnimateMoveUnit
                | StateKind::AnimateEvents
        )
    }

    /// States this one may advance into
    pub fn successors(self) -> &'static [StateKind] {
        use StateKind::*;
        match self {
            GameStart => &[TextCutscene, TurnStart],
            TextCutscene => &[TurnStart],
            TurnStart => &[ResetPerspective],
            ResetPerspective => &[PlayerCard],
            PlayerCard => &[StandbyPhase],
            StandbyPhase => &[AnimateEvents],
            CheckBoardState => &[AnimateEvents, TurnEnd, GameWin, GameLose],
            TurnEnd => &[TurnChange],
            TurnChange => &[TurnStart],
            GameWin | GameLose => &[GameEnd],
            GameEnd => &[],
            PickUnit => &[MoveUnit, FactoryMenu, FieldMenu, ShowUnitAttackRange],
            ShowUnitAttackRange => &[],
            FieldMenu => &[TurnEnd],
            FactoryMenu => &[RatifyIssuedOrder],
            MoveUnit => &[CommandMenu],
            CommandMenu => &[AnimateMoveUnit, ChooseAttackTarget, ChooseMapTarget, DropLocation],
            ChooseAttackTarget | ChooseMapTarget => &[AnimateMoveUnit],
            DropLocation => &[CommandMenu],
            AnimateMoveUnit => &[RatifyIssuedOrder],
            RatifyIssuedOrder => &[AnimateEvents],
            AnimateEvents => &[CheckBoardState, PickUnit, WaitForNextInstruction],
            WaitForNextInstruction => &[RatifyIssuedOrder, TurnEnd],
        }
    }

    pub fn can_advance_to(self, next: StateKind) -> bool {
        self.successors().contains(&next)
    }

    /// A fresh instance of this state
    pub fn construct(self) -> TurnState {
        match self {
            StateKind::GameStart => TurnState::GameStart(GameStart),
            StateKind::TextCutscene => TurnState::TextCutscene(TextCutscene::default()),
            StateKind::TurnStart => TurnState::TurnStart(TurnStart),
            StateKind::ResetPerspective => TurnState::ResetPerspective(ResetPerspective),
            StateKind::PlayerCard => TurnState::PlayerCard(PlayerCard::default()),
            StateKind::StandbyPhase => TurnState::StandbyPhase(StandbyPhase::default()),
            StateKind::CheckBoardState => TurnState::CheckBoardState(CheckBoardState),
            StateKind::TurnEnd => TurnState::TurnEnd(TurnEnd::default()),
            StateKind::TurnChange => TurnState::TurnChange(TurnChange::default()),
            StateKind::GameWin => TurnState::GameWin(GameWin::default()),
            StateKind::GameLose => TurnState::GameLose(GameLose::default()),
            StateKind::GameEnd => TurnState::GameEnd(GameEnd),
            StateKind::PickUnit => TurnState::PickUnit(PickUnit),
            StateKind::ShowUnitAttackRange => {
                TurnState::ShowUnitAttackRange(ShowUnitAttackRange)
            }
            StateKind::FieldMenu => TurnState::FieldMenu(FieldMenu),
            StateKind::FactoryMenu => TurnState::FactoryMenu(FactoryMenu::default()),
            StateKind::MoveUnit => TurnState::MoveUnit(MoveUnit::default()),
            StateKind::CommandMenu => TurnState::CommandMenu(CommandMenu::default()),
            StateKind::ChooseAttackTarget => {
                TurnState::ChooseAttackTarget(ChooseAttackTarget::default())
            }
            StateKind::ChooseMapTarget => TurnState::ChooseMapTarget(ChooseMapTarget::default()),
            StateKind::DropLocation => TurnState::DropLocation(DropLocation::default()),
            StateKind::AnimateMoveUnit => TurnState::AnimateMoveUnit(AnimateMoveUnit::default()),
            StateKind::RatifyIssuedOrder => {
                TurnState::RatifyIssuedOrder(RatifyIssuedOrder::default())
            }
            StateKind::AnimateEvents => TurnState::AnimateEvents(AnimateEvents),
            StateKind::WaitForNextInstruction => {
                TurnState::WaitForNextInstruction(WaitForNextInstruction)
            }
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a state could not run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("{state} requires {what}")]
    MissingDependency {
        state: StateKind,
        what: &'static str,
    },

    #[error("{0} has nothing to offer")]
    NoOptions(StateKind),

    #[error(transparent)]
    Ratification(#[from] RatificationError),
}

impl StateError {
    pub fn missing(state: StateKind, what: &'static str) -> Self {
        StateError::MissingDependency { state, what }
    }
}

/// How a state came to be on top of the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Freshly pushed
    Advance,
    /// Uncovered by the state above it leaving
    Regress,
}

/// A transition a state asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Queue these states in front of the upcoming queue, then enter the first
    Advance(Vec<StateKind>),
    /// Enter the next already-queued state
    AdvanceNext,
    /// Step back out of this state
    Regress,
}

/// Collects at most one transition request from a state call.
/// The first request wins; later ones are ignored.
#[derive(Debug, Default)]
pub struct Transition {
    request: Option<Request>,
}

impl Transition {
    pub fn advance(&mut self, kinds: &[StateKind]) {
        self.file(Request::Advance(kinds.to_vec()));
    }

    pub fn advance_next(&mut self) {
        self.file(Request::AdvanceNext);
    }

    pub fn regress(&mut self) {
        self.file(Request::Regress);
    }

    fn file(&mut self, request: Request) {
        if self.request.is_none() {
            self.request = Some(request);
        }
    }

    pub fn is_requested(&self) -> bool {
        self.request.is_some()
    }

    pub fn take(&mut self) -> Option<Request> {
        self.request.take()
    }
}

/// Lifecycle hooks shared by every state.
///
/// `configure` runs each time the state reaches the top of the stack,
/// `update` once per tick while it stays there. `close` runs when another
/// state is pushed over it or it is popped, and `prev` undoes whatever the
/// state wrote when it is popped by a regression.
pub trait StateLogic {
    fn kind(&self) -> StateKind;

    fn assert_dependencies(&self, _assets: &BattleAssets) -> Result<(), StateError> {
        Ok(())
    }

    fn configure(
        &mut self,
        _assets: &mut BattleAssets,
        _wake: Wake,
        _transition: &mut Transition,
    ) -> Result<(), StateError> {
        Ok(())
    }

    fn update(
        &mut self,
        _assets: &mut BattleAssets,
        _transition: &mut Transition,
    ) -> Result<(), StateError> {
        Ok(())
    }

    fn close(&mut self, _assets: &mut BattleAssets) {}

    fn prev(&mut self, _assets: &mut BattleAssets) {}
}

/// One live state on the stack
#[derive(Debug)]
pub enum TurnState {
    GameStart(GameStart),
    TextCutscene(TextCutscene),
    TurnStart(TurnStart),
    ResetPerspective(ResetPerspective),
    PlayerCard(PlayerCard),
    StandbyPhase(StandbyPhase),
    CheckBoardState(CheckBoardState),
    TurnEnd(TurnEnd),
    TurnChange(TurnChange),
    GameWin(GameWin),
    GameLose(GameLose),
    GameEnd(GameEnd),
    PickUnit(PickUnit),
    ShowUnitAttackRange(ShowUnitAttackRange),
    FieldMenu(FieldMenu),
    FactoryMenu(FactoryMenu),
    MoveUnit(MoveUnit),
    CommandMenu(CommandMenu),
    ChooseAttackTarget(ChooseAttackTarget),
    ChooseMapTarget(ChooseMapTarget),
    DropLocation(DropLocation),
    AnimateMoveUnit(AnimateMoveUnit),
    RatifyIssuedOrder(RatifyIssuedOrder),
    AnimateEvents(AnimateEvents),
    WaitForNextInstruction(WaitForNextInstruction),
}

impl TurnState {
    pub fn kind(&self) -> StateKind {
        self.logic().kind()
    }

    pub fn logic(&self) -> &dyn StateLogic {
        match self {
            TurnState::GameStart(s) => s,
            TurnState::TextCutscene(s) => s,
            TurnState::TurnStart(s) => s,
            TurnState::ResetPerspective(s) => s,
            TurnState::PlayerCard(s) => s,
            TurnState::StandbyPhase(s) => s,
            TurnState::CheckBoardState(s) => s,
            TurnState::TurnEnd(s) => s,
            TurnState::TurnChange(s) => s,
            TurnState::GameWin(s) => s,
            TurnState::GameLose(s) => s,
            TurnState::GameEnd(s) => s,
            TurnState::PickUnit(s) => s,
            TurnState::ShowUnitAttackRange(s) => s,
            TurnState::FieldMenu(s) => s,
            TurnState::FactoryMenu(s) => s,
            TurnState::MoveUnit(s) => s,
            TurnState::CommandMenu(s) => s,
            TurnState::ChooseAttackTarget(s) => s,
            TurnState::ChooseMapTarget(s) => s,
            TurnState::DropLocation(s) => s,
            TurnState::AnimateMoveUnit(s) => s,
            TurnState::RatifyIssuedOrder(s) => s,
            TurnState::AnimateEvents(s) => s,
            TurnState::WaitForNextInstruction(s) => s,
        }
    }

    pub fn logic_mut(&mut self) -> &mut dyn StateLogic {
        match self {
            TurnState::GameStart(s) => s,
            TurnState::TextCutscene(s) => s,
            TurnState::TurnStart(s) => s,
            TurnState::ResetPerspective(s) => s,
            TurnState::PlayerCard(s) => s,
            TurnState::StandbyPhase(s) => s,
            TurnState::CheckBoardState(s) => s,
            TurnState::TurnEnd(s) => s,
            TurnState::TurnChange(s) => s,
            TurnState::GameWin(s) => s,
            TurnState::GameLose(s) => s,
            TurnState::GameEnd(s) => s,
            TurnState::PickUnit(s) => s,
            TurnState::ShowUnitAttackRange(s) => s,
            TurnState::FieldMenu(s) => s,
            TurnState::FactoryMenu(s) => s,
            TurnState::MoveUnit(s) => s,
            TurnState::CommandMenu(s) => s,
            TurnState::ChooseAttackTarget(s) => s,
            TurnState::ChooseMapTarget(s) => s,
            TurnState::DropLocation(s) => s,
            TurnState::AnimateMoveUnit(s) => s,
            TurnState::RatifyIssuedOrder(s) => s,
            TurnState::AnimateEvents(s) => s,
            TurnState::WaitForNextInstruction(s) => s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_matches_kind() {
        for kind in StateKind::ALL {
            assert_eq!(kind.construct().kind(), kind);
        }
    }

    #[test]
    fn test_terminal_states_are_not_revertible() {
        for kind in [StateKind::GameWin, StateKind::GameLose, StateKind::GameEnd] {
            assert!(!kind.revertible());
        }
        assert!(StateKind::GameEnd.successors().is_empty());
    }

    #[test]
    fn test_every_state_is_reachable_from_game_start() {
        let mut seen = vec![StateKind::GameStart];
        let mut frontier = vec![StateKind::GameStart];
        while let Some(kind) = frontier.pop() {
            for &next in kind.successors() {
                if !seen.contains(&next) {
                    seen.push(next);
                    frontier.push(next);
                }
            }
        }
        for kind in StateKind::ALL {
            assert!(seen.contains(&kind), "{kind} is unreachable");
        }
    }

    #[test]
    fn test_first_request_wins() {
        let mut t = Transition::default();
        t.regress();
        t.advance(&[StateKind::MoveUnit]);
        assert_eq!(t.take(), Some(Request::Regress));
        assert!(!t.is_requested());
    }
}
