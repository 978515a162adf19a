//! Concrete decision states, grouped by the part of the turn they drive.

mod order;
mod phase;
mod resolve;

pub use order::{
    ChooseAttackTarget, ChooseMapTarget, CommandMenu, DropLocation, FactoryMenu, FieldMenu,
    MoveUnit, PickUnit, ShowUnitAttackRange,
};
pub use phase::{
    CheckBoardState, GameEnd, GameLose, GameStart, GameWin, PlayerCard, ResetPerspective,
    StandbyPhase, TextCutscene, TurnChange, TurnEnd, TurnStart,
};
pub use resolve::{AnimateEvents, AnimateMoveUnit, RatifyIssuedOrder, WaitForNextInstruction};

use crate::assets::BattleAssets;
use crate::grid::Direction;
use crate::input::Button;

/// A button went down this tick
fn pressed(assets: &BattleAssets, button: Button) -> bool {
    assets.gamepad.button(button).pressed()
}

/// Move a list selection with the axis; up and left step back, down and right forward
fn cycle(index: usize, len: usize, dir: Option<Direction>) -> usize {
    if len == 0 {
        return 0;
    }
    match dir {
        Some(Direction::South | Direction::East) => (index + 1) % len,
        Some(Direction::North | Direction::West) => (index + len - 1) % len,
        None => index,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::assets::BattleAssets;
    use crate::board::Board;
    use crate::grid::Point;
    use crate::input::Button;
    use crate::player::Players;
    use crate::scenario::Scenario;
    use crate::turn::{StateLogic, Transition, Wake};

    pub fn assets(map: &str) -> BattleAssets {
        let board = Board::parse(map).unwrap();
        let scenario = Scenario {
            seed: Some(5),
            ..Scenario::default()
        };
        let players = Players::new(&["Red", "Blue"], &board, &scenario);
        BattleAssets::new(board, players, scenario)
    }

    /// Press `button` for one tick
    pub fn press(assets: &mut BattleAssets, button: Button) {
        assets.poll_input(&[], Point::default());
        assets.poll_input(&[button], Point::default());
    }

    /// Push the axis for one tick
    pub fn push(assets: &mut BattleAssets, axis: Point) {
        assets.poll_input(&[], Point::default());
        assets.poll_input(&[], axis);
    }

    pub fn configure(state: &mut dyn StateLogic, assets: &mut BattleAssets) -> Transition {
        let mut t = Transition::default();
        state.assert_dependencies(assets).unwrap();
        state.configure(assets, Wake::Advance, &mut t).unwrap();
        t
    }

    pub fn update(state: &mut dyn StateLogic, assets: &mut BattleAssets) -> Transition {
        let mut t = Transition::default();
        state.update(assets, &mut t).unwrap();
        t
    }
}
