//! Token kinds, board positions and sides.

/// Elemental kind of a token (gem). `Berry` is the non-damaging heal kind used in battles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    Fire,
    Water,
    Grass,
    Electric,
    Psychic,
    Dark,
    Berry,
}

impl TokenKind {
    /// The six damaging kinds (solo and versus boards).
    pub const ELEMENTS: [Self; 6] = [
        Self::Fire,
        Self::Water,
        Self::Grass,
        Self::Electric,
        Self::Psychic,
        Self::Dark,
    ];

    /// Elements plus berries (battle boards).
    pub const WITH_BERRY: [Self; 7] = [
        Self::Fire,
        Self::Water,
        Self::Grass,
        Self::Electric,
        Self::Psychic,
        Self::Dark,
        Self::Berry,
    ];

    /// Palette index 0..7 for theme.token_color().
    pub fn color_index(self) -> u8 {
        match self {
            Self::Fire => 0,
            Self::Water => 1,
            Self::Grass => 2,
            Self::Electric => 3,
            Self::Psychic => 4,
            Self::Dark => 5,
            Self::Berry => 6,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Fire => "▲",
            Self::Water => "●",
            Self::Grass => "♣",
            Self::Electric => "ϟ",
            Self::Psychic => "◆",
            Self::Dark => "★",
            Self::Berry => "♥",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Water => "Water",
            Self::Grass => "Grass",
            Self::Electric => "Electric",
            Self::Psychic => "Psychic",
            Self::Dark => "Dark",
            Self::Berry => "Berry",
        }
    }

    pub fn is_heal(self) -> bool {
        self == Self::Berry
    }
}

/// Cell coordinate; row 0 is the top of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// True if the two positions share an edge.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Neighbour in `dir`, or None when it would leave a rows x cols board.
    pub fn step(self, dir: Direction, rows: usize, cols: usize) -> Option<Self> {
        let (row, col) = match dir {
            Direction::Up => (self.row.checked_sub(1)?, self.col),
            Direction::Down => (self.row + 1, self.col),
            Direction::Left => (self.row, self.col.checked_sub(1)?),
            Direction::Right => (self.row, self.col + 1),
        };
        (row < rows && col < cols).then_some(Self { row, col })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// The two sides sharing a board. `Player` is always the human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::Enemy => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Player => "You",
            Self::Enemy => "Rival",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacency() {
        let p = Position::new(2, 2);
        assert!(p.is_adjacent(Position::new(1, 2)));
        assert!(p.is_adjacent(Position::new(2, 3)));
        assert!(!p.is_adjacent(Position::new(3, 3)));
        assert!(!p.is_adjacent(p));
    }

    #[test]
    fn test_step_stays_in_bounds() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.step(Direction::Up, 5, 5), None);
        assert_eq!(corner.step(Direction::Left, 5, 5), None);
        assert_eq!(corner.step(Direction::Down, 5, 5), Some(Position::new(1, 0)));
        assert_eq!(Position::new(4, 4).step(Direction::Right, 5, 5), None);
    }
}
