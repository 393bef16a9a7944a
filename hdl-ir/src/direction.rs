/// A fully resolved signal direction: input, output, or inout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
    Inout,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Input => Direction::Output,
            Direction::Output => Direction::Input,
            Direction::Inout => Direction::Inout,
        }
    }
}

/// The direction tag declared on a [`crate::TypeSpec`] or carried by a
/// [`crate::SignalMeta`] before resolution. `Inherit` defers to the nearest
/// non-`Inherit` ancestor; `Flipped` inverts that ancestor's resolved
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DirTag {
    #[default]
    Inherit,
    Input,
    Output,
    Inout,
    Flipped,
}

impl DirTag {
    pub fn as_direction(self) -> Option<Direction> {
        match self {
            DirTag::Input => Some(Direction::Input),
            DirTag::Output => Some(Direction::Output),
            DirTag::Inout => Some(Direction::Inout),
            DirTag::Inherit | DirTag::Flipped => None,
        }
    }
}
