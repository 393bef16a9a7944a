//! `Enum(names)`: a fixed list of symbolic state names assigned dense
//! integer codes, sized to the smallest bit width that holds them all.

use hdl_utils::{math::bit_width_for_states, Id};

/// A named-to-integer mapping with a computed bit width, for FSM state
/// registers and similar small closed enumerations.
pub struct Enum {
    codes: Vec<(Id, i64)>,
    pub width: u32,
}

impl Enum {
    pub fn new(names: &[&str]) -> Self {
        let width = bit_width_for_states(names.len() as u64) as u32;
        let codes = names
            .iter()
            .enumerate()
            .map(|(i, name)| (Id::new(*name), i as i64))
            .collect();
        Self { codes, width }
    }

    /// The integer code assigned to `name`, or `None` if it isn't a member.
    pub fn code(&self, name: &str) -> Option<i64> {
        self.codes
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, code)| *code)
    }
}
