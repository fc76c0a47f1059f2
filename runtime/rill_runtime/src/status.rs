//! Control-flow statuses threaded through block execution.
//!
//! Executing a node yields a `Status`. `Next` keeps the enclosing queue
//! iterating; every other status stops it early and bubbles out through the
//! native call stack until a consumer matching the construct converts it
//! back. There is no programmable instruction pointer: `break`, `continue`
//! and `return` are ordinary return values.

/// The status produced by executing one AVMC node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Keep going with the next node.
    Next,
    /// An unlabelled `break`; consumed by the nearest loop or `switch`.
    BreakUnspecified,
    /// `break switch;`
    BreakSwitch,
    /// `break while;`
    BreakWhile,
    /// `break for;`
    BreakFor,
    /// An unlabelled `continue`; consumed by the nearest loop.
    ContinueUnspecified,
    /// `continue while;`
    ContinueWhile,
    /// `continue for;`
    ContinueFor,
    /// `return`; passes through every block and loop up to the function.
    Return,
}

impl Status {
    /// Whether queue iteration should keep going.
    #[inline]
    pub fn is_next(self) -> bool {
        matches!(self, Status::Next)
    }

    /// Encode into the 16-bit node scratch field.
    pub(crate) fn to_x16(self) -> u16 {
        match self {
            Status::Next => 0,
            Status::BreakUnspecified => 1,
            Status::BreakSwitch => 2,
            Status::BreakWhile => 3,
            Status::BreakFor => 4,
            Status::ContinueUnspecified => 5,
            Status::ContinueWhile => 6,
            Status::ContinueFor => 7,
            Status::Return => 8,
        }
    }

    /// Decode from the 16-bit node scratch field.
    ///
    /// # Panics
    /// An unknown code is a compiled-code invariant violation.
    #[track_caller]
    pub(crate) fn from_x16(code: u16) -> Self {
        match code {
            0 => Status::Next,
            1 => Status::BreakUnspecified,
            2 => Status::BreakSwitch,
            3 => Status::BreakWhile,
            4 => Status::BreakFor,
            5 => Status::ContinueUnspecified,
            6 => Status::ContinueWhile,
            7 => Status::ContinueFor,
            8 => Status::Return,
            other => panic!("invalid status code `{other}` in an AVMC node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x16_round_trip() {
        let all = [
            Status::Next,
            Status::BreakUnspecified,
            Status::BreakSwitch,
            Status::BreakWhile,
            Status::BreakFor,
            Status::ContinueUnspecified,
            Status::ContinueWhile,
            Status::ContinueFor,
            Status::Return,
        ];
        for status in all {
            assert_eq!(Status::from_x16(status.to_x16()), status);
        }
    }
}
