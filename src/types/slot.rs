// ABOUTME: Blue/green deployment slots.
// ABOUTME: Each (project, environment) pair holds at most one container per slot.

use std::fmt;
use std::str::FromStr;

/// One of the two deployment slots per environment.
///
/// Slots are stored and labeled as `A`/`B`; status output shows the
/// conventional blue/green names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::A => "A",
            Slot::B => "B",
        }
    }

    /// External blue/green label for human-facing output.
    pub fn color(&self) -> &'static str {
        match self {
            Slot::A => "blue",
            Slot::B => "green",
        }
    }

    pub fn opposite(&self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    /// Pick the slot the next deployment should target.
    ///
    /// The tie-break is fixed so tests are deterministic: a never-deployed
    /// environment starts in `B`.
    pub fn next_inactive(active: Option<Slot>) -> Slot {
        match active {
            Some(Slot::A) => Slot::B,
            Some(Slot::B) => Slot::A,
            None => Slot::B,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Slot::A),
            "B" => Ok(Slot::B),
            other => Err(format!("invalid slot: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_deployment_targets_b() {
        assert_eq!(Slot::next_inactive(None), Slot::B);
    }

    #[test]
    fn slots_alternate() {
        assert_eq!(Slot::next_inactive(Some(Slot::B)), Slot::A);
        assert_eq!(Slot::next_inactive(Some(Slot::A)), Slot::B);
    }

    #[test]
    fn colors_are_stable() {
        assert_eq!(Slot::A.color(), "blue");
        assert_eq!(Slot::B.color(), "green");
    }
}
