//! Celebration milestones on top of the points counter.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl Milestone {
    /// All milestones in ascending order.
    pub const ALL: [Milestone; 4] = [
        Milestone::Quarter,
        Milestone::Half,
        Milestone::ThreeQuarters,
        Milestone::Full,
    ];

    #[must_use]
    pub fn percent(self) -> u32 {
        match self {
            Milestone::Quarter => 25,
            Milestone::Half => 50,
            Milestone::ThreeQuarters => 75,
            Milestone::Full => 100,
        }
    }

    /// Points needed for this milestone: `percent% of total`, floored.
    #[must_use]
    pub fn threshold(self, total_points: u32) -> u64 {
        u64::from(total_points) * u64::from(self.percent()) / 100
    }

    #[must_use]
    pub fn is_reached(self, earned: u32, total_points: u32) -> bool {
        u64::from(earned) >= self.threshold(total_points)
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Tracks which milestones already fired in the current session.
#[derive(Debug, Clone, Default)]
pub struct MilestoneTracker {
    total_points: u32,
    fired: Vec<Milestone>,
}

impl MilestoneTracker {
    #[must_use]
    pub fn new(total_points: u32) -> Self {
        Self {
            total_points,
            fired: Vec::new(),
        }
    }

    /// Start over for a new session.
    pub fn reset(&mut self, total_points: u32) {
        self.total_points = total_points;
        self.fired.clear();
    }

    #[must_use]
    pub fn fired(&self) -> &[Milestone] {
        &self.fired
    }

    /// Milestones crossed by moving from `previous` to `current` earned points,
    /// ascending, each reported at most once per session.
    pub fn observe(&mut self, previous: u32, current: u32) -> Vec<Milestone> {
        if current <= previous {
            return Vec::new();
        }
        let total = self.total_points;
        let crossed: Vec<Milestone> = Milestone::ALL
            .into_iter()
            .filter(|m| !self.fired.contains(m))
            .filter(|m| !m.is_reached(previous, total) && m.is_reached(current, total))
            .collect();
        self.fired.extend(crossed.iter().copied());
        crossed
    }
}
