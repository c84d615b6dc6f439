use serde::{Deserialize, Serialize};

/// One timed, grounded action of a temporal plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    /// Start offset from the beginning of the plan.
    pub time: f64,
    /// Grounded action, without the surrounding parentheses
    /// (e.g. `pick-up a`).
    pub action: String,
    pub duration: f64,
}

impl PlanItem {
    pub fn new(time: f64, action: impl Into<String>, duration: f64) -> Self {
        Self {
            time,
            action: action.into(),
            duration,
        }
    }

    /// Time at which this action finishes.
    pub fn end_time(&self) -> f64 {
        self.time + self.duration
    }
}

/// An ordered sequence of [`PlanItem`]s, in plan-file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub items: Vec<PlanItem>,
}

impl Plan {
    pub fn new(items: Vec<PlanItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanItem> {
        self.items.iter()
    }

    /// Latest end time over all actions, or `0.0` for an empty plan.
    pub fn makespan(&self) -> f64 {
        self.items
            .iter()
            .map(PlanItem::end_time)
            .fold(0.0, f64::max)
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a PlanItem;
    type IntoIter = std::slice::Iter<'a, PlanItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
