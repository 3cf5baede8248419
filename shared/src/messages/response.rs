use bytes::Bytes;

use crate::Member;

/// Per-target outcome of a call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// The target answered with a value
    Value(Bytes),
    /// The target answered, but its handler failed
    Failed(String),
    /// The deadline passed before the target answered
    NoResponse,
    /// The target left the view before answering
    Suspected,
}

impl ResponseOutcome {
    /// Whether the target actually answered
    pub fn is_received(&self) -> bool {
        matches!(self, ResponseOutcome::Value(_) | ResponseOutcome::Failed(_))
    }

    pub fn value(&self) -> Option<&Bytes> {
        match self {
            ResponseOutcome::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// How many real responses a call waits for before completing early
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResponseMode {
    #[default]
    All,
    First,
    Majority,
    AtLeast(usize),
    /// Complete as soon as the requests are sent
    NoWait,
}

impl ResponseMode {
    /// Number of real responses needed out of `targets`
    pub fn required(&self, targets: usize) -> usize {
        match self {
            ResponseMode::All => targets,
            ResponseMode::First => targets.min(1),
            ResponseMode::Majority => {
                if targets == 0 {
                    0
                } else {
                    targets / 2 + 1
                }
            }
            ResponseMode::AtLeast(count) => (*count).min(targets),
            ResponseMode::NoWait => 0,
        }
    }

    /// Whether a call with `received` real responses and `accounted`
    /// settled targets (answered or suspected) out of `targets` is done
    pub fn is_satisfied(&self, received: usize, accounted: usize, targets: usize) -> bool {
        accounted >= targets || received >= self.required(targets)
    }
}

/// Outcomes of one call, one entry per target, in target order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseSet {
    entries: Vec<(Member, ResponseOutcome)>,
}

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outcome for `member`, replacing any earlier one
    pub fn insert(&mut self, member: Member, outcome: ResponseOutcome) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == member) {
            Some((_, slot)) => *slot = outcome,
            None => self.entries.push((member, outcome)),
        }
    }

    pub fn get(&self, member: &Member) -> Option<&ResponseOutcome> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == member)
            .map(|(_, outcome)| outcome)
    }

    pub fn contains(&self, member: &Member) -> bool {
        self.get(member).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Member, &ResponseOutcome)> {
        self.entries.iter().map(|(member, outcome)| (member, outcome))
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.entries.iter().map(|(member, _)| member)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn num_received(&self) -> usize {
        self.count(ResponseOutcome::is_received)
    }

    pub fn num_suspected(&self) -> usize {
        self.count(|outcome| *outcome == ResponseOutcome::Suspected)
    }

    pub fn num_no_response(&self) -> usize {
        self.count(|outcome| *outcome == ResponseOutcome::NoResponse)
    }

    /// First value in target order, skipping failures
    pub fn first_value(&self) -> Option<(&Member, &Bytes)> {
        self.entries
            .iter()
            .find_map(|(member, outcome)| outcome.value().map(|value| (member, value)))
    }

    fn count(&self, predicate: impl Fn(&ResponseOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

impl IntoIterator for ResponseSet {
    type Item = (Member, ResponseOutcome);
    type IntoIter = std::vec::IntoIter<(Member, ResponseOutcome)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
