//! Observed values and the rules for matching them

/// What a getter observed on one poll
///
/// Getters can return either form directly or anything convertible with
/// `Into`: a bare `T` becomes `Single`, a `Vec<T>` becomes `Many` and an
/// `Option<T>` becomes a `Many` of zero or one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T> PollResult<T> {
    /// Number of observed values
    pub fn len(&self) -> usize {
        match self {
            PollResult::Single(_) => 1,
            PollResult::Many(values) => values.len(),
        }
    }

    /// True only for an empty `Many`
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            PollResult::Single(value) => std::slice::from_ref(value).iter(),
            PollResult::Many(values) => values.iter(),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> PollResult<U> {
        match self {
            PollResult::Single(value) => PollResult::Single(f(value)),
            PollResult::Many(values) => PollResult::Many(values.into_iter().map(f).collect()),
        }
    }
}

impl<T> From<T> for PollResult<T> {
    fn from(value: T) -> Self {
        PollResult::Single(value)
    }
}

impl<T> From<Vec<T>> for PollResult<T> {
    fn from(values: Vec<T>) -> Self {
        PollResult::Many(values)
    }
}

impl<T> From<Option<T>> for PollResult<T> {
    fn from(value: Option<T>) -> Self {
        PollResult::Many(value.into_iter().collect())
    }
}

/// The value(s) a check waits for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation<T> {
    Equals(T),
    /// Any of the listed values is acceptable
    OneOf(Vec<T>),
}

impl<T: PartialEq> Expectation<T> {
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Expectation::Equals(expected) => expected == value,
            Expectation::OneOf(expected) => expected.contains(value),
        }
    }
}

impl<T> From<T> for Expectation<T> {
    fn from(value: T) -> Self {
        Expectation::Equals(value)
    }
}

/// Result of evaluating one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Evaluation {
    /// Index of the first accepted element in scan order
    pub matched: Option<usize>,
    /// Whether the check condition holds (match XOR negate)
    pub satisfied: bool,
}

/// Find the first accepted element, scanning back to front when `reverse` is set
pub(crate) fn find_match<T: PartialEq>(
    observed: &PollResult<T>,
    expectation: &Expectation<T>,
    reverse: bool,
) -> Option<usize> {
    match observed {
        PollResult::Single(value) => expectation.accepts(value).then_some(0),
        PollResult::Many(values) if reverse => values.iter().rposition(|v| expectation.accepts(v)),
        PollResult::Many(values) => values.iter().position(|v| expectation.accepts(v)),
    }
}

pub(crate) fn evaluate<T: PartialEq>(
    observed: &PollResult<T>,
    expectation: &Expectation<T>,
    reverse: bool,
    negate: bool,
) -> Evaluation {
    let matched = find_match(observed, expectation, reverse);
    Evaluation {
        matched,
        satisfied: matched.is_some() != negate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(PollResult::<i32>::from(3), PollResult::Single(3));
        assert_eq!(PollResult::<i32>::from(vec![1, 2]), PollResult::Many(vec![1, 2]));
        assert_eq!(PollResult::<i32>::from(Some(7)), PollResult::Many(vec![7]));
        assert!(PollResult::<i32>::from(None).is_empty());
    }

    #[test]
    fn test_single_is_never_empty() {
        let single = PollResult::Single("x");
        assert_eq!(single.len(), 1);
        assert_eq!(single.iter().collect::<Vec<_>>(), vec![&"x"]);
    }

    #[test]
    fn test_one_of_accepts_any_listed() {
        let expectation = Expectation::OneOf(vec!["Stopped", "Finished"]);
        assert!(expectation.accepts(&"Finished"));
        assert!(!expectation.accepts(&"Running"));
    }

    #[test]
    fn test_reverse_finds_last_match() {
        let observed = PollResult::Many(vec![1, 5, 2, 5]);
        let expectation = Expectation::Equals(5);

        assert_eq!(find_match(&observed, &expectation, false), Some(1));
        assert_eq!(find_match(&observed, &expectation, true), Some(3));
    }

    #[test]
    fn test_negate_inverts_satisfaction() {
        let observed = PollResult::Many(vec!["a", "b"]);
        let expectation = Expectation::Equals("c");

        assert!(!evaluate(&observed, &expectation, false, false).satisfied);
        assert!(evaluate(&observed, &expectation, false, true).satisfied);
    }

    #[test]
    fn test_empty_many_never_matches() {
        let observed: PollResult<&str> = PollResult::Many(Vec::new());
        let expectation = Expectation::Equals("anything");

        let plain = evaluate(&observed, &expectation, false, false);
        assert_eq!(plain.matched, None);
        assert!(!plain.satisfied);
        assert!(evaluate(&observed, &expectation, true, true).satisfied);
    }
}
