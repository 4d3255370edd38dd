//! Set difference between desired and observed membership.
//!
//! Every enrolment, removal and archival decision goes through
//! [`diff`]: applying `to_add` and `to_remove` to the observed set yields
//! exactly the desired set.

use std::collections::BTreeSet;

use serde::Serialize;

/// Result of differencing a desired set against an observed set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetDiff<T: Ord> {
    /// Desired but not observed
    pub to_add: BTreeSet<T>,
    /// Observed but not desired
    pub to_remove: BTreeSet<T>,
}

impl<T: Ord> SetDiff<T> {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_remove.is_empty()
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

impl<T: Ord> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            to_add: BTreeSet::new(),
            to_remove: BTreeSet::new(),
        }
    }
}

/// Compute `desired \ observed` and `observed \ desired`.
///
/// Inputs may contain duplicates; each element appears at most once in the
/// result.
pub fn diff<T, D, O>(desired: D, observed: O) -> SetDiff<T>
where
    T: Ord + Clone,
    D: IntoIterator<Item = T>,
    O: IntoIterator<Item = T>,
{
    let desired: BTreeSet<T> = desired.into_iter().collect();
    let observed: BTreeSet<T> = observed.into_iter().collect();

    SetDiff {
        to_add: desired.difference(&observed).cloned().collect(),
        to_remove: observed.difference(&desired).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_changes() {
        let result = diff(set(&["a", "b"]), set(&["b", "a"]));
        assert!(!result.has_changes());
        assert_eq!(result.change_count(), 0);
    }

    #[test]
    fn test_additions_and_removals() {
        let result = diff(set(&["a", "b", "c"]), set(&["b", "d"]));
        assert_eq!(result.to_add, set(&["a", "c"]));
        assert_eq!(result.to_remove, set(&["d"]));
    }

    #[test]
    fn test_empty_inputs() {
        let result: SetDiff<String> = diff(Vec::new(), Vec::new());
        assert!(result.to_add.is_empty());
        assert!(result.to_remove.is_empty());
    }

    #[test]
    fn test_empty_to_full() {
        let result = diff(set(&["a"]), BTreeSet::new());
        assert_eq!(result.to_add, set(&["a"]));
        assert!(result.to_remove.is_empty());
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let desired = vec!["a", "a", "b"];
        let observed = vec!["c", "c"];
        let result = diff(desired, observed);
        assert_eq!(result.to_add.len(), 2);
        assert_eq!(result.to_remove.len(), 1);
    }

    #[test]
    fn test_applying_diff_reconstructs_desired() {
        // Every pair of subsets of a four-element universe.
        let universe = ["a", "b", "c", "d"];
        let subset = |mask: u32| -> BTreeSet<&str> {
            universe
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| *s)
                .collect()
        };

        for d_mask in 0..16 {
            for o_mask in 0..16 {
                let desired = subset(d_mask);
                let observed = subset(o_mask);
                let result = diff(desired.clone(), observed.clone());

                assert!(result.to_add.is_disjoint(&observed));
                assert!(result.to_remove.is_disjoint(&desired));

                let applied: BTreeSet<&str> = observed
                    .union(&result.to_add)
                    .filter(|item| !result.to_remove.contains(*item))
                    .copied()
                    .collect();
                assert_eq!(applied, desired);
            }
        }
    }
}
