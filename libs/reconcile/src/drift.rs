//! Drift detection and the per-node capacity decision.

use crate::table::CapacityTable;

/// Whether the current capacity must be corrected to `target`.
///
/// Textual comparison: the API server reports canonical decimal strings and
/// the table stores the same form.
pub fn needs_update(current: Option<&str>, target: &str) -> bool {
    current != Some(target)
}

/// Outcome of comparing one node against the capacity table.
///
/// Only [`CapacityDecision::evaluate`] builds one, so an unknown instance
/// type can never carry `needs_update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityDecision {
    instance_type: String,
    target_capacity: Option<String>,
    current_capacity: Option<String>,
    needs_update: bool,
}

impl CapacityDecision {
    /// Decide for a node of `instance_type` currently reporting `current`.
    pub fn evaluate(table: &CapacityTable, instance_type: &str, current: Option<&str>) -> Self {
        let target = table.target_for(instance_type);
        let needs_update = match target {
            Some(target) => needs_update(current, target),
            None => false,
        };

        Self {
            instance_type: instance_type.to_string(),
            target_capacity: target.map(str::to_string),
            current_capacity: current.map(str::to_string),
            needs_update,
        }
    }

    /// Resolved instance type.
    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    /// Target from the table, `None` when the type is unknown.
    pub fn target_capacity(&self) -> Option<&str> {
        self.target_capacity.as_deref()
    }

    /// Capacity currently reported by the node.
    pub fn current_capacity(&self) -> Option<&str> {
        self.current_capacity.as_deref()
    }

    /// True only when the type is known and the node drifted.
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn type_known(&self) -> bool {
        self.target_capacity.is_some()
    }

    pub fn current_capacity_present(&self) -> bool {
        self.current_capacity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, "24", true)]
    #[case(Some("24"), "24", false)]
    #[case(Some("23"), "24", true)]
    #[case(Some("024"), "24", true)]
    #[case(Some(""), "24", true)]
    fn test_needs_update(#[case] current: Option<&str>, #[case] target: &str, #[case] want: bool) {
        assert_eq!(needs_update(current, target), want);
    }

    #[test]
    fn test_c5_large_without_capacity() {
        let decision = CapacityDecision::evaluate(&CapacityTable::builtin(), "c5.large", None);
        assert!(decision.type_known());
        assert!(!decision.current_capacity_present());
        assert!(decision.needs_update());
        assert_eq!(decision.target_capacity(), Some("24"));
        assert_eq!(decision.instance_type(), "c5.large");
    }

    #[test]
    fn test_unknown_type_decision_is_inert() {
        let decision =
            CapacityDecision::evaluate(&CapacityTable::builtin(), "x99.enormous", Some("7"));
        assert_eq!(decision.instance_type(), "x99.enormous");
        assert_eq!(decision.target_capacity(), None);
        assert_eq!(decision.current_capacity(), Some("7"));
        assert!(!decision.type_known());
        assert!(!decision.needs_update());
    }

    #[test]
    fn test_i3_16xlarge_in_sync() {
        let decision =
            CapacityDecision::evaluate(&CapacityTable::builtin(), "i3.16xlarge", Some("16"));
        assert!(!decision.needs_update());
    }

    proptest! {
        #[test]
        fn unknown_type_is_never_corrected(
            instance_type in "[a-z]{1,3}[0-9]{2,3}\\.[a-z]{1,8}",
            current in proptest::option::of("[0-9]{0,3}"),
        ) {
            let table = CapacityTable::builtin();
            prop_assume!(table.target_for(&instance_type).is_none());

            let decision = CapacityDecision::evaluate(&table, &instance_type, current.as_deref());
            prop_assert!(!decision.type_known());
            prop_assert!(!decision.needs_update());
        }

        #[test]
        fn matching_capacity_is_in_sync(index in 0usize..1000) {
            let table = CapacityTable::builtin();
            let (instance_type, target) = table.iter().nth(index % table.len()).unwrap();

            let decision = CapacityDecision::evaluate(&table, instance_type, Some(target));
            prop_assert!(!decision.needs_update());
        }

        #[test]
        fn drifted_capacity_targets_table_value(
            index in 0usize..1000,
            current in proptest::option::of("[0-9]{1,3}"),
        ) {
            let table = CapacityTable::builtin();
            let (instance_type, target) = table.iter().nth(index % table.len()).unwrap();
            prop_assume!(current.as_deref() != Some(target));

            let decision = CapacityDecision::evaluate(&table, instance_type, current.as_deref());
            prop_assert!(decision.needs_update());
            prop_assert_eq!(decision.target_capacity(), Some(target));
        }
    }
}
