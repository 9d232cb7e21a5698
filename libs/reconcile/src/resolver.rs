//! Instance type resolution from node labels.

use std::collections::BTreeMap;

/// Label keys carrying the instance type, most preferred first.
///
/// Append-only: older nodes may still only carry a later key.
pub const INSTANCE_TYPE_LABELS: &[&str] = &[
    "node.kubernetes.io/instance-type",
    "beta.kubernetes.io/instance-type",
];

/// Return the value of the first key in `keys` present in `labels`.
pub fn resolve_instance_type<'a, K>(
    labels: &'a BTreeMap<String, String>,
    keys: &[K],
) -> Option<&'a str>
where
    K: AsRef<str>,
{
    keys.iter()
        .find_map(|key| labels.get(key.as_ref()))
        .map(String::as_str)
}
