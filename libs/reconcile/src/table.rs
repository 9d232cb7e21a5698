//! Instance-type capacity table.
//!
//! Maps an EC2 instance type to the number of EBS volumes that can still be
//! attached once the root volume, network interfaces and instance-store NVMe
//! devices have taken their attachment slots:
//!
//! ```text
//! 28 - 1 (root volume) - network interfaces - instance-store NVMe volumes
//! ```
//!
//! See <https://github.com/kubernetes/kubernetes/issues/80967> and
//! <https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/using-eni.html>.
//!
//! The table is curated offline. Changing it means shipping a new build.

use std::collections::BTreeMap;

/// Shared attachment ceiling for Nitro-based instances.
pub const ATTACHMENT_LIMIT: u32 = 28;

/// Builtin entries, sorted by instance type.
const BUILTIN: &[(&str, &str)] = &[
    ("a1.2xlarge", "23"),
    ("a1.4xlarge", "23"),
    ("a1.large", "24"),
    ("a1.medium", "25"),
    ("a1.metal", "23"),
    ("a1.xlarge", "23"),
    ("c1.medium", "25"),
    ("c1.xlarge", "23"),
    ("c3.2xlarge", "23"),
    ("c3.4xlarge", "23"),
    ("c3.8xlarge", "23"),
    ("c3.large", "24"),
    ("c3.xlarge", "23"),
    ("c4.2xlarge", "23"),
    ("c4.4xlarge", "23"),
    ("c4.8xlarge", "23"),
    ("c4.large", "24"),
    ("c4.xlarge", "23"),
    ("c5.12xlarge", "23"),
    ("c5.18xlarge", "24"),
    ("c5.24xlarge", "24"),
    ("c5.2xlarge", "23"),
    ("c5.4xlarge", "23"),
    ("c5.9xlarge", "23"),
    ("c5.large", "24"),
    ("c5.metal", "24"),
    ("c5.xlarge", "23"),
    ("c5d.12xlarge", "21"),
    ("c5d.18xlarge", "22"),
    ("c5d.24xlarge", "20"),
    ("c5d.2xlarge", "22"),
    ("c5d.4xlarge", "22"),
    ("c5d.9xlarge", "22"),
    ("c5d.large", "23"),
    ("c5d.metal", "20"),
    ("c5d.xlarge", "22"),
    ("c5n.18xlarge", "24"),
    ("c5n.2xlarge", "23"),
    ("c5n.4xlarge", "23"),
    ("c5n.9xlarge", "23"),
    ("c5n.large", "24"),
    ("c5n.metal", "24"),
    ("c5n.xlarge", "23"),
    ("cc2.8xlarge", "23"),
    ("cr1.8xlarge", "23"),
    ("d2.2xlarge", "23"),
    ("d2.4xlarge", "23"),
    ("d2.8xlarge", "23"),
    ("d2.xlarge", "23"),
    ("f1.16xlarge", "24"),
    ("f1.2xlarge", "23"),
    ("f1.4xlarge", "23"),
    ("g2.2xlarge", "23"),
    ("g2.8xlarge", "23"),
    ("g3.16xlarge", "24"),
    ("g3.4xlarge", "23"),
    ("g3.8xlarge", "23"),
    ("g3s.xlarge", "23"),
    ("g4dn.12xlarge", "23"),
    ("g4dn.16xlarge", "23"),
    ("g4dn.2xlarge", "24"),
    ("g4dn.4xlarge", "24"),
    ("g4dn.8xlarge", "23"),
    ("g4dn.xlarge", "24"),
    ("h1.16xlarge", "24"),
    ("h1.2xlarge", "23"),
    ("h1.4xlarge", "23"),
    ("h1.8xlarge", "23"),
    ("hs1.8xlarge", "23"),
    ("i2.2xlarge", "23"),
    ("i2.4xlarge", "23"),
    ("i2.8xlarge", "23"),
    ("i2.xlarge", "23"),
    ("i3.16xlarge", "16"),
    ("i3.2xlarge", "22"),
    ("i3.4xlarge", "21"),
    ("i3.8xlarge", "19"),
    ("i3.large", "23"),
    ("i3.metal", "16"),
    ("i3.xlarge", "22"),
    ("i3en.12xlarge", "23"),
    ("i3en.24xlarge", "24"),
    ("i3en.2xlarge", "23"),
    ("i3en.3xlarge", "23"),
    ("i3en.6xlarge", "23"),
    ("i3en.large", "24"),
    ("i3en.metal", "24"),
    ("i3en.xlarge", "23"),
    ("inf1.24xlarge", "23"),
    ("inf1.2xlarge", "23"),
    ("inf1.6xlarge", "23"),
    ("inf1.xlarge", "23"),
    ("m1.large", "24"),
    ("m1.medium", "25"),
    ("m1.small", "25"),
    ("m1.xlarge", "23"),
    ("m2.2xlarge", "23"),
    ("m2.4xlarge", "23"),
    ("m2.xlarge", "23"),
    ("m3.2xlarge", "23"),
    ("m3.large", "24"),
    ("m3.medium", "25"),
    ("m3.xlarge", "23"),
    ("m4.10xlarge", "23"),
    ("m4.16xlarge", "23"),
    ("m4.2xlarge", "23"),
    ("m4.4xlarge", "23"),
    ("m4.large", "25"),
    ("m4.xlarge", "23"),
    ("m5.12xlarge", "23"),
    ("m5.16xlarge", "24"),
    ("m5.24xlarge", "24"),
    ("m5.2xlarge", "23"),
    ("m5.4xlarge", "23"),
    ("m5.8xlarge", "23"),
    ("m5.large", "24"),
    ("m5.metal", "24"),
    ("m5.xlarge", "23"),
    ("m5a.12xlarge", "23"),
    ("m5a.16xlarge", "24"),
    ("m5a.24xlarge", "24"),
    ("m5a.2xlarge", "23"),
    ("m5a.4xlarge", "23"),
    ("m5a.8xlarge", "23"),
    ("m5a.large", "24"),
    ("m5a.xlarge", "23"),
    ("m5ad.12xlarge", "21"),
    ("m5ad.16xlarge", "20"),
    ("m5ad.24xlarge", "20"),
    ("m5ad.2xlarge", "22"),
    ("m5ad.4xlarge", "21"),
    ("m5ad.8xlarge", "21"),
    ("m5ad.large", "23"),
    ("m5ad.xlarge", "22"),
    ("m5d.12xlarge", "21"),
    ("m5d.16xlarge", "20"),
    ("m5d.24xlarge", "20"),
    ("m5d.2xlarge", "22"),
    ("m5d.4xlarge", "21"),
    ("m5d.8xlarge", "21"),
    ("m5d.large", "23"),
    ("m5d.metal", "20"),
    ("m5d.xlarge", "22"),
    ("m5dn.12xlarge", "21"),
    ("m5dn.16xlarge", "20"),
    ("m5dn.24xlarge", "20"),
    ("m5dn.2xlarge", "22"),
    ("m5dn.4xlarge", "21"),
    ("m5dn.8xlarge", "21"),
    ("m5dn.large", "23"),
    ("m5dn.xlarge", "22"),
    ("m5n.12xlarge", "23"),
    ("m5n.16xlarge", "24"),
    ("m5n.24xlarge", "24"),
    ("m5n.2xlarge", "23"),
    ("m5n.4xlarge", "23"),
    ("m5n.8xlarge", "23"),
    ("m5n.large", "24"),
    ("m5n.xlarge", "23"),
    ("p2.16xlarge", "23"),
    ("p2.8xlarge", "23"),
    ("p2.xlarge", "23"),
    ("p3.16xlarge", "23"),
    ("p3.2xlarge", "23"),
    ("p3.8xlarge", "23"),
    ("p3dn.24xlarge", "24"),
    ("r3.2xlarge", "23"),
    ("r3.4xlarge", "23"),
    ("r3.8xlarge", "23"),
    ("r3.large", "24"),
    ("r3.xlarge", "23"),
    ("r4.16xlarge", "24"),
    ("r4.2xlarge", "23"),
    ("r4.4xlarge", "23"),
    ("r4.8xlarge", "23"),
    ("r4.large", "24"),
    ("r4.xlarge", "23"),
    ("r5.12xlarge", "23"),
    ("r5.16xlarge", "24"),
    ("r5.24xlarge", "24"),
    ("r5.2xlarge", "23"),
    ("r5.4xlarge", "23"),
    ("r5.8xlarge", "23"),
    ("r5.large", "24"),
    ("r5.metal", "24"),
    ("r5.xlarge", "23"),
    ("r5a.12xlarge", "23"),
    ("r5a.16xlarge", "24"),
    ("r5a.24xlarge", "24"),
    ("r5a.2xlarge", "23"),
    ("r5a.4xlarge", "23"),
    ("r5a.8xlarge", "23"),
    ("r5a.large", "24"),
    ("r5a.xlarge", "23"),
    ("r5ad.12xlarge", "21"),
    ("r5ad.16xlarge", "20"),
    ("r5ad.24xlarge", "20"),
    ("r5ad.2xlarge", "22"),
    ("r5ad.4xlarge", "21"),
    ("r5ad.8xlarge", "21"),
    ("r5ad.large", "23"),
    ("r5ad.xlarge", "22"),
    ("r5d.12xlarge", "21"),
    ("r5d.16xlarge", "20"),
    ("r5d.24xlarge", "20"),
    ("r5d.2xlarge", "22"),
    ("r5d.4xlarge", "21"),
    ("r5d.8xlarge", "21"),
    ("r5d.large", "23"),
    ("r5d.metal", "20"),
    ("r5d.xlarge", "22"),
    ("r5dn.12xlarge", "21"),
    ("r5dn.16xlarge", "20"),
    ("r5dn.24xlarge", "20"),
    ("r5dn.2xlarge", "22"),
    ("r5dn.4xlarge", "21"),
    ("r5dn.8xlarge", "21"),
    ("r5dn.large", "23"),
    ("r5dn.xlarge", "22"),
    ("r5n.12xlarge", "23"),
    ("r5n.16xlarge", "24"),
    ("r5n.24xlarge", "24"),
    ("r5n.2xlarge", "23"),
    ("r5n.4xlarge", "23"),
    ("r5n.8xlarge", "23"),
    ("r5n.large", "24"),
    ("r5n.xlarge", "23"),
    ("t1.micro", "25"),
    ("t2.2xlarge", "24"),
    ("t2.large", "24"),
    ("t2.medium", "24"),
    ("t2.micro", "25"),
    ("t2.nano", "25"),
    ("t2.small", "24"),
    ("t2.xlarge", "24"),
    ("t3.2xlarge", "23"),
    ("t3.large", "24"),
    ("t3.medium", "24"),
    ("t3.micro", "25"),
    ("t3.nano", "25"),
    ("t3.small", "24"),
    ("t3.xlarge", "23"),
    ("t3a.2xlarge", "23"),
    ("t3a.large", "24"),
    ("t3a.medium", "24"),
    ("t3a.micro", "25"),
    ("t3a.nano", "25"),
    ("t3a.small", "25"),
    ("t3a.xlarge", "23"),
    ("u-12tb1.metal", "23"),
    ("u-18tb1.metal", "24"),
    ("u-24tb1.metal", "24"),
    ("u-6tb1.metal", "23"),
    ("u-9tb1.metal", "23"),
    ("x1.16xlarge", "23"),
    ("x1.32xlarge", "23"),
    ("x1e.16xlarge", "23"),
    ("x1e.2xlarge", "23"),
    ("x1e.32xlarge", "23"),
    ("x1e.4xlarge", "23"),
    ("x1e.8xlarge", "23"),
    ("x1e.xlarge", "24"),
    ("z1d.12xlarge", "22"),
    ("z1d.2xlarge", "22"),
    ("z1d.3xlarge", "22"),
    ("z1d.6xlarge", "22"),
    ("z1d.large", "23"),
    ("z1d.metal", "22"),
    ("z1d.xlarge", "22"),
];

/// Immutable instance type -> max attachable volumes lookup.
///
/// Values are kept as decimal strings so they compare exactly against the
/// canonical quantity text reported by the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityTable {
    entries: BTreeMap<String, String>,
}

impl CapacityTable {
    /// Build the table of known instance families.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN.iter().copied())
    }

    /// Build a table from arbitrary entries. Later duplicates win.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Target capacity for an instance type, if the type is known.
    pub fn target_for(&self, instance_type: &str) -> Option<&str> {
        self.entries.get(instance_type).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(instance_type, capacity)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for CapacityTable {
    fn default() -> Self {
        Self::builtin()
    }
}
