//! Configuration types deserialized from `incre.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// Default size of a 16-bit member index space.
pub const DEFAULT_REFERENCE_CAPACITY: usize = 65_536;

/// Default directory, relative to the project root, holding persisted snapshots.
pub const DEFAULT_STATE_DIR: &str = ".incre";

/// The top-level configuration parsed from `incre.toml`.
///
/// Every section is optional; a missing section takes its defaults.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct IncreConfig {
    /// Snapshot scanning and persistence settings.
    #[serde(default)]
    pub snapshot: SnapshotSettings,
    /// Reference-budget merging settings.
    #[serde(default)]
    pub merge: MergeSettings,
}

/// Settings controlling how a directory is scanned into a snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    /// Directory (relative to the project root) where snapshots are persisted.
    pub state_dir: String,
    /// Which file properties make up an item's fingerprint.
    pub fingerprint: FingerprintMode,
    /// File extensions (without the leading dot) to include. Empty accepts all.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub extensions: Vec<String>,
    /// Skip files and directories whose name starts with a dot.
    pub skip_hidden: bool,
    /// Walk top-level entries on parallel workers.
    pub parallel: bool,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            state_dir: DEFAULT_STATE_DIR.to_string(),
            fingerprint: FingerprintMode::default(),
            extensions: Vec::new(),
            skip_hidden: true,
            parallel: false,
        }
    }
}

/// How a scanned file's fingerprint is computed.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    /// Last-modified time plus byte length (default). Cheap, reads no content.
    #[default]
    Metadata,
    /// XXH3-128 hash of the file bytes plus byte length.
    Content,
}

/// Capacities of the reference-budget merging strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Maximum distinct field references per output group.
    pub field_capacity: usize,
    /// Maximum distinct method references per output group.
    pub method_capacity: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            field_capacity: DEFAULT_REFERENCE_CAPACITY,
            method_capacity: DEFAULT_REFERENCE_CAPACITY,
        }
    }
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows both `extensions = "java"` and `extensions = ["java", "kt"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
