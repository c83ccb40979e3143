//! Diff computation between desired and live target group state.
//!
//! Both diffs are pure functions of their inputs. The follow-up planning that
//! turns them into queued operations lives in the reconciler.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::desired::{AdvancedAttributes, Tags};

/// Tag changes needed to turn the live tag set into the desired one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagDiff {
  /// Live keys that must go.
  pub to_remove: BTreeSet<String>,

  /// Keys to add or overwrite.
  pub to_add: Tags,

  /// The definition carries no tags at all, so every live tag is cleared.
  pub full_clear: bool,
}

impl TagDiff {
  /// Returns true if there are no changes to make.
  pub fn is_empty(&self) -> bool {
    self.to_remove.is_empty() && self.to_add.is_empty()
  }

  /// Apply the removals then the additions to `live`.
  pub fn apply(&self, live: &Tags) -> Tags {
    let mut result: Tags = live
      .iter()
      .filter(|(key, _)| !self.to_remove.contains(*key))
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();
    result.extend(self.to_add.iter().map(|(k, v)| (k.clone(), v.clone())));
    result
  }
}

/// Compute the tag diff.
///
/// # Diff Logic
///
/// - Live key absent from desired → `to_remove`
/// - Desired key absent from live, or with a different value → `to_add`
/// - `desired` is `None` → every live key goes to `to_remove` and
///   `full_clear` is set
///
/// A key whose value changed is overwritten by the add, never removed first.
pub fn diff_tags(desired: Option<&Tags>, live: &Tags) -> TagDiff {
  let Some(desired) = desired else {
    return TagDiff {
      to_remove: live.keys().cloned().collect(),
      to_add: Tags::new(),
      full_clear: true,
    };
  };

  let to_remove = live.keys().filter(|key| !desired.contains_key(*key)).cloned().collect();

  let to_add = desired
    .iter()
    .filter(|(key, value)| live.get(*key) != Some(*value))
    .map(|(k, v)| (k.clone(), v.clone()))
    .collect();

  TagDiff {
    to_remove,
    to_add,
    full_clear: false,
  }
}

/// Compute the full advanced attribute mapping to write.
///
/// Every key in `live_keys` appears in the result with the desired value when
/// the user supplied one, otherwise with its documented default. Keys outside
/// `live_keys` are never written; the live resource decides which keys are
/// legal for its configuration. A live key with neither a desired value nor a
/// known default is left out.
pub fn diff_advanced_attributes<'a>(
  desired: &AdvancedAttributes,
  live_keys: impl IntoIterator<Item = &'a String>,
  defaults: &BTreeMap<String, String>,
) -> AdvancedAttributes {
  let mut update = AdvancedAttributes::new();
  for key in live_keys {
    match desired.get(key).or_else(|| defaults.get(key)) {
      Some(value) => {
        update.insert(key.clone(), value.clone());
      }
      None => debug!(key = %key, "live attribute has no default, leaving it untouched"),
    }
  }
  update
}
