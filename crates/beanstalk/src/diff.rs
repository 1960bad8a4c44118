//! Variable overlay diffing.
//!
//! Turns the snapshot's overlay into the option lists an update request
//! carries: variables to write and variables to delete.

use crate::types::{ENVIRONMENT_NAMESPACE, OptionSetting, OptionSpecification, VarValue};
use std::collections::BTreeMap;

/// Options to write and options to remove for one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarDiff {
    /// Variables to write, in key order.
    pub to_set: Vec<OptionSetting>,
    /// Variables to delete, in key order.
    pub to_remove: Vec<OptionSpecification>,
}

impl VarDiff {
    /// Total number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_set.len() + self.to_remove.len()
    }

    /// Check if there is nothing to send.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition an overlay into set and remove instructions.
///
/// Every key lands in exactly one of the two lists. Keys absent from the
/// overlay produce nothing and stay untouched remotely.
///
/// ```
/// use beanstalk::VarValue;
/// use beanstalk::diff::diff_vars;
/// use std::collections::BTreeMap;
///
/// let mut overlay = BTreeMap::new();
/// overlay.insert("API_KEY".to_string(), VarValue::set("secret"));
/// overlay.insert("LEGACY".to_string(), VarValue::Remove);
///
/// let diff = diff_vars(&overlay);
/// assert_eq!(diff.to_set[0].option_name, "API_KEY");
/// assert_eq!(diff.to_remove[0].option_name, "LEGACY");
/// ```
#[must_use]
pub fn diff_vars(overlay: &BTreeMap<String, VarValue>) -> VarDiff {
    let mut diff = VarDiff::default();

    for (key, value) in overlay {
        match value {
            VarValue::Set(value) => diff
                .to_set
                .push(OptionSetting::new(ENVIRONMENT_NAMESPACE, key, value)),
            VarValue::Remove => diff
                .to_remove
                .push(OptionSpecification::new(ENVIRONMENT_NAMESPACE, key)),
        }
    }

    diff
}
