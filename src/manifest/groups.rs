//! Flattening of group files into ordered package lists.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::ManifestError;
use crate::files::ConfigFiles;

/// A parsed group file mapping group names to their members.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackageGroups {
    file: String,
    groups: Mapping,
}

/// Outcome of resolving selected groups.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolvedPackages {
    /// Packages to install, in group file order, with ignored names removed.
    pub packages: Vec<String>,
    /// Owning group for every member of a selected group, ignored or not.
    pub package_to_group: BTreeMap<String, String>,
}

impl PackageGroups {
    /// Loads the group file `name`. An empty document yields no groups.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file is missing or its root is not
    /// a mapping.
    pub fn load(files: &ConfigFiles, name: &str) -> Result<Self, ManifestError> {
        let value: Value = files.read_yaml(name)?;
        Self::from_value(name, value)
    }

    /// Wraps an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidGroup`] when the root is neither a
    /// mapping nor empty.
    pub fn from_value(file: &str, value: Value) -> Result<Self, ManifestError> {
        let groups = match value {
            Value::Mapping(groups) => groups,
            Value::Null => Mapping::new(),
            other => {
                return Err(ManifestError::InvalidGroup {
                    file: file.to_owned(),
                    group: String::from("<root>"),
                    detail: describe(&other),
                });
            }
        };
        Ok(Self {
            file: file.to_owned(),
            groups,
        })
    }

    /// Flattens the groups named in `selected` (every group when `None`).
    ///
    /// Groups are visited in file order and members keep their declared
    /// order. A package listed more than once keeps its first position and
    /// the group it first appears in. Nested mappings contribute their members to the enclosing
    /// top-level group. Names in `ignore` are left out of
    /// [`ResolvedPackages::packages`] but still recorded in
    /// [`ResolvedPackages::package_to_group`].
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidGroup`] when a member is not a
    /// scalar, list or mapping.
    pub fn resolve(
        &self,
        selected: Option<&[String]>,
        ignore: &[String],
    ) -> Result<ResolvedPackages, ManifestError> {
        let mut resolved = ResolvedPackages::default();
        let mut seen = BTreeSet::new();
        for (key, members) in &self.groups {
            let group = scalar_text(key).ok_or_else(|| self.invalid("<key>", key))?;
            if selected.is_some_and(|names| !names.contains(&group)) {
                continue;
            }

            let mut flattened = Vec::new();
            self.collect(&group, members, &mut flattened)?;
            debug!(file = %self.file, %group, count = flattened.len(), "resolved group");
            for package in flattened {
                if !seen.insert(package.clone()) {
                    continue;
                }
                resolved
                    .package_to_group
                    .insert(package.clone(), group.clone());
                if !ignore.contains(&package) {
                    resolved.packages.push(package);
                }
            }
        }
        Ok(resolved)
    }

    fn collect(
        &self,
        group: &str,
        value: &Value,
        out: &mut Vec<String>,
    ) -> Result<(), ManifestError> {
        match value {
            Value::Null => Ok(()),
            Value::Sequence(items) => {
                for item in items {
                    let name = scalar_text(item).ok_or_else(|| self.invalid(group, item))?;
                    out.push(name);
                }
                Ok(())
            }
            Value::Mapping(nested) => {
                for nested_value in nested.values() {
                    self.collect(group, nested_value, out)?;
                }
                Ok(())
            }
            Value::Tagged(tagged) => self.collect(group, &tagged.value, out),
            other => Err(self.invalid(group, other)),
        }
    }

    fn invalid(&self, group: &str, value: &Value) -> ManifestError {
        ManifestError::InvalidGroup {
            file: self.file.clone(),
            group: group.to_owned(),
            detail: describe(value),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::Bool(flag) => format!("boolean {flag}"),
        Value::Number(number) => format!("number {number}"),
        Value::String(text) => format!("string {text:?}"),
        Value::Sequence(_) => String::from("a list"),
        Value::Mapping(_) => String::from("a mapping"),
        Value::Tagged(tagged) => format!("tagged value {}", tagged.tag),
    }
}
