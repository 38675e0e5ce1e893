use super::SymbolRequest;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Identifiers one local compilation unit uses from a single external package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageUsage {
    /// Names used in type position (`pkg.T` in a declaration, field, parameter or literal type)
    pub types: BTreeSet<String>,
    /// Names used as values (`pkg.F()`, `pkg.V`)
    pub values: BTreeSet<String>,
    /// Source directories that reference the package
    pub dirs: BTreeSet<PathBuf>,
}

/// External package path → symbols referenced from local code
///
/// Built by the usage scanner and never mutated afterwards. Serializes as
/// a map keyed by package path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UsageIndex {
    packages: BTreeMap<String, PackageUsage>,
}

impl UsageIndex {
    pub fn from_packages(mut packages: BTreeMap<String, PackageUsage>) -> Self {
        for usage in packages.values_mut() {
            let types = usage.types.clone();
            usage.values.retain(|v| !types.contains(v));
        }
        packages.retain(|_, u| !u.types.is_empty() || !u.values.is_empty());
        Self { packages }
    }

    pub fn get(&self, package: &str) -> Option<&PackageUsage> {
        self.packages.get(package)
    }

    /// Package paths in sorted order
    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageUsage)> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// One request per package, sorted by package path
    pub fn requests(&self) -> Vec<SymbolRequest> {
        self.packages
            .iter()
            .map(|(path, usage)| {
                SymbolRequest::new(path.as_str(), usage.types.iter().cloned(), usage.values.iter().cloned())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(types: &[&str], values: &[&str]) -> PackageUsage {
        PackageUsage {
            types: types.iter().map(|s| s.to_string()).collect(),
            values: values.iter().map(|s| s.to_string()).collect(),
            dirs: BTreeSet::new(),
        }
    }

    #[test]
    fn test_requests_are_sorted_by_path() {
        let mut packages = BTreeMap::new();
        packages.insert("github.com/z/z".to_string(), usage(&["Z"], &[]));
        packages.insert("github.com/a/a".to_string(), usage(&[], &["New"]));

        let index = UsageIndex::from_packages(packages);
        let requests = index.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].package, "github.com/a/a");
        assert_eq!(requests[0].values, vec!["New"]);
        assert_eq!(requests[1].types, vec!["Z"]);
    }

    #[test]
    fn test_type_usage_wins() {
        let mut packages = BTreeMap::new();
        packages.insert("x.io/p".to_string(), usage(&["Kind"], &["Kind", "Parse"]));

        let index = UsageIndex::from_packages(packages);
        let p = index.get("x.io/p").unwrap();
        assert!(p.types.contains("Kind"));
        assert!(!p.values.contains("Kind"));
        assert!(p.values.contains("Parse"));
    }

    #[test]
    fn test_empty_usages_are_dropped() {
        let mut packages = BTreeMap::new();
        packages.insert("x.io/p".to_string(), usage(&[], &[]));
        assert!(UsageIndex::from_packages(packages).is_empty());
    }
}
