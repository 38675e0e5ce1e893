
/// The set of symbols to stub from one package
///
/// Names are deduplicated while keeping first-seen order, so that the
/// rendered stub follows the order the caller asked for. A name listed both
/// as a type and as a function/variable is kept only as a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRequest {
    /// Go import path of the package to stub
    pub package: String,

    /// Requested type names
    pub types: Vec<String>,

    /// Requested function, variable and constant names
    pub values: Vec<String>,
}

impl SymbolRequest {
    pub fn new<T, V>(package: impl Into<String>, types: T, values: V) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let types = dedup(types.into_iter().map(Into::into));
        let values = dedup(values.into_iter().map(Into::into))
            .into_iter()
            .filter(|v| !types.contains(v))
            .collect();

        Self {
            package: package.into(),
            types,
            values,
        }
    }

    /// Build a request from the comma-separated lists used on the command line
    pub fn from_lists(package: &str, types: &str, values: &str) -> Self {
        Self::new(package, split_list(types), split_list(values))
    }

    /// All requested names, types first
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().chain(self.values.iter()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.values.is_empty()
    }

    /// Requested types joined the way they are written on the command line
    pub fn type_list(&self) -> String {
        self.types.join(",")
    }

    /// Requested functions and variables joined the way they are written on the command line
    pub fn value_list(&self) -> String {
        self.values.join(",")
    }
}

/// Split a comma-separated symbol list, dropping empty entries
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn dedup(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
