//! Go naming rules

/// Predeclared type names of the universe scope
const PREDECLARED_TYPES: &[&str] = &[
    "any",
    "bool",
    "byte",
    "comparable",
    "complex64",
    "complex128",
    "error",
    "float32",
    "float64",
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "rune",
    "string",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
];

/// Whether an identifier is exported (starts with an uppercase letter)
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

pub fn is_predeclared_type(name: &str) -> bool {
    PREDECLARED_TYPES.contains(&name)
}

/// Standard library paths have no dot in their first element
pub fn is_standard_library(path: &str) -> bool {
    !path.split('/').next().unwrap_or_default().contains('.')
}

/// Package name a path is imported under when no alias is given
///
/// Follows the usual conventions: a trailing `/vN` major-version element is
/// skipped, a `gopkg.in` `.vN` suffix is dropped, and `go-` prefixes and
/// `-go` suffixes are removed.
pub fn default_package_name(path: &str) -> String {
    let mut elems: Vec<&str> = path.split('/').filter(|e| !e.is_empty()).collect();
    if elems.len() > 1 {
        if let Some(last) = elems.last() {
            if is_major_version(last) {
                elems.pop();
            }
        }
    }

    let mut name = elems.last().copied().unwrap_or(path).to_string();
    if path.starts_with("gopkg.in/") {
        if let Some(idx) = name.rfind(".v") {
            if name[idx + 2..].chars().all(|c| c.is_ascii_digit()) {
                name.truncate(idx);
            }
        }
    }
    if let Some(stripped) = name.strip_prefix("go-") {
        name = stripped.to_string();
    }
    if let Some(stripped) = name.strip_suffix("-go") {
        name = stripped.to_string();
    }

    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Pick the import a qualifier refers to when it matches no default name
///
/// Packages such as `github.com/satori/go.uuid` (package `uuid`) declare a
/// name their path does not spell. The qualifier is compared with the last
/// two path elements, ignoring case, `-`, `_`, `.` and a leading or trailing
/// `go`/`golang`. Gives up unless exactly one path matches.
pub fn guess_import<'p>(qualifier: &str, paths: impl IntoIterator<Item = &'p str>) -> Option<&'p str> {
    let wanted = normalize(qualifier);
    if wanted.is_empty() {
        return None;
    }

    let mut matches = paths.into_iter().filter(|path| {
        path.rsplit('/')
            .filter(|elem| !is_major_version(elem))
            .take(2)
            .any(|elem| name_variants(elem).contains(&wanted))
    });
    let first = matches.next()?;
    match matches.next() {
        None => Some(first),
        Some(_) => None,
    }
}

fn normalize(s: &str) -> String {
    s.replace(['-', '_', '.'], "").to_lowercase()
}

fn name_variants(elem: &str) -> Vec<String> {
    let base = normalize(elem);
    let mut variants = vec![base.clone()];
    for affix in ["golang", "go"] {
        variants.extend(base.strip_prefix(affix).map(String::from));
        variants.extend(base.strip_suffix(affix).map(String::from));
    }
    variants.retain(|v| !v.is_empty());
    variants
}

fn is_major_version(elem: &str) -> bool {
    elem.len() > 1
        && elem.starts_with('v')
        && elem[1..].chars().all(|c| c.is_ascii_digit())
}
