//! Filter shapes shared by table and view groundings.

use regex::Regex;
use std::sync::Arc;

/// One of three arms: an explicit qualified-name list, a regex, or a
/// predicate callback. Evaluation dispatches by arm.
#[derive(Clone)]
pub enum TableFilter {
    List(Vec<String>),
    Regex(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl TableFilter {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            TableFilter::List(names) => names.iter().any(|n| n == name),
            TableFilter::Regex(re) => re.is_match(name),
            TableFilter::Predicate(f) => f(name),
        }
    }

    /// Whether this filter is an explicit list, in which case seeding skips
    /// enumerating every table name and uses the list directly.
    pub fn is_explicit_list(&self) -> bool {
        matches!(self, TableFilter::List(_))
    }

    pub fn explicit_names(&self) -> Option<&[String]> {
        match self {
            TableFilter::List(names) => Some(names),
            _ => None,
        }
    }
}

impl std::fmt::Debug for TableFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableFilter::List(names) => f.debug_tuple("List").field(names).finish(),
            TableFilter::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            TableFilter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Depth configuration for one BFS direction: no traversal, unbounded, or a
/// hard cap (seed = depth 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    None,
    Unbounded,
    Bounded(u32),
}

impl Depth {
    pub fn traverses(&self) -> bool {
        !matches!(self, Depth::None)
    }

    /// Whether a neighbor at `next_depth` is still within this direction's limit.
    pub fn allows(&self, next_depth: u32) -> bool {
        match self {
            Depth::None => false,
            Depth::Unbounded => true,
            Depth::Bounded(limit) => next_depth <= *limit,
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Depth::None
    }
}
