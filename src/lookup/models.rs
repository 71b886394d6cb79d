//! HMM state models from a context builder state log.
//!
//! Each log line names a state model and lists its context groups:
//!
//! ```text
//! a_1.0 ... -1={b c} 0={a} 1={si}
//! ```
//!
//! Group `0` holds the center phones, `-1` and `1` the left and right
//! context phones.
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::symbols::StateSymbolTable;

/// Symbols that precede the state models in the state symbol table
/// (`.eps` and `.wb`).
pub const RESERVED_SYMBOLS: i64 = 2;

static GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9\-]+)=\{([^}]*)\}").unwrap());
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)_([0-9]+)\.[0-9]+").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected 3 context groups, found {found}")]
    ContextGroups { line: usize, found: usize },
    #[error("line {line}: context groups must be -1, 0, 1; found {found:?}")]
    ContextOrder { line: usize, found: Vec<String> },
    #[error("invalid state model name {0:?}")]
    StateName(String),
    #[error("state model {0:?} has no valid key in the state symbol table")]
    UnknownModel(String),
    #[error("ambiguous lookup for {center} in state {state}: models {first} and {second} match")]
    Ambiguous {
        center: String,
        state: usize,
        first: i64,
        second: i64,
    },
}

pub type ContextSet = BTreeSet<String>;

/// Left and right context accepted by one state model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelContext {
    pub left: ContextSet,
    pub right: ContextSet,
}

impl ModelContext {
    fn is_unconstrained(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct HmmStateModels {
    /// Per state: center phone to model groups.
    center_idx: Vec<HashMap<String, Vec<usize>>>,
    /// Per group: model index to its context.
    models: Vec<IndexMap<i64, ModelContext>>,
    ci_phones: HashSet<String>,
    empty_context: ContextSet,
}

impl HmmStateModels {
    pub fn new<I, S>(ci_phones: I, empty_context: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ci_phones: ci_phones.into_iter().map(Into::into).collect(),
            empty_context: ContextSet::from([empty_context.into()]),
            ..Default::default()
        }
    }

    pub fn parse_log_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        symbols: &StateSymbolTable,
    ) -> Result<(), Error> {
        self.parse_log(File::open(path)?, symbols)
    }

    pub fn parse_log<R: Read>(&mut self, reader: R, symbols: &StateSymbolTable) -> Result<(), Error> {
        for (n, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let Some(name) = line.split_whitespace().next() else {
                continue;
            };

            let groups: Vec<_> = GROUP_RE.captures_iter(&line).collect();
            if groups.len() != 3 {
                return Err(Error::ContextGroups {
                    line: n + 1,
                    found: groups.len(),
                });
            }
            let ids: Vec<i32> = groups
                .iter()
                .map(|g| g[1].parse().unwrap_or(i32::MIN))
                .collect();
            if ids != [-1, 0, 1] {
                return Err(Error::ContextOrder {
                    line: n + 1,
                    found: groups.iter().map(|g| g[1].to_string()).collect(),
                });
            }

            self.add_model(name, [&groups[0][2], &groups[1][2], &groups[2][2]], symbols)?;
        }

        Ok(())
    }

    /// Register the state model `name` with its left, center and right
    /// context phone lists.
    pub fn add_model(
        &mut self,
        name: &str,
        context: [&str; 3],
        symbols: &StateSymbolTable,
    ) -> Result<(), Error> {
        let state = NAME_RE
            .captures(name)
            .and_then(|c| c[2].parse::<usize>().ok())
            .and_then(|s| s.checked_sub(1))
            .ok_or_else(|| Error::StateName(name.to_string()))?;

        let model_idx = match symbols.find(name) {
            Some(key) if key > 0 => i64::from(key) - RESERVED_SYMBOLS,
            _ => return Err(Error::UnknownModel(name.to_string())),
        };

        let center_phones: Vec<&str> = context[1].split_whitespace().collect();
        let mut left: ContextSet = context[0].split_whitespace().map(str::to_string).collect();
        let mut right: ContextSet = context[2].split_whitespace().map(str::to_string).collect();

        if self.all_ci(left.iter().map(String::as_str)) {
            left = self.empty_context.clone();
        }
        if self.all_ci(right.iter().map(String::as_str)) {
            right = self.empty_context.clone();
        }
        if self.all_ci(center_phones.iter().copied()) {
            left.clear();
            right.clear();
        }

        let group = self.add_hmm_index(&center_phones, state);
        self.models[group].insert(model_idx, ModelContext { left, right });
        Ok(())
    }

    fn all_ci<'a>(&self, mut phones: impl Iterator<Item = &'a str>) -> bool {
        phones.all(|p| self.ci_phones.contains(p))
    }

    fn add_hmm_index(&mut self, center_phones: &[&str], state: usize) -> usize {
        if self.center_idx.len() <= state {
            self.center_idx.resize_with(state + 1, HashMap::new);
        }
        let group = self.models.len();
        self.models.push(IndexMap::new());
        for &center in center_phones {
            self.center_idx[state]
                .entry(center.to_string())
                .or_default()
                .push(group);
        }
        group
    }

    /// Find the model for `center` in `state` whose context accepts
    /// `left` and `right`. Models without context constraints match a
    /// query without context.
    pub fn find(
        &self,
        left: Option<&str>,
        center: &str,
        right: Option<&str>,
        state: usize,
    ) -> Result<Option<i64>, Error> {
        let Some(groups) = self.center_idx.get(state).and_then(|c| c.get(center)) else {
            return Ok(None);
        };

        let mut found = None;
        for &group in groups {
            for (&model, context) in &self.models[group] {
                let matches = match (left, right) {
                    (None, None) if context.is_unconstrained() => true,
                    (Some(l), Some(r)) => context.left.contains(l) && context.right.contains(r),
                    _ => false,
                };
                if !matches {
                    continue;
                }
                if let Some(first) = found {
                    return Err(Error::Ambiguous {
                        center: center.to_string(),
                        state,
                        first,
                        second: model,
                    });
                }
                found = Some(model);
            }
        }

        tracing::trace!(?left, center, ?right, state, ?found, "lookup");
        Ok(found)
    }

    /// Number of state models registered.
    pub fn len(&self) -> usize {
        self.models.iter().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(text: &str) -> StateSymbolTable {
        StateSymbolTable::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_collapse_ci_context() {
        let syms = symbols(".eps 0\n.wb 1\na_1.0 2\n");
        let mut models = HmmStateModels::new(["si"], "si");
        models
            .parse_log("a_1.0 -1={si} 0={a} 1={si}\n".as_bytes(), &syms)
            .unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models.find(Some("si"), "a", Some("si"), 0).unwrap(), Some(0));
        assert_eq!(models.find(Some("b"), "a", Some("si"), 0).unwrap(), None);
        assert_eq!(models.find(None, "a", None, 0).unwrap(), None);
    }

    #[test]
    fn test_context_independent_center() {
        let syms = symbols(".eps 0\n.wb 1\nsi_1.0 2\nsi_2.0 3\n");
        let mut models = HmmStateModels::new(["si"], "si");
        models
            .parse_log(
                "si_1.0 -1={a b} 0={si} 1={a}\nsi_2.0 -1={a} 0={si} 1={b}\n".as_bytes(),
                &syms,
            )
            .unwrap();

        assert_eq!(models.find(None, "si", None, 0).unwrap(), Some(0));
        assert_eq!(models.find(None, "si", None, 1).unwrap(), Some(1));
        assert_eq!(models.find(Some("a"), "si", Some("a"), 0).unwrap(), None);
    }

    #[test]
    fn test_disjoint_contexts() {
        let syms = symbols(".eps 0\n.wb 1\na_1.0 2\na_1.1 3\n");
        let mut models = HmmStateModels::new(["si"], "si");
        models
            .parse_log(
                "a_1.0 -1={b c} 0={a e} 1={b}\na_1.1 -1={d} 0={a} 1={b}\n".as_bytes(),
                &syms,
            )
            .unwrap();

        assert_eq!(models.find(Some("c"), "a", Some("b"), 0).unwrap(), Some(0));
        assert_eq!(models.find(Some("c"), "e", Some("b"), 0).unwrap(), Some(0));
        assert_eq!(models.find(Some("d"), "a", Some("b"), 0).unwrap(), Some(1));
        assert_eq!(models.find(Some("x"), "a", Some("b"), 0).unwrap(), None);
        assert_eq!(models.find(Some("d"), "a", Some("b"), 4).unwrap(), None);
    }

    #[test]
    fn test_ambiguous() {
        let syms = symbols("a_1.0 2\na_1.1 3\n");
        let mut models = HmmStateModels::new(["si"], "si");
        models
            .parse_log(
                "a_1.0 -1={b} 0={a} 1={b}\na_1.1 -1={b} 0={a} 1={b c}\n".as_bytes(),
                &syms,
            )
            .unwrap();

        let err = models.find(Some("b"), "a", Some("b"), 0).unwrap_err();
        assert!(matches!(err, Error::Ambiguous { first: 0, second: 1, .. }));
        assert_eq!(models.find(Some("b"), "a", Some("c"), 0).unwrap(), Some(1));
    }

    #[test]
    fn test_malformed_groups() {
        let syms = symbols("a_1.0 2\n");
        let mut models = HmmStateModels::new(["si"], "si");

        let err = models
            .parse_log("a_1.0 -1={b} 0={a}\n".as_bytes(), &syms)
            .unwrap_err();
        assert!(matches!(err, Error::ContextGroups { line: 1, found: 2 }));

        let err = models
            .parse_log("a_1.0 0={b} -1={a} 1={c}\n".as_bytes(), &syms)
            .unwrap_err();
        assert!(matches!(err, Error::ContextOrder { line: 1, .. }));
    }

    #[test]
    fn test_unknown_model_and_bad_name() {
        let syms = symbols(".eps 0\na_1.0 2\n");
        let mut models = HmmStateModels::new(["si"], "si");

        let err = models
            .parse_log("b_1.0 -1={b} 0={b} 1={b}\n".as_bytes(), &syms)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownModel(name) if name == "b_1.0"));

        let err = models
            .parse_log("a_0.0 -1={b} 0={a} 1={b}\n".as_bytes(), &syms)
            .unwrap_err();
        assert!(matches!(err, Error::StateName(_)));
    }
}
