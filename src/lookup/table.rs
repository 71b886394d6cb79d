use std::{
    collections::HashSet,
    io::{BufRead, Write},
};

use super::{
    allophone::{self, AllophoneState},
    models::{self, HmmStateModels},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Allophone(#[from] allophone::Error),
    #[error("{0}")]
    Models(#[from] models::Error),
}

/// Outcome of looking up one allophone state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Matched with the descriptor's own phone symbol.
    Exact(i64),
    /// Matched only after dropping the word boundary markers.
    Unmarked(i64),
    NotFound,
}

impl Resolution {
    pub fn model(&self) -> Option<i64> {
        match self {
            Resolution::Exact(m) | Resolution::Unmarked(m) => Some(*m),
            Resolution::NotFound => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub mapped: usize,
    pub unmapped: usize,
}

/// Maps allophone state descriptors to HMM state model indices.
pub struct LookupTable<'a> {
    models: &'a HmmStateModels,
    ci_phones: HashSet<String>,
    empty_context: String,
}

impl<'a> LookupTable<'a> {
    pub fn new<I, S>(models: &'a HmmStateModels, ci_phones: I, empty_context: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models,
            ci_phones: ci_phones.into_iter().map(Into::into).collect(),
            empty_context: empty_context.into(),
        }
    }

    pub fn parse(&self, descriptor: &str) -> Result<AllophoneState, Error> {
        Ok(AllophoneState::parse(descriptor, &self.empty_context)?)
    }

    /// Context independent centers are looked up without context. A
    /// boundary phone that is not found is retried with the bare center.
    pub fn resolve(&self, allophone: &AllophoneState) -> Result<Resolution, Error> {
        let state = allophone.state;

        let (left, center, right) = if self.ci_phones.contains(&allophone.center) {
            (None, allophone.center.clone(), None)
        } else {
            (
                Some(allophone.context[0].as_str()),
                allophone.phone_symbol(),
                Some(allophone.context[1].as_str()),
            )
        };

        if let Some(m) = self.models.find(left, &center, right, state)? {
            return Ok(Resolution::Exact(m));
        }
        if allophone.is_boundary() {
            if let Some(m) = self.models.find(left, &allophone.center, right, state)? {
                return Ok(Resolution::Unmarked(m));
            }
        }
        Ok(Resolution::NotFound)
    }

    /// Write `<descriptor> <model>` for every descriptor in `input`.
    ///
    /// Blank lines and `#` comments are skipped. Misses are reported on
    /// `diagnostics` and left out of `out`.
    pub fn write<R, W, E>(&self, input: R, out: &mut W, diagnostics: &mut E) -> Result<Summary, Error>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut summary = Summary::default();

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let allophone = self.parse(line)?;
            let resolution = self.resolve(&allophone)?;
            tracing::debug!(descriptor = line, ?resolution, "resolved");

            if !matches!(resolution, Resolution::Exact(_)) {
                writeln!(diagnostics, "[WARNING] not found: {line}")?;
            }
            match resolution.model() {
                Some(m) => {
                    writeln!(out, "{line} {m}")?;
                    summary.mapped += 1;
                }
                None => {
                    writeln!(diagnostics, "[ERROR] cannot map {line}")?;
                    summary.unmapped += 1;
                }
            }
        }

        Ok(summary)
    }
}
