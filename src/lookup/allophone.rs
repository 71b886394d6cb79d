use once_cell::sync::Lazy;
use regex::Regex;

use crate::{FINAL_MARK, INITIAL_MARK};

/// Context symbol used in descriptors for a missing neighbour.
pub const EMPTY_CONTEXT_MARK: &str = "#";

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*)\{([^+]+)\+([^}]+)\}(@i)?(@f)?\.([0-9]+)").unwrap()
});

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot parse symbol: {0}")]
    Malformed(String),
    #[error("invalid state in symbol: {0}")]
    InvalidState(String),
}

/// Parsed allophone state descriptor, `<center>{<left>+<right>}[@i][@f].<state>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllophoneState {
    pub center: String,
    /// Left and right context, with `#` replaced by the empty context phone.
    pub context: [String; 2],
    pub state: usize,
    pub initial: bool,
    pub r#final: bool,
}

impl AllophoneState {
    pub fn parse(symbol: &str, empty_context: &str) -> Result<Self, Error> {
        let captures = SYMBOL_RE
            .captures(symbol)
            .ok_or_else(|| Error::Malformed(symbol.to_string()))?;

        let context = |i: usize| {
            let c = &captures[i];
            if c == EMPTY_CONTEXT_MARK {
                empty_context.to_string()
            } else {
                c.to_string()
            }
        };

        Ok(Self {
            center: captures[1].to_string(),
            context: [context(2), context(3)],
            state: captures[6]
                .parse()
                .map_err(|_| Error::InvalidState(symbol.to_string()))?,
            initial: captures.get(4).is_some(),
            r#final: captures.get(5).is_some(),
        })
    }

    pub fn is_boundary(&self) -> bool {
        self.initial || self.r#final
    }

    /// Center phone with its word boundary markers.
    pub fn phone_symbol(&self) -> String {
        let mut s = self.center.clone();
        if self.initial {
            s.push_str(INITIAL_MARK);
        }
        if self.r#final {
            s.push_str(FINAL_MARK);
        }
        s
    }
}
