use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fs,
    path::Path,
};

use indexmap::IndexMap;

use super::{FINAL_MARK, INITIAL_MARK, Sample, Samples, SymbolTable};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("word boundary phone {0:?} is not in the phone symbol table")]
    UnknownPhone(String),
}

/// Rewrites sample phones and contexts into the context builder's symbols.
///
/// Initial and final phones are recognised by the `@i` / `@f` markers in the
/// symbol table. Every symbol containing `@` is grouped under the base phone
/// before the first `@`.
#[derive(Debug)]
pub struct SymbolConverter<'a> {
    symbols: &'a SymbolTable,
    mapping: HashMap<String, String>,
    initial_phones: BTreeSet<String>,
    final_phones: BTreeSet<String>,
    phone_classes: IndexMap<String, Vec<String>>,
    use_word_boundary: bool,
    ci_phones: HashSet<String>,
}

impl<'a> SymbolConverter<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        let mut initial_phones = BTreeSet::new();
        let mut final_phones = BTreeSet::new();
        let mut phone_classes: IndexMap<String, Vec<String>> = IndexMap::new();

        for symbol in symbols.symbols() {
            if symbol.contains(INITIAL_MARK) {
                initial_phones.insert(symbol.to_string());
            }
            if symbol.contains(FINAL_MARK) {
                final_phones.insert(symbol.to_string());
            }
            if let Some((base, _)) = symbol.split_once('@') {
                phone_classes
                    .entry(base.to_string())
                    .or_default()
                    .push(symbol.to_string());
            }
        }

        Self {
            symbols,
            mapping: HashMap::new(),
            initial_phones,
            final_phones,
            phone_classes,
            use_word_boundary: false,
            ci_phones: HashSet::new(),
        }
    }

    /// Context independent phones are never boundary marked and may appear
    /// at either end of a word.
    pub fn set_use_word_boundary<I, S>(&mut self, use_word_boundary: bool, ci_phones: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.use_word_boundary = use_word_boundary;
        self.ci_phones = ci_phones.into_iter().map(Into::into).collect();
        self.initial_phones.extend(self.ci_phones.iter().cloned());
        self.final_phones.extend(self.ci_phones.iter().cloned());
    }

    pub fn map_symbol(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.mapping.insert(from.into(), to.into());
    }

    pub fn convert_symbols(&self, symbols: &mut [String]) {
        for symbol in symbols {
            if let Some(mapped) = self.mapping.get(symbol.as_str()) {
                symbol.clone_from(mapped);
            }
        }
    }

    pub fn is_excluded(&self, sample: &Sample) -> bool {
        self.ci_phones.contains(&sample.phone)
    }

    pub fn convert_context_symbols(&self, samples: &mut Samples) -> Result<(), Error> {
        for sample in samples.iter_mut() {
            if self.use_word_boundary && !self.is_excluded(sample) {
                self.map_word_boundary_phone(sample)?;
            }
            self.convert_symbols(&mut sample.left_context);
            self.convert_symbols(&mut sample.right_context);
        }
        Ok(())
    }

    pub fn map_word_boundary_phone(&self, sample: &mut Sample) -> Result<(), Error> {
        if sample.word_initial {
            sample.phone.push_str(INITIAL_MARK);
        }
        if sample.word_final {
            sample.phone.push_str(FINAL_MARK);
        }
        if !self.symbols.contains(&sample.phone) {
            return Err(Error::UnknownPhone(sample.phone.clone()));
        }
        Ok(())
    }

    pub fn initial_phones(&self) -> &BTreeSet<String> {
        &self.initial_phones
    }

    pub fn final_phones(&self) -> &BTreeSet<String> {
        &self.final_phones
    }

    /// Base phone to its boundary variants.
    pub fn phone_classes(&self) -> &IndexMap<String, Vec<String>> {
        &self.phone_classes
    }

    pub fn write_initial_phones<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        write_phone_list(path.as_ref(), &self.initial_phones)
    }

    pub fn write_final_phones<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        write_phone_list(path.as_ref(), &self.final_phones)
    }

    /// One `<boundary-variant> <base-phone>` line per variant.
    pub fn write_phone_map<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut out = String::new();
        for (phone, variants) in &self.phone_classes {
            for variant in variants {
                out.push_str(&format!("{variant} {phone}\n"));
            }
        }
        fs::write(path, out)?;
        Ok(())
    }
}

fn write_phone_list(path: &Path, phones: &BTreeSet<String>) -> Result<(), Error> {
    let mut out = phones.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
    out.push('\n');
    fs::write(path, out)?;
    Ok(())
}
