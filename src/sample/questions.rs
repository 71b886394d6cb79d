use std::{
    collections::BTreeSet,
    fs::{self, File},
    io::{BufRead, BufReader, Read},
    path::Path,
};

use indexmap::IndexMap;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("line {0}: empty question")]
    EmptyLine(usize),
}

/// Decision tree questions: a name and the phones it asks about.
#[derive(Debug, Default, Clone)]
pub struct Questions {
    questions: IndexMap<String, Vec<String>>,
}

impl Questions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive `is_initial`, `is_final` and `is_within` from the boundary
    /// phone sets. `is_within` keeps the order of `all`.
    pub fn set_initial_final<'a>(
        &mut self,
        initial: &BTreeSet<String>,
        fin: &BTreeSet<String>,
        all: impl IntoIterator<Item = &'a str>,
    ) {
        let within = all
            .into_iter()
            .filter(|p| !initial.contains(*p) && !fin.contains(*p))
            .map(str::to_string)
            .collect();

        self.questions
            .insert("is_initial".to_string(), initial.iter().cloned().collect());
        self.questions
            .insert("is_final".to_string(), fin.iter().cloned().collect());
        self.questions.insert("is_within".to_string(), within);
    }

    pub fn read<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        self.read_from(File::open(path)?)
    }

    /// Lines of `<name> <phone...>`. A repeated name replaces the earlier one.
    pub fn read_from<R: Read>(&mut self, reader: R) -> Result<(), Error> {
        for (n, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let mut items = line.split_whitespace();
            let name = items.next().ok_or(Error::EmptyLine(n + 1))?;
            self.questions
                .insert(name.to_string(), items.map(str::to_string).collect());
        }
        Ok(())
    }

    /// Append the boundary variants of every listed phone that has any.
    pub fn add_mapped_phones(&mut self, phone_map: &IndexMap<String, Vec<String>>) {
        for phones in self.questions.values_mut() {
            let add: Vec<String> = phones
                .iter()
                .filter_map(|p| phone_map.get(p))
                .flatten()
                .cloned()
                .collect();
            phones.extend(add);
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.questions.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl std::fmt::Display for Questions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, phones) in &self.questions {
            writeln!(f, "{} {}", name, phones.join(" "))?;
        }
        Ok(())
    }
}
