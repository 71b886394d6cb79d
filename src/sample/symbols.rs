use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use indexmap::IndexMap;

/// Symbol written for the reserved key 0. Never stored in the table.
pub const EPSILON: &str = ".eps";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `<symbol> <key>`, got {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("line {line}: invalid key {key:?}")]
    InvalidKey { line: usize, key: String },
    #[error("duplicate key {0}")]
    DuplicateKey(u32),
    #[error("ignored symbol {0:?} must have key 0")]
    IgnoredNotEpsilon(String),
}

/// Phone symbol table: symbol to non-negative integer key.
///
/// Key 0 is reserved for epsilon. It is skipped when reading and implied
/// when writing.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: BTreeMap<u32, String>,
    keys: HashMap<String, u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let mut table = Self::new();

        for (n, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let mut items = line.split_whitespace();
            let (symbol, key) = match (items.next(), items.next(), items.next()) {
                (None, _, _) => continue,
                (Some(symbol), Some(key), None) => (symbol, key),
                _ => {
                    return Err(Error::MalformedLine {
                        line: n + 1,
                        text: line.clone(),
                    });
                }
            };
            let key: u32 = key.parse().map_err(|_| Error::InvalidKey {
                line: n + 1,
                key: key.to_string(),
            })?;
            if key == 0 {
                continue;
            }
            table.insert(symbol.to_string(), key)?;
        }

        Ok(table)
    }

    /// Load from an id to label map, such as a property value map.
    ///
    /// The `ignore` label is dropped and must be the one at key 0.
    pub fn set(&mut self, map: &IndexMap<String, String>, ignore: &str) -> Result<(), Error> {
        for (key, value) in map {
            let ikey: u32 = key.parse().map_err(|_| Error::InvalidKey {
                line: 0,
                key: key.clone(),
            })?;
            if value == ignore {
                if ikey != 0 {
                    return Err(Error::IgnoredNotEpsilon(value.clone()));
                }
                continue;
            }
            self.insert(value.clone(), ikey)?;
        }
        Ok(())
    }

    /// Append symbols after the current largest key.
    pub fn add<I, S>(&mut self, phones: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut key = self.symbols.keys().next_back().copied().unwrap_or(0) + 1;
        for phone in phones {
            let phone = phone.into();
            self.symbols.insert(key, phone.clone());
            self.keys.insert(phone, key);
            key += 1;
        }
    }

    fn insert(&mut self, symbol: String, key: u32) -> Result<(), Error> {
        if self.symbols.contains_key(&key) {
            return Err(Error::DuplicateKey(key));
        }
        self.symbols.insert(key, symbol.clone());
        self.keys.insert(symbol, key);
        Ok(())
    }

    pub fn find(&self, symbol: &str) -> Option<u32> {
        self.keys.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.keys.contains_key(symbol)
    }

    /// Symbols in key order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        writeln!(out, "{EPSILON} 0")?;
        for (key, symbol) in &self.symbols {
            writeln!(out, "{symbol} {key}")?;
        }
        Ok(())
    }
}
