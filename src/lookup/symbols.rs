use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `<symbol> <key>`, got {text:?}")]
    MalformedLine { line: usize, text: String },
}

/// HMM state model symbols. Unlike the phone table, every key is kept,
/// including 0.
#[derive(Debug, Default, Clone)]
pub struct StateSymbolTable {
    keys: HashMap<String, u32>,
}

impl StateSymbolTable {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let mut keys = HashMap::new();

        for (n, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let items: Vec<&str> = line.split_whitespace().collect();
            match items.as_slice() {
                [] => continue,
                [symbol, key] => {
                    let key = key.parse().map_err(|_| Error::MalformedLine {
                        line: n + 1,
                        text: line.clone(),
                    })?;
                    keys.insert(symbol.to_string(), key);
                }
                _ => {
                    return Err(Error::MalformedLine {
                        line: n + 1,
                        text: line.clone(),
                    });
                }
            }
        }

        Ok(Self { keys })
    }

    pub fn find(&self, symbol: &str) -> Option<u32> {
        self.keys.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
