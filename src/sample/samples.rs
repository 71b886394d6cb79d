use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use super::example_list::{Example, PropertyName};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("example is missing property {0}")]
    MissingProperty(PropertyName),
    #[error("invalid hmm state {0:?}")]
    InvalidState(String),
    #[error("expected a matrix with 2 rows, found {found}")]
    RowCount { found: usize },
    #[error("expected {expected} matrix entries, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("sample {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("sample {index} has context lengths {found:?}, expected {expected:?}")]
    ContextMismatch {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("no samples to write")]
    Empty,
}

/// Position of a phone within its word, from the `boundary` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    BeginOfLemma,
    EndOfLemma,
    SinglePhonemeLemma,
    #[default]
    Other,
}

impl Boundary {
    pub fn from_property(value: &str) -> Self {
        match value {
            "begin-of-lemma" => Boundary::BeginOfLemma,
            "end-of-lemma" => Boundary::EndOfLemma,
            "single-phoneme-lemma" => Boundary::SinglePhonemeLemma,
            _ => Boundary::Other,
        }
    }

    pub fn is_initial(&self) -> bool {
        matches!(self, Boundary::BeginOfLemma | Boundary::SinglePhonemeLemma)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Boundary::EndOfLemma | Boundary::SinglePhonemeLemma)
    }
}

/// Accumulated statistics of one phone in one HMM state and context.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub phone: String,
    pub state: u32,
    pub left_context: Vec<String>,
    pub right_context: Vec<String>,
    pub word_initial: bool,
    pub word_final: bool,
    pub weight: u64,
    pub sum: Vec<String>,
    pub sum2: Vec<String>,
}

impl Sample {
    pub fn new(
        phone: impl Into<String>,
        state: u32,
        left_context: Vec<String>,
        right_context: Vec<String>,
    ) -> Self {
        Self {
            phone: phone.into(),
            state,
            left_context,
            right_context,
            word_initial: false,
            word_final: false,
            weight: 0,
            sum: Vec::new(),
            sum2: Vec::new(),
        }
    }

    /// Split a 2-row statistics matrix into the sum and sum of squares.
    pub fn set_data(
        &mut self,
        observations: u64,
        columns: usize,
        rows: usize,
        data: &[String],
    ) -> Result<(), Error> {
        if rows != 2 {
            return Err(Error::RowCount { found: rows });
        }
        if columns.checked_mul(2) != Some(data.len()) {
            return Err(Error::ColumnCount {
                expected: columns.saturating_mul(2),
                found: data.len(),
            });
        }
        let (sum, sum2) = data.split_at(columns);
        self.weight = observations;
        self.sum = sum.to_vec();
        self.sum2 = sum2.to_vec();
        Ok(())
    }

    fn write_to<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        writeln!(
            out,
            "{} {} {} {} {:.6} {} {}",
            self.phone,
            self.state,
            self.left_context.join(" "),
            self.right_context.join(" "),
            self.weight as f64,
            self.sum.join(" "),
            self.sum2.join(" "),
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Samples {
    samples: Vec<Sample>,
    use_word_boundary: bool,
}

impl Samples {
    pub fn new(use_word_boundary: bool) -> Self {
        Self {
            samples: Vec::new(),
            use_word_boundary,
        }
    }

    pub fn add_example(&mut self, example: &Example) -> Result<(), Error> {
        let property = |name| example.property(name).ok_or(Error::MissingProperty(name));

        let state = property(PropertyName::HmmState)?;
        let state: u32 = state
            .parse()
            .map_err(|_| Error::InvalidState(state.to_string()))?;
        let mut sample = Sample::new(
            property(PropertyName::Central)?,
            state,
            vec![property(PropertyName::History)?.to_string()],
            vec![property(PropertyName::Future)?.to_string()],
        );

        if self.use_word_boundary {
            let boundary = Boundary::from_property(property(PropertyName::Boundary)?);
            sample.word_initial = boundary.is_initial();
            sample.word_final = boundary.is_final();
        }

        sample.set_data(
            example.observations,
            example.columns,
            example.rows,
            &example.data,
        )?;
        self.samples.push(sample);
        Ok(())
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Sample> {
        self.samples.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Dimension and left/right context lengths shared by every sample.
    pub fn global_properties(&self) -> Result<(usize, usize, usize), Error> {
        let first = self.samples.first().ok_or(Error::Empty)?;
        let dim = first.sum.len();
        let context = (first.left_context.len(), first.right_context.len());

        for (index, sample) in self.samples.iter().enumerate() {
            if sample.sum.len() != dim || sample.sum2.len() != dim {
                return Err(Error::DimensionMismatch {
                    index,
                    expected: dim,
                    found: sample.sum.len().max(sample.sum2.len()),
                });
            }
            let found = (sample.left_context.len(), sample.right_context.len());
            if found != context {
                return Err(Error::ContextMismatch {
                    index,
                    expected: context,
                    found,
                });
            }
        }

        Ok((dim, context.0, context.1))
    }

    /// Validates all samples before the file is created.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        self.global_properties()?;
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        let (dim, num_left_context, num_right_context) = self.global_properties()?;
        writeln!(out, "1 {dim} {num_left_context} {num_right_context}")?;
        for sample in &self.samples {
            sample.write_to(out)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Samples {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
