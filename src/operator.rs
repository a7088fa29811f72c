use crate::errors::{Result, SamplerError};
use crate::util::{space_size, sub_index, sub_values, SubConfig};
use num_complex::Complex64;
use smallvec::SmallVec;

/// Sites touched by a local matrix or a connection.
pub type Sites = SmallVec<[usize; 4]>;

/// One configuration connected to the current one by an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// The matrix element `<v|O|v'>`.
    pub mel: Complex64,
    /// Sites which differ in `v'`. Empty for the diagonal element.
    pub sites: Sites,
    /// Values of those sites in `v'`.
    pub values: SubConfig,
}

impl Connection {
    /// Whether this is the diagonal element.
    pub fn is_diagonal(&self) -> bool {
        self.sites.is_empty()
    }
}

/// An operator which can enumerate its nonzero matrix elements from a configuration.
pub trait Operator {
    /// Append to `conns` every `v'` with `<v|O|v'> != 0`.
    fn find_conn(&self, v: &[f64], conns: &mut Vec<Connection>);
}

impl<O: Operator + ?Sized> Operator for &O {
    fn find_conn(&self, v: &[f64], conns: &mut Vec<Connection>) {
        (**self).find_conn(v, conns)
    }
}

/// A dense real matrix acting on a few sites.
///
/// Rows and columns are indexed by the mixed radix index of the local values on `sites`,
/// the first site being the most significant digit.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMatrix {
    mat: Vec<f64>,
    dim: usize,
    sites: Sites,
}

impl LocalMatrix {
    /// Make a new local matrix from its rows. The matrix must be square with one row per
    /// local configuration of `sites`, and the sites must be distinct.
    pub fn new<MAT, VAR>(rows: MAT, sites: VAR, local_size: usize) -> Result<Self>
    where
        MAT: Into<Vec<Vec<f64>>>,
        VAR: Into<Vec<usize>>,
    {
        let rows: Vec<Vec<f64>> = rows.into();
        let sites: Vec<usize> = sites.into();
        let sites: Sites = sites.into_iter().collect();
        if sites.is_empty() {
            return Err(SamplerError::construction(
                "acting_on",
                &sites,
                "a local matrix must act on at least one site",
            ));
        }
        let mut sorted = sites.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(SamplerError::construction(
                "acting_on",
                &sites,
                "sites must be distinct",
            ));
        }
        let dim = space_size(local_size, sites.len()).ok_or_else(|| {
            SamplerError::construction("acting_on", &sites, "too many sites for a dense matrix")
        })?;
        if rows.len() != dim || rows.iter().any(|r| r.len() != dim) {
            return Err(SamplerError::construction(
                "move_operators",
                rows.iter().map(|r| r.len()).collect::<Vec<_>>(),
                format!(
                    "expected a {}x{} matrix for {} sites with {} local states",
                    dim,
                    dim,
                    sites.len(),
                    local_size
                ),
            ));
        }
        if rows.iter().flatten().any(|x| !x.is_finite()) {
            return Err(SamplerError::construction(
                "move_operators",
                rows,
                "matrix entries must be finite",
            ));
        }
        let mat = rows.into_iter().flatten().collect();
        Ok(Self { mat, dim, sites })
    }

    /// Matrix element at (row, col).
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.mat[row * self.dim + col]
    }

    /// Number of rows (and columns).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Sites the matrix acts on.
    pub fn sites(&self) -> &[usize] {
        &self.sites
    }

    /// Entries of column `col`, top to bottom.
    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.dim).map(move |row| self.at(row, col))
    }

    /// Checks that entries are non-negative and that each column sums to one.
    pub fn is_column_stochastic(&self, tolerance: f64) -> bool {
        self.mat.iter().all(|x| *x >= 0.0)
            && (0..self.dim).all(|col| (self.column(col).sum::<f64>() - 1.0).abs() <= tolerance)
    }
}

/// A sum of local matrices, for instance a lattice Hamiltonian.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOperator {
    local_states: Vec<f64>,
    terms: Vec<LocalMatrix>,
}

impl LocalOperator {
    /// An empty operator over the given local values.
    pub fn new<V: Into<Vec<f64>>>(local_states: V) -> Self {
        Self {
            local_states: local_states.into(),
            terms: vec![],
        }
    }

    /// Add a term given by its rows and the sites it acts on.
    pub fn push_term<MAT, VAR>(&mut self, rows: MAT, sites: VAR) -> Result<()>
    where
        MAT: Into<Vec<Vec<f64>>>,
        VAR: Into<Vec<usize>>,
    {
        let term = LocalMatrix::new(rows, sites, self.local_states.len())?;
        self.terms.push(term);
        Ok(())
    }

    /// Builder version of [`LocalOperator::push_term`].
    pub fn with_term<MAT, VAR>(mut self, rows: MAT, sites: VAR) -> Result<Self>
    where
        MAT: Into<Vec<Vec<f64>>>,
        VAR: Into<Vec<usize>>,
    {
        self.push_term(rows, sites)?;
        Ok(self)
    }

    /// The terms of the operator.
    pub fn terms(&self) -> &[LocalMatrix] {
        &self.terms
    }

    /// The local values this operator was built for.
    pub fn local_states(&self) -> &[f64] {
        &self.local_states
    }
}

impl Operator for LocalOperator {
    fn find_conn(&self, v: &[f64], conns: &mut Vec<Connection>) {
        let mut diagonal = 0.0;
        for term in &self.terms {
            let row = match sub_index(v, term.sites(), &self.local_states) {
                Some(row) => row,
                None => continue,
            };
            diagonal += term.at(row, row);
            (0..term.dim())
                .filter(|col| *col != row)
                .map(|col| (col, term.at(row, col)))
                .filter(|(_, mel)| *mel != 0.0)
                .for_each(|(col, mel)| {
                    conns.push(Connection {
                        mel: Complex64::new(mel, 0.0),
                        sites: term.sites.clone(),
                        values: sub_values(col, term.sites.len(), &self.local_states),
                    })
                });
        }
        if diagonal != 0.0 {
            conns.push(Connection {
                mel: Complex64::new(diagonal, 0.0),
                sites: Sites::new(),
                values: SubConfig::new(),
            });
        }
    }
}
