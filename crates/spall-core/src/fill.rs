//! Slot bitsets and the dof×dof fill maps built from them.

const WORD: usize = u64::BITS as usize;

/// Fixed-width bitset over the `dof` slots of one grid point.
///
/// The width is set at construction; slots at or past it are never
/// stored.
#[derive(Clone, Debug)]
pub struct SlotSet {
    dof: usize,
    words: Box<[u64]>,
}

impl SlotSet {
    /// An empty set able to hold slots `0..dof`.
    pub fn with_dof(dof: usize) -> Self {
        Self {
            dof,
            words: vec![0; dof.div_ceil(WORD)].into_boxed_slice(),
        }
    }

    /// Add `slot`. Returns `false` if it was already present or lies
    /// outside `0..dof`.
    pub fn insert(&mut self, slot: usize) -> bool {
        if slot >= self.dof {
            return false;
        }
        let mask = 1u64 << (slot % WORD);
        let word = &mut self.words[slot / WORD];
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }

    /// Whether `slot` is present.
    pub fn contains(&self, slot: usize) -> bool {
        slot < self.dof && self.words[slot / WORD] & (1u64 << (slot % WORD)) != 0
    }

    /// Number of slots present.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` when no slot is present.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Slots present, ascending.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * WORD + bit)
            })
        })
    }
}

/// Boolean dof×dof sparsity pattern consumed by the external matrix
/// assembler.
///
/// Row `r` holds the columns whose concentration the rate of slot `r`
/// depends on. Out-of-range marks are ignored.
#[derive(Clone, Debug)]
pub struct FillMap {
    rows: Vec<SlotSet>,
}

impl FillMap {
    /// An empty map for `dof` slots.
    pub fn new(dof: usize) -> Self {
        Self {
            rows: vec![SlotSet::with_dof(dof); dof],
        }
    }

    /// Number of rows (the dof).
    pub fn dof(&self) -> usize {
        self.rows.len()
    }

    /// Mark `(row, col)` as structurally non-zero.
    pub fn mark(&mut self, row: usize, col: usize) {
        if let Some(r) = self.rows.get_mut(row) {
            r.insert(col);
        }
    }

    /// Whether `(row, col)` is marked.
    pub fn is_marked(&self, row: usize, col: usize) -> bool {
        self.rows.get(row).is_some_and(|r| r.contains(col))
    }

    /// The column set of one row.
    pub fn row(&self, row: usize) -> &SlotSet {
        &self.rows[row]
    }

    /// Merge every mark of `other` into `self`.
    pub fn merge(&mut self, other: &FillMap) {
        for (row, theirs) in other.rows.iter().enumerate() {
            for col in theirs.iter() {
                self.mark(row, col);
            }
        }
    }

    /// Total number of marked entries.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(SlotSet::len).sum()
    }

    /// Compressed-row export: `row_ptr` has `dof + 1` entries and the
    /// columns of row `r` are `cols[row_ptr[r]..row_ptr[r + 1]]`.
    pub fn to_sparse(&self) -> SparseFill {
        let mut row_ptr = Vec::with_capacity(self.rows.len() + 1);
        let mut cols = Vec::with_capacity(self.nnz());
        row_ptr.push(0);
        for row in &self.rows {
            cols.extend(row.iter());
            row_ptr.push(cols.len());
        }
        SparseFill { row_ptr, cols }
    }
}

/// Compressed-row form of a [`FillMap`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseFill {
    /// Row start offsets into `cols`, length `dof + 1`.
    pub row_ptr: Vec<usize>,
    /// Column indices, ascending within each row.
    pub cols: Vec<usize>,
}
