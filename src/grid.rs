//! Table rows and merged-cell normalization.
//!
//! ## The Problem
//!
//! Spreadsheet exports encode merged cells sparsely: the origin cell carries a
//! span, and the positions it covers simply have no cell at all.
//!
//! ```text
//! <tr><td rowspan=2>A</td><td>B</td></tr>      | A | B |
//! <tr><td>C</td></tr>                          |   | C |   <- "C" is in column 1
//! ```
//!
//! Chunking splits rows apart, so a chunk that starts at the second row would
//! lose `A` and misalign `C`. Normalization makes every row self-contained:
//!
//! ```text
//! | A | B |
//! | A*| C |    * = span-fill copy of the origin
//! ```
//!
//! After normalization every row has the same number of cells, and no cell
//! spans more than one position.

use std::collections::HashMap;

/// Largest `colspan` honoured; larger values are clamped, as browsers do.
pub const MAX_COLSPAN: usize = 1000;

/// Largest `rowspan` honoured; larger values are clamped, as browsers do.
pub const MAX_ROWSPAN: usize = 65534;

/// What a row is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RowKind {
    /// A header row, repeated in every chunk.
    Header,
    /// A data row, the unit of chunking.
    #[default]
    Data,
    /// A footnote row; kept with the document but never chunked.
    Footnote,
}

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Cell content in the document's representation (inner HTML or escaped Markdown).
    pub content: String,
    /// Rows covered by this cell (1..=[`MAX_ROWSPAN`]).
    pub rowspan: usize,
    /// Columns covered by this cell (1..=[`MAX_COLSPAN`]).
    pub colspan: usize,
    /// Whether this is a heading cell (`th`).
    pub is_header: bool,
    /// Whether this is a copy of a merged origin cell.
    pub span_fill: bool,
}

impl Cell {
    /// A plain data cell.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rowspan: 1,
            colspan: 1,
            is_header: false,
            span_fill: false,
        }
    }

    /// A heading cell.
    #[must_use]
    pub fn heading(content: impl Into<String>) -> Self {
        Self {
            is_header: true,
            ..Self::new(content)
        }
    }

    /// An empty placeholder cell.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    /// Set the merge span. Zero spans are treated as 1; spans past
    /// [`MAX_ROWSPAN`] / [`MAX_COLSPAN`] are clamped.
    #[must_use]
    pub fn with_span(self, rowspan: usize, colspan: usize) -> Self {
        Self {
            rowspan: rowspan.clamp(1, MAX_ROWSPAN),
            colspan: colspan.clamp(1, MAX_COLSPAN),
            ..self
        }
    }

    fn fill_copy(&self) -> Self {
        Self {
            content: self.content.clone(),
            rowspan: 1,
            colspan: 1,
            is_header: self.is_header,
            span_fill: true,
        }
    }

    fn origin_copy(&self) -> Self {
        Self {
            rowspan: 1,
            colspan: 1,
            ..self.clone()
        }
    }
}

/// One logical table row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    /// What the row is used for.
    pub kind: RowKind,
    /// Cells in source order.
    pub cells: Vec<Cell>,
    /// Attributes of the source row element (HTML only), in source order.
    pub attributes: Vec<(String, String)>,
}

impl Row {
    /// A row of the given kind.
    #[must_use]
    pub fn new(kind: RowKind, cells: Vec<Cell>) -> Self {
        Self {
            kind,
            cells,
            attributes: Vec::new(),
        }
    }

    /// A data row.
    #[must_use]
    pub fn data(cells: Vec<Cell>) -> Self {
        Self::new(RowKind::Data, cells)
    }

    /// A header row.
    #[must_use]
    pub fn header(cells: Vec<Cell>) -> Self {
        Self::new(RowKind::Header, cells)
    }

    /// A data row of plain cells.
    #[must_use]
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::data(texts.into_iter().map(Cell::new).collect())
    }

    /// Add a row attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Whether this row takes part in chunking.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.kind == RowKind::Data
    }
}

/// A rectangular grid with all merge spans resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedGrid {
    rows: Vec<Row>,
    width: usize,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    row: usize,
    cell: usize,
    is_origin: bool,
}

impl NormalizedGrid {
    /// Expand merge spans so every row has one cell per column.
    ///
    /// Vertical spans that would reach past the last row are clipped.
    ///
    /// ```rust
    /// use tabslabs::{Cell, NormalizedGrid, Row};
    ///
    /// let rows = vec![
    ///     Row::data(vec![Cell::new("A").with_span(2, 1), Cell::new("B")]),
    ///     Row::data(vec![Cell::new("C")]),
    /// ];
    /// let grid = NormalizedGrid::normalize(&rows);
    /// assert_eq!(grid.width(), 2);
    /// assert_eq!(grid.rows()[1].cells[0].content, "A");
    /// assert!(grid.rows()[1].cells[0].span_fill);
    /// assert_eq!(grid.rows()[1].cells[1].content, "C");
    /// ```
    #[must_use]
    pub fn normalize(rows: &[Row]) -> Self {
        let occupied = occupancy(rows);
        let width = occupied
            .keys()
            .map(|&(_, col)| col + 1)
            .max()
            .unwrap_or(0);

        let rows = rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let cells = (0..width)
                    .map(|col| match occupied.get(&(row_idx, col)) {
                        None => Cell::empty(),
                        Some(slot) => {
                            let origin = &rows[slot.row].cells[slot.cell];
                            if slot.is_origin {
                                origin.origin_copy()
                            } else {
                                origin.fill_copy()
                            }
                        }
                    })
                    .collect();
                Row {
                    kind: row.kind,
                    cells,
                    attributes: row.attributes.clone(),
                }
            })
            .collect();

        Self { rows, width }
    }

    /// The normalized rows, in source order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of columns shared by every row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the grid has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Take ownership of the normalized rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

/// Map every claimed (row, column) position to the cell that claims it.
///
/// Rows are scanned top-to-bottom, cells left-to-right; a cell lands on the
/// first column not already claimed by a vertical span from above.
fn occupancy(rows: &[Row]) -> HashMap<(usize, usize), Slot> {
    let mut occupied: HashMap<(usize, usize), Slot> = HashMap::new();

    for (row_idx, row) in rows.iter().enumerate() {
        let mut col = 0;
        for (cell_idx, cell) in row.cells.iter().enumerate() {
            while occupied.contains_key(&(row_idx, col)) {
                col += 1;
            }

            let rowspan = cell.rowspan.clamp(1, MAX_ROWSPAN).min(rows.len() - row_idx);
            let colspan = cell.colspan.clamp(1, MAX_COLSPAN);
            for r in 0..rowspan {
                for c in 0..colspan {
                    occupied.insert(
                        (row_idx + r, col + c),
                        Slot {
                            row: row_idx,
                            cell: cell_idx,
                            is_origin: r == 0 && c == 0,
                        },
                    );
                }
            }
            col += colspan;
        }
    }

    occupied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(row: &Row) -> Vec<&str> {
        row.cells.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_rowspan_fills_below() {
        let rows = vec![
            Row::data(vec![Cell::new("A").with_span(3, 1), Cell::new("B")]),
            Row::data(vec![Cell::new("C")]),
            Row::data(vec![Cell::new("D")]),
        ];
        let grid = NormalizedGrid::normalize(&rows);

        assert_eq!(grid.width(), 2);
        assert_eq!(contents(&grid.rows()[0]), ["A", "B"]);
        assert_eq!(contents(&grid.rows()[1]), ["A", "C"]);
        assert_eq!(contents(&grid.rows()[2]), ["A", "D"]);
        assert!(!grid.rows()[0].cells[0].span_fill);
        assert!(grid.rows()[2].cells[0].span_fill);
    }

    #[test]
    fn test_colspan_fills_right() {
        let rows = vec![
            Row::data(vec![Cell::new("wide").with_span(1, 3)]),
            Row::data(vec![Cell::new("x"), Cell::new("y"), Cell::new("z")]),
        ];
        let grid = NormalizedGrid::normalize(&rows);

        assert_eq!(contents(&grid.rows()[0]), ["wide", "wide", "wide"]);
        assert_eq!(
            grid.rows()[0]
                .cells
                .iter()
                .map(|c| c.span_fill)
                .collect::<Vec<_>>(),
            [false, true, true]
        );
    }

    #[test]
    fn test_block_span() {
        let rows = vec![
            Row::data(vec![Cell::new("M").with_span(2, 2), Cell::new("a")]),
            Row::data(vec![Cell::new("b")]),
        ];
        let grid = NormalizedGrid::normalize(&rows);
        assert_eq!(contents(&grid.rows()[0]), ["M", "M", "a"]);
        assert_eq!(contents(&grid.rows()[1]), ["M", "M", "b"]);
    }

    #[test]
    fn test_ragged_rows_padded_to_max_width() {
        let rows = vec![
            Row::from_texts(["a"]),
            Row::from_texts(["b", "c", "d"]),
            Row::data(vec![]),
        ];
        let grid = NormalizedGrid::normalize(&rows);
        assert_eq!(grid.width(), 3);
        for row in grid.rows() {
            assert_eq!(row.cells.len(), 3);
        }
        assert_eq!(contents(&grid.rows()[0]), ["a", "", ""]);
        assert_eq!(contents(&grid.rows()[2]), ["", "", ""]);
    }

    #[test]
    fn test_rowspan_clipped_at_last_row() {
        let rows = vec![Row::data(vec![Cell::new("A").with_span(5, 1)])];
        let grid = NormalizedGrid::normalize(&rows);
        assert_eq!(grid.len(), 1);
        assert_eq!(contents(&grid.rows()[0]), ["A"]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let rows = vec![
            Row::data(vec![Cell::new("A").with_span(2, 2), Cell::new("B")]),
            Row::data(vec![Cell::new("C")]),
            Row::from_texts(["d"]),
        ];
        let once = NormalizedGrid::normalize(&rows);
        let twice = NormalizedGrid::normalize(once.rows());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_kind_preserved() {
        let rows = vec![
            Row::header(vec![Cell::heading("h")]),
            Row::new(RowKind::Footnote, vec![Cell::new("note")]),
        ];
        let grid = NormalizedGrid::normalize(&rows);
        assert_eq!(grid.rows()[0].kind, RowKind::Header);
        assert!(grid.rows()[0].cells[0].is_header);
        assert_eq!(grid.rows()[1].kind, RowKind::Footnote);
    }

    #[test]
    fn test_huge_colspan_is_clamped() {
        let mut wide = Cell::new("x");
        wide.colspan = 3_000_000;
        let rows = vec![Row::data(vec![wide]), Row::from_texts(["a", "b"])];
        let grid = NormalizedGrid::normalize(&rows);
        assert_eq!(grid.width(), MAX_COLSPAN);
        assert!(grid.rows().iter().all(|r| r.cells.len() == MAX_COLSPAN));
    }

    #[test]
    fn test_with_span_clamps() {
        let cell = Cell::new("x").with_span(usize::MAX, 0);
        assert_eq!(cell.rowspan, MAX_ROWSPAN);
        assert_eq!(cell.colspan, 1);
        assert_eq!(Cell::new("y").with_span(1, 5000).colspan, MAX_COLSPAN);
    }

    #[test]
    fn test_row_attributes_survive_normalization() {
        let rows = vec![Row::from_texts(["a"]).with_attribute("class", "odd")];
        let grid = NormalizedGrid::normalize(&rows);
        assert_eq!(
            grid.rows()[0].attributes,
            [(String::from("class"), String::from("odd"))]
        );
    }

    #[test]
    fn test_empty_input() {
        let grid = NormalizedGrid::normalize(&[]);
        assert!(grid.is_empty());
        assert_eq!(grid.width(), 0);
    }
}
