use crate::lcd::hd44780::{ConfigurationError, OutOfRange};
use log::debug;

/// Size of the DDRAM address space. DDRAM addresses are 7-bit.
pub const DDRAM_SIZE: usize = 0x80;

/// Character font of the controller.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Font {
    /// 5x8 dots.
    #[default]
    Dots5x8,
    /// 5x10 dots. Only available in the single-line mode.
    Dots5x10,
}

/// Size of the display in characters, together with the DDRAM address of the first character
/// of every row.
///
/// The rows are not contiguous in the DDRAM. In the two-line mode the controller keeps 40
/// characters per line, starting at `0x00` and `0x40`. Four-row modules are two-line modules with
/// every line folded in half, so their third and fourth rows continue the first and second:
///
/// | Display | Row 0  | Row 1  | Row 2  | Row 3  |
/// |---------|--------|--------|--------|--------|
/// | 16x1    | `0x00` |        |        |        |
/// | 16x2    | `0x00` | `0x40` |        |        |
/// | 16x4    | `0x00` | `0x40` | `0x10` | `0x50` |
/// | 20x2    | `0x00` | `0x40` |        |        |
/// | 20x4    | `0x00` | `0x40` | `0x14` | `0x54` |
///
/// Modules that don't follow this layout can supply their own table with
/// [Geometry::with_row_offsets].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Geometry {
    cols: usize,
    rows: usize,
    row_offsets: [u8; 4],
}

impl Geometry {
    /// Creates the geometry of a standard module with `rows` of 1, 2 or 4.
    ///
    /// # Errors
    /// - [ConfigurationError::InvalidGeometry] if there are no columns, more columns than a row
    ///   can hold (80, 40 and 20 for 1, 2 and 4 rows), or an unsupported row count.
    pub fn new(cols: usize, rows: usize) -> Result<Self, ConfigurationError> {
        let max_cols = match rows {
            1 => 80,
            2 => 40,
            4 => 20,
            _ => return Err(ConfigurationError::InvalidGeometry { cols, rows }),
        };
        if cols == 0 || cols > max_cols {
            return Err(ConfigurationError::InvalidGeometry { cols, rows });
        }

        let folded = cols as u8;
        let row_offsets = match rows {
            1 => [0x00, 0x00, 0x00, 0x00],
            2 => [0x00, 0x40, 0x00, 0x00],
            _ => [0x00, 0x40, folded, 0x40 + folded],
        };

        debug!("{}x{} display, row offsets {:02x?}", cols, rows, &row_offsets[..rows]);

        Ok(Geometry {
            cols,
            rows,
            row_offsets,
        })
    }

    /// Creates a geometry with a custom row address table. Only the first `rows` entries are used.
    ///
    /// # Errors
    /// - [ConfigurationError::InvalidGeometry] if there are no columns or `rows` is not 1, 2 or 4.
    /// - [ConfigurationError::RowOffsetOverflow] if a row would run past the end of the DDRAM.
    pub fn with_row_offsets(
        cols: usize,
        rows: usize,
        row_offsets: [u8; 4],
    ) -> Result<Self, ConfigurationError> {
        if cols == 0 || !matches!(rows, 1 | 2 | 4) {
            return Err(ConfigurationError::InvalidGeometry { cols, rows });
        }

        for (row, &offset) in row_offsets[..rows].iter().enumerate() {
            if offset as usize + cols > DDRAM_SIZE {
                return Err(ConfigurationError::RowOffsetOverflow { row });
            }
        }

        Ok(Geometry {
            cols,
            rows,
            row_offsets,
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Whether the controller has to run in the two-line mode (`N` bit of the function set).
    pub fn two_line(&self) -> bool {
        self.rows > 1
    }

    /// Gets the DDRAM address of the first character of the given row.
    pub fn row_offset(&self, row: usize) -> Option<u8> {
        self.row_offsets[..self.rows].get(row).copied()
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows
    }

    /// Gets the DDRAM address of a visible character.
    pub fn ddram_address(&self, col: usize, row: usize) -> Result<u8, OutOfRange> {
        if !self.contains(col, row) {
            return Err(OutOfRange::Position {
                col,
                row,
                cols: self.cols,
                rows: self.rows,
            });
        }
        Ok(self.row_offsets[row] + col as u8)
    }

    /// Same as [Self::ddram_address], but also accepts `col == cols`, the address right past the
    /// end of a row, where the address counter stops after the row gets filled.
    pub(crate) fn cursor_address(&self, col: usize, row: usize) -> u8 {
        let address = self.row_offsets[row.min(self.rows - 1)] as usize + col.min(self.cols);
        (address % DDRAM_SIZE) as u8
    }
}
