//! Character display abstraction.
//!
//! The controller drives a small HD44780-class character LCD. The core only
//! needs cursor addressing, text output, clears and the display/cursor/blink
//! mode bits, captured by [`CharDisplay`]. [`TextScreen`] is an in-memory
//! implementation used by the emulator, the firmware's RTT mirror and tests.

/// Display/cursor/blink control bits.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DisplayMode {
    pub display: bool,
    pub cursor: bool,
    pub blink: bool,
}

impl DisplayMode {
    /// Display on, cursor hidden.
    pub const TEXT: Self = Self {
        display: true,
        cursor: false,
        blink: false,
    };

    /// Display on with a visible cursor, optionally blinking.
    #[must_use]
    pub const fn with_cursor(blink: bool) -> Self {
        Self {
            display: true,
            cursor: true,
            blink,
        }
    }
}

/// Cursor-addressed character display.
///
/// Coordinates are zero-based `(column, row)`. Writes past the end of a row
/// are truncated; they never wrap onto the next row.
pub trait CharDisplay {
    /// Returns `(columns, rows)`.
    fn size(&self) -> (u8, u8);

    /// Moves the cursor; coordinates outside the screen are clamped.
    fn move_to(&mut self, col: u8, row: u8);

    fn position(&self) -> (u8, u8);

    /// Writes text at the cursor and advances it.
    fn write_str(&mut self, text: &str);

    /// Blanks the whole screen and homes the cursor.
    fn clear(&mut self);

    /// Blanks from the cursor to the end of its row. The cursor does not move.
    fn clear_eol(&mut self);

    fn set_mode(&mut self, mode: DisplayMode);

    /// Writes `count` copies of `ch` at the cursor.
    fn fill(&mut self, ch: char, count: u8) {
        let mut buf = [0u8; 4];
        let encoded: &str = ch.encode_utf8(&mut buf);
        for _ in 0..count {
            self.write_str(encoded);
        }
    }
}

/// In-memory character grid with `COLS` columns and `ROWS` rows.
#[derive(Clone, Debug)]
pub struct TextScreen<const COLS: usize, const ROWS: usize> {
    cells: [[char; COLS]; ROWS],
    col: u8,
    row: u8,
    mode: DisplayMode,
    generation: u32,
}

impl<const COLS: usize, const ROWS: usize> TextScreen<COLS, ROWS> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [[' '; COLS]; ROWS],
            col: 0,
            row: 0,
            mode: DisplayMode::TEXT,
            generation: 0,
        }
    }

    /// Characters of one row.
    #[must_use]
    pub fn row(&self, row: usize) -> &[char; COLS] {
        &self.cells[row]
    }

    /// Copies one row into `out` as UTF-8 text, returning the used prefix.
    pub fn row_text<'a>(&self, row: usize, out: &'a mut [u8]) -> &'a str {
        let mut used = 0;
        for &ch in &self.cells[row] {
            let len = ch.len_utf8();
            if used + len > out.len() {
                break;
            }
            ch.encode_utf8(&mut out[used..used + len]);
            used += len;
        }
        core::str::from_utf8(&out[..used]).unwrap_or("")
    }

    #[must_use]
    pub const fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Incremented on every mutation; lets mirrors skip unchanged frames.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<const COLS: usize, const ROWS: usize> Default for TextScreen<COLS, ROWS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const COLS: usize, const ROWS: usize> CharDisplay for TextScreen<COLS, ROWS> {
    #[allow(clippy::cast_possible_truncation)]
    fn size(&self) -> (u8, u8) {
        (COLS as u8, ROWS as u8)
    }

    fn move_to(&mut self, col: u8, row: u8) {
        let (cols, rows) = self.size();
        self.col = col.min(cols);
        self.row = row.min(rows.saturating_sub(1));
        self.touch();
    }

    fn position(&self) -> (u8, u8) {
        (self.col, self.row)
    }

    fn write_str(&mut self, text: &str) {
        let row = usize::from(self.row);
        for ch in text.chars() {
            let col = usize::from(self.col);
            if col >= COLS {
                break;
            }
            self.cells[row][col] = ch;
            self.col += 1;
        }
        self.touch();
    }

    fn clear(&mut self) {
        self.cells = [[' '; COLS]; ROWS];
        self.col = 0;
        self.row = 0;
        self.touch();
    }

    fn clear_eol(&mut self) {
        let row = usize::from(self.row);
        for cell in self.cells[row].iter_mut().skip(usize::from(self.col)) {
            *cell = ' ';
        }
        self.touch();
    }

    fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_truncate_at_row_end() {
        let mut screen = TextScreen::<8, 2>::new();
        screen.move_to(5, 1);
        screen.write_str("abcdef");

        let mut buf = [0u8; 32];
        assert_eq!(screen.row_text(1, &mut buf), "     abc");
        assert_eq!(screen.row_text(0, &mut buf), "        ");
        assert_eq!(screen.position(), (8, 1));
    }

    #[test]
    fn clear_eol_keeps_cursor_and_prefix() {
        let mut screen = TextScreen::<6, 1>::new();
        screen.write_str("hello!");
        screen.move_to(2, 0);
        screen.clear_eol();

        let mut buf = [0u8; 16];
        assert_eq!(screen.row_text(0, &mut buf), "he    ");
        assert_eq!(screen.position(), (2, 0));
    }

    #[test]
    fn multibyte_glyphs_occupy_one_cell() {
        let mut screen = TextScreen::<4, 1>::new();
        screen.write_str("µs");
        screen.fill('-', 3);

        let mut buf = [0u8; 16];
        assert_eq!(screen.row_text(0, &mut buf), "µs--");
    }

    #[test]
    fn generation_advances_on_mutation() {
        let mut screen = TextScreen::<4, 1>::new();
        let before = screen.generation();
        screen.set_mode(DisplayMode::with_cursor(true));
        assert!(screen.generation() > before);
        assert_eq!(screen.mode(), DisplayMode::with_cursor(true));
    }
}
