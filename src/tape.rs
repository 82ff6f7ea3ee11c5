//! The machine's only storage: a fixed-length byte tape with a single cursor.
//!
//! The tape is allocated once, zero-filled, and never grows. Moving the cursor
//! past either end is rejected and leaves the cursor where it was; cell values
//! wrap naturally at 8 bits.

use std::fmt;

/// Number of cells allocated when no size is configured.
pub const DEFAULT_TAPE_SIZE: usize = 65_536;

/// Direction of a cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

/// Errors raised by tape allocation and tape access.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TapeError {
    /// A tape must have at least one cell.
    #[error("invalid tape size of 0")]
    ZeroSize,

    /// The cells could not be allocated.
    #[error("unable to allocate a tape of {size} cells")]
    Allocation { size: usize },

    /// The cursor was asked to move past the first or the last cell.
    #[error("tape {}: cannot move {direction} from cell {cursor}", boundary_name(.direction))]
    OutOfBounds { cursor: usize, direction: Direction },

    /// An introspection index was outside the tape.
    #[error("cell index {index} is outside a tape of {size} cells")]
    IndexOutOfRange { index: usize, size: usize },
}

fn boundary_name(direction: &Direction) -> &'static str {
    match direction {
        Direction::Left => "underflow",
        Direction::Right => "overflow",
    }
}

/// Fixed-size byte tape with a cursor.
#[derive(Debug, Clone)]
pub struct Tape {
    cells: Vec<u8>,
    cursor: usize,
}

impl Tape {
    /// Allocate `size` zeroed cells with the cursor on cell 0.
    pub fn new(size: usize) -> Result<Self, TapeError> {
        if size == 0 {
            return Err(TapeError::ZeroSize);
        }

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(size)
            .map_err(|_| TapeError::Allocation { size })?;
        cells.resize(size, 0);

        Ok(Self { cells, cursor: 0 })
    }

    /// Number of cells on the tape.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Value of the cell under the cursor.
    pub fn get(&self) -> u8 {
        self.cells[self.cursor]
    }

    /// Overwrite the cell under the cursor.
    pub fn set(&mut self, value: u8) {
        self.cells[self.cursor] = value;
    }

    pub fn move_right(&mut self) -> Result<(), TapeError> {
        if self.cursor + 1 >= self.cells.len() {
            return Err(TapeError::OutOfBounds {
                cursor: self.cursor,
                direction: Direction::Right,
            });
        }
        self.cursor += 1;
        Ok(())
    }

    pub fn move_left(&mut self) -> Result<(), TapeError> {
        if self.cursor == 0 {
            return Err(TapeError::OutOfBounds {
                cursor: self.cursor,
                direction: Direction::Left,
            });
        }
        self.cursor -= 1;
        Ok(())
    }

    pub fn increment(&mut self) {
        self.cells[self.cursor] = self.cells[self.cursor].wrapping_add(1);
    }

    pub fn decrement(&mut self) {
        self.cells[self.cursor] = self.cells[self.cursor].wrapping_sub(1);
    }

    /// Clamp an arbitrary index into `0..size`.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.cells.len() - 1)
    }

    /// Read any cell without moving the cursor.
    pub fn read_at(&self, index: usize) -> Result<u8, TapeError> {
        self.cells
            .get(index)
            .copied()
            .ok_or(TapeError::IndexOutOfRange { index, size: self.cells.len() })
    }

    /// Write any cell without moving the cursor.
    pub fn write_at(&mut self, index: usize, value: u8) -> Result<(), TapeError> {
        let size = self.cells.len();
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(TapeError::IndexOutOfRange { index, size })?;
        *cell = value;
        Ok(())
    }

    /// Read-only view of every cell.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Zero every cell. The cursor stays put.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tape_is_zeroed_with_cursor_at_start() {
        for size in [1, 2, 3, 17, DEFAULT_TAPE_SIZE] {
            let tape = Tape::new(size).unwrap();
            assert_eq!(tape.size(), size);
            assert_eq!(tape.cursor(), 0);
            assert!(tape.cells().iter().all(|&c| c == 0));
        }
    }

    #[test]
    fn zero_size_is_rejected() {
        assert_eq!(Tape::new(0).unwrap_err(), TapeError::ZeroSize);
    }

    #[test]
    fn increment_wraps_after_256_steps() {
        let mut tape = Tape::new(1).unwrap();
        tape.set(42);
        for _ in 0..256 {
            tape.increment();
        }
        assert_eq!(tape.get(), 42);
    }

    #[test]
    fn decrement_undoes_increment() {
        let mut tape = Tape::new(1).unwrap();
        tape.decrement();
        assert_eq!(tape.get(), 255);
        tape.increment();
        assert_eq!(tape.get(), 0);
    }

    #[test]
    fn moving_left_from_first_cell_fails_and_keeps_cursor() {
        let mut tape = Tape::new(4).unwrap();
        let err = tape.move_left().unwrap_err();
        assert_eq!(err, TapeError::OutOfBounds { cursor: 0, direction: Direction::Left });
        assert_eq!(tape.cursor(), 0);
    }

    #[test]
    fn moving_right_from_last_cell_fails_and_keeps_cursor() {
        let mut tape = Tape::new(3).unwrap();
        tape.move_right().unwrap();
        tape.move_right().unwrap();
        let err = tape.move_right().unwrap_err();
        assert_eq!(err, TapeError::OutOfBounds { cursor: 2, direction: Direction::Right });
        assert_eq!(tape.cursor(), 2);
    }

    #[test]
    fn single_cell_tape_cannot_move_at_all() {
        let mut tape = Tape::new(1).unwrap();
        assert!(tape.move_right().is_err());
        assert!(tape.move_left().is_err());
        assert_eq!(tape.cursor(), 0);
    }

    #[test]
    fn boundary_messages_name_the_side() {
        let mut tape = Tape::new(1).unwrap();
        let right = tape.move_right().unwrap_err().to_string();
        let left = tape.move_left().unwrap_err().to_string();
        assert!(right.contains("overflow"), "{right}");
        assert!(left.contains("underflow"), "{left}");
    }

    #[test]
    fn reset_is_idempotent_and_keeps_cursor() {
        let mut tape = Tape::new(8).unwrap();
        tape.increment();
        tape.move_right().unwrap();
        tape.move_right().unwrap();
        tape.set(9);

        tape.reset();
        let once = tape.cells().to_vec();
        tape.reset();

        assert_eq!(tape.cells(), once.as_slice());
        assert!(tape.cells().iter().all(|&c| c == 0));
        assert_eq!(tape.cursor(), 2);
    }

    #[test]
    fn read_and_write_at_index() {
        let mut tape = Tape::new(4).unwrap();
        tape.write_at(3, 7).unwrap();
        assert_eq!(tape.read_at(3), Ok(7));
        assert_eq!(tape.cursor(), 0);
        assert_eq!(
            tape.read_at(4),
            Err(TapeError::IndexOutOfRange { index: 4, size: 4 })
        );
        assert!(tape.write_at(10, 1).is_err());
    }

    #[test]
    fn clamp_index_stays_inside_tape() {
        let tape = Tape::new(16).unwrap();
        assert_eq!(tape.clamp_index(0), 0);
        assert_eq!(tape.clamp_index(15), 15);
        assert_eq!(tape.clamp_index(1_000), 15);
    }
}
