//! Bounded, thread-safe pool of piece records.
//!
//! Model loads on different threads share one arena. The free list is
//! reserved lazily on the first allocation and never grows; running out
//! of pieces is a fatal, non-retryable allocation failure. Recycled
//! pieces keep their buffer capacities, so repeated load/unload cycles
//! stop allocating once the pool is warm.

use parking_lot::Mutex;
use thiserror::Error;

use crate::model::Piece;

/// Upper bound on models alive at once.
pub const MAX_CONCURRENT_MODELS: usize = 2048;

/// Average piece count the pool reserves per model.
pub const AVG_PIECES_PER_MODEL: usize = 16;

/// Arena allocation failure.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// Every piece slot is handed out. Not recoverable for this load.
    #[error("piece arena exhausted ({capacity} pieces in use)")]
    Exhausted {
        /// Total slots in the arena.
        capacity: usize,
    },
}

#[derive(Debug)]
struct ArenaInner {
    free: Vec<Piece>,
    outstanding: usize,
    reserved: bool,
}

/// Fixed-capacity pool handing out [`Piece`] records.
///
/// `allocate` is the only critical section; the returned piece is owned
/// exclusively by the caller and populated without further locking.
#[derive(Debug)]
pub struct PieceArena {
    inner: Mutex<ArenaInner>,
    capacity: usize,
}

impl PieceArena {
    /// Arena with the default capacity
    /// (`MAX_CONCURRENT_MODELS * AVG_PIECES_PER_MODEL`).
    pub fn new() -> Self {
        Self::with_capacity(MAX_CONCURRENT_MODELS * AVG_PIECES_PER_MODEL)
    }

    /// Arena with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ArenaInner {
                free: Vec::new(),
                outstanding: 0,
                reserved: false,
            }),
            capacity,
        }
    }

    /// Total piece slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pieces currently handed out.
    pub fn in_use(&self) -> usize {
        self.inner.lock().outstanding
    }

    /// Take one piece out of the pool.
    ///
    /// The backing storage is reserved on the first call rather than at
    /// construction, so programs that never import a model pay nothing.
    pub fn allocate(&self) -> Result<Piece, ArenaError> {
        let mut inner = self.inner.lock();
        if !inner.reserved {
            inner.free = Vec::with_capacity(self.capacity);
            inner.free.resize_with(self.capacity, Piece::default);
            inner.reserved = true;
        }
        match inner.free.pop() {
            Some(piece) => {
                inner.outstanding += 1;
                Ok(piece)
            }
            None => Err(ArenaError::Exhausted {
                capacity: self.capacity,
            }),
        }
    }

    /// Return pieces to the pool, clearing them but keeping capacities.
    ///
    /// Called from `Model::drop`; pieces are never freed individually.
    pub fn recycle(&self, pieces: impl IntoIterator<Item = Piece>) {
        let mut inner = self.inner.lock();
        for mut piece in pieces {
            piece.reset();
            if inner.free.len() < self.capacity {
                inner.free.push(piece);
            }
            inner.outstanding = inner.outstanding.saturating_sub(1);
        }
    }
}

impl Default for PieceArena {
    fn default() -> Self {
        Self::new()
    }
}
