//! Byte buffers whose start address satisfies an engine-required alignment.
//!
//! The engine reads model weights with SIMD loads straight out of the buffer
//! it is handed, so the first byte must sit on a multiple of the artifact's
//! alignment. The buffer over-allocates by `alignment - 1` bytes and exposes
//! the window starting at the first aligned address. A boxed slice never
//! moves its heap allocation, so the window stays aligned for the buffer's
//! whole lifetime.

use std::fmt;

use verto_core::{Result, VertoError};

/// Largest alignment accepted (one page).
pub const MAX_ALIGNMENT: usize = 4096;

/// Owned, aligned copy of a model artifact.
pub struct AlignedBuffer {
    storage: Box<[u8]>,
    offset: usize,
    len: usize,
    alignment: usize,
}

impl AlignedBuffer {
    /// Allocate a zeroed buffer of `len` bytes aligned to `alignment`.
    pub fn zeroed(len: usize, alignment: usize) -> Result<Self> {
        if !alignment.is_power_of_two() || alignment > MAX_ALIGNMENT {
            return Err(VertoError::input(format!(
                "alignment {alignment} is not a power of two up to {MAX_ALIGNMENT}"
            )));
        }
        let storage = vec![0_u8; len + alignment - 1].into_boxed_slice();
        let offset = storage.as_ptr().align_offset(alignment);
        if offset >= alignment {
            return Err(VertoError::engine(format!(
                "cannot align allocation to {alignment} bytes"
            )));
        }
        Ok(Self {
            storage,
            offset,
            len,
            alignment,
        })
    }

    /// Copy `bytes` into a fresh buffer aligned to `alignment`.
    pub fn from_bytes(bytes: &[u8], alignment: usize) -> Result<Self> {
        let mut buffer = Self::zeroed(bytes.len(), alignment)?;
        buffer.as_mut_slice().copy_from_slice(bytes);
        Ok(buffer)
    }

    /// The aligned bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.len]
    }

    /// The aligned bytes, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.offset..self.offset + self.len]
    }

    /// Address of the first aligned byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }

    /// Size in bytes of the aligned window.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment this buffer was built for.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Whether the start address is a multiple of the alignment.
    pub fn is_aligned(&self) -> bool {
        (self.as_ptr() as usize) % self.alignment == 0
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("alignment", &self.alignment)
            .finish_non_exhaustive()
    }
}
