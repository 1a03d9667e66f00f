//! Two-dimensional buffers.
//!
//! [`Grid2D`] stores rows contiguously with a `stride` that may exceed the
//! width. Aligned grids round the stride up to a multiple of
//! [`GRID_ALIGN`] elements so 4-wide loads at the end of a row never
//! touch the next one. A grid either owns its storage or borrows a caller
//! slice, e.g. a plane of a larger image.
//!
//! ```rust
//! use clut_core::Grid2D;
//!
//! let mut g: Grid2D<f32> = Grid2D::aligned(5, 2);
//! assert_eq!(g.stride(), 8);
//! g[(1, 4)] = 3.0;
//! assert_eq!(g.row(1)[4], 3.0);
//! ```

use std::ops::{Index, IndexMut};

use crate::{Error, Result};

#[derive(Debug)]
enum Storage<'a, T> {
    Owned(Vec<T>),
    Borrowed(&'a mut [T]),
}

/// A row-major 2D array, owning or borrowing its storage.
#[derive(Debug)]
pub struct Grid2D<'a, T> {
    width: usize,
    height: usize,
    stride: usize,
    aligned: bool,
    storage: Storage<'a, T>,
}

/// Grid that always owns its storage.
pub type OwnedGrid<T> = Grid2D<'static, T>;

/// Row alignment, in elements, of aligned grids.
pub const GRID_ALIGN: usize = 4;

fn aligned_stride(width: usize) -> usize {
    width.div_ceil(GRID_ALIGN) * GRID_ALIGN
}

impl<T: Clone + Default> Grid2D<'static, T> {
    /// Creates an owned grid filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Creates an owned grid whose rows are padded to [`GRID_ALIGN`].
    pub fn aligned(width: usize, height: usize) -> Self {
        let stride = aligned_stride(width);
        Self {
            width,
            height,
            stride,
            aligned: true,
            storage: Storage::Owned(vec![T::default(); stride * height]),
        }
    }

    /// Creates an owned grid filled with `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            stride: width,
            aligned: false,
            storage: Storage::Owned(vec![value; width * height]),
        }
    }

    /// Wraps a tightly packed vector.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::Config(format!(
                "grid data has {} elements, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            stride: width,
            aligned: false,
            storage: Storage::Owned(data),
        })
    }
}

impl<'a, T> Grid2D<'a, T> {
    /// Borrows `data` as a grid with the given row stride.
    pub fn borrowed(width: usize, height: usize, stride: usize, data: &'a mut [T]) -> Result<Self> {
        let needed = if height == 0 { 0 } else { stride * (height - 1) + width };
        if stride < width || data.len() < needed {
            return Err(Error::Config(format!(
                "borrowed slice of {} elements cannot hold {}x{} with stride {}",
                data.len(),
                width,
                height,
                stride
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            aligned: false,
            storage: Storage::Borrowed(data),
        })
    }

    /// Width in elements.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance in elements between the starts of consecutive rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// True if the grid holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True if the grid owns its storage.
    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    fn data(&self) -> &[T] {
        match &self.storage {
            Storage::Owned(v) => v,
            Storage::Borrowed(s) => s,
        }
    }

    fn data_mut(&mut self) -> &mut [T] {
        match &mut self.storage {
            Storage::Owned(v) => v,
            Storage::Borrowed(s) => s,
        }
    }

    /// Returns row `y`, excluding padding.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.stride;
        &self.data()[start..start + self.width]
    }

    /// Returns row `y` mutably, excluding padding.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.stride;
        let width = self.width;
        &mut self.data_mut()[start..start + width]
    }

    /// Iterates over all rows mutably.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        let (width, height, stride) = (self.width, self.height, self.stride.max(1));
        self.data_mut()
            .chunks_mut(stride)
            .take(height)
            .map(move |row| &mut row[..width])
    }

    /// Sets every element, padding included.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data_mut().fill(value);
    }

    /// Resizes an owned grid, resetting its contents to `T::default()`.
    ///
    /// Borrowed grids cannot be resized.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()>
    where
        T: Clone + Default,
    {
        let Storage::Owned(v) = &mut self.storage else {
            return Err(Error::Config("cannot resize a borrowed grid".into()));
        };
        let stride = if self.aligned { aligned_stride(width) } else { width };
        v.clear();
        v.resize(stride * height, T::default());
        self.width = width;
        self.height = height;
        self.stride = stride;
        Ok(())
    }
}

impl<T> Index<(usize, usize)> for Grid2D<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, (y, x): (usize, usize)) -> &T {
        debug_assert!(x < self.width);
        &self.data()[y * self.stride + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid2D<'_, T> {
    #[inline]
    fn index_mut(&mut self, (y, x): (usize, usize)) -> &mut T {
        debug_assert!(x < self.width);
        let stride = self.stride;
        &mut self.data_mut()[y * stride + x]
    }
}
