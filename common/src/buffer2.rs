use std::ops::{Deref, Index, IndexMut};
use std::slice;

use rayon::prelude::*;

/// Rows handed to one rayon task by the row-parallel helpers.
const ROWS_PER_CHUNK: usize = 8;

/// Dense row-major 2-D buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `true` when both buffers have the same width and height.
    #[inline]
    pub fn same_shape<U>(&self, other: &Buffer2<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.pixels.iter()
    }

}

impl<T: Default + Clone> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![T::default(); width * height],
            width,
            height,
        }
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }
}

impl<T: Send> Buffer2<T> {
    /// Overwrites every row in parallel. `f` receives the row index and the row slice.
    pub fn par_fill_rows<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        let width = self.width;
        if self.pixels.is_empty() {
            return;
        }

        self.pixels
            .par_chunks_mut(width * ROWS_PER_CHUNK)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let y_start = chunk_idx * ROWS_PER_CHUNK;
                for (local_y, row) in chunk.chunks_exact_mut(width).enumerate() {
                    f(y_start + local_y, row);
                }
            });
    }
}

impl<T: Sync> Buffer2<T> {
    /// Element-wise parallel map into a new buffer of the same shape.
    pub fn par_map<U, F>(&self, f: F) -> Buffer2<U>
    where
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        Buffer2 {
            pixels: self.pixels.par_iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Element-wise parallel map over two buffers of the same shape.
    pub fn par_zip_map<U, V, F>(&self, other: &Buffer2<U>, f: F) -> Buffer2<V>
    where
        U: Sync,
        V: Send,
        F: Fn(&T, &U) -> V + Sync + Send,
    {
        assert!(self.same_shape(other), "buffer shape mismatch");
        Buffer2 {
            pixels: self
                .pixels
                .par_iter()
                .zip(other.pixels.par_iter())
                .map(|(a, b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl<T> Deref for Buffer2<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}
