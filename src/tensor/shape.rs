use std::fmt;

use crate::dataloader::error::{DataError, Result};

use super::index;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() || dims.contains(&0) {
            return Err(DataError::InvalidShape(dims));
        }
        Ok(Self { dims })
    }

    /// `[batch, channels, height, width]`
    pub fn image_batch(batch: usize, channels: usize, height: usize, width: usize) -> Result<Self> {
        Self::new(vec![batch, channels, height, width])
    }

    pub fn matrix(rows: usize, cols: usize) -> Result<Self> {
        Self::new(vec![rows, cols])
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.dims
    }

    pub fn dims(&self) -> usize {
        self.dims.len()
    }

    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.num_elements() * std::mem::size_of::<f32>()
    }

    pub fn strides(&self) -> Vec<usize> {
        index::strides(&self.dims)
    }

    pub fn flatten(&self, coord: &[usize]) -> usize {
        index::flatten(coord, &self.dims)
    }

    pub fn unflatten(&self, offset: usize) -> Vec<usize> {
        index::unflatten(offset, &self.dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_zero_dims() {
        assert!(matches!(Shape::new(vec![]), Err(DataError::InvalidShape(_))));
        assert!(matches!(Shape::new(vec![0, 1, 2, 2]), Err(DataError::InvalidShape(_))));
    }

    #[test]
    fn element_and_byte_counts() {
        let shape = Shape::image_batch(2, 1, 28, 28).unwrap();
        assert_eq!(shape.dims(), 4);
        assert_eq!(shape.num_elements(), 2 * 28 * 28);
        assert_eq!(shape.size_in_bytes(), 2 * 28 * 28 * 4);
        assert_eq!(shape.to_string(), "[2, 1, 28, 28]");
    }

    #[test]
    fn one_hot_offset_matches_row_major_layout() {
        let shape = Shape::matrix(3, 10).unwrap();
        assert_eq!(shape.flatten(&[2, 7]), 2 * 10 + 7);
        assert_eq!(shape.unflatten(27), vec![2, 7]);
    }
}
