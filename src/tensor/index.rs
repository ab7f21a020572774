// Row-major index arithmetic. The last dimension is contiguous.
//
// Kernels compiled through NVRTC get the same loops from DEVICE_INDEX_SRC so a
// flat offset means the same coordinate on both sides of the transfer.

/// CUDA C helpers mirroring `flatten` / `unflatten_into`, meant to be prepended to kernel source.
pub const DEVICE_INDEX_SRC: &str = r#"
__device__ __forceinline__ void index2loc(int index, const int *shape, int dims, int *loc)
{
    for (int i = dims - 1; i >= 0; i--) {
        loc[i] = index % shape[i];
        index /= shape[i];
    }
}

__device__ __forceinline__ int loc2index(const int *loc, const int *shape, int dims)
{
    int index = 0;
    int base = 1;
    for (int i = dims - 1; i >= 0; i--) {
        index += base * loc[i];
        base *= shape[i];
    }
    return index;
}
"#;

/// Flat offset of `coord` in a buffer laid out with `shape`.
#[inline]
pub fn flatten(coord: &[usize], shape: &[usize]) -> usize {
    debug_assert_eq!(coord.len(), shape.len());

    let mut index = 0;
    let mut base = 1;
    for i in (0..shape.len()).rev() {
        index += base * coord[i];
        base *= shape[i];
    }
    index
}

/// Writes the coordinate of `offset` into `coord` without allocating.
#[inline]
pub fn unflatten_into(mut offset: usize, shape: &[usize], coord: &mut [usize]) {
    debug_assert_eq!(coord.len(), shape.len());

    for i in (0..shape.len()).rev() {
        coord[i] = offset % shape[i];
        offset /= shape[i];
    }
}

pub fn unflatten(offset: usize, shape: &[usize]) -> Vec<usize> {
    let mut coord = vec![0; shape.len()];
    unflatten_into(offset, shape, &mut coord);
    coord
}

pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}
