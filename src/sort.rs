#![forbid(unsafe_code)]
//! In-memory co-sort of a key array with a parallel byte array.
//!
//! Keys are sorted ascending as unsigned 64-bit integers; whenever two key
//! slots swap, the corresponding fixed-width value slots swap bitwise. The
//! algorithm is a recursive Hoare partition with a uniform random pivot.
//! Elements equal to the pivot may land in either subrange, so the sort is
//! not stable; duplicate keys keep no particular relative order.

use rand::Rng;

/// Hard ceiling on edges per shard. A shovel beyond this cannot be loaded
/// and co-sorted in RAM, and the run must fail fast instead.
pub const MAX_SHARD_EDGES: usize = 500_000_000;

/// Sorts `keys` ascending, co-permuting the `size_of`-wide records of
/// `values`. `values.len()` must equal `keys.len() * size_of`.
pub fn sort_with_values(keys: &mut [u64], values: &mut [u8], size_of: usize) {
    debug_assert_eq!(values.len(), keys.len() * size_of);
    if keys.len() > 1 {
        let mut rng = rand::thread_rng();
        quick_sort(
            keys,
            values,
            size_of,
            0,
            keys.len() as isize - 1,
            &mut rng,
        );
    }
}

fn quick_sort<R: Rng>(
    keys: &mut [u64],
    values: &mut [u8],
    size_of: usize,
    left: isize,
    right: isize,
    rng: &mut R,
) {
    let idx = partition(keys, values, size_of, left, right, rng);
    if left < idx - 1 {
        quick_sort(keys, values, size_of, left, idx - 1, rng);
    }
    if idx < right {
        quick_sort(keys, values, size_of, idx, right, rng);
    }
}

fn partition<R: Rng>(
    keys: &mut [u64],
    values: &mut [u8],
    size_of: usize,
    left: isize,
    right: isize,
    rng: &mut R,
) -> isize {
    let mut i = left;
    let mut j = right;
    let pivot = keys[rng.gen_range(left..=right) as usize];

    while i <= j {
        while keys[i as usize] < pivot {
            i += 1;
        }
        while keys[j as usize] > pivot {
            j -= 1;
        }
        if i <= j {
            keys.swap(i as usize, j as usize);
            swap_values(values, size_of, i as usize, j as usize);
            i += 1;
            j -= 1;
        }
    }
    i
}

fn swap_values(values: &mut [u8], size_of: usize, a: usize, b: usize) {
    let (a, b) = (a * size_of, b * size_of);
    for t in 0..size_of {
        values.swap(a + t, b + t);
    }
}
