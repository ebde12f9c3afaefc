//! Value patterns whose origin can be read back from the value itself.

/// A `width` x `height` canonical grid (row-major, south row first) where
/// the point at column `col`, row `row` holds `col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col * 1000 + row) as f32))
        .collect()
}

/// Store a canonical grid (row-major, south row first, west to east) in the
/// traversal described by a GRIB scanning mode byte.
///
/// Lines are rows unless bit 0x20 is set, in which case they are columns.
/// The first line starts at the west edge unless 0x80 is set and at the
/// north edge unless 0x40 is set. With 0x10 every second line runs in the
/// opposite direction.
pub fn encode_scan_order(canonical: &[f32], kx: usize, ky: usize, flag: u8) -> Vec<f32> {
    let i_negative = flag & 0x80 != 0;
    let j_positive = flag & 0x40 != 0;
    let j_consecutive = flag & 0x20 != 0;
    let boustrophedon = flag & 0x10 != 0;

    let rows: Vec<usize> = if j_positive {
        (0..ky).collect()
    } else {
        (0..ky).rev().collect()
    };
    let cols: Vec<usize> = if i_negative {
        (0..kx).rev().collect()
    } else {
        (0..kx).collect()
    };

    let (outer, inner) = if j_consecutive { (&cols, &rows) } else { (&rows, &cols) };
    let mut stored = Vec::with_capacity(kx * ky);
    for (k, a) in outer.iter().enumerate() {
        let reverse = boustrophedon && k % 2 == 1;
        let line: Vec<usize> = if reverse {
            inner.iter().rev().copied().collect()
        } else {
            inner.clone()
        };
        for b in line {
            let (row, col) = if j_consecutive { (b, *a) } else { (*a, b) };
            stored.push(canonical[row * kx + col]);
        }
    }
    stored
}

/// Concatenated lines of a quasi-regular grid; point `p` of line `l` holds
/// `l * 100 + p`.
pub fn create_quasi_lines(counts: &[usize]) -> Vec<f32> {
    counts
        .iter()
        .enumerate()
        .flat_map(|(l, n)| (0..*n).map(move |p| (l * 100 + p) as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_encode_canonical_is_identity() {
        let grid = create_test_grid(4, 3);
        assert_eq!(encode_scan_order(&grid, 4, 3, 0x40), grid);
    }

    #[test]
    fn test_encode_north_first() {
        let grid: Vec<f32> = (0..6).map(|v| v as f32).collect();
        assert_eq!(
            encode_scan_order(&grid, 3, 2, 0x00),
            vec![3.0, 4.0, 5.0, 0.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_encode_column_boustrophedon() {
        let grid: Vec<f32> = (0..6).map(|v| v as f32).collect();
        // Columns south to north, second column north to south
        assert_eq!(
            encode_scan_order(&grid, 2, 3, 0x70),
            vec![0.0, 2.0, 4.0, 5.0, 3.0, 1.0]
        );
    }

    #[test]
    fn test_quasi_lines() {
        assert_eq!(create_quasi_lines(&[2, 1]), vec![0.0, 1.0, 100.0]);
    }
}
