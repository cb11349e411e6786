use proptest::prelude::*;
use std::path::PathBuf;
use tempfile::tempdir;

pub fn with_tmp_dir<T, F: FnMut(PathBuf) -> T>(mut func: F) -> T {
    let dir = tempdir().unwrap();
    let path = dir.path().to_path_buf();
    func(path)
}

pub fn with_tmp_path<T, F: FnMut(PathBuf) -> T>(mut func: F) -> T {
    with_tmp_dir(|dir| func(dir.join("store")))
}

/// Rows of random lengths, including empty ones.
pub fn ragged_rows_strat(
    max_rows: usize,
    max_row_len: usize,
) -> impl Strategy<Value = Vec<Vec<f64>>> {
    proptest::collection::vec(
        proptest::collection::vec(-1e6f64..1e6, 0..=max_row_len),
        0..=max_rows,
    )
}
