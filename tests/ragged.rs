mod common;
use common::*;

use anyhow::Result;
use ndarray::Array1;
use proptest::prelude::*;
use ragstore::backend::{
    fs::Fs, AttributeOp, Backend, DataContainer, DatasetOp, GroupOp, StoreOp,
};
use ragstore::data::SelectInfoElem;
use ragstore::{
    RaggedArray, RaggedArrayBuilder, RaggedElem, RaggedWriter, Readable, ReadableArray,
    StoreError, Writable,
};

fn rows_of<T: Clone>(arr: &RaggedArray<T>) -> Vec<Vec<T>> {
    arr.iter_rows().map(|r| r.to_vec()).collect()
}

#[test]
fn test_roundtrip() -> Result<()> {
    with_tmp_path(|path| {
        let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0, 3.0], vec![], vec![4.0]];
        let arr = RaggedArray::from_rows(rows.clone());

        let store = Fs::new(&path)?;
        arr.write(&store, "spikes")?;
        store.close()?;

        let store = Fs::open(&path)?;
        let container = DataContainer::open(&store, "spikes")?;
        let loaded: RaggedArray<f64> = RaggedArray::read(&container)?;

        assert_eq!(loaded.row_ends(), &[3, 3, 4]);
        assert_eq!(loaded.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(loaded.get_row(0)?, &[1.0, 2.0, 3.0]);
        assert_eq!(loaded.get_row(1)?, &[] as &[f64]);
        assert_eq!(loaded.get_row(2)?, &[4.0]);
        assert_eq!(loaded, arr);
        store.close()
    })
}

#[test]
fn test_backed_row_access() -> Result<()> {
    with_tmp_path(|path| {
        let rows: Vec<Vec<i64>> = vec![vec![10, 20], vec![], vec![30], vec![40, 50, 60]];
        let arr = RaggedArray::from_rows(rows.clone());

        let store = Fs::new(&path)?;
        let container = arr.write(&store, "events")?;
        let elem = RaggedElem::<Fs, i64>::try_from(container)?;

        assert_eq!(elem.row_count(), 4);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(&elem.get_row(i)?, row);
        }

        // Out-of-range stays typed, for empty rows and full stores alike.
        let err = elem.get_row(4).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::IndexOutOfRange { index: 4, rows: 4 })
        );

        // Row-range selection windows the offsets once.
        let sub = elem.select_rows(&SelectInfoElem::from(1..3))?;
        assert_eq!(rows_of(&sub), rows[1..3].to_vec());

        // Arbitrary row picking.
        let picked = elem.select_rows(&SelectInfoElem::from(vec![3, 0]))?;
        assert_eq!(rows_of(&picked), vec![vec![40, 50, 60], vec![10, 20]]);

        store.close()
    })
}

#[test]
fn test_zero_rows_is_a_valid_state() -> Result<()> {
    with_tmp_path(|path| {
        let arr = RaggedArray::<f64>::from_rows(Vec::<Vec<f64>>::new());
        assert_eq!(arr.row_count(), 0);

        let store = Fs::new(&path)?;
        let container = arr.write(&store, "empty")?;
        let elem = RaggedElem::<Fs, f64>::try_from(container)?;
        assert_eq!(elem.row_count(), 0);

        let err = elem.get_row(0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::IndexOutOfRange { index: 0, rows: 0 })
        );
        store.close()
    })
}

#[test]
fn test_corrupt_offsets_are_reported() -> Result<()> {
    with_tmp_path(|path| {
        let arr = RaggedArray::from_rows(vec![vec![1i32, 2, 3], vec![4], vec![5]]);
        let store = Fs::new(&path)?;
        arr.write(&store, "bad")?;
        store.close()?;

        // Tamper with the persisted offsets: non-monotonic.
        let store = Fs::open_rw(&path)?;
        let group = store.open_group("bad")?;
        let ends = group.open_dataset("row_ends")?;
        ends.write_array(Array1::from_vec(vec![3u64, 2, 5]).into())?;
        store.close()?;

        let store = Fs::open(&path)?;
        let container = DataContainer::open(&store, "bad")?;

        // A full read validates at load.
        let err = RaggedArray::<i32>::read(&container).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::CorruptData(_))
        ));

        // Backed row access validates the offset window it reads.
        let elem = RaggedElem::<Fs, i32>::try_from(container)?;
        let err = elem.get_row(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::CorruptData(_))
        ));
        store.close()
    })
}

#[test]
fn test_offsets_that_overrun_values() -> Result<()> {
    with_tmp_path(|path| {
        let arr = RaggedArray::from_rows(vec![vec![1i32, 2], vec![3]]);
        let store = Fs::new(&path)?;
        arr.write(&store, "bad")?;

        let group = store.open_group("bad")?;
        let ends = group.open_dataset("row_ends")?;
        ends.write_array(Array1::from_vec(vec![2u64, 7]).into())?;

        let container = DataContainer::open(&store, "bad")?;
        let elem = RaggedElem::<Fs, i32>::try_from(container)?;
        let err = elem.get_row(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::CorruptData(_))
        ));
        store.close()
    })
}

#[test]
fn test_streaming_writer_matches_builder() -> Result<()> {
    with_tmp_path(|path| {
        let rows: Vec<Vec<f64>> =
            vec![vec![0.5; 700], vec![], vec![1.5, 2.5], Vec::new(), vec![9.0; 3]];

        let store = Fs::new(&path)?;
        let mut writer = RaggedWriter::<Fs, f64>::new(&store, "streamed")?;
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(writer.append_row(row)?, i);
        }
        assert_eq!(writer.row_count(), rows.len());
        let container = writer.finish()?;

        let streamed: RaggedArray<f64> = RaggedArray::read(&container)?;
        assert_eq!(streamed, RaggedArray::from_rows(rows));
        store.close()
    })
}

#[test]
fn test_backed_selection_reads_only_requested_rows() -> Result<()> {
    // A selection must succeed even when offsets outside its window are
    // corrupt, because those offsets are never read.
    with_tmp_path(|path| {
        let arr = RaggedArray::from_rows(vec![vec![1i64], vec![2, 3], vec![4], vec![5, 6]]);
        let store = Fs::new(&path)?;
        arr.write(&store, "x")?;

        let group = store.open_group("x")?;
        let ends = group.open_dataset("row_ends")?;
        // Corrupt only the last row's offset.
        ends.write_array_slice(
            Array1::from_vec(vec![2u64]).into(),
            &[SelectInfoElem::from(3..4)],
        )?;

        let container = DataContainer::open(&store, "x")?;
        let selected = RaggedArray::<i64>::read_select(&container, &[SelectInfoElem::from(0..3)])?;
        assert_eq!(
            rows_of(&selected),
            vec![vec![1i64], vec![2, 3], vec![4]]
        );

        // While a read touching the corrupt window is rejected.
        let err =
            RaggedArray::<i64>::read_select(&container, &[SelectInfoElem::from(2..4)]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::CorruptData(_))
        ));
        store.close()
    })
}

#[test]
fn test_length_attribute() -> Result<()> {
    with_tmp_path(|path| {
        let arr = RaggedArray::from_rows(vec![vec![1u8], vec![2, 3]]);
        let store = Fs::new(&path)?;
        let container = arr.write(&store, "x")?;
        assert_eq!(container.as_group()?.get_usize_attr("length")?, 2);
        assert_eq!(
            RaggedArray::<u8>::get_shape::<Fs>(&container)?.as_ref(),
            &[2]
        );
        store.close()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_append_preserves_rows(rows in ragged_rows_strat(10, 50)) {
        let mut builder = RaggedArrayBuilder::new();
        for row in &rows {
            builder.append_row(row.clone()).unwrap();
        }
        let arr = builder.finish().unwrap();

        prop_assert_eq!(arr.row_count(), rows.len());
        let total: usize = rows.iter().map(|r| r.len()).sum();
        prop_assert_eq!(arr.len(), total);
        for (i, row) in rows.iter().enumerate() {
            prop_assert_eq!(arr.get_row(i).unwrap(), row.as_slice());
        }
        // Offsets are non-decreasing and close over the value buffer.
        prop_assert!(arr.row_ends().windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(arr.row_ends().last().copied().unwrap_or(0), total);
    }

    #[test]
    fn prop_store_roundtrip(rows in ragged_rows_strat(10, 50)) {
        with_tmp_path(|path| {
            let arr = RaggedArray::from_rows(rows.clone());
            let store = Fs::new(&path).unwrap();
            let container = arr.write(&store, "x").unwrap();
            let loaded: RaggedArray<f64> = RaggedArray::read(&container).unwrap();
            assert_eq!(loaded, arr);

            let elem = RaggedElem::<Fs, f64>::try_from(container).unwrap();
            for (i, row) in rows.iter().enumerate() {
                assert_eq!(&elem.get_row(i).unwrap(), row);
            }
            store.close().unwrap();
        });
    }
}
