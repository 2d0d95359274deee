mod common;

use comms::specs::server::SyncMode;
use ndarray::array;
use worker::WorkerErr;

use common::{run_group, start_store};

#[test]
fn array_adds_from_every_worker_accumulate() {
    let (addr, store) = start_store(2, SyncMode::Async);

    run_group(addr, 2, |session| {
        assert_eq!(session.workers(), 2);
        assert_eq!(session.server_id(), 0);

        let table = session.new_array_table(4).unwrap();
        table.add(&[1.0; 4]).unwrap();
        session.barrier().unwrap();

        assert_eq!(table.get().unwrap(), array![2.0, 2.0, 2.0, 2.0]);
        session.shutdown().unwrap();
    });

    store.join().unwrap().unwrap();
}

#[test]
fn exactly_one_master() {
    let (addr, store) = start_store(3, SyncMode::Async);
    let masters = std::sync::atomic::AtomicUsize::new(0);

    run_group(addr, 3, |session| {
        if session.is_master() {
            assert_eq!(session.worker_id(), 0);
            masters.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }

        session.shutdown().unwrap();
    });

    assert_eq!(masters.into_inner(), 1);
    store.join().unwrap().unwrap();
}

#[test]
fn row_partial_access_is_isolated() {
    let (addr, store) = start_store(2, SyncMode::Async);

    run_group(addr, 2, |session| {
        let table = session.new_matrix_table(2, 2).unwrap();

        if session.worker_id() == 0 {
            table.add_rows(&[0], &[5.0, 5.0]).unwrap();
        }
        session.barrier().unwrap();

        assert_eq!(table.get_rows(&[0]).unwrap(), array![[5.0, 5.0]]);
        assert_eq!(table.get_rows(&[1]).unwrap(), array![[0.0, 0.0]]);
        assert_eq!(
            table.get_rows(&[1, 0, 0]).unwrap(),
            array![[0.0, 0.0], [5.0, 5.0], [5.0, 5.0]]
        );
        assert_eq!(table.get().unwrap(), array![[5.0, 5.0], [0.0, 0.0]]);

        session.shutdown().unwrap();
    });

    store.join().unwrap().unwrap();
}

#[test]
fn rows_accumulate_over_rounds() {
    const ROWS: usize = 11;
    const COLS: usize = 10;
    let (addr, store) = start_store(2, SyncMode::Sync);

    run_group(addr, 2, |session| {
        let table = session.new_matrix_table(ROWS, COLS).unwrap();
        let row_ids = [0, 1, 5, 10];
        let delta = vec![1.0; row_ids.len() * COLS];

        for round in 1..=3 {
            table.add_rows(&row_ids, &delta).unwrap();
            session.barrier().unwrap();

            let values = table.get().unwrap();
            for ((row, _), &v) in values.indexed_iter() {
                let expected = if row_ids.contains(&row) { 2.0 * round as f32 } else { 0.0 };
                assert_eq!(v, expected, "row {row} at round {round}");
            }

            session.barrier().unwrap();
        }

        session.shutdown().unwrap();
    });

    store.join().unwrap().unwrap();
}

#[test]
fn invalid_requests_never_reach_the_store() {
    let (addr, store) = start_store(1, SyncMode::Async);

    run_group(addr, 1, |session| {
        let array = session.new_array_table(4).unwrap();
        let matrix = session.new_matrix_table(3, 2).unwrap();

        assert!(matches!(
            array.add(&[1.0; 3]),
            Err(WorkerErr::SizeMismatch {
                got: 3,
                expected: 4,
                ..
            })
        ));
        assert!(matches!(
            matrix.get_rows(&[5]),
            Err(WorkerErr::InvalidRowId {
                row: Some(5),
                rows: 3
            })
        ));
        assert!(matches!(
            matrix.add_rows(&[], &[]),
            Err(WorkerErr::InvalidRowId { row: None, .. })
        ));
        assert!(matches!(
            matrix.add_rows(&[0, 3], &[1.0; 4]),
            Err(WorkerErr::InvalidRowId { row: Some(3), .. })
        ));
        assert!(matches!(
            session.new_matrix_table(0, 2),
            Err(WorkerErr::InvalidShape { rows: 0, cols: 2 })
        ));

        let mut out = [0.0; 5];
        assert!(matches!(
            array.get_into(&mut out),
            Err(WorkerErr::SizeMismatch { got: 5, .. })
        ));

        assert_eq!(array.get().unwrap(), array![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(matrix.get().unwrap(), ndarray::Array2::<f32>::zeros((3, 2)));

        session.shutdown().unwrap();
        assert!(matches!(array.get(), Err(WorkerErr::UninitializedHandle)));
        assert!(matches!(session.barrier(), Err(WorkerErr::UninitializedHandle)));
    });

    store.join().unwrap().unwrap();
}

#[test]
fn unreachable_store_is_an_init_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = common::config(addr);
    config.connect_timeout = std::time::Duration::from_millis(200);

    assert!(matches!(
        worker::Session::connect(&config),
        Err(WorkerErr::Initialization(_))
    ));
}
