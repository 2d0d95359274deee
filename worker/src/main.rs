use std::{env, io};

use log::info;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use worker::{Session, sync::ParameterSet};

const ROUNDS: usize = 5;
const ARRAY_SIZE: usize = 1000;
const MATRIX_ROWS: usize = 11;
const MATRIX_COLS: usize = 10;

fn mismatch(what: &str, at: usize, got: f32, expected: f32) -> io::Error {
    io::Error::other(format!("{what}[{at}] = {got}, expected {expected}"))
}

/// Every worker adds `i` into element `i` once per round.
fn check_array(session: &Session) -> io::Result<()> {
    let table = session.new_array_table(ARRAY_SIZE)?;
    let delta: Vec<f32> = (0..ARRAY_SIZE).map(|i| i as f32).collect();
    let workers = session.workers() as f32;

    for round in 1..=ROUNDS {
        table.add(&delta)?;
        session.barrier()?;

        let values = table.get()?;
        for (i, &got) in values.iter().enumerate() {
            let expected = i as f32 * round as f32 * workers;
            if got != expected {
                return Err(mismatch("array", i, got, expected));
            }
        }

        session.barrier()?;
    }

    info!(rounds = ROUNDS; "array table ok");
    Ok(())
}

/// Every worker adds the whole matrix, and once more a subset of its rows, once per round.
fn check_matrix(session: &Session) -> io::Result<()> {
    let table = session.new_matrix_table(MATRIX_ROWS, MATRIX_COLS)?;
    let row_ids = [0, 1, 5, 10];
    let len = MATRIX_ROWS * MATRIX_COLS;
    let delta: Vec<f32> = (0..len).map(|i| i as f32).collect();
    let rows_delta: Vec<f32> = row_ids
        .iter()
        .flat_map(|&row| &delta[row * MATRIX_COLS..(row + 1) * MATRIX_COLS])
        .copied()
        .collect();
    let workers = session.workers() as f32;

    for round in 1..=ROUNDS {
        table.add(&delta)?;
        table.add_rows(&row_ids, &rows_delta)?;
        session.barrier()?;

        let values = table.get()?;
        for ((row, col), &got) in values.indexed_iter() {
            let times = if row_ids.contains(&row) { 2.0 } else { 1.0 };
            let base = (row * MATRIX_COLS + col) as f32;
            let expected = base * times * round as f32 * workers;

            if got != expected {
                return Err(mismatch("matrix", row * MATRIX_COLS + col, got, expected));
            }
        }

        let partial = table.get_rows(&[10, 0])?;
        if partial.row(0) != values.row(10) || partial.row(1) != values.row(0) {
            return Err(io::Error::other("row-partial read out of order"));
        }

        session.barrier()?;
    }

    info!(rounds = ROUNDS; "matrix table ok");
    Ok(())
}

/// Seeds random parameters from the master, then every worker nudges them once.
fn check_delta_sync(session: &Session) -> io::Result<()> {
    let mut rng = rand::rng();
    let params: Vec<ArrayD<f32>> = [vec![4, 3], vec![3]]
        .into_iter()
        .map(|shape| ArrayD::from_shape_fn(IxDyn(&shape), |_| rng.random_range(-1.0..1.0)))
        .collect();

    let mut adapter = session.delta_sync(params)?;
    let mut start = Vec::new();
    adapter.params().read_current_values(&mut start);

    for tensor in adapter.params_mut() {
        tensor.mapv_inplace(|v| v + 1.0);
    }

    adapter.sync()?;
    session.barrier()?;
    adapter.sync()?;

    let mut end = Vec::new();
    adapter.params().read_current_values(&mut end);
    let workers = session.workers() as f32;

    for (i, (&got, &first)) in end.iter().zip(&start).enumerate() {
        let expected = first + workers;
        if (got - expected).abs() > 1e-4 {
            return Err(mismatch("parameters", i, got, expected));
        }
    }

    info!("delta sync ok");
    Ok(())
}

fn main() -> io::Result<()> {
    env_logger::init();

    let session = Session::init(env::args())?;
    info!(
        worker_id = session.worker_id(),
        workers = session.workers();
        "running table checks"
    );

    check_array(&session)?;
    check_matrix(&session)?;
    check_delta_sync(&session)?;

    session.shutdown()?;
    info!("all checks passed");
    Ok(())
}
