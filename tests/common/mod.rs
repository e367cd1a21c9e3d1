//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod sources;

use recojob_rs::output::{ColumnValue, MergedOutput};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// `EventNumber` column of a merged table, in row order
pub fn event_numbers(output: &MergedOutput, table: &str) -> Vec<i64> {
    output.tables[table]
        .column("EventNumber")
        .expect("table has an EventNumber column")
        .into_iter()
        .map(|v| match v {
            ColumnValue::Int(n) => *n,
            other => panic!("unexpected EventNumber value {:?}", other),
        })
        .collect()
}
