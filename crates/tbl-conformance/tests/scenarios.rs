#![forbid(unsafe_code)]

//! End-to-end scenarios across the engines.

use tbl_conformance::{check_shape, quotes, scenario_frame, trades};
use tbl_expr::{col, filter, lit};
use tbl_frame::{DataFrame, Scalar, SortOptions};
use tbl_groupby::{AggFunc, AggSpec, GroupByExt};
use tbl_io::{Format, deserialize, serialize};
use tbl_join::{AsofJoinArgs, JoinExt, Tolerance};
use tbl_reshape::{MeltArgs, PivotArgs, ReshapeExt};

fn row(df: &DataFrame, idx: usize) -> Vec<Scalar> {
    df.row(idx).expect("row").into_values()
}

#[test]
fn filter_sort_and_count_the_reference_frame() {
    let df = scenario_frame().expect("scenario");

    let small = filter(&df, &col("foo").lt(lit(3_i64))).expect("filter");
    assert_eq!(small.height(), 2);
    assert_eq!(row(&small, 0), vec![Scalar::Int(1), Scalar::Int(6), Scalar::from("a")]);
    assert_eq!(row(&small, 1), vec![Scalar::Int(2), Scalar::Int(7), Scalar::from("b")]);

    let sorted = df
        .sort(&["foo"], &SortOptions::descending(vec![true]))
        .expect("sort");
    let rows = (0..3).map(|idx| row(&sorted, idx)).collect::<Vec<_>>();
    assert_eq!(
        rows,
        vec![
            vec![Scalar::Int(3), Scalar::Int(8), Scalar::from("c")],
            vec![Scalar::Int(2), Scalar::Int(7), Scalar::from("b")],
            vec![Scalar::Int(1), Scalar::Int(6), Scalar::from("a")],
        ]
    );

    let counts = df.group_by(&["ham"]).expect("group_by").count().expect("count");
    assert_eq!(counts.height(), 3);
    assert_eq!(
        counts.column("count").expect("count").to_vec(),
        [1, 1, 1].map(Scalar::Int).to_vec()
    );
}

#[test]
fn trades_pick_up_the_latest_quote_per_ticker() {
    let trades = trades().expect("trades");
    let quotes = quotes().expect("quotes");
    let args = AsofJoinArgs::on("time")
        .by(&["ticker"])
        .with_tolerance(Tolerance::Numeric(10.0));
    let out = trades.join_asof(&quotes, &args).expect("asof");
    check_shape(&out).expect("shape");
    assert_eq!(out.column_names(), vec!["time", "ticker", "price", "quantity", "bid"]);
    assert_eq!(
        out.column("bid").expect("bid").to_vec(),
        vec![
            Scalar::Float(51.95),
            Scalar::Float(51.95),
            Scalar::Float(720.50),
            Scalar::Null,
            Scalar::Float(720.61),
            Scalar::Float(97.99),
            Scalar::Float(720.50),
            Scalar::Float(52.01),
        ]
    );
}

#[test]
fn aggregates_survive_the_json_boundary() {
    let trades = trades().expect("trades");
    let summary = trades
        .group_by(&["ticker"])
        .expect("group_by")
        .agg(&[
            AggSpec::new("quantity", AggFunc::Sum).alias("volume"),
            AggSpec::new("price", AggFunc::Mean),
        ])
        .expect("agg");
    let bytes = serialize(&summary, Format::Json).expect("serialize");
    let back = deserialize(&bytes, Format::Json).expect("deserialize");
    assert_eq!(back, summary);
    assert_eq!(
        back.column("volume").expect("volume").to_vec(),
        [340, 250, 100].map(Scalar::Int).to_vec()
    );
}

#[test]
fn csv_input_reshapes_long_and_back() {
    let wide = deserialize(b"id,q1,q2\n1,10,\n2,30,40\n", Format::Csv).expect("csv");
    let long = wide.melt(&MeltArgs::new(&["id"], &[])).expect("melt");
    assert_eq!(long.height(), 4);
    let back = long
        .pivot(&PivotArgs::new(&["id"], &["variable"], &["value"]))
        .expect("pivot");
    assert_eq!(back, wide);
    let text = serialize(&back, Format::Csv).expect("serialize");
    assert_eq!(text, b"id,q1,q2\n1,10,\n2,30,40\n");
}
