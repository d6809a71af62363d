use std::sync::Arc;

use cosmo_core::{evaluate_checked, ColumnName, GaussianSumPipeline, Pipeline};
use cosmo_output::{
    open_sink, Column, ColumnKind, InMemoryOutput, OutputConfig, OutputFormat, OutputSink,
    RowLayout, SampleRow, TextOutput,
};
use tempfile::tempdir;

fn fill(sink: &mut dyn OutputSink, points: &[[f64; 2]]) {
    let pipeline = GaussianSumPipeline::new().expect("pipeline");
    let layout = RowLayout::for_pipeline(&pipeline, &["weight"]).expect("layout");
    for point in points {
        let eval = evaluate_checked(&pipeline, point).expect("evaluate");
        let row = layout.row(point, &eval, &[1.0]).expect("row");
        sink.record(row).expect("record");
    }
}

const POINTS: [[f64; 2]; 4] = [[0.0, 0.0], [1.0, -0.5], [2.75, 0.25], [-1.5, 1.5]];

#[test]
fn schema_orders_parameters_extras_then_derived() {
    let mut sink = InMemoryOutput::new();
    assert!(sink.schema().is_none());
    fill(&mut sink, &POINTS);
    let schema = sink.schema().expect("schema");
    assert_eq!(
        schema.header(),
        vec![
            "parameters--p1",
            "parameters--p2",
            "parameters--p3",
            "prior",
            "post",
            "weight"
        ]
    );
    assert_eq!(schema.of_kind(ColumnKind::Extra).count(), 1);
    assert_eq!(sink.len(), 4);
}

#[test]
fn column_lookup_accepts_any_spelling() {
    let mut sink = InMemoryOutput::new();
    fill(&mut sink, &POINTS);
    let p3 = sink.column("PARAMETERS--P3").expect("column");
    let slash = sink.column("parameters/p3").expect("column");
    assert_eq!(p3.len(), 4);
    assert_eq!(p3[1], 0.5);
    assert!(p3[2].is_nan());
    assert_eq!(p3[0], slash[0]);
    let err = sink.column("parameters--p9").unwrap_err();
    assert_eq!(err.info().code, "column-unknown");
}

#[test]
fn mismatched_row_is_rejected_after_freeze() {
    let mut sink = InMemoryOutput::new();
    fill(&mut sink, &POINTS[..1]);
    let other = Arc::new(vec![Column::new(
        ColumnName::parse("parameters/p1").expect("name"),
        ColumnKind::Parameter,
    )]);
    let row = SampleRow::new(other, vec![0.0]).expect("row");
    let err = sink.record(row).unwrap_err();
    assert_eq!(err.info().code, "schema-mismatch");
    assert_eq!(sink.len(), 1);
}

#[test]
fn row_indices_increase_monotonically() {
    let pipeline = GaussianSumPipeline::new().expect("pipeline");
    let layout = RowLayout::for_pipeline(&pipeline, &[]).expect("layout");
    let mut sink = InMemoryOutput::new();
    for (expected, point) in POINTS.iter().enumerate() {
        let eval = evaluate_checked(&pipeline, point).expect("evaluate");
        let index = sink
            .record(layout.row(point, &eval, &[]).expect("row"))
            .expect("record");
        assert_eq!(index, expected);
    }
}

#[test]
fn layout_rejects_wrong_widths() {
    let pipeline = GaussianSumPipeline::new().expect("pipeline");
    let layout = RowLayout::for_pipeline(&pipeline, &["weight"]).expect("layout");
    let eval = evaluate_checked(&pipeline, &[0.0, 0.0]).expect("evaluate");
    assert!(layout.row(&[0.0, 0.0], &eval, &[]).is_err());
    assert!(RowLayout::for_pipeline(&pipeline, &["post"]).is_err());
    assert_eq!(pipeline.extra_outputs().len(), 1);
}

#[test]
fn text_output_reads_back_from_disk() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("chains/run.csv");
    let mut sink = TextOutput::create(&path).expect("create");
    fill(&mut sink, &POINTS);
    sink.set_metadata("sampler", "test".into()).expect("metadata");
    sink.flush().expect("flush");

    let mut memory = InMemoryOutput::new();
    fill(&mut memory, &POINTS);
    for name in ["parameters--p1", "parameters--p2", "prior", "post", "weight"] {
        assert_eq!(sink.column(name).expect("text"), memory.column(name).expect("memory"));
    }
    assert!(sink.column("parameters--p3").expect("p3")[2].is_nan());

    sink.finalize().expect("finalize");
    let pipeline = GaussianSumPipeline::new().expect("pipeline");
    let layout = RowLayout::for_pipeline(&pipeline, &["weight"]).expect("layout");
    let eval = evaluate_checked(&pipeline, &[0.0, 0.0]).expect("evaluate");
    let late = layout.row(&[0.0, 0.0], &eval, &[1.0]).expect("row");
    assert_eq!(sink.record(late).unwrap_err().info().code, "sink-finalized");

    let reopened = TextOutput::open(&path).expect("open");
    assert_eq!(reopened.len(), 4);
    assert_eq!(reopened.metadata()["sampler"], "test");
    assert_eq!(reopened.schema(), memory.schema());
    assert_eq!(reopened.rows().expect("rows").len(), 4);
}

#[test]
fn reopening_without_sidecar_infers_kinds() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.csv");
    let mut sink = TextOutput::create(&path).expect("create");
    fill(&mut sink, &POINTS);
    sink.finalize().expect("finalize");
    std::fs::remove_file(sink.sidecar()).expect("remove sidecar");

    let reopened = TextOutput::open(&path).expect("open");
    let schema = reopened.schema().expect("schema");
    assert_eq!(schema.of_kind(ColumnKind::Parameter).count(), 3);
    assert_eq!(schema.of_kind(ColumnKind::Derived).count(), 3);
    assert_eq!(reopened.column("post").expect("post").len(), 4);
}

#[test]
fn text_format_requires_a_path() {
    let config = OutputConfig {
        format: OutputFormat::Text,
        path: None,
    };
    let err = open_sink(&config).err().expect("error");
    assert_eq!(err.info().code, "output-path");
    assert!(open_sink(&OutputConfig::default()).is_ok());
}
