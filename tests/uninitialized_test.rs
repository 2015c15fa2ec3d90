//! Runs in its own process and never initializes the engine.

use segdex::document::Document;
use segdex::engine::{self, InvertedEngine};
use segdex::error::ErrorKind;
use segdex::schema::{FieldOptions, Schema};
use segdex::search::{SearchIndex, SearchOptions};
use segdex::segment::{Segment, SegmentBuilder, SegmentBuilderConfig, SegmentMerger};

#[test]
fn test_constructors_require_initialization() {
    assert!(!engine::is_initialized());

    let schema = Schema::builder()
        .add_field("title", FieldOptions::text_stored())
        .build()
        .unwrap();

    let err = SegmentBuilder::new(schema, 1024).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uninitialized);

    let err = Segment::from_bytes(b"SGDX").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uninitialized);

    let err = SearchIndex::new().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uninitialized);

    let err = SegmentMerger::new().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uninitialized);

    assert_eq!(engine::global().unwrap_err().kind(), ErrorKind::Uninitialized);
}

#[test]
fn test_injected_engine_needs_no_initialization() {
    let engine = InvertedEngine::shared().unwrap();
    let schema = Schema::builder()
        .add_field("title", FieldOptions::text_stored())
        .build()
        .unwrap();

    let mut builder =
        SegmentBuilder::with_engine(engine.clone(), schema, SegmentBuilderConfig::default()).unwrap();
    builder
        .add_document(Document::new().with_field("title", "quick red fox"))
        .unwrap();
    let segment = builder.finalize().unwrap();

    let bytes = segment.export().unwrap();
    let imported = Segment::from_bytes_with_engine(engine.clone(), &bytes).unwrap();

    let mut merger = SegmentMerger::with_engine(engine.clone());
    merger.add_segment(&segment).add_segment(&imported);
    let merged = merger.merge().unwrap();

    let index = SearchIndex::with_engine(engine);
    index.register_segment(&merged).unwrap();
    let hits = index.search("fox", &SearchOptions::default()).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].get("title"), Some("quick red fox"));

    assert!(!engine::is_initialized());
}
