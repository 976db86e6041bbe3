//! Integration test: load chart fixtures → adapt → verify timing and metadata.

use ct_engine::{BeatKind, ChartAdapter};
use ct_ir::{BoundaryStyle, ChartData, ChartError, ChartSnapshot, NoteId, NoteShape};
use std::fs;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/charts")
}

fn load_snapshot(name: &str) -> ChartSnapshot {
    let path = fixtures_dir().join(name);
    let text = fs::read_to_string(&path).unwrap();
    ChartSnapshot::from_json(&text).unwrap()
}

fn adapt(name: &str) -> ChartData {
    let mut adapter = ChartAdapter::new();
    adapter.load_snapshot(&load_snapshot(name)).unwrap().clone()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// --- two_measures.json ---

#[test]
fn two_measures_note_timing() {
    let chart = adapt("two_measures.json");
    let spans: Vec<(f64, f64, f64)> = chart
        .notes
        .iter()
        .map(|n| (n.start_time_ms.as_ms(), n.end_time_ms.as_ms(), n.duration_ms))
        .collect();
    assert_eq!(
        spans,
        vec![(0.0, 500.0, 500.0), (500.0, 1000.0, 500.0), (1000.0, 2000.0, 1000.0)]
    );
    assert_eq!(chart.total_duration_ms.as_ms(), 2000.0);
    assert_eq!(chart.notes[1].pitch_name, "D4");
}

#[test]
fn two_measures_beats() {
    let chart = adapt("two_measures.json");
    assert_eq!(chart.beats.len(), 8);

    let kinds: Vec<BeatKind> = chart.beats.iter().map(BeatKind::of).collect();
    assert_eq!(
        kinds,
        vec![
            BeatKind::Measure,
            BeatKind::Microbeat,
            BeatKind::Macrobeat,
            BeatKind::Microbeat,
            BeatKind::Measure,
            BeatKind::Microbeat,
            BeatKind::Macrobeat,
            BeatKind::Microbeat,
        ]
    );
    for (i, beat) in chart.beats.iter().enumerate() {
        assert_eq!(beat.index, i);
        assert_eq!(beat.time_ms.as_ms(), i as f64 * 250.0);
    }
}

#[test]
fn two_measures_metadata() {
    let chart = adapt("two_measures.json");
    assert_eq!(chart.tempo, 120.0);
    assert_eq!(chart.voice_ids, vec!["melody".to_string()]);
    // no explicit range: taken from the notes
    assert_eq!((chart.min_midi_pitch, chart.max_midi_pitch), (60.0, 64.0));
    assert_eq!(chart.tonic_indicators.len(), 1);
}

// --- compound_duet.json ---

#[test]
fn compound_duet_orders_voices_by_time() {
    let chart = adapt("compound_duet.json");
    let ids: Vec<NoteId> = chart.notes.iter().map(|n| n.id).collect();
    // ids follow voice order; the lower voice's note shares the first start time
    assert_eq!(ids, vec![NoteId(0), NoteId(3), NoteId(1), NoteId(2)]);

    let lower = chart.note(NoteId(3)).unwrap();
    assert_eq!(lower.voice_id, "lower");
    assert!(approx(lower.end_time_ms.as_ms(), 2000.0));
}

#[test]
fn compound_duet_short_notes_and_grid() {
    let chart = adapt("compound_duet.json");
    let diamond = chart.note(NoteId(1)).unwrap();
    assert_eq!(diamond.shape, NoteShape::Diamond);
    assert!(diamond.is_short_note);
    assert!(approx(diamond.start_time_ms.as_ms(), 1000.0));
    assert!(!chart.note(NoteId(2)).unwrap().is_short_note);

    assert_eq!(chart.beats.len(), 6);
    assert!(chart.beats.iter().all(|b| b.grouping == 3));
    assert!(chart.beats[3].is_measure_start);
    assert_eq!(chart.beats[3].boundary_style, BoundaryStyle::Solid);
    assert!(approx(chart.total_duration_ms.as_ms(), 2000.0));
}

#[test]
fn compound_duet_explicit_range_and_tonic() {
    let chart = adapt("compound_duet.json");
    assert_eq!((chart.min_midi_pitch, chart.max_midi_pitch), (50.0, 74.0));
    let tonic = &chart.tonic_indicators[0];
    assert_eq!(tonic.tonic, 5);
    assert!(approx(tonic.time_ms.as_ms(), 1000.0));
}

#[test]
fn overlapping_voices_are_both_active() {
    let chart = adapt("compound_duet.json");
    let t = chart.note(NoteId(1)).unwrap().start_time_ms + 10.0;
    let active: Vec<NoteId> = chart.notes_active_at(t).map(|n| n.id).collect();
    assert_eq!(active, vec![NoteId(3), NoteId(1)]);
}

// --- sparse.json ---

#[test]
fn sparse_snapshot_falls_back_to_defaults() {
    let chart = adapt("sparse.json");
    assert_eq!(chart.tempo, 120.0);
    assert!(chart.beats.is_empty());
    assert_eq!(chart.notes.len(), 2);
    assert_eq!(chart.notes[0].pitch_name, "A3");
    assert!(chart.notes[0].is_short_note);
    assert_eq!(chart.notes[1].shape, NoteShape::Other);
    assert!(!chart.notes[1].is_short_note);
    assert_eq!(chart.notes[1].color, "");
    assert_eq!(chart.total_duration_ms.as_ms(), 1000.0);
    assert_eq!((chart.min_midi_pitch, chart.max_midi_pitch), (57.0, 59.0));
}

// --- reversed_span.json ---

#[test]
fn reversed_span_is_rejected() {
    let mut adapter = ChartAdapter::new();
    let err = adapter
        .load_snapshot(&load_snapshot("reversed_span.json"))
        .unwrap_err();
    match err {
        ChartError::InvalidNoteSpan {
            voice_id,
            start_column,
            end_column,
        } => {
            assert_eq!(voice_id, "broken");
            assert_eq!((start_column, end_column), (3, 1));
        }
        other => panic!("unexpected error: {}", other),
    }
}

// --- tempo ---

#[test]
fn reloading_at_another_tempo_rescales() {
    let mut snapshot = load_snapshot("two_measures.json");
    snapshot.tempo = Some(60.0);
    let mut adapter = ChartAdapter::new();
    let chart = adapter.load_snapshot(&snapshot).unwrap();
    assert_eq!(chart.notes[1].start_time_ms.as_ms(), 1000.0);
    assert_eq!(chart.total_duration_ms.as_ms(), 4000.0);
}
