//! Snapshot-to-timeline conversion.
//!
//! Walks a chart snapshot's grid and voices, producing notes and beats in
//! absolute milliseconds at the chart tempo.

use ct_ir::{
    is_short_note, microbeat_duration_ms, pitch_name_for_midi, BoundaryStyle, ChartData,
    ChartError, ChartSnapshot, NoteId, SessionTimeMs, TimeGrid, TimedBeat, TimedNote,
    TonicIndicator, DEFAULT_PITCH_RANGE,
};

/// Tempo used until a snapshot provides one.
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Grouping assumed when a snapshot has no macrobeat groupings.
const FALLBACK_GROUPING: u32 = 2;

/// Converts snapshots into [`ChartData`] and keeps the last result.
pub struct ChartAdapter {
    tempo: f64,
    /// Microbeat column -> ms, `microbeat_count + 1` entries
    time_map: Vec<f64>,
    chart: Option<ChartData>,
}

impl ChartAdapter {
    pub fn new() -> Self {
        Self::with_tempo(DEFAULT_TEMPO)
    }

    pub fn with_tempo(tempo: f64) -> Self {
        Self {
            tempo,
            time_map: Vec::new(),
            chart: None,
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn microbeat_duration_ms(&self) -> f64 {
        microbeat_duration_ms(self.tempo)
    }

    /// Change the tempo used by the next load.
    ///
    /// Notes already built keep their timing; reload the snapshot to re-time them.
    pub fn set_tempo(&mut self, tempo: f64) {
        if self.chart.is_some() {
            log::warn!(
                target: "chart",
                "tempo changed to {} after load; existing notes keep their timing until reload",
                tempo
            );
        }
        self.tempo = tempo;
    }

    /// The most recently loaded chart.
    pub fn chart(&self) -> Option<&ChartData> {
        self.chart.as_ref()
    }

    /// Forget the loaded chart. The tempo is kept.
    pub fn clear(&mut self) {
        self.chart = None;
        self.time_map.clear();
    }

    /// Build a chart from `snapshot`, replacing any previous one.
    pub fn load_snapshot(&mut self, snapshot: &ChartSnapshot) -> Result<&ChartData, ChartError> {
        let tempo = snapshot.tempo.unwrap_or(self.tempo);
        if !tempo.is_finite() || tempo <= 0.0 {
            return Err(ChartError::InvalidTempo(tempo));
        }
        let microbeat_ms = microbeat_duration_ms(tempo);
        let grid = &snapshot.time_grid;

        let time_map = build_time_map(grid.microbeat_count, microbeat_ms);
        let notes = build_notes(snapshot, &time_map, microbeat_ms)?;
        let beats = build_beats(grid, &time_map, microbeat_ms);

        let tonic_indicators = snapshot
            .tonic_signs
            .iter()
            .map(|sign| TonicIndicator {
                time_ms: SessionTimeMs::new(column_time(
                    &time_map,
                    microbeat_ms,
                    sign.column_index.into(),
                )),
                column: sign.column_index,
                tonic: sign.tonic_number,
            })
            .collect();

        let (min_midi_pitch, max_midi_pitch) = pitch_range(snapshot, &notes);

        let grid_end = time_map.last().copied().unwrap_or(0.0);
        let notes_end = notes
            .iter()
            .map(|n| n.end_time_ms.as_ms())
            .fold(0.0_f64, f64::max);

        let voice_ids = snapshot.voices.iter().map(|v| v.voice_id.clone()).collect();

        log::debug!(
            target: "chart",
            "loaded {} notes, {} beats at {} BPM",
            notes.len(),
            beats.len(),
            tempo
        );

        self.tempo = tempo;
        self.time_map = time_map;
        Ok(self.chart.insert(ChartData {
            notes,
            beats,
            tonic_indicators,
            total_duration_ms: SessionTimeMs::new(grid_end.max(notes_end)),
            voice_ids,
            tempo,
            min_midi_pitch,
            max_midi_pitch,
        }))
    }

    /// Absolute time of a microbeat column at the loaded tempo.
    pub fn time_for_column(&self, column: u32) -> SessionTimeMs {
        SessionTimeMs::new(column_time(&self.time_map, self.microbeat_duration_ms(), column.into()))
    }

    /// Microbeat column containing `time`.
    pub fn column_at_time(&self, time: SessionTimeMs) -> u32 {
        let microbeat_ms = self.microbeat_duration_ms();
        if microbeat_ms <= 0.0 {
            return 0;
        }
        (time.as_ms() / microbeat_ms).floor() as u32
    }
}

impl Default for ChartAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn build_time_map(microbeat_count: u32, microbeat_ms: f64) -> Vec<f64> {
    (0..=microbeat_count).map(|col| col as f64 * microbeat_ms).collect()
}

/// Look up a column; columns past the grid are extrapolated.
/// Columns are `u64` so the exclusive end of the last `u32` column still fits.
fn column_time(time_map: &[f64], microbeat_ms: f64, column: u64) -> f64 {
    usize::try_from(column)
        .ok()
        .and_then(|i| time_map.get(i))
        .copied()
        .unwrap_or(column as f64 * microbeat_ms)
}

fn build_notes(
    snapshot: &ChartSnapshot,
    time_map: &[f64],
    microbeat_ms: f64,
) -> Result<Vec<TimedNote>, ChartError> {
    let mut notes = Vec::new();
    let mut next_id = 0u32;

    for voice in &snapshot.voices {
        for note in &voice.notes {
            let (start_col, end_col) = (note.start_microbeat_col, note.end_microbeat_col);
            if end_col < start_col {
                return Err(ChartError::InvalidNoteSpan {
                    voice_id: voice.voice_id.clone(),
                    start_column: start_col,
                    end_column: end_col,
                });
            }

            let start = column_time(time_map, microbeat_ms, start_col.into());
            let end = column_time(time_map, microbeat_ms, u64::from(end_col) + 1);
            let pitch_name = note
                .pitch_name
                .clone()
                .unwrap_or_else(|| pitch_name_for_midi(note.midi_pitch));

            notes.push(TimedNote {
                id: NoteId(next_id),
                midi_pitch: note.midi_pitch,
                start_time_ms: SessionTimeMs::new(start),
                end_time_ms: SessionTimeMs::new(end),
                duration_ms: end - start,
                voice_id: voice.voice_id.clone(),
                color: voice.color.clone(),
                shape: note.shape,
                is_short_note: is_short_note(note.shape, start_col, end_col),
                pitch_name,
                start_column: start_col,
                end_column: end_col,
            });
            next_id += 1;
        }
    }

    notes.sort_by(|a, b| {
        a.start_time_ms
            .as_ms()
            .total_cmp(&b.start_time_ms.as_ms())
            .then(a.id.cmp(&b.id))
    });
    Ok(notes)
}

/// Walk macrobeats, emitting one beat per microbeat.
///
/// A macrobeat opens a measure when the previous macrobeat's boundary is
/// solid; the first macrobeat always does.
fn build_beats(grid: &TimeGrid, time_map: &[f64], microbeat_ms: f64) -> Vec<TimedBeat> {
    let fallback: Vec<u32>;
    let groupings: &[u32] = if grid.macrobeat_groupings.is_empty() {
        if grid.microbeat_count > 0 {
            log::warn!(
                target: "chart",
                "snapshot has no macrobeat groupings; assuming groups of {}",
                FALLBACK_GROUPING
            );
        }
        let full = grid.microbeat_count / FALLBACK_GROUPING;
        let rest = grid.microbeat_count % FALLBACK_GROUPING;
        fallback = (0..full)
            .map(|_| FALLBACK_GROUPING)
            .chain((rest > 0).then_some(rest))
            .collect();
        &fallback
    } else {
        &grid.macrobeat_groupings
    };

    let mut beats = Vec::new();
    let mut column = 0u32;
    for (macro_index, &grouping) in groupings.iter().enumerate() {
        let style = grid
            .macrobeat_boundary_styles
            .get(macro_index)
            .copied()
            .unwrap_or_default();
        let opens_measure = macro_index == 0
            || grid.macrobeat_boundary_styles.get(macro_index - 1) == Some(&BoundaryStyle::Solid);

        for micro in 0..grouping {
            beats.push(TimedBeat {
                index: beats.len(),
                time_ms: SessionTimeMs::new(column_time(time_map, microbeat_ms, column.into())),
                is_macrobeat: micro == 0,
                is_measure_start: micro == 0 && opens_measure,
                grouping,
                boundary_style: style,
            });
            column += 1;
        }
    }
    beats
}

/// Snapshot range, else the notes' range, else the default.
fn pitch_range(snapshot: &ChartSnapshot, notes: &[TimedNote]) -> (f64, f64) {
    let note_min = notes.iter().map(|n| n.midi_pitch).reduce(f64::min);
    let note_max = notes.iter().map(|n| n.midi_pitch).reduce(f64::max);
    let min = snapshot
        .min_midi_pitch
        .or(note_min)
        .unwrap_or(DEFAULT_PITCH_RANGE.0);
    let max = snapshot
        .max_midi_pitch
        .or(note_max)
        .unwrap_or(DEFAULT_PITCH_RANGE.1);
    (min, max)
}
