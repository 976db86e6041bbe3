//! Per-note judgment.
//!
//! While a note is being judged, every pitch sample inside its window is
//! accumulated. Stopping the note finalizes three independent channels:
//! continuous accuracy, onset, and release. They are never combined.

use std::collections::BTreeMap;

use ct_ir::{
    ContinuousAccuracy, JudgmentResult, NoteId, OnsetJudgment, PitchSample, ReleaseJudgment,
    SessionTimeMs, TimedNote,
};
use serde::Deserialize;

use crate::listeners::{Listeners, Subscription};
use crate::pitch_matcher::PitchMatcher;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// First voiced sample must land this close after the note start
    pub onset_window_ms: f64,
    /// Last voiced sample must land this close to the note end
    pub release_window_ms: f64,
    /// Samples below this clarity are ignored entirely
    pub min_clarity_threshold: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            onset_window_ms: 150.0,
            release_window_ms: 150.0,
            min_clarity_threshold: 0.5,
        }
    }
}

/// What one sample did to the notes being judged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleOutcome {
    /// Active notes whose window contained the sample
    pub notes_considered: usize,
    /// At least one of them matched in pitch
    pub matched_any: bool,
}

struct FirstVoiced {
    time_ms: SessionTimeMs,
    in_tolerance: bool,
}

struct NoteProgress {
    note: TimedNote,
    total: u32,
    in_tolerance: u32,
    unvoiced: u32,
    deviation_sum: f64,
    absolute_deviation_sum: f64,
    first_voiced: Option<FirstVoiced>,
    last_voiced: Option<SessionTimeMs>,
}

impl NoteProgress {
    fn new(note: TimedNote) -> Self {
        Self {
            note,
            total: 0,
            in_tolerance: 0,
            unvoiced: 0,
            deviation_sum: 0.0,
            absolute_deviation_sum: 0.0,
            first_voiced: None,
            last_voiced: None,
        }
    }

    fn finalize(self, config: &JudgeConfig) -> JudgmentResult {
        let note = self.note;
        let voiced = self.total as f64;
        let mean = |sum: f64| if self.total > 0 { sum / voiced } else { 0.0 };

        let accuracy = ContinuousAccuracy {
            ratio: mean(self.in_tolerance as f64),
            in_tolerance: self.in_tolerance,
            total: self.total,
        };

        let onset = match &self.first_voiced {
            Some(first) => {
                let error = first.time_ms.delta_ms(note.start_time_ms);
                let voiced_at_onset = error <= config.onset_window_ms;
                OnsetJudgment {
                    voiced_at_onset,
                    in_tolerance_at_onset: voiced_at_onset && first.in_tolerance,
                    timing_error_ms: Some(error),
                }
            }
            None => OnsetJudgment::default(),
        };

        let release = match self.last_voiced {
            Some(last) => {
                let error = last.delta_ms(note.end_time_ms);
                let sustained = -error <= config.release_window_ms;
                ReleaseJudgment {
                    sustained,
                    released_early: !sustained,
                    timing_error_ms: Some(error),
                }
            }
            None => ReleaseJudgment::default(),
        };

        JudgmentResult {
            note_id: note.id,
            midi_pitch: note.midi_pitch,
            start_time_ms: note.start_time_ms,
            end_time_ms: note.end_time_ms,
            accuracy,
            onset,
            release,
            total_samples: self.total,
            in_tolerance_samples: self.in_tolerance,
            unvoiced_samples: self.unvoiced,
            average_deviation_cents: mean(self.deviation_sum),
            average_absolute_deviation_cents: mean(self.absolute_deviation_sum),
        }
    }
}

pub struct Judge {
    config: JudgeConfig,
    matcher: PitchMatcher,
    active: BTreeMap<NoteId, NoteProgress>,
    completed: Vec<JudgmentResult>,
    listeners: Listeners<JudgmentResult>,
}

impl Judge {
    pub fn new(config: JudgeConfig, matcher: PitchMatcher) -> Self {
        Self {
            config,
            matcher,
            active: BTreeMap::new(),
            completed: Vec::new(),
            listeners: Listeners::new("judge"),
        }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn matcher(&self) -> &PitchMatcher {
        &self.matcher
    }

    /// Begin accumulating samples for `note`. Returns false if it is already active.
    pub fn start_judging_note(&mut self, note: &TimedNote) -> bool {
        if self.active.contains_key(&note.id) {
            log::warn!(target: "judge", "{} is already being judged", note.id);
            return false;
        }
        self.active.insert(note.id, NoteProgress::new(note.clone()));
        true
    }

    /// Feed one sample to every active note whose window contains it.
    pub fn add_pitch_sample(&mut self, sample: &PitchSample) -> SampleOutcome {
        let mut outcome = SampleOutcome::default();
        if sample.clarity < self.config.min_clarity_threshold {
            return outcome;
        }

        for progress in self.active.values_mut() {
            if !progress.note.contains(sample.time_ms) {
                continue;
            }
            outcome.notes_considered += 1;

            if !sample.is_voiced {
                progress.unvoiced += 1;
                continue;
            }

            let m = self.matcher.match_sample(sample, &progress.note);
            progress.total += 1;
            if m.is_match {
                progress.in_tolerance += 1;
                outcome.matched_any = true;
            }
            progress.deviation_sum += m.deviation_cents;
            progress.absolute_deviation_sum += m.absolute_deviation_cents;

            if progress.first_voiced.is_none() {
                progress.first_voiced = Some(FirstVoiced {
                    time_ms: sample.time_ms,
                    in_tolerance: m.is_match,
                });
            }
            progress.last_voiced = Some(match progress.last_voiced {
                Some(last) => last.max(sample.time_ms),
                None => sample.time_ms,
            });
        }
        outcome
    }

    /// Finalize `id`, append it to the log and notify subscribers.
    ///
    /// Returns `None` if the note was not being judged.
    pub fn stop_judging_note(&mut self, id: NoteId) -> Option<JudgmentResult> {
        let progress = self.active.remove(&id)?;
        let result = progress.finalize(&self.config);
        log::debug!(
            target: "judge",
            "{}: accuracy {:.2} ({}/{}), onset hit {}, sustained {}",
            id,
            result.accuracy.ratio,
            result.in_tolerance_samples,
            result.total_samples,
            result.onset.is_hit(),
            result.release.sustained
        );
        self.completed.push(result.clone());
        self.listeners.emit(&result);
        Some(result)
    }

    /// Drop in-progress notes without judging them.
    pub fn abandon_all(&mut self) {
        if !self.active.is_empty() {
            log::debug!(target: "judge", "abandoning {} notes", self.active.len());
        }
        self.active.clear();
    }

    /// Drop in-progress notes and the completed log.
    pub fn reset(&mut self) {
        self.active.clear();
        self.completed.clear();
    }

    pub fn is_judging(&self, id: NoteId) -> bool {
        self.active.contains_key(&id)
    }

    /// Any note currently being judged.
    pub fn is_judging_any(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn active_note_ids(&self) -> Vec<NoteId> {
        self.active.keys().copied().collect()
    }

    pub fn completed(&self) -> &[JudgmentResult] {
        &self.completed
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&JudgmentResult) + 'static,
    {
        self.listeners.subscribe(callback)
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new(JudgeConfig::default(), PitchMatcher::default())
    }
}
