//! cantor CLI: headless session playback with a simulated singer.
//!
//! Usage:
//!   cantor path/to/chart.json
//!   cantor path/to/chart.json --config session.toml --singer flat --step-ms 16

mod singer;

use std::rc::Rc;
use std::{env, fs};

use ct_engine::{Clock, ManualClock};
use ct_ir::{ChartSnapshot, JudgmentResult, SessionTimeMs};
use ct_session::{Referee, SessionConfig, SessionPhase};

use singer::Singer;

const USAGE: &str = "Usage: cantor <chart.json> [--config session.toml] \
                     [--singer accurate|flat|silent|wobbly] [--step-ms N]";

/// Wall time a gated singer takes to find the note again.
const RECOVERY_MS: f64 = 1000.0;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let path = args.get(1).filter(|a| !a.starts_with("--")).unwrap_or_else(|| {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    });

    let flag = |name: &str| {
        args.iter()
            .position(|a| a == name)
            .and_then(|i| args.get(i + 1))
            .cloned()
    };

    let config = match flag("--config") {
        Some(config_path) => {
            let text = fs::read_to_string(&config_path).unwrap_or_else(|e| {
                eprintln!("Failed to read {}: {}", config_path, e);
                std::process::exit(1);
            });
            SessionConfig::from_toml_str(&text).unwrap_or_else(|e| {
                eprintln!("{}: {}", config_path, e);
                std::process::exit(1);
            })
        }
        None => SessionConfig::default(),
    };

    let singer = flag("--singer")
        .map(|s| {
            s.parse::<Singer>().unwrap_or_else(|e| {
                eprintln!("{}", e);
                std::process::exit(1);
            })
        })
        .unwrap_or(Singer::Accurate);

    let step_ms = flag("--step-ms")
        .map(|s| match s.parse::<f64>() {
            Ok(ms) if ms > 0.0 && ms.is_finite() => ms,
            _ => {
                eprintln!("--step-ms must be a positive number, got {}", s);
                std::process::exit(1);
            }
        })
        .unwrap_or(10.0);

    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path, e);
        std::process::exit(1);
    });
    let snapshot = ChartSnapshot::from_json(&text).unwrap_or_else(|e| {
        eprintln!("Failed to parse chart: {}", e);
        std::process::exit(1);
    });

    let clock = ManualClock::new();
    let mut referee = Referee::new(config, Rc::new(clock.clone()));
    referee.load_chart(&snapshot).unwrap_or_else(|e| {
        eprintln!("Failed to load chart: {}", e);
        std::process::exit(1);
    });

    if let Some(chart) = referee.chart() {
        println!("Tempo:    {} BPM", chart.tempo);
        println!("Voices:   {}", chart.voice_ids.join(", "));
        println!("Notes:    {}", chart.notes.len());
        println!("Beats:    {}", chart.beats.len());
        println!("Duration: {}", chart.total_duration_ms);
        println!("Range:    MIDI {} - {}", chart.min_midi_pitch, chart.max_midi_pitch);
        println!();
    }

    let _judgments = referee.on_judgment(|r| println!("{}", format_judgment(r)));
    let _phases = referee.on_state_change(|s| {
        println!("[{:>8.0}ms] {}", s.current_time_ms.as_ms(), s.phase);
    });

    println!("Singer: {:?}, step {}ms", singer, step_ms);
    referee.start();
    run(&clock, &mut referee, singer, step_ms);

    let state = referee.session_state();
    println!();
    println!("Final phase: {}", state.phase);
    print_summary(&state.completed_judgments);
}

/// Step the clock until the session completes or stalls.
fn run(clock: &ManualClock, referee: &mut Referee, singer: Singer, step_ms: f64) {
    let total = referee
        .chart()
        .map(|c| c.total_duration_ms.as_ms())
        .unwrap_or(0.0);
    // generous: every frame could in principle be spent gated
    let max_frames = ((total / step_ms) as usize + 1) * 4 + (RECOVERY_MS / step_ms) as usize * 64;

    let mut gated_at: Option<f64> = None;
    for _ in 0..max_frames {
        if !referee.wants_frames() {
            return;
        }
        clock.advance(step_ms);
        let wall = clock.now_ms();

        gated_at = match referee.phase() {
            SessionPhase::Gated => Some(gated_at.unwrap_or(wall)),
            _ => None,
        };
        let corrected = gated_at.is_some_and(|since| wall - since >= RECOVERY_MS);

        let now = referee.conductor().current_time_ms();
        let target = target_pitch(referee, now);
        referee.on_pitch_detected(&singer.sample(now, target, corrected));
        referee.on_frame();
    }
    log::warn!(target: "referee", "stopped after {} frames without completing", max_frames);
}

fn target_pitch(referee: &Referee, now: SessionTimeMs) -> Option<f64> {
    referee
        .chart()?
        .notes_active_at(now)
        .next()
        .map(|n| n.midi_pitch)
}

fn format_judgment(r: &JudgmentResult) -> String {
    let onset = match r.onset.timing_error_ms {
        Some(err) if r.onset.is_hit() => format!("hit {:+.0}ms", err),
        Some(err) => format!("miss {:+.0}ms", err),
        None => "miss".to_string(),
    };
    let release = match r.release.timing_error_ms {
        Some(err) if r.release.sustained => format!("held {:+.0}ms", err),
        Some(err) => format!("early {:+.0}ms", err),
        None => "none".to_string(),
    };
    format!(
        "{:<8} midi {:>5.1}  accuracy {:>4.0}% ({}/{})  {:>+6.1}c  onset {:<12} release {}",
        r.note_id.to_string(),
        r.midi_pitch,
        r.accuracy.ratio * 100.0,
        r.in_tolerance_samples,
        r.total_samples,
        r.average_deviation_cents,
        onset,
        release
    )
}

fn print_summary(judgments: &[JudgmentResult]) {
    if judgments.is_empty() {
        println!("No notes judged.");
        return;
    }
    let n = judgments.len() as f64;
    let accuracy = judgments.iter().map(|r| r.accuracy.ratio).sum::<f64>() / n;
    let onsets = judgments.iter().filter(|r| r.onset.is_hit()).count();
    let held = judgments.iter().filter(|r| r.release.sustained).count();
    println!("Judged:   {}", judgments.len());
    println!("Accuracy: {:.1}%", accuracy * 100.0);
    println!("Onsets:   {}/{}", onsets, judgments.len());
    println!("Releases: {}/{}", held, judgments.len());
}
