use crate::game::error::{LoadError, ParseError, ParseErrorKind};
use crate::game::note::{NoteId, NoteRecord, RAW_VELOCITY_MAX, ScheduledNote};
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::Path;

const FIELD_COUNT: usize = 6;

/// A validated, columned, time-ordered note set plus everything that was
/// wrong with the dataset it came from.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    pub notes: Vec<ScheduledNote>,
    pub errors: Vec<ParseError>,
    /// Instruments referenced by the dataset with no matching voice.
    pub missing_instruments: BTreeSet<String>,
}

impl Timeline {
    pub fn user_played_count(&self) -> usize {
        self.notes.iter().filter(|n| n.user_played()).count()
    }
}

fn parse_user_played(field: &str) -> Option<bool> {
    if field.eq_ignore_ascii_case("true") {
        Some(true)
    } else if field.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses one data line. `line` is 1-based and counts the header.
pub fn parse_record(line: usize, raw: &str) -> Result<NoteRecord, ParseError> {
    let err = |kind| ParseError { line, kind };
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(err(ParseErrorKind::FieldCount(fields.len())));
    }

    let user_played = parse_user_played(fields[0]).ok_or(err(ParseErrorKind::UserPlayed))?;
    let instrument = fields[1];
    if instrument.is_empty() {
        return Err(err(ParseErrorKind::Instrument));
    }
    let velocity = parse_finite(fields[2]).ok_or(err(ParseErrorKind::Velocity))?;
    let pitch = fields[3]
        .parse::<i32>()
        .map_err(|_| err(ParseErrorKind::Pitch))?;
    let start = parse_finite(fields[4])
        .filter(|s| *s >= 0.0)
        .ok_or(err(ParseErrorKind::Start))?;
    let end = parse_finite(fields[5]).ok_or(err(ParseErrorKind::End))?;
    if end < start {
        return Err(err(ParseErrorKind::EndBeforeStart));
    }

    Ok(NoteRecord {
        user_played,
        instrument: instrument.to_string(),
        velocity: (velocity as f32 / RAW_VELOCITY_MAX).clamp(0.0, 1.0),
        pitch,
        start,
        end,
    })
}

/// Builds the timeline from raw dataset lines.
///
/// The first line is a header and is discarded; blank lines are skipped.
/// Bad records are collected in `Timeline::errors` and left out, every other
/// record is kept. Notes come back sorted by start time; ids follow that order.
pub fn build<I, S>(lines: I, available_voices: &BTreeSet<String>, tick_ms: f64) -> Timeline
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (idx, raw) in lines.into_iter().enumerate().skip(1) {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            continue;
        }
        match parse_record(idx + 1, raw) {
            Ok(rec) => records.push(rec),
            Err(e) => {
                warn!("Skipping malformed note record: {e}");
                errors.push(e);
            }
        }
    }

    records.sort_by(|a, b| a.start.total_cmp(&b.start));
    let notes: Vec<ScheduledNote> = records
        .into_iter()
        .enumerate()
        .map(|(i, rec)| ScheduledNote::new(NoteId(i), rec, tick_ms))
        .collect();

    let missing_instruments: BTreeSet<String> = notes
        .iter()
        .map(|n| n.record.instrument.as_str())
        .filter(|name| !available_voices.contains(*name))
        .map(str::to_string)
        .collect();
    for name in &missing_instruments {
        warn!("Instrument '{name}' has no loaded voice; its notes will play silent.");
    }

    Timeline {
        notes,
        errors,
        missing_instruments,
    }
}

/// Reads and builds a dataset file. I/O failure is terminal to game start.
pub fn load_file(
    path: &Path,
    available_voices: &BTreeSet<String>,
    tick_ms: f64,
) -> Result<Timeline, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::DatasetRead {
        path: path.to_path_buf(),
        source,
    })?;
    let timeline = build(content.lines(), available_voices, tick_ms);
    info!(
        "Loaded '{}': {} notes ({} user-played), {} bad records, {} missing instruments.",
        path.display(),
        timeline.notes.len(),
        timeline.user_played_count(),
        timeline.errors.len(),
        timeline.missing_instruments.len()
    );
    Ok(timeline)
}
