use tracing::debug;

use stave_domain::{DomainError, Measure, Note, Rest, ScoreEvent, Tempo, TimeSignature};

use crate::quantize::MeasureSpan;

/// Slack for float comparisons when deciding whether a gap or trailing
/// remainder is real; keeps dust-sized rests out of the output.
const GRID_EPS: f64 = 1e-9;

/// Places notes into measures, filling gaps with rests and truncating notes
/// that overflow their measure.
pub struct NotationAssembler {
    canonical_durations: Vec<f64>,
}

impl NotationAssembler {
    pub fn new(canonical_durations: Vec<f64>) -> Self {
        Self {
            canonical_durations,
        }
    }

    /// Nearest canonical note value by absolute difference; ties resolve to
    /// the smaller value.
    pub fn quantize_duration(&self, duration: f64) -> f64 {
        let mut best = self.canonical_durations[0];
        let mut best_distance = (best - duration).abs();
        for &candidate in &self.canonical_durations[1..] {
            let distance = (candidate - duration).abs();
            if distance < best_distance {
                best = candidate;
                best_distance = distance;
            }
        }
        best
    }

    pub fn assemble(
        &self,
        notes: &[Note],
        spans: &[MeasureSpan],
        signature: TimeSignature,
        tempo: &Tempo,
    ) -> Result<Vec<Measure>, DomainError> {
        if notes.is_empty() || spans.is_empty() {
            debug!("nothing to assemble, emitting the fallback measure");
            return Ok(vec![self.fallback_measure(signature, tempo)?]);
        }

        let mut notes = notes.to_vec();
        notes.sort_by(|a, b| a.onset.partial_cmp(&b.onset).expect("finite onsets"));
        for note in &mut notes {
            note.duration = self.quantize_duration(note.duration);
        }

        let mut measures = Vec::with_capacity(spans.len());
        for (index, span) in spans.iter().enumerate() {
            let mut measure = Measure::new(index as u32 + 1, span.start, span.end)?;
            let mut selected: Vec<Note> = notes
                .iter()
                .copied()
                .filter(|note| note.onset >= span.start && note.onset < span.end)
                .collect();

            if selected.is_empty() {
                measure.push(
                    0.0,
                    ScoreEvent::Rest(Rest::new(signature.measure_quarters())?),
                );
                measures.push(measure);
                continue;
            }

            for note in &mut selected {
                if note.end_time(tempo) > span.end {
                    // Truncate to the measure boundary, exactly.
                    note.duration = tempo.quarters_from_seconds(span.end - note.onset);
                }
            }

            selected.sort_by(|a, b| a.onset.partial_cmp(&b.onset).expect("finite onsets"));
            let total = tempo.quarters_from_seconds(span.end - span.start);
            let mut cursor = 0.0;
            for note in selected {
                let offset = tempo.quarters_from_seconds(note.onset - span.start);
                if offset > cursor + GRID_EPS {
                    measure.push(cursor, ScoreEvent::Rest(Rest::new(offset - cursor)?));
                }
                cursor = offset + note.duration;
                measure.push(offset, ScoreEvent::Note(note));
            }
            if cursor + GRID_EPS < total {
                measure.push(cursor, ScoreEvent::Rest(Rest::new(total - cursor)?));
            }
            measures.push(measure);
        }
        Ok(measures)
    }

    fn fallback_measure(
        &self,
        signature: TimeSignature,
        tempo: &Tempo,
    ) -> Result<Measure, DomainError> {
        let quarters = signature.measure_quarters();
        let mut measure = Measure::new(1, 0.0, tempo.seconds_from_quarters(quarters))?;
        measure.push(0.0, ScoreEvent::Rest(Rest::new(quarters)?));
        Ok(measure)
    }
}
