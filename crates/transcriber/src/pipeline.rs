use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stave_audio::{
    dsp, AudioDecoder, EnergyRhythmEstimator, PitchEstimator, PitchTrack, RhythmEstimator,
    RhythmTrack, SpectralPitchEstimator,
};
use stave_domain::{Part, Score, Tablature, Tempo, TimeSignature};

use crate::assemble::NotationAssembler;
use crate::config::{ConfigError, TranscriberConfig};
use crate::quantize::TemporalQuantizer;
use crate::segment::NoteSegmenter;
use crate::tablature::TablatureMapper;

/// Silence below this many dB under the peak is trimmed before analysis.
const TRIM_TOP_DB: f32 = 30.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionJob {
    pub audio_path: String,
    pub title: String,
    pub composer: String,
}

/// Caller-owned outcome summary for one job. The pipeline itself keeps no
/// state between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSummary {
    pub tempo_bpm: f64,
    pub time_signature: TimeSignature,
    pub note_count: usize,
    pub measure_count: usize,
    /// Notes present in the score that had no playable fretboard position
    /// and were therefore omitted from the tablature.
    pub unplayable_notes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub score: Score,
    pub tablature: Option<Tablature>,
    pub summary: TranscriptionSummary,
}

/// The full transcription pipeline: pitch estimates and rhythm estimates in,
/// a populated score (and tablature for fretted instruments) out. Strictly
/// sequential; a failure in any stage aborts the job with no partial output.
pub struct TranscriptionPipeline {
    config: TranscriberConfig,
    segmenter: NoteSegmenter,
    quantizer: TemporalQuantizer,
    assembler: NotationAssembler,
    tablature: TablatureMapper,
    pitch: Box<dyn PitchEstimator>,
    rhythm: Box<dyn RhythmEstimator>,
}

impl TranscriptionPipeline {
    /// Build a pipeline around the bundled reference estimators.
    pub fn new(config: TranscriberConfig) -> Result<Self, ConfigError> {
        let pitch = Box::new(SpectralPitchEstimator::new(config.pitch_algorithm));
        let rhythm = Box::new(EnergyRhythmEstimator::new(
            config.onset_method,
            config.tempo_method,
        ));
        Self::with_estimators(config, pitch, rhythm)
    }

    /// Build a pipeline around caller-supplied estimator implementations.
    pub fn with_estimators(
        config: TranscriberConfig,
        pitch: Box<dyn PitchEstimator>,
        rhythm: Box<dyn RhythmEstimator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            segmenter: NoteSegmenter::new(
                config.confidence_threshold,
                config.min_note_duration,
                config.pitch_tolerance,
            ),
            quantizer: TemporalQuantizer::new(config.subdivision_per_beat, config.time_signature),
            assembler: NotationAssembler::new(config.canonical_durations.clone()),
            tablature: TablatureMapper::new(config.tuning.clone(), config.max_fret),
            config,
            pitch,
            rhythm,
        })
    }

    #[instrument(skip(self))]
    pub fn transcribe(&self, job: &TranscriptionJob) -> Result<TranscriptionResult> {
        info!(path = %job.audio_path, "loading audio");
        let recording = AudioDecoder::open(&job.audio_path)?;
        let mut samples = dsp::trim_silence(&recording.samples, TRIM_TOP_DB).to_vec();
        dsp::normalize(&mut samples);
        self.transcribe_samples(job, &samples, recording.sample_rate)
    }

    /// Run the estimators over preprocessed samples and transcribe their
    /// output.
    pub fn transcribe_samples(
        &self,
        job: &TranscriptionJob,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<TranscriptionResult> {
        let (fmin, fmax) = self.config.instrument.frequency_range();
        let mut pitch_track = self
            .pitch
            .estimate(samples, sample_rate, fmin, fmax)
            .context("pitch estimation failed")?;
        pitch_track.constrain_to_range(fmin, fmax);
        let rhythm_track = self
            .rhythm
            .estimate(samples, sample_rate)
            .context("rhythm estimation failed")?;
        self.transcribe_estimates(job, &pitch_track, &rhythm_track)
    }

    /// The sequential core over already-computed estimates: segment notes,
    /// infer meter and measures, snap onsets to the subdivision grid,
    /// assemble notation, and map tablature for fretted instruments.
    pub fn transcribe_estimates(
        &self,
        job: &TranscriptionJob,
        pitch: &PitchTrack,
        rhythm: &RhythmTrack,
    ) -> Result<TranscriptionResult> {
        let tempo = Tempo::new(rhythm.tempo_bpm).context("detected tempo is unusable")?;
        let mut notes = self.segmenter.segment(pitch, &tempo)?;

        let signature = self
            .quantizer
            .time_signature(&rhythm.onset_times, &rhythm.beat_times);
        let spans = self.quantizer.measure_spans(&rhythm.beat_times, signature);

        let onsets: Vec<f64> = notes.iter().map(|note| note.onset).collect();
        for (note, snapped) in notes
            .iter_mut()
            .zip(self.quantizer.snap_times(&onsets, &rhythm.beat_times))
        {
            note.onset = snapped;
        }

        let measures = self.assembler.assemble(&notes, &spans, signature, &tempo)?;
        info!(
            notes = notes.len(),
            measures = measures.len(),
            %signature,
            "assembled notation"
        );

        let tablature = self
            .config
            .instrument
            .is_fretted()
            .then(|| self.tablature.map(&notes, &tempo));
        let unplayable = tablature
            .as_ref()
            .map(|tab| notes.len() - tab.positions.len())
            .unwrap_or(0);

        let summary = TranscriptionSummary {
            tempo_bpm: tempo.bpm(),
            time_signature: signature,
            note_count: notes.len(),
            measure_count: measures.len(),
            unplayable_notes: unplayable,
        };
        let mut score = Score::new(job.title.clone(), job.composer.clone());
        score.parts.push(Part {
            instrument: self.config.instrument,
            time_signature: signature,
            key: self.config.key.clone(),
            tempo,
            measures,
        });
        Ok(TranscriptionResult {
            score,
            tablature,
            summary,
        })
    }
}
