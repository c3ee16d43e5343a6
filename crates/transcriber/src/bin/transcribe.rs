use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stave_domain::{Instrument, JsonRenderer, RenderFormat, ScoreRenderer, TimeSignature, Tuning};
use stave_transcriber::{TranscriberConfig, TranscriptionJob, TranscriptionPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about = "Transcribe a recording into symbolic notation", long_about = None)]
struct Cli {
    /// Path to the audio file to transcribe
    input: String,
    /// Title for the generated score
    #[arg(short, long, default_value = "Transcribed Score")]
    title: String,
    /// Composer credited on the score
    #[arg(short, long, default_value = "Unknown")]
    composer: String,
    /// Instrument to transcribe for (piano, guitar)
    #[arg(short, long, default_value = "piano")]
    instrument: String,
    /// Named tuning for fretted instruments (standard, drop-d, open-g, ...)
    #[arg(long)]
    tuning: Option<String>,
    /// Explicit time signature such as 3/4; inferred when omitted
    #[arg(long)]
    time_signature: Option<String>,
    /// Write the score JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write the tablature JSON here (fretted instruments only)
    #[arg(long)]
    tab_output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = TranscriberConfig {
        instrument: cli.instrument.parse::<Instrument>()?,
        ..Default::default()
    };
    if let Some(name) = cli.tuning.as_deref() {
        config.tuning = Tuning::by_name(name)?;
    }
    if let Some(signature) = cli.time_signature.as_deref() {
        config.time_signature = Some(signature.parse::<TimeSignature>()?);
    }

    let pipeline = TranscriptionPipeline::new(config)?;
    let job = TranscriptionJob {
        audio_path: cli.input,
        title: cli.title,
        composer: cli.composer,
    };
    let result = pipeline.transcribe(&job)?;
    info!(
        tempo_bpm = result.summary.tempo_bpm,
        notes = result.summary.note_count,
        measures = result.summary.measure_count,
        unplayable = result.summary.unplayable_notes,
        "transcription finished"
    );

    let bytes = JsonRenderer.render(&result.score, RenderFormat::Json)?;
    match &cli.output {
        Some(path) => std::fs::write(path, &bytes)?,
        None => println!("{}", String::from_utf8_lossy(&bytes)),
    }

    if let Some(path) = &cli.tab_output {
        match &result.tablature {
            Some(tablature) => std::fs::write(path, serde_json::to_vec_pretty(tablature)?)?,
            None => anyhow::bail!("tablature output requested for a non-fretted instrument"),
        }
    }
    Ok(())
}
