use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// A fully decoded recording, downmixed to mono.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub sample_rate: u32,
    /// Channel count of the source before downmixing.
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl Recording {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Recording> {
        let path_ref = path.as_ref();
        let file =
            File::open(path_ref).with_context(|| format!("open audio file {:?}", path_ref))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| anyhow::anyhow!("no default track found"))?;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())?;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(48_000);
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);

        let mut samples = Vec::new();
        let mut interleaved: Option<SampleBuffer<f32>> = None;
        loop {
            match format.next_packet() {
                Ok(packet) => {
                    let decoded = decoder.decode(&packet)?;
                    let spec = *decoded.spec();
                    let frames = decoded.frames() as u64;
                    let buffer = interleaved
                        .get_or_insert_with(|| SampleBuffer::<f32>::new(frames.max(1), spec));
                    if buffer.capacity() < (frames as usize) * spec.channels.count() {
                        *buffer = SampleBuffer::<f32>::new(frames, spec);
                    }
                    buffer.copy_interleaved_ref(decoded);
                    let source_channels = spec.channels.count().max(1);
                    for chunk in buffer.samples().chunks_exact(source_channels) {
                        samples.push(chunk.iter().sum::<f32>() / source_channels as f32);
                    }
                }
                Err(err) => {
                    use symphonia::core::errors::Error as SymphError;
                    match err {
                        SymphError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            break;
                        }
                        SymphError::DecodeError(_) => {
                            // skip undecodable packet
                        }
                        _ => return Err(err.into()),
                    }
                }
            }
        }

        debug!(
            sample_rate,
            channels,
            sample_count = samples.len(),
            "decoded recording"
        );
        Ok(Recording {
            sample_rate,
            channels,
            samples,
        })
    }
}
