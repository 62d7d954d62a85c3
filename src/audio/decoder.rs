// Audio decoder using Symphonia
// Decodes audio files to interleaved f32 samples

use symphonia::core::audio::{AudioBufferRef, AudioPlanes, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use std::fs::File;
use std::path::Path;

use crate::error::LoadError;

/// One decoded packet: interleaved samples plus the channel count they carry
pub struct DecodedChunk {
    pub samples: Vec<f32>,
    pub channels: usize,
}

pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: Option<usize>,
}

impl AudioDecoder {
    /// Open an audio file and prepare for decoding
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint using the file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| LoadError::Probe(e.to_string()))?;

        let format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .filter(|rate| *rate > 0)
            .ok_or(LoadError::MissingSampleRate)?;
        let channels = track.codec_params.channels.map(|c| c.count());

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decoder(e.to_string()))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count declared by the container, if any
    pub fn channels(&self) -> Option<usize> {
        self.channels
    }

    /// Decode next packet.
    /// Returns None when end of stream is reached
    pub fn decode_next(&mut self) -> Result<Option<DecodedChunk>, LoadError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            // Skip packets from other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let channels = decoded.spec().channels.count();
                    return Ok(Some(DecodedChunk {
                        samples: Self::audio_buf_to_f32(&decoded),
                        channels,
                    }));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            }
        }
    }

    /// Convert any AudioBufferRef to interleaved f32 samples
    fn audio_buf_to_f32(buf: &AudioBufferRef) -> Vec<f32> {
        match buf {
            AudioBufferRef::F32(b) => Self::interleave(b.planes(), b.frames(), |s: f32| s),
            AudioBufferRef::F64(b) => {
                Self::interleave(b.planes(), b.frames(), |s: f64| s as f32)
            }
            AudioBufferRef::S8(b) => {
                let scale = 1.0 / 128.0;
                Self::interleave(b.planes(), b.frames(), |s: i8| s as f32 * scale)
            }
            AudioBufferRef::S16(b) => {
                let scale = 1.0 / 32768.0;
                Self::interleave(b.planes(), b.frames(), |s: i16| s as f32 * scale)
            }
            AudioBufferRef::S24(b) => {
                let scale = 1.0 / 8388608.0;
                Self::interleave(b.planes(), b.frames(), |s| s.inner() as f32 * scale)
            }
            AudioBufferRef::S32(b) => {
                let scale = 1.0 / 2147483648.0;
                Self::interleave(b.planes(), b.frames(), |s: i32| s as f32 * scale)
            }
            AudioBufferRef::U8(b) => {
                Self::interleave(b.planes(), b.frames(), |s: u8| (s as f32 - 128.0) / 128.0)
            }
            AudioBufferRef::U16(b) => Self::interleave(b.planes(), b.frames(), |s: u16| {
                (s as f32 - 32768.0) / 32768.0
            }),
            AudioBufferRef::U24(b) => Self::interleave(b.planes(), b.frames(), |s| {
                (s.inner() as f32 - 8388608.0) / 8388608.0
            }),
            AudioBufferRef::U32(b) => Self::interleave(b.planes(), b.frames(), |s: u32| {
                (s as f64 - 2147483648.0) as f32 / 2147483648.0
            }),
        }
    }

    fn interleave<T: Sample + Copy, F: Fn(T) -> f32>(
        planes: AudioPlanes<T>,
        frames: usize,
        convert: F,
    ) -> Vec<f32> {
        let planes = planes.planes();
        let num_channels = planes.len();
        if num_channels == 0 || frames == 0 {
            return vec![];
        }

        let mut interleaved = Vec::with_capacity(frames * num_channels);
        for frame in 0..frames {
            for plane in planes.iter() {
                interleaved.push(convert(plane[frame]));
            }
        }

        interleaved
    }
}
