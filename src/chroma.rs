//! Chroma
//!
//! Offline 12-bin chromagram of a mono signal. Each frame is Hann-windowed and
//! transformed with `rustfft`; each pitch class sums the spectral peaks found
//! around its fundamentals and their harmonics over a few octaves. Bin 0 is C.
//!
//! Adapted from Adam Stark's Chord-Detector-and-Chromagram.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use thiserror::Error;

use crate::pitch::SEMITONES;

/// C3 in Hz; the lowest octave searched.
const REFERENCE_FREQ: f32 = 130.8127;

/// Errors returned by the chroma extractor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChromaError {
    /// The extractor was configured with impossible parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No samples were supplied.
    #[error("signal is empty")]
    EmptySignal,
}

/// Builder for a [`ChromaExtractor`].
#[derive(Debug, Clone)]
pub struct ChromaExtractorBuilder {
    fft_size: usize,
    hop_size: usize,
    sampling_rate: usize,
    num_harmonics: usize,
    num_octaves: usize,
    search_width: usize,
}

impl ChromaExtractorBuilder {
    /// Start with default parameters:
    /// fft_size = 16_384, hop_size = 8_192, sampling_rate = 44_100,
    /// num_harmonics = 2, num_octaves = 2, search_width = 1.
    pub fn new() -> Self {
        ChromaExtractorBuilder {
            fft_size: 16_384,
            hop_size: 8_192,
            sampling_rate: 44_100,
            num_harmonics: 2,
            num_octaves: 2,
            search_width: 1,
        }
    }

    /// Set the FFT length in samples.
    pub fn fft_size(mut self, size: usize) -> Self {
        self.fft_size = size;
        self
    }

    /// Set the distance between frame starts in samples.
    pub fn hop_size(mut self, size: usize) -> Self {
        self.hop_size = size;
        self
    }

    /// Set the sampling rate of the signal.
    pub fn sampling_rate(mut self, rate: usize) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// Set the number of harmonics summed per note.
    pub fn num_harmonics(mut self, n: usize) -> Self {
        self.num_harmonics = n;
        self
    }

    /// Set the number of octaves searched above C3.
    pub fn num_octaves(mut self, n: usize) -> Self {
        self.num_octaves = n;
        self
    }

    /// Set the peak search radius in bins, scaled by the harmonic number.
    pub fn search_width(mut self, w: usize) -> Self {
        self.search_width = w;
        self
    }

    /// Finalize and create the extractor.
    pub fn build(self) -> Result<ChromaExtractor, ChromaError> {
        if self.fft_size < 2 {
            return Err(ChromaError::Configuration(
                "fft_size must be at least 2".into(),
            ));
        }
        if self.hop_size == 0 {
            return Err(ChromaError::Configuration("hop_size cannot be zero".into()));
        }
        if self.sampling_rate == 0 {
            return Err(ChromaError::Configuration(
                "sampling_rate cannot be zero".into(),
            ));
        }
        if self.num_harmonics == 0 || self.num_octaves == 0 {
            return Err(ChromaError::Configuration(
                "num_harmonics and num_octaves must be positive".into(),
            ));
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.fft_size);

        let mut note_frequencies = [0.0; SEMITONES];
        for (i, freq) in note_frequencies.iter_mut().enumerate() {
            *freq = REFERENCE_FREQ * 2f32.powf(i as f32 / 12.0);
        }

        Ok(ChromaExtractor {
            window: hann_window(self.fft_size),
            fft_size: self.fft_size,
            hop_size: self.hop_size,
            sampling_rate: self.sampling_rate,
            num_harmonics: self.num_harmonics,
            num_octaves: self.num_octaves,
            search_width: self.search_width,
            fft,
            note_frequencies,
        })
    }
}

impl Default for ChromaExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame-by-frame chromagram calculator.
#[derive(Clone)]
pub struct ChromaExtractor {
    window: Vec<f32>,
    fft_size: usize,
    hop_size: usize,
    sampling_rate: usize,
    num_harmonics: usize,
    num_octaves: usize,
    search_width: usize,
    fft: Arc<dyn Fft<f32>>,
    note_frequencies: [f32; SEMITONES],
}

impl std::fmt::Debug for ChromaExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromaExtractor")
            .field("fft_size", &self.fft_size)
            .field("hop_size", &self.hop_size)
            .field("sampling_rate", &self.sampling_rate)
            .field("num_harmonics", &self.num_harmonics)
            .field("num_octaves", &self.num_octaves)
            .field("search_width", &self.search_width)
            .finish()
    }
}

impl ChromaExtractor {
    /// Start customizing with a builder.
    pub fn builder() -> ChromaExtractorBuilder {
        ChromaExtractorBuilder::new()
    }

    /// Chroma frames per second of signal.
    pub fn frame_rate(&self) -> f64 {
        self.sampling_rate as f64 / self.hop_size as f64
    }

    /// One chroma vector per hop. Frames running past the end are zero-padded,
    /// so any non-empty signal yields at least one frame.
    pub fn extract(&self, signal: &[f32]) -> Result<Vec<[f32; SEMITONES]>, ChromaError> {
        if signal.is_empty() {
            return Err(ChromaError::EmptySignal);
        }

        let mut buffer = vec![Complex { re: 0.0, im: 0.0 }; self.fft_size];
        let mut magnitude = vec![0.0f32; self.fft_size / 2 + 1];

        Ok((0..signal.len())
            .step_by(self.hop_size)
            .map(|start| {
                self.compute_spectrum(&signal[start..], &mut buffer, &mut magnitude);
                self.compute_chroma(&magnitude)
            })
            .collect())
    }

    fn compute_spectrum(&self, samples: &[f32], buffer: &mut [Complex<f32>], magnitude: &mut [f32]) {
        for (i, c) in buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            c.re = sample * self.window[i];
            c.im = 0.0;
        }

        self.fft.process(buffer);

        for (mag, c) in magnitude.iter_mut().zip(buffer.iter()) {
            *mag = (c.re * c.re + c.im * c.im).sqrt();
        }
    }

    fn compute_chroma(&self, magnitude: &[f32]) -> [f32; SEMITONES] {
        let bin_width = self.sampling_rate as f32 / self.fft_size as f32;
        let max_bin = magnitude.len() - 1;
        let mut chroma = [0.0; SEMITONES];

        for (n, value) in chroma.iter_mut().enumerate() {
            let mut c_sum = 0.0;
            for octave in 1..=self.num_octaves {
                let mut note_sum = 0.0;
                for harm in 1..=self.num_harmonics {
                    let freq = self.note_frequencies[n] * octave as f32 * harm as f32;
                    let center = (freq / bin_width).round() as usize;
                    if center > max_bin {
                        continue;
                    }
                    let lo = center.saturating_sub(self.search_width * harm);
                    let hi = (center + self.search_width * harm).min(max_bin);

                    let peak = magnitude[lo..=hi].iter().copied().fold(0.0_f32, f32::max);
                    note_sum += peak / harm as f32;
                }
                c_sum += note_sum;
            }
            *value = c_sum;
        }

        chroma
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    let denom = (size - 1) as f32;
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / denom).cos())
        .collect()
}
