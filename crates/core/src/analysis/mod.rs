use serde::{Deserialize, Serialize};

use crate::{config::AnalysisConfig, AudioTrack};

/// Width of one histogram bucket, expressed as buckets per second.
const BUCKETS_PER_SECOND: f64 = 10.0;

/// Result of running the tempo estimator over a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoAnalysis {
    /// Clamped estimate used by the game.
    pub bpm: f32,
    /// Unclamped `60 / dominant_interval`; `None` when no interval was found.
    pub raw_bpm: Option<f32>,
    pub dominant_interval: Option<f32>,
    pub peak_count: usize,
}

/// Energy-peak tempo estimator.
///
/// The signal is cut into overlapping frames, local energy maxima above a
/// floor become onsets, and the most common onset spacing (in 0.1 s buckets)
/// is read as the beat period. The result is clamped into a playable range.
#[derive(Debug, Clone, Default)]
pub struct TempoEstimator {
    config: AnalysisConfig,
}

impl TempoEstimator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Shorthand for [`TempoEstimator::analyse`] when only the BPM matters.
    pub fn estimate_bpm(&self, track: &AudioTrack) -> f32 {
        self.analyse(track).bpm
    }

    pub fn analyse(&self, track: &AudioTrack) -> TempoAnalysis {
        let energies = frame_energies(
            track.samples(),
            self.config.frame_size,
            self.config.hop_size,
        );
        let peaks = energy_peaks(&energies, self.config.energy_floor);
        let hop_seconds = self.config.hop_size as f64 / track.sample_rate() as f64;
        let peak_times: Vec<f64> = peaks.iter().map(|&i| i as f64 * hop_seconds).collect();

        let intervals: Vec<f64> = peak_times
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect();

        let Some(dominant) = dominant_interval(&intervals) else {
            return TempoAnalysis {
                bpm: self.config.default_bpm,
                raw_bpm: None,
                dominant_interval: None,
                peak_count: peaks.len(),
            };
        };

        // A zero-width bucket means onsets closer than half a bucket apart; the
        // division yields infinity, which the clamp turns into the fastest tempo.
        let raw_bpm = (60.0 / dominant) as f32;
        TempoAnalysis {
            bpm: self.clamp(raw_bpm),
            raw_bpm: Some(raw_bpm),
            dominant_interval: Some(dominant as f32),
            peak_count: peaks.len(),
        }
    }

    fn clamp(&self, bpm: f32) -> f32 {
        if bpm.is_nan() {
            return self.config.default_bpm;
        }
        bpm.max(self.config.min_bpm).min(self.config.max_bpm)
    }
}

/// Sum of squared samples for every full frame, stepping by `hop_size`.
///
/// A frame is only produced while at least one sample remains after it, so a
/// buffer no longer than `frame_size` yields nothing.
pub fn frame_energies(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    if frame_size == 0 || samples.len() <= frame_size {
        return Vec::new();
    }

    (0..samples.len() - frame_size)
        .step_by(hop_size.max(1))
        .map(|start| {
            samples[start..start + frame_size]
                .iter()
                .map(|sample| sample * sample)
                .sum::<f32>()
        })
        .collect()
}

/// Indices of frames louder than both neighbours and above `floor`.
pub fn energy_peaks(energies: &[f32], floor: f32) -> Vec<usize> {
    energies
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2] && w[1] > floor)
        .map(|(i, _)| i + 1)
        .collect()
}

/// Most frequent interval after rounding to 0.1 s.
///
/// Ties are broken by candidate order: whole-second buckets first in
/// ascending order, then the remaining buckets in the order they appeared.
pub fn dominant_interval(intervals: &[f64]) -> Option<f64> {
    let mut histogram: Vec<(i64, usize)> = Vec::new();
    for interval in intervals {
        let bucket = (interval * BUCKETS_PER_SECOND).round() as i64;
        match histogram.iter_mut().find(|(b, _)| *b == bucket) {
            Some((_, count)) => *count += 1,
            None => histogram.push((bucket, 1)),
        }
    }

    let whole_second = |bucket: i64| bucket >= 0 && bucket % BUCKETS_PER_SECOND as i64 == 0;
    let (mut candidates, fractional): (Vec<_>, Vec<_>) =
        histogram.into_iter().partition(|&(bucket, _)| whole_second(bucket));
    candidates.sort_by_key(|&(bucket, _)| bucket);
    candidates.extend(fractional);

    let mut best: Option<(i64, usize)> = None;
    for (bucket, count) in candidates {
        if best.map(|(_, c)| count > c).unwrap_or(true) {
            best = Some((bucket, count));
        }
    }

    best.map(|(bucket, _)| bucket as f64 / BUCKETS_PER_SECOND)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8192;

    /// Bursts aligned to hop boundaries so exactly one frame per burst peaks.
    fn burst_train(period_samples: usize, bursts: usize) -> AudioTrack {
        let len = period_samples * bursts + 2048;
        let mut samples = vec![0.0; len];
        for b in 0..bursts {
            let start = b * period_samples + 1024;
            for s in &mut samples[start..start + 600] {
                *s = 0.5;
            }
        }
        AudioTrack::new(samples, RATE).unwrap()
    }

    #[test]
    fn silence_falls_back_to_default() {
        let track = AudioTrack::new(vec![0.0; RATE as usize * 4], RATE).unwrap();
        let analysis = TempoEstimator::default().analyse(&track);

        assert_eq!(analysis.bpm, 120.0);
        assert_eq!(analysis.raw_bpm, None);
        assert_eq!(analysis.peak_count, 0);
    }

    #[test]
    fn empty_and_short_tracks_fall_back_to_default() {
        let estimator = TempoEstimator::default();
        let empty = AudioTrack::new(Vec::new(), RATE).unwrap();
        let short = AudioTrack::new(vec![0.8; 1000], RATE).unwrap();

        assert_eq!(estimator.estimate_bpm(&empty), 120.0);
        assert_eq!(estimator.estimate_bpm(&short), 120.0);
    }

    #[test]
    fn single_peak_falls_back_to_default() {
        let analysis = TempoEstimator::default().analyse(&burst_train(4096, 1));
        assert_eq!(analysis.peak_count, 1);
        assert_eq!(analysis.bpm, 120.0);
    }

    #[test]
    fn half_second_bursts_read_as_120() {
        let analysis = TempoEstimator::default().analyse(&burst_train(4096, 8));

        assert_eq!(analysis.peak_count, 8);
        assert_eq!(analysis.dominant_interval, Some(0.5));
        assert_eq!(analysis.bpm, 120.0);
    }

    #[test]
    fn slow_tempo_is_clamped_up() {
        let analysis = TempoEstimator::default().analyse(&burst_train(8192, 5));
        assert_eq!(analysis.raw_bpm, Some(60.0));
        assert_eq!(analysis.bpm, 90.0);
    }

    #[test]
    fn fast_tempo_is_clamped_down() {
        let analysis = TempoEstimator::default().analyse(&burst_train(2048, 10));
        assert!(analysis.raw_bpm.unwrap() > 140.0);
        assert_eq!(analysis.bpm, 140.0);
    }

    #[test]
    fn zero_bucket_maps_to_fastest_tempo() {
        let estimator = TempoEstimator::default();
        assert_eq!(estimator.clamp(f32::INFINITY), 140.0);
        assert_eq!(dominant_interval(&[0.02, 0.03]), Some(0.0));
    }

    #[test]
    fn histogram_ties_prefer_first_fractional_bucket() {
        assert_eq!(dominant_interval(&[0.52, 0.71, 0.49, 0.68]), Some(0.5));
        assert_eq!(dominant_interval(&[]), None);
    }

    #[test]
    fn histogram_ties_prefer_whole_seconds_in_ascending_order() {
        assert_eq!(dominant_interval(&[0.5, 1.0]), Some(1.0));
        assert_eq!(dominant_interval(&[0.7, 2.0, 1.04]), Some(1.0));
        assert_eq!(dominant_interval(&[0.5, 0.5, 1.0]), Some(0.5));
    }

    #[test]
    fn peaks_need_strict_neighbours_and_floor() {
        let energies = [0.0, 1.0, 1.0, 0.0, 0.005, 0.0, 2.0, 0.5];
        assert_eq!(energy_peaks(&energies, 0.01), vec![6]);
    }

    #[test]
    fn frames_overlap_by_hop() {
        let energies = frame_energies(&[1.0; 10], 4, 2);
        assert_eq!(energies, vec![4.0, 4.0, 4.0]);
        assert!(frame_energies(&[1.0; 4], 4, 2).is_empty());
    }
}
