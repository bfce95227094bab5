//! Beat grid: tempo plus tracked beat times
//!
//! The tracker produces slightly irregular beat times; the grid keeps them
//! as detected and extrapolates at the tempo only where none were found.

/// Tempo estimate and beat positions in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    bpm: f64,
    beats: Vec<f64>,
}

impl BeatGrid {
    /// Create a grid from detected beats
    ///
    /// Returns `None` unless the tempo is positive and finite and the beats
    /// are finite, non-negative and strictly increasing.
    pub fn new(bpm: f64, beats: Vec<f64>) -> Option<Self> {
        if !(bpm.is_finite() && bpm > 0.0) {
            return None;
        }
        if beats.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return None;
        }
        if beats.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }
        Some(Self { bpm, beats })
    }

    /// Fixed-interval grid from `first_beat` up to `duration` seconds
    pub fn uniform(bpm: f64, first_beat: f64, duration: f64) -> Option<Self> {
        if !(bpm.is_finite() && bpm > 0.0) || first_beat < 0.0 {
            return None;
        }
        let period = 60.0 / bpm;
        let count = if duration > first_beat {
            ((duration - first_beat) / period).floor() as usize + 1
        } else {
            0
        };
        let beats = (0..count)
            .map(|i| first_beat + i as f64 * period)
            .filter(|&t| t < duration)
            .collect();
        Self::new(bpm, beats)
    }

    #[inline]
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Seconds per beat
    #[inline]
    pub fn period(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn beats(&self) -> &[f64] {
        &self.beats
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// Detected beats in `[start, end)`
    pub fn beats_in(&self, start: f64, end: f64) -> &[f64] {
        let lo = self.beats.partition_point(|&b| b < start);
        let hi = self.beats.partition_point(|&b| b < end);
        &self.beats[lo..hi.max(lo)]
    }

    /// Nearest detected beat to a time
    pub fn snap(&self, time: f64) -> Option<f64> {
        let idx = self.beats.partition_point(|&b| b < time);
        let after = self.beats.get(idx).copied();
        let before = idx.checked_sub(1).and_then(|i| self.beats.get(i).copied());
        match (before, after) {
            (Some(b), Some(a)) => Some(if time - b <= a - time { b } else { a }),
            (b, a) => b.or(a),
        }
    }

    /// Beat positions covering `[start, end)`
    ///
    /// Detected beats inside the range are used as they are. Slots before the
    /// first and after the last of them are extrapolated at the grid period.
    /// A range holding no detected beat is aligned to the nearest one (or to
    /// `start` on an empty grid).
    pub fn positions(&self, start: f64, end: f64) -> Vec<f64> {
        if end <= start {
            return Vec::new();
        }
        let period = self.period();
        let inside = self.beats_in(start, end);

        let (first, last) = match (inside.first(), inside.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                let anchor = self.snap(start).unwrap_or(start);
                let steps = ((start - anchor) / period - 1e-9).ceil();
                let first = anchor + steps * period;
                (first, first)
            }
        };

        let mut positions = Vec::new();

        // Lead-in before the first beat
        let lead = ((first - start) / period + 1e-9).floor().max(0.0) as usize;
        for i in (1..=lead).rev() {
            positions.push((first - i as f64 * period).max(start));
        }

        if inside.is_empty() {
            if first < end {
                positions.push(first);
            }
        } else {
            positions.extend_from_slice(inside);
        }

        let mut t = last + period;
        while t < end {
            positions.push(t);
            t += period;
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_input() {
        assert!(BeatGrid::new(0.0, vec![0.0]).is_none());
        assert!(BeatGrid::new(f64::NAN, vec![]).is_none());
        assert!(BeatGrid::new(120.0, vec![0.5, 0.5]).is_none());
        assert!(BeatGrid::new(120.0, vec![-0.1, 0.4]).is_none());
        assert!(BeatGrid::new(120.0, vec![]).is_some());
    }

    #[test]
    fn test_uniform_grid() {
        // 120 BPM = 0.5 seconds per beat over 10 seconds
        let grid = BeatGrid::uniform(120.0, 0.0, 10.0).unwrap();
        assert_eq!(grid.len(), 20);
        assert_eq!(grid.beats()[0], 0.0);
        assert!((grid.beats()[1] - 0.5).abs() < 1e-12);
        assert!((grid.period() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_beats_in_range() {
        let grid = BeatGrid::new(120.0, vec![0.0, 0.5, 1.0, 1.5, 2.0]).unwrap();
        assert_eq!(grid.beats_in(0.5, 1.5), &[0.5, 1.0]);
        assert!(grid.beats_in(3.0, 4.0).is_empty());
        assert!(grid.beats_in(1.0, 0.5).is_empty());
    }

    #[test]
    fn test_snap() {
        let grid = BeatGrid::new(120.0, vec![0.0, 0.5, 1.0]).unwrap();
        assert_eq!(grid.snap(0.2), Some(0.0));
        assert_eq!(grid.snap(0.3), Some(0.5));
        assert_eq!(grid.snap(5.0), Some(1.0));
        assert_eq!(BeatGrid::new(120.0, vec![]).unwrap().snap(1.0), None);
    }

    #[test]
    fn test_positions_extrapolate_from_anchor() {
        let grid = BeatGrid::new(120.0, vec![0.1, 0.6, 1.1]).unwrap();
        let positions = grid.positions(0.0, 3.0);
        assert_eq!(positions.len(), 6);
        assert!((positions[0] - 0.1).abs() < 1e-9);
        assert!((positions[5] - 2.6).abs() < 1e-9);

        // Anchor is the first detected beat in the range, earlier slots filled
        let positions = grid.positions(0.9, 2.0);
        assert!((positions[0] - 1.1).abs() < 1e-9);
        assert!((positions[1] - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_positions_follow_irregular_beats() {
        // Tracked beats run slower than the nominal 120 BPM
        let grid = BeatGrid::new(120.0, vec![0.0, 0.55, 1.1, 1.65, 2.2]).unwrap();
        let positions = grid.positions(0.0, 3.0);
        assert_eq!(positions.len(), 6);
        for (p, b) in positions.iter().zip(grid.beats()) {
            assert!((p - b).abs() < 1e-12);
        }
        // Fourth beat stays on the tracked 1.65s, not the nominal 1.5s
        assert!((positions[3] - 1.65).abs() < 1e-12);
        // Past the last detected beat the period takes over
        assert!((positions[5] - 2.7).abs() < 1e-9);
    }

    #[test]
    fn test_positions_lead_in_before_first_beat() {
        let grid = BeatGrid::new(120.0, vec![1.2, 1.75]).unwrap();
        let positions = grid.positions(0.0, 2.0);
        assert_eq!(positions.len(), 4);
        assert!((positions[0] - 0.2).abs() < 1e-9);
        assert!((positions[1] - 0.7).abs() < 1e-9);
        assert!((positions[2] - 1.2).abs() < 1e-12);
        assert!((positions[3] - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_positions_outside_detected_beats() {
        // Range after the last beat stays in phase with it
        let grid = BeatGrid::new(120.0, vec![0.1, 0.6]).unwrap();
        let positions = grid.positions(2.0, 3.0);
        assert_eq!(positions.len(), 2);
        assert!((positions[0] - 2.1).abs() < 1e-9);
        assert!((positions[1] - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_positions_without_detected_beats() {
        let grid = BeatGrid::new(120.0, vec![]).unwrap();
        let positions = grid.positions(2.0, 3.0);
        assert_eq!(positions.len(), 2);
        assert!((positions[0] - 2.0).abs() < 1e-9);
    }
}
