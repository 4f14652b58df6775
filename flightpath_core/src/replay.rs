//! Trajectory tables: precomputed samples written to and replayed from text.
//!
//! Format, one sample per line:
//!
//! ```text
//! # t ax ay az mx my mz
//! 0.000000 -120.000000 0.000000 0.000000 -110.000000 0.000000 0.000000
//! 0.002000 -119.520000 0.282566 0.282566 -109.480000 0.075398 -0.010000
//! ```
//!
//! `#` lines and blank lines are ignored. Each data row is `t` followed by
//! `x y z` for every track. Rows that do not parse, have the wrong column
//! count, hold non-finite values, or do not advance `t` are skipped and
//! counted rather than aborting the load.

use crate::error::{FlightPathError, Result};
use crate::trajectory::Trajectory;

use nalgebra::Vector3;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of reading a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows accepted
    pub loaded: usize,
    /// Data rows rejected as malformed
    pub skipped: usize,
}

/// Time-aligned samples of one or more tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryTable {
    times: Vec<f64>,
    tracks: Vec<Vec<Vector3<f64>>>,
    labels: Vec<String>,
}

impl TrajectoryTable {
    /// Creates an empty table with `track_count` tracks.
    pub fn new(track_count: usize) -> Self {
        Self {
            times: Vec::new(),
            tracks: vec![Vec::new(); track_count],
            labels: (0..track_count).map(|i| format!("p{}", i)).collect(),
        }
    }

    /// Header prefixes per track (`"a"` gives columns `ax ay az`).
    /// Missing labels keep their defaults; extra ones are ignored.
    pub fn with_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        for (slot, label) in self.labels.iter_mut().zip(labels) {
            *slot = label.as_ref().to_string();
        }
        self
    }

    /// Samples every trajectory at `t = i / intervals` for `i ∈ 0..=intervals`.
    pub fn sample(trajectories: &[&dyn Trajectory], intervals: usize) -> Self {
        let intervals = intervals.max(1);
        let mut table = Self::new(trajectories.len());
        for i in 0..=intervals {
            let t = i as f64 / intervals as f64;
            let row: Vec<Vector3<f64>> = trajectories.iter().map(|traj| traj.position(t)).collect();
            table.push_row(t, &row);
        }
        table
    }

    /// Appends a row. Rejects wrong widths, non-finite values and
    /// non-increasing `t`. Returns whether the row was stored.
    pub fn push_row(&mut self, t: f64, points: &[Vector3<f64>]) -> bool {
        if points.len() != self.tracks.len() || !t.is_finite() {
            return false;
        }
        if points.iter().any(|p| !p.iter().all(|c| c.is_finite())) {
            return false;
        }
        if let Some(&last) = self.times.last() {
            if t <= last {
                return false;
            }
        }

        self.times.push(t);
        for (track, p) in self.tracks.iter_mut().zip(points) {
            track.push(*p);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Raw samples of one track.
    pub fn samples(&self, track: usize) -> Option<&[Vector3<f64>]> {
        self.tracks.get(track).map(Vec::as_slice)
    }

    /// Linear interpolation of `track` at `t`, clamped to the end samples.
    pub fn interpolate(&self, track: usize, t: f64) -> Option<Vector3<f64>> {
        interpolate_samples(&self.times, self.tracks.get(track)?, t)
    }

    /// A replayable trajectory over one track, or `None` when the table is
    /// empty or the track does not exist.
    pub fn track(&self, track: usize) -> Option<SampledTrajectory> {
        let points = self.tracks.get(track)?;
        if points.is_empty() {
            return None;
        }
        Some(SampledTrajectory {
            times: self.times.clone(),
            points: points.clone(),
        })
    }

    /// Writes the table in text form.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        write!(writer, "# t")?;
        for label in &self.labels {
            write!(writer, " {0}x {0}y {0}z", label)?;
        }
        writeln!(writer)?;

        for (i, t) in self.times.iter().enumerate() {
            write!(writer, "{:.6}", t)?;
            for track in &self.tracks {
                let p = track[i];
                write!(writer, " {:.6} {:.6} {:.6}", p.x, p.y, p.z)?;
            }
            writeln!(writer)?;
        }
        writer.flush()
    }

    /// Writes the table to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| FlightPathError::io(path, e))?;
        self.write_to(BufWriter::new(file))
            .map_err(|e| FlightPathError::io(path, e))?;
        info!("Trajectory table written: {} ({} samples)", path.display(), self.len());
        Ok(())
    }

    /// Parses a table with `track_count` tracks, skipping malformed rows.
    pub fn read_from<R: BufRead>(reader: R, track_count: usize) -> std::io::Result<(Self, LoadReport)> {
        let mut table = Self::new(track_count);
        let mut report = LoadReport::default();
        let width = 1 + 3 * track_count;

        for (line_no, bytes) in reader.split(b'\n').enumerate() {
            let bytes = bytes?;
            let Ok(line) = std::str::from_utf8(&bytes) else {
                warn!("Line {}: not valid UTF-8; skipped", line_no + 1);
                report.skipped += 1;
                continue;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let values: std::result::Result<Vec<f64>, _> =
                trimmed.split_whitespace().map(str::parse::<f64>).collect();
            let values = match values {
                Ok(values) if values.len() == width => values,
                Ok(values) => {
                    warn!(
                        "Line {}: expected {} columns, found {}; skipped",
                        line_no + 1,
                        width,
                        values.len()
                    );
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Line {}: {}; skipped", line_no + 1, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let points: Vec<Vector3<f64>> = values[1..]
                .chunks_exact(3)
                .map(|c| Vector3::new(c[0], c[1], c[2]))
                .collect();

            if table.push_row(values[0], &points) {
                report.loaded += 1;
            } else {
                warn!("Line {}: non-finite value or non-increasing t; skipped", line_no + 1);
                report.skipped += 1;
            }
        }

        Ok((table, report))
    }

    /// Loads a table from `path`.
    ///
    /// Fails with [`FlightPathError::Io`] if the file cannot be read and
    /// [`FlightPathError::EmptyTable`] if no row survives parsing.
    pub fn load(path: impl AsRef<Path>, track_count: usize) -> Result<(Self, LoadReport)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FlightPathError::io(path, e))?;
        let (table, report) = Self::read_from(BufReader::new(file), track_count)
            .map_err(|e| FlightPathError::io(path, e))?;

        if table.is_empty() {
            return Err(FlightPathError::EmptyTable {
                path: path.to_path_buf(),
            });
        }
        info!(
            "Loaded {} samples from {} ({} skipped)",
            report.loaded,
            path.display(),
            report.skipped
        );
        Ok((table, report))
    }
}

/// One replayed track, linearly interpolated between samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledTrajectory {
    times: Vec<f64>,
    points: Vec<Vector3<f64>>,
}

impl SampledTrajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

impl Trajectory for SampledTrajectory {
    fn evaluate(&self, t: f64) -> Vector3<f64> {
        interpolate_samples(&self.times, &self.points, t).unwrap_or_else(Vector3::zeros)
    }
}

/// Binary-searches the bracketing pair and blends linearly.
fn interpolate_samples(times: &[f64], points: &[Vector3<f64>], t: f64) -> Option<Vector3<f64>> {
    let (first, last) = (points.first()?, points.last()?);
    let (t_first, t_last) = (*times.first()?, *times.last()?);

    if t.is_nan() || t <= t_first {
        return Some(*first);
    }
    if t >= t_last {
        return Some(*last);
    }

    // First sample strictly after t; in 1..len because of the checks above
    let i = times.partition_point(|&s| s <= t);
    let (t0, t1) = (times[i - 1], times[i]);
    let u = (t - t0) / (t1 - t0);
    Some(points[i - 1].lerp(&points[i], u))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{Axis, LinearPath, Wave, WavePath};
    use approx::assert_relative_eq;
    use std::io::Cursor;

    fn aircraft() -> WavePath {
        WavePath::new(Vector3::new(-120.0, 0.0, 0.0), Vector3::new(240.0, 0.0, 0.0))
            .with_wave(Wave::new(Axis::Y, 15.0, 1.5))
            .with_wave(Wave::new(Axis::Z, 15.0, 1.5))
    }

    fn missile() -> WavePath {
        WavePath::new(Vector3::new(-110.0, 0.0, 0.0), Vector3::new(260.0, 0.0, -5.0))
            .with_wave(Wave::new(Axis::Y, 25.0, 0.6))
    }

    fn sampled() -> TrajectoryTable {
        let (a, m) = (aircraft(), missile());
        TrajectoryTable::sample(&[&a, &m], 500).with_labels(&["a", "m"])
    }

    #[test]
    fn test_sample_count() {
        let table = sampled();
        assert_eq!(table.len(), 501);
        assert_eq!(table.track_count(), 2);
        assert_eq!(table.times()[0], 0.0);
        assert_eq!(table.times()[500], 1.0);
    }

    #[test]
    fn test_header_format() {
        let mut buf = Vec::new();
        sampled().write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("# t ax ay az mx my mz\n"));
        assert_eq!(text.lines().count(), 502);
    }

    #[test]
    fn test_write_read_round_trip() {
        let table = sampled();
        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();

        let (loaded, report) = TrajectoryTable::read_from(Cursor::new(buf), 2).unwrap();
        assert_eq!(report, LoadReport { loaded: 501, skipped: 0 });
        assert_eq!(loaded.len(), 501);

        for i in 0..501 {
            assert_relative_eq!(loaded.times()[i], table.times()[i], epsilon = 1e-6);
            for track in 0..2 {
                let expected = table.samples(track).unwrap()[i];
                let actual = loaded.samples(track).unwrap()[i];
                assert_relative_eq!(actual, expected, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_interpolation_blends_bracketing_samples() {
        let table = sampled();
        let i = 137;
        let (t0, t1) = (table.times()[i], table.times()[i + 1]);
        let t = t0 + 0.25 * (t1 - t0);

        let a0 = table.samples(0).unwrap()[i];
        let a1 = table.samples(0).unwrap()[i + 1];
        let expected = a0 * 0.75 + a1 * 0.25;

        assert_relative_eq!(table.interpolate(0, t).unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_interpolation_clamps_to_ends() {
        let table = sampled();
        assert_eq!(table.interpolate(1, -0.5), Some(table.samples(1).unwrap()[0]));
        assert_eq!(table.interpolate(1, 1.5), Some(table.samples(1).unwrap()[500]));
        assert_eq!(table.interpolate(7, 0.5), None);
    }

    #[test]
    fn test_interpolation_hits_samples_exactly() {
        let table = sampled();
        let t = table.times()[250];
        assert_eq!(table.interpolate(0, t), Some(table.samples(0).unwrap()[250]));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let text = "\
# t ax ay az
0.0 0 0 0

0.5 1 2
0.5 not a number
0.5 1 1 1
0.4 9 9 9
0.75 inf 0 0
1.0 2 2 2
";
        let (table, report) = TrajectoryTable::read_from(Cursor::new(text), 1).unwrap();

        assert_eq!(report.loaded, 3);
        assert_eq!(report.skipped, 4);
        assert_eq!(table.times(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let bytes: &[u8] = b"# t ax ay az\n0.0 0 0 0\n0.5 \xff\xfe 0 0\r\n1.0 2 2 2\r\n";
        let (table, report) = TrajectoryTable::read_from(Cursor::new(bytes), 1).unwrap();

        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(table.times(), &[0.0, 1.0]);
        assert_relative_eq!(
            table.interpolate(0, 0.5).unwrap(),
            Vector3::new(1.0, 1.0, 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_empty_table_has_no_track() {
        let (table, report) = TrajectoryTable::read_from(Cursor::new("# only a header\n"), 2).unwrap();
        assert!(table.is_empty());
        assert_eq!(report.loaded, 0);
        assert!(table.track(0).is_none());
        assert_eq!(table.interpolate(0, 0.5), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = TrajectoryTable::load("/nonexistent/flightpath/trajectory.txt", 2);
        assert!(matches!(result, Err(FlightPathError::Io { .. })));
    }

    #[test]
    fn test_sampled_trajectory_replays_track() {
        let path = LinearPath::new(Vector3::zeros(), Vector3::new(10.0, 0.0, 0.0));
        let table = TrajectoryTable::sample(&[&path], 10);
        let replay = table.track(0).unwrap();

        assert_eq!(replay.len(), 11);
        assert_relative_eq!(replay.position(0.55), Vector3::new(5.5, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(replay.position(2.0), Vector3::new(10.0, 0.0, 0.0), epsilon = 1e-9);
    }
}
