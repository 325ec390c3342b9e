//! Streaming resampler — base-resolution bars in, coarser bars out.
//!
//! Buckets are `compression × base_minutes` long and aligned to the Unix epoch,
//! so 240-minute bars from 60-minute input start at 00:00, 04:00, 08:00, ...
//! A coarse bar is emitted as soon as the base bar closing its bucket arrives,
//! or flushed when a base bar for a later bucket shows up first (gaps).

use crate::domain::Bar;

/// Integer compression factor for an indicator resolution over the base resolution.
///
/// `max(indicator_minutes / base_minutes, 1)` with integer division.
pub fn compression(indicator_minutes: u32, base_minutes: u32) -> u32 {
    if base_minutes == 0 {
        return 1;
    }
    (indicator_minutes / base_minutes).max(1)
}

/// Turns a base bar stream into a coarser one, one bar at a time.
pub trait Resampler: Send + Sync {
    /// Push the next base bar; returns the coarse bars completed by it, oldest first.
    fn push(&mut self, bar: &Bar) -> Vec<Bar>;

    /// Emit the in-progress bar, if any.
    fn flush(&mut self) -> Option<Bar>;

    fn compression(&self) -> u32;
}

#[derive(Debug, Clone)]
pub struct CalendarResampler {
    compression: u32,
    base_minutes: i64,
    bucket_minutes: i64,
    current: Option<(i64, Bar)>,
}

impl CalendarResampler {
    pub fn new(compression: u32, base_minutes: u32) -> Self {
        assert!(compression >= 1, "compression must be >= 1");
        assert!(base_minutes >= 1, "base resolution must be >= 1 minute");
        let base = base_minutes as i64;
        Self {
            compression,
            base_minutes: base,
            bucket_minutes: base * compression as i64,
            current: None,
        }
    }

    fn bucket_of(&self, bar: &Bar) -> i64 {
        bar.epoch_minutes().div_euclid(self.bucket_minutes)
    }

    fn closes_bucket(&self, bar: &Bar) -> bool {
        (bar.epoch_minutes() + self.base_minutes).rem_euclid(self.bucket_minutes) == 0
    }
}

impl Resampler for CalendarResampler {
    fn push(&mut self, bar: &Bar) -> Vec<Bar> {
        if self.compression == 1 {
            return vec![bar.clone()];
        }

        let mut out = Vec::new();
        let bucket = self.bucket_of(bar);

        match self.current.as_mut() {
            Some((b, agg)) if *b == bucket => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                if let Some((_, done)) = self.current.take() {
                    out.push(done);
                }
                let start_minutes = bucket * self.bucket_minutes;
                let timestamp = chrono::DateTime::from_timestamp(start_minutes * 60, 0)
                    .map(|dt| dt.naive_utc())
                    .unwrap_or(bar.timestamp);
                let agg = Bar {
                    timestamp,
                    ..bar.clone()
                };
                self.current = Some((bucket, agg));
            }
        }

        if self.closes_bucket(bar) {
            if let Some((_, done)) = self.current.take() {
                out.push(done);
            }
        }
        out
    }

    fn flush(&mut self) -> Option<Bar> {
        self.current.take().map(|(_, bar)| bar)
    }

    fn compression(&self) -> u32 {
        self.compression
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn compression_is_floored_ratio_at_least_one() {
        assert_eq!(compression(240, 60), 4);
        assert_eq!(compression(60, 60), 1);
        assert_eq!(compression(30, 60), 1);
        assert_eq!(compression(90, 60), 1);
    }

    #[test]
    fn compression_one_passes_through() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let mut rs = CalendarResampler::new(1, 60);
        for bar in &bars {
            assert_eq!(rs.push(bar), vec![bar.clone()]);
        }
    }

    #[test]
    fn four_hour_buckets_from_hourly_bars() {
        // make_bars starts at 2024-01-02 00:00, hourly
        let closes: Vec<f64> = (1..=8).map(|i| i as f64 * 10.0).collect();
        let bars = make_bars(&closes);
        let mut rs = CalendarResampler::new(4, 60);
        let mut emitted = Vec::new();
        for (i, bar) in bars.iter().enumerate() {
            let out = rs.push(bar);
            if i % 4 == 3 {
                assert_eq!(out.len(), 1, "bucket closes on bar {i}");
            } else {
                assert!(out.is_empty());
            }
            emitted.extend(out);
        }
        assert_eq!(emitted.len(), 2);
        let first = &emitted[0];
        assert_eq!(first.timestamp, bars[0].timestamp);
        assert_eq!(first.open, bars[0].open);
        assert_eq!(first.close, 40.0);
        assert_eq!(first.high, bars[..4].iter().map(|b| b.high).fold(f64::MIN, f64::max));
        assert_eq!(first.low, bars[..4].iter().map(|b| b.low).fold(f64::MAX, f64::min));
        assert_eq!(first.volume, 4000.0);
        assert_eq!(emitted[1].timestamp, bars[4].timestamp);
        assert!(rs.flush().is_none());
    }

    #[test]
    fn gap_flushes_partial_bucket() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let mut rs = CalendarResampler::new(4, 60);
        // 00:00 and 01:00, then jump to 05:00 (second bucket)
        assert!(rs.push(&bars[0]).is_empty());
        assert!(rs.push(&bars[1]).is_empty());
        let out = rs.push(&bars[5]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].close, 2.0);
        assert_eq!(out[0].volume, 2000.0);
        let rest = rs.flush().expect("partial second bucket");
        assert_eq!(rest.close, 6.0);
    }
}
