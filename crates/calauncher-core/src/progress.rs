use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const REPORT_BYTES: u64 = 128 * 1024;
const SPEED_WINDOW: Duration = Duration::from_secs(2);
const MAX_SPEED_SAMPLES: usize = 10;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub percentage: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed_bytes_per_second: f64,
}

impl DownloadProgress {
    #[must_use]
    pub fn formatted_speed(&self) -> String {
        let speed = self.speed_bytes_per_second;
        if speed < KIB {
            format!("{speed:.0} B/s")
        } else if speed < MIB {
            format!("{:.1} KB/s", speed / KIB)
        } else if speed < GIB {
            format!("{:.1} MB/s", speed / MIB)
        } else {
            format!("{:.1} GB/s", speed / GIB)
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn formatted_size(&self) -> String {
        let downloaded = self.downloaded_bytes as f64;
        let total = self.total_bytes as f64;
        if total < KIB {
            format!("{} / {} B", self.downloaded_bytes, self.total_bytes)
        } else if total < MIB {
            format!("{:.2} / {:.2} KB", downloaded / KIB, total / KIB)
        } else if total < GIB {
            format!("{:.2} / {:.2} MB", downloaded / MIB, total / MIB)
        } else {
            format!("{:.2} / {:.2} GB", downloaded / GIB, total / GIB)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProgressEvent {
    Progress(DownloadProgress),
    ExtractionStarting,
}

/// Decides when a download is worth reporting and estimates its speed from a
/// short window of recent reports.
#[derive(Debug)]
pub(crate) struct ProgressSampler {
    total: u64,
    last_report_at: Instant,
    last_reported_bytes: u64,
    samples: VecDeque<(Instant, u64)>,
    extraction_announced: bool,
}

impl ProgressSampler {
    pub(crate) fn new(total: u64, started: Instant) -> Self {
        Self {
            total,
            last_report_at: started,
            last_reported_bytes: 0,
            samples: VecDeque::with_capacity(MAX_SPEED_SAMPLES + 1),
            extraction_announced: false,
        }
    }

    /// Record the cumulative byte count after a chunk.
    ///
    /// Returns an event at most once per second, on completion, or after
    /// 128 KiB of new data. Reaching 100% yields `ExtractionStarting` once and
    /// nothing afterwards.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn record(&mut self, downloaded: u64, now: Instant) -> Option<ProgressEvent> {
        if self.extraction_announced {
            return None;
        }

        let due = now.duration_since(self.last_report_at) >= REPORT_INTERVAL
            || downloaded == self.total
            || downloaded.saturating_sub(self.last_reported_bytes) >= REPORT_BYTES;
        if !due {
            return None;
        }

        self.samples.push_back((now, downloaded));
        while self
            .samples
            .front()
            .is_some_and(|(at, _)| now.duration_since(*at) > SPEED_WINDOW)
        {
            self.samples.pop_front();
        }
        while self.samples.len() > MAX_SPEED_SAMPLES {
            self.samples.pop_front();
        }

        self.last_report_at = now;
        self.last_reported_bytes = downloaded;

        let percentage = if self.total > 0 {
            downloaded as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };

        if percentage >= 100.0 {
            self.extraction_announced = true;
            return Some(ProgressEvent::ExtractionStarting);
        }

        Some(ProgressEvent::Progress(DownloadProgress {
            percentage,
            downloaded_bytes: downloaded,
            total_bytes: self.total,
            speed_bytes_per_second: self.speed(),
        }))
    }

    /// Announce extraction if the byte count never reached the (estimated) total.
    pub(crate) fn finish(&mut self) -> Option<ProgressEvent> {
        if self.extraction_announced {
            None
        } else {
            self.extraction_announced = true;
            Some(ProgressEvent::ExtractionStarting)
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn speed(&self) -> f64 {
        let (Some((first_at, first_bytes)), Some((last_at, last_bytes))) =
            (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };
        if self.samples.len() < 2 {
            return 0.0;
        }
        let elapsed = last_at.duration_since(*first_at).as_secs_f64();
        if elapsed > 0.0 {
            last_bytes.saturating_sub(*first_bytes) as f64 / elapsed
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::{DownloadProgress, ProgressEvent, ProgressSampler};

    fn progress(event: Option<ProgressEvent>) -> DownloadProgress {
        match event {
            Some(ProgressEvent::Progress(progress)) => progress,
            other => panic!("expected a progress event, got {other:?}"),
        }
    }

    #[test]
    fn small_chunks_are_not_reported_until_a_threshold_is_hit() {
        let start = Instant::now();
        let mut sampler = ProgressSampler::new(1_000_000, start);

        assert!(sampler.record(8192, start).is_none());
        assert!(
            sampler
                .record(16_384, start + Duration::from_millis(500))
                .is_none()
        );

        let report = progress(sampler.record(24_576, start + Duration::from_secs(1)));
        assert_eq!(report.downloaded_bytes, 24_576);
        assert_eq!(report.total_bytes, 1_000_000);
        assert!((report.percentage - 2.4576).abs() < 1e-9);
        assert!(report.speed_bytes_per_second.abs() < f64::EPSILON);
    }

    #[test]
    fn byte_threshold_reports_without_waiting_for_the_clock() {
        let start = Instant::now();
        let mut sampler = ProgressSampler::new(10 * 1024 * 1024, start);

        let report = progress(sampler.record(128 * 1024, start));
        assert_eq!(report.downloaded_bytes, 128 * 1024);
    }

    #[test]
    fn speed_uses_oldest_and_newest_sample_in_window() {
        let start = Instant::now();
        let mut sampler = ProgressSampler::new(100 * 1024 * 1024, start);

        let _ = sampler.record(128 * 1024, start + Duration::from_millis(500));
        let report = progress(sampler.record(384 * 1024, start + Duration::from_millis(1500)));
        assert!((report.speed_bytes_per_second - 256.0 * 1024.0).abs() < 1e-6);

        // Samples older than two seconds fall out of the window.
        let report = progress(sampler.record(512 * 1024, start + Duration::from_millis(4000)));
        assert!(report.speed_bytes_per_second.abs() < f64::EPSILON);
    }

    #[test]
    fn window_keeps_at_most_ten_samples() {
        let start = Instant::now();
        let mut sampler = ProgressSampler::new(100 * 1024 * 1024, start);

        for step in 1..=12_u64 {
            let _ = sampler.record(step * 128 * 1024, start + Duration::from_millis(step * 10));
        }

        assert_eq!(sampler.samples.len(), 10);
        let report = progress(sampler.record(13 * 128 * 1024, start + Duration::from_millis(130)));
        // Window now spans samples 4..=13: nine steps of 128 KiB over 90 ms.
        let expected = 9.0 * 128.0 * 1024.0 / 0.09;
        assert!((report.speed_bytes_per_second - expected).abs() < 1.0);
    }

    #[test]
    fn completion_announces_extraction_exactly_once() {
        let start = Instant::now();
        let mut sampler = ProgressSampler::new(4096, start);

        assert_eq!(
            sampler.record(4096, start),
            Some(ProgressEvent::ExtractionStarting)
        );
        assert!(sampler.record(4096, start + Duration::from_secs(5)).is_none());
        assert!(sampler.finish().is_none());
    }

    #[test]
    fn finish_announces_when_estimate_was_never_reached() {
        let start = Instant::now();
        let mut sampler = ProgressSampler::new(50 * 1024 * 1024, start);
        let _ = sampler.record(200 * 1024, start);

        assert_eq!(sampler.finish(), Some(ProgressEvent::ExtractionStarting));
        assert!(sampler.finish().is_none());
    }

    #[test]
    fn formatting_picks_a_readable_unit() {
        let progress = DownloadProgress {
            percentage: 50.0,
            downloaded_bytes: 3 * 1024 * 1024,
            total_bytes: 6 * 1024 * 1024,
            speed_bytes_per_second: 1536.0,
        };
        assert_eq!(progress.formatted_speed(), "1.5 KB/s");
        assert_eq!(progress.formatted_size(), "3.00 / 6.00 MB");

        let tiny = DownloadProgress {
            percentage: 50.0,
            downloaded_bytes: 10,
            total_bytes: 20,
            speed_bytes_per_second: 12.0,
        };
        assert_eq!(tiny.formatted_speed(), "12 B/s");
        assert_eq!(tiny.formatted_size(), "10 / 20 B");
    }
}
