use crate::motion::{MotionReading, MotionSource};
use log::{info, warn};
use std::time::Duration;

/// Latest motion snapshot, replaced wholesale on each successful update
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    /// Linear acceleration [x, y, z] in g
    pub acceleration: [f64; 3],
    /// Rotation rate [x, y, z] in rad/s
    pub rotation_rate: [f64; 3],
    /// Magnetic field [x, y, z] in µT
    pub magnetic_field: [f64; 3],
    /// Compass heading in degrees [0, 360), when an orientation reference
    /// was requested and the source provides one
    pub heading: Option<f64>,
}

/// Compass heading in degrees from a yaw angle in radians, reduced into [0, 360)
///
/// Uses a floored reduction so that negative yaw still comes out as a
/// conventional compass bearing: yaw = -π/2 maps to 270°, not -90°.
pub fn heading_from_yaw(yaw: f64) -> f64 {
    let degrees = yaw.to_degrees().rem_euclid(360.0);
    // rem_euclid of a tiny negative value can round up to exactly 360.0
    if degrees >= 360.0 {
        0.0
    } else {
        degrees
    }
}

/// Polls a motion source at a fixed period and republishes the latest sample.
///
/// The sample slot has a single writer (poll, on the main scheduling context)
/// and is read by the presentation layer. Delivery errors are logged and
/// dropped; the previous sample stays in place.
pub struct Sampler {
    source: Option<Box<dyn MotionSource>>,
    period: Duration,
    compute_heading: bool,
    latest: MotionSample,
    active: bool,
}

impl Sampler {
    /// Create a sampler.
    ///
    /// source: None when the motion hardware is unavailable; the sampler then
    /// never subscribes and the sample stays at its zero default.
    /// compute_heading: whether an orientation reference was requested.
    pub fn new(source: Option<Box<dyn MotionSource>>, period: Duration, compute_heading: bool) -> Self {
        Self {
            source,
            period,
            compute_heading,
            latest: MotionSample::default(),
            active: false,
        }
    }

    /// The fixed sampling period
    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Begin delivering updates. With no source this is a no-op beyond a log
    /// line; the sample keeps its default value for the whole run.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        match &self.source {
            Some(source) => info!(
                "Sampling {} every {:.1} ms",
                source.describe(),
                self.period.as_secs_f64() * 1000.0
            ),
            None => info!("Motion hardware unavailable, sampling skipped"),
        }
    }

    /// Stop delivering updates
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Take one reading from the source and overwrite the latest sample.
    ///
    /// Called once per period tick while active. A delivery error leaves the
    /// previous sample untouched; there is no retry.
    pub fn poll(&mut self) {
        if !self.active {
            return;
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };

        match source.sample() {
            Ok(reading) => {
                self.latest = sample_from_reading(&reading, self.compute_heading);
            }
            Err(e) => {
                warn!("Motion update dropped: {:#}", e);
            }
        }
    }

    /// The current sample
    pub fn latest(&self) -> MotionSample {
        self.latest
    }
}

fn sample_from_reading(reading: &MotionReading, compute_heading: bool) -> MotionSample {
    let heading = if compute_heading {
        reading.yaw.map(heading_from_yaw)
    } else {
        None
    };

    MotionSample {
        acceleration: reading.acceleration,
        rotation_rate: reading.rotation_rate,
        magnetic_field: reading.magnetic_field,
        heading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::VecDeque;
    use std::f64::consts::{FRAC_PI_2, PI};

    /// Motion source fed from a canned queue of deliveries
    struct FakeSource {
        deliveries: VecDeque<Result<MotionReading>>,
    }

    impl FakeSource {
        fn new(deliveries: Vec<Result<MotionReading>>) -> Self {
            Self {
                deliveries: deliveries.into(),
            }
        }
    }

    impl MotionSource for FakeSource {
        fn sample(&mut self) -> Result<MotionReading> {
            self.deliveries
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("queue exhausted")))
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    fn reading(value: f64, yaw: Option<f64>) -> MotionReading {
        MotionReading {
            acceleration: [value, value, value],
            rotation_rate: [value, value, value],
            magnetic_field: [value, value, value],
            yaw,
        }
    }

    fn sampler_with(deliveries: Vec<Result<MotionReading>>) -> Sampler {
        Sampler::new(
            Some(Box::new(FakeSource::new(deliveries))),
            Duration::from_millis(500),
            true,
        )
    }

    #[test]
    fn test_heading_quarter_turns() {
        assert!((heading_from_yaw(FRAC_PI_2) - 90.0).abs() < 1e-9);
        assert!((heading_from_yaw(-FRAC_PI_2) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_heading_stays_in_range() {
        let yaws = [
            0.0,
            PI,
            -PI,
            2.0 * PI,
            -2.0 * PI,
            5.75 * PI,
            -7.25 * PI,
            -1e-15,
            1e-15,
        ];
        for yaw in yaws {
            let heading = heading_from_yaw(yaw);
            assert!(
                (0.0..360.0).contains(&heading),
                "yaw {} gave heading {}",
                yaw,
                heading
            );
        }
    }

    #[test]
    fn test_heading_full_turn_wraps_to_zero() {
        assert!(heading_from_yaw(2.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_errors_never_mutate_displayed_state() {
        let mut sampler = sampler_with(vec![
            Ok(reading(1.0, Some(0.0))),
            Err(anyhow::anyhow!("bus glitch")),
            Ok(reading(2.0, Some(0.0))),
            Err(anyhow::anyhow!("bus glitch")),
        ]);
        sampler.start();

        sampler.poll();
        assert_eq!(sampler.latest().acceleration, [1.0, 1.0, 1.0]);

        sampler.poll();
        assert_eq!(sampler.latest().acceleration, [1.0, 1.0, 1.0]);

        sampler.poll();
        assert_eq!(sampler.latest().acceleration, [2.0, 2.0, 2.0]);

        sampler.poll();
        assert_eq!(sampler.latest().acceleration, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_sourceless_sampler_stays_at_default() {
        let mut sampler = Sampler::new(None, Duration::from_millis(500), true);
        sampler.start();
        sampler.poll();
        sampler.poll();

        assert_eq!(sampler.latest(), MotionSample::default());
        assert_eq!(sampler.latest().acceleration, [0.0, 0.0, 0.0]);
        assert_eq!(sampler.latest().heading, None);
    }

    #[test]
    fn test_inactive_sampler_ignores_polls() {
        let mut sampler = sampler_with(vec![Ok(reading(1.0, Some(0.0)))]);
        sampler.poll();
        assert_eq!(sampler.latest(), MotionSample::default());

        sampler.start();
        sampler.poll();
        assert_eq!(sampler.latest().acceleration, [1.0, 1.0, 1.0]);

        sampler.stop();
        sampler.poll();
        assert_eq!(sampler.latest().acceleration, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_heading_computed_on_update() {
        let mut sampler = sampler_with(vec![Ok(reading(0.0, Some(-FRAC_PI_2)))]);
        sampler.start();
        sampler.poll();

        let heading = sampler.latest().heading.unwrap();
        assert!((heading - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_heading_skipped_without_reference() {
        let mut sampler = Sampler::new(
            Some(Box::new(FakeSource::new(vec![Ok(reading(0.0, Some(1.0)))]))),
            Duration::from_millis(500),
            false,
        );
        sampler.start();
        sampler.poll();
        assert_eq!(sampler.latest().heading, None);
    }

    #[test]
    fn test_heading_absent_when_source_has_no_orientation() {
        let mut sampler = sampler_with(vec![Ok(reading(1.0, None))]);
        sampler.start();
        sampler.poll();
        assert_eq!(sampler.latest().heading, None);
        assert_eq!(sampler.latest().magnetic_field, [1.0, 1.0, 1.0]);
    }
}
