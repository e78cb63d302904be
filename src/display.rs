use crate::sampler::MotionSample;
use chrono::{DateTime, Local};

/// Renders the wall clock and the latest sample once per second.
///
/// No computation happens here beyond formatting; the presenter re-renders on
/// its own cadence regardless of how often samples arrive.
pub struct Presenter {
    ticks: u64,
    active: bool,
}

impl Presenter {
    pub fn new() -> Self {
        Self {
            ticks: 0,
            active: false,
        }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Number of renders since construction
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Render one readout, or None when stopped
    pub fn tick(
        &mut self,
        now: DateTime<Local>,
        sample: &MotionSample,
        camera_status: &str,
    ) -> Option<String> {
        if !self.active {
            return None;
        }
        self.ticks += 1;
        Some(format_readout(now, sample, camera_status))
    }
}

/// Format one display block: clock, the three vectors, heading, camera status
/// Precision: 2 decimals for acceleration and rotation, 4 for the magnetic
/// field, 1 for heading
pub fn format_readout(now: DateTime<Local>, sample: &MotionSample, camera_status: &str) -> String {
    let heading = match sample.heading {
        Some(h) => format!("{:5.1}°", h),
        None => "   --".to_string(),
    };

    format!(
        "{} | Accel (g):    X={:6.2}  Y={:6.2}  Z={:6.2}\n\
         {:8} | Gyro (rad/s): X={:6.2}  Y={:6.2}  Z={:6.2}\n\
         {:8} | Mag (µT):     X={:9.4}  Y={:9.4}  Z={:9.4}\n\
         {:8} | Heading: {}  | Camera: {}",
        now.format("%H:%M:%S"),
        sample.acceleration[0],
        sample.acceleration[1],
        sample.acceleration[2],
        "",
        sample.rotation_rate[0],
        sample.rotation_rate[1],
        sample.rotation_rate[2],
        "",
        sample.magnetic_field[0],
        sample.magnetic_field[1],
        sample.magnetic_field[2],
        "",
        heading,
        camera_status,
    )
}
