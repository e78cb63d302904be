use anyhow::{Context, Result};
use bno055::{Bno055, BNO055Calibration, BNO055OperationMode};
use linux_embedded_hal::{Delay, I2cdev};
use std::fs;
use std::path::PathBuf;

/// Standard gravity in m/s², for converting accelerometer output to g
const STANDARD_GRAVITY: f64 = 9.80665;

/// One delivery from the motion hardware
#[derive(Debug, Clone, Copy)]
pub struct MotionReading {
    /// Linear acceleration [x, y, z] in g (gravity removed by the fusion engine)
    pub acceleration: [f64; 3],
    /// Rotation rate [x, y, z] in rad/s (angular velocity in body frame)
    pub rotation_rate: [f64; 3],
    /// Magnetic field [x, y, z] in µT
    pub magnetic_field: [f64; 3],
    /// Yaw angle in radians, present when the source tracks an absolute
    /// orientation reference (magnetic north)
    pub yaw: Option<f64>,
}

/// A source of periodic motion readings.
///
/// The sampler polls this at a fixed period. The production implementation is
/// `Bno055Source`; tests drive the sampler with hand-rolled fakes.
pub trait MotionSource {
    /// Read one set of vectors (and orientation, if tracked) from the hardware
    fn sample(&mut self) -> Result<MotionReading>;

    /// Human-readable description of the underlying device
    fn describe(&self) -> String;
}

/// Motion source backed by a BNO055 9-DOF IMU in NDOF fusion mode
pub struct Bno055Source {
    imu: Bno055<I2cdev>,
    delay: Delay,
    bus: String,
}

impl Bno055Source {
    /// Create a motion source with default settings
    /// Uses /dev/i2c-1 and the alternative address (0x29)
    pub fn new_default() -> Result<Self> {
        Self::new("/dev/i2c-1", 0x29)
    }

    /// Create a new motion source
    /// bus: path to the I2C device (e.g., "/dev/i2c-1")
    /// address: BNO055 I2C address (0x28 or 0x29)
    pub fn new(bus: &str, address: u8) -> Result<Self> {
        let i2c = I2cdev::new(bus)
            .context(format!("Failed to open I2C device: {}", bus))?;

        let mut imu = if address == 0x29 {
            Bno055::new(i2c).with_alternative_address()
        } else {
            Bno055::new(i2c)
        };

        let mut delay = Delay {};

        imu.init(&mut delay)
            .map_err(|e| anyhow::anyhow!("Failed to initialize BNO055: {:?}", e))?;

        // NDOF mode: the chip fuses all three sensors and tracks absolute
        // orientation against magnetic north, which is what the heading needs
        imu.set_mode(BNO055OperationMode::NDOF, &mut delay)
            .map_err(|e| anyhow::anyhow!("Failed to set NDOF mode: {:?}", e))?;

        let mut source = Self {
            imu,
            delay,
            bus: bus.to_string(),
        };

        // Automatically load calibration if it exists
        match source.load_calibration() {
            Ok(true) => {
                // Calibration loaded successfully
            }
            Ok(false) => {
                // No calibration file found - sensor will auto-calibrate
            }
            Err(e) => {
                log::warn!("Failed to load IMU calibration: {:#}", e);
                log::warn!("Sensor will use auto-calibration.");
            }
        }

        Ok(source)
    }

    /// Get calibration status
    /// Returns (system, gyro, accelerometer, magnetometer) calibration levels (0-3)
    pub fn calibration_status(&mut self) -> Result<(u8, u8, u8, u8)> {
        let calib = self.imu.get_calibration_status()
            .map_err(|e| anyhow::anyhow!("Failed to get calibration status: {:?}", e))?;
        Ok((calib.sys, calib.gyr, calib.acc, calib.mag))
    }

    /// Get path to calibration file
    fn calibration_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config/motionview/imu_calibration.bin")
    }

    /// Load calibration from file and apply to the sensor
    /// Returns true if calibration was loaded, false if file doesn't exist
    pub fn load_calibration(&mut self) -> Result<bool> {
        let calib_path = Self::calibration_path();

        if !calib_path.exists() {
            return Ok(false);
        }

        let calib_bytes = fs::read(&calib_path)
            .context(format!("Failed to read calibration file: {}", calib_path.display()))?;

        // BNO055 calibration profiles are exactly 22 bytes
        if calib_bytes.len() != 22 {
            return Err(anyhow::anyhow!(
                "Invalid calibration file size: {} bytes (expected 22)",
                calib_bytes.len()
            ));
        }

        let mut buf = [0u8; 22];
        buf.copy_from_slice(&calib_bytes);

        let calibration = BNO055Calibration::from_buf(&buf);

        self.imu.set_calibration_profile(calibration, &mut self.delay)
            .map_err(|e| anyhow::anyhow!("Failed to set calibration profile: {:?}", e))?;

        Ok(true)
    }

    /// Save current calibration to file
    pub fn save_calibration(&mut self) -> Result<()> {
        let calib_path = Self::calibration_path();

        if let Some(parent) = calib_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create calibration directory")?;
        }

        let calibration = self.imu.calibration_profile(&mut self.delay)
            .map_err(|e| anyhow::anyhow!("Failed to read calibration profile: {:?}", e))?;

        let calib_bytes = calibration.as_bytes();
        fs::write(&calib_path, calib_bytes)
            .context(format!("Failed to write calibration file: {}", calib_path.display()))?;

        Ok(())
    }

    /// Read the current orientation quaternion [w, x, y, z] (normalized)
    pub fn orientation(&mut self) -> Result<[f64; 4]> {
        let quat = self.imu.quaternion()
            .map_err(|e| anyhow::anyhow!("Failed to read quaternion: {:?}", e))?;

        Ok([quat.s as f64, quat.v.x as f64, quat.v.y as f64, quat.v.z as f64])
    }
}

impl MotionSource for Bno055Source {
    /// Read one motion update from the sensor
    /// Returns linear acceleration (g), rotation rate (rad/s), magnetic field
    /// (µT) and the yaw extracted from the fusion quaternion
    fn sample(&mut self) -> Result<MotionReading> {
        // Linear acceleration with gravity removed by the NDOF engine, in m/s²
        let accel = self.imu.linear_acceleration()
            .map_err(|e| anyhow::anyhow!("Failed to read linear acceleration: {:?}", e))?;

        let acceleration = [
            accel.x as f64 / STANDARD_GRAVITY,
            accel.y as f64 / STANDARD_GRAVITY,
            accel.z as f64 / STANDARD_GRAVITY,
        ];

        // Gyroscope comes back in deg/s
        let gyro = self.imu.gyro_data()
            .map_err(|e| anyhow::anyhow!("Failed to read gyroscope: {:?}", e))?;

        let gyro_scale = std::f64::consts::PI / 180.0;
        let rotation_rate = [
            gyro.x as f64 * gyro_scale,
            gyro.y as f64 * gyro_scale,
            gyro.z as f64 * gyro_scale,
        ];

        // Magnetometer is already in µT
        let mag = self.imu.mag_data()
            .map_err(|e| anyhow::anyhow!("Failed to read magnetometer: {:?}", e))?;

        let magnetic_field = [mag.x as f64, mag.y as f64, mag.z as f64];

        let quat = self.orientation()?;
        let [_, _, yaw] = quat_to_euler(quat);

        Ok(MotionReading {
            acceleration,
            rotation_rate,
            magnetic_field,
            yaw: Some(yaw),
        })
    }

    fn describe(&self) -> String {
        format!("BNO055 on {}", self.bus)
    }
}

/// Convert quaternion [w, x, y, z] to Euler angles [roll, pitch, yaw] in radians
/// Using ZYX intrinsic rotation order (yaw-pitch-roll)
pub fn quat_to_euler(quat: [f64; 4]) -> [f64; 3] {
    let [w, x, y, z] = quat;

    // Roll (rotation around X axis)
    let sinr_cosp = 2.0 * (w * x + y * z);
    let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
    let roll = sinr_cosp.atan2(cosr_cosp);

    // Pitch (rotation around Y axis)
    let sinp = 2.0 * (w * y - z * x);
    let pitch = if sinp.abs() >= 1.0 {
        std::f64::consts::FRAC_PI_2.copysign(sinp) // use 90 degrees if out of range
    } else {
        sinp.asin()
    };

    // Yaw (rotation around Z axis)
    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    let yaw = siny_cosp.atan2(cosy_cosp);

    [roll, pitch, yaw]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_1_SQRT_2};

    #[test]
    fn test_identity_quaternion_has_zero_angles() {
        let euler = quat_to_euler([1.0, 0.0, 0.0, 0.0]);
        assert!(euler[0].abs() < 1e-9);
        assert!(euler[1].abs() < 1e-9);
        assert!(euler[2].abs() < 1e-9);
    }

    #[test]
    fn test_quarter_turn_about_z_yields_yaw() {
        // 90° rotation around Z: q = [cos(45°), 0, 0, sin(45°)]
        let euler = quat_to_euler([FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2]);
        assert!(euler[0].abs() < 1e-9);
        assert!(euler[1].abs() < 1e-9);
        assert!((euler[2] - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_negative_quarter_turn_about_z() {
        let euler = quat_to_euler([FRAC_1_SQRT_2, 0.0, 0.0, -FRAC_1_SQRT_2]);
        assert!((euler[2] + FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_gimbal_pitch_clamps_to_quarter_turn() {
        // 90° pitch puts sin(pitch) at the asin domain edge
        let euler = quat_to_euler([FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2, 0.0]);
        assert!((euler[1] - FRAC_PI_2).abs() < 1e-6);
    }
}
