use anyhow::Result;
use std::thread;
use std::time::Duration;

use motionview::motion::{quat_to_euler, Bno055Source, MotionSource};
use motionview::sampler::heading_from_yaw;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║          BNO055 Motion Debug Tool                             ║");
    println!("╚════════════════════════════════════════════════════════════════╝");
    println!();
    println!("This tool helps verify motion data units and heading derivation.");
    println!();
    println!("Expected while the sensor sits still on a desk:");
    println!("  Accel ~[0, 0, 0] g (gravity is removed by the fusion engine)");
    println!("  Gyro ~[0, 0, 0] rad/s");
    println!("  Mag magnitude in the 25-65 µT range (Earth field)");
    println!("  Heading steady, in [0°, 360°)");
    println!();

    println!("Initializing BNO055 on /dev/i2c-1 at address 0x29...");
    let mut source = Bno055Source::new_default()?;
    println!("✓ BNO055 initialized successfully");
    println!();

    println!("Waiting for calibration...");
    println!("Calibration status: System | Gyro | Accel | Mag (0-3, 3=fully calibrated)");
    println!();

    // Wait for reasonable calibration; the heading is meaningless without
    // at least a partially calibrated magnetometer
    for _ in 0..20 {
        let (sys, gyro, accel, mag) = source.calibration_status()?;
        println!("Calibration: {:2} | {:2} | {:2} | {:2}", sys, gyro, accel, mag);

        if sys >= 2 && mag >= 2 {
            println!("✓ Calibration sufficient for testing");
            println!();
            break;
        }

        thread::sleep(Duration::from_millis(500));
    }

    println!("Reading motion data at 10 Hz (Ctrl+C to stop):");
    println!();

    loop {
        let reading = source.sample()?;
        let quat = source.orientation()?;
        let euler = quat_to_euler(quat);

        println!("┌─────────────────────────────────────────────────────────────┐");
        println!("│ Accel (g):    X={:7.3}  Y={:7.3}  Z={:7.3}              │",
                 reading.acceleration[0], reading.acceleration[1], reading.acceleration[2]);
        println!("│ Gyro (rad/s): X={:7.3}  Y={:7.3}  Z={:7.3}              │",
                 reading.rotation_rate[0], reading.rotation_rate[1], reading.rotation_rate[2]);
        println!("│ Mag (µT):     X={:8.3} Y={:8.3} Z={:8.3}              │",
                 reading.magnetic_field[0], reading.magnetic_field[1], reading.magnetic_field[2]);
        println!("│ Euler (rad):  Roll={:7.3} Pitch={:7.3} Yaw={:7.3}       │",
                 euler[0], euler[1], euler[2]);

        if let Some(yaw) = reading.yaw {
            println!("│ Heading:      {:5.1}° (yaw {:6.3} rad = {:7.2}°)            │",
                     heading_from_yaw(yaw), yaw, yaw.to_degrees());
        }

        println!("└─────────────────────────────────────────────────────────────┘");

        // Real-time hints based on data
        let mag_norm = (reading.magnetic_field[0].powi(2)
            + reading.magnetic_field[1].powi(2)
            + reading.magnetic_field[2].powi(2))
        .sqrt();
        if !(25.0..=65.0).contains(&mag_norm) {
            println!("⚠ Warning: Mag magnitude is {:.1} µT, expected 25-65 µT", mag_norm);
            println!("  Check for nearby magnets or recalibrate the magnetometer");
        }

        let gyro_norm = (reading.rotation_rate[0].powi(2)
            + reading.rotation_rate[1].powi(2)
            + reading.rotation_rate[2].powi(2))
        .sqrt();
        if gyro_norm > 0.1 {
            println!("→ Motion detected! Gyro: [{:.2}, {:.2}, {:.2}] rad/s",
                     reading.rotation_rate[0], reading.rotation_rate[1], reading.rotation_rate[2]);
        }

        thread::sleep(Duration::from_millis(100)); // 10 Hz
    }
}
