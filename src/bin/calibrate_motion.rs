use anyhow::Result;
use std::thread;
use std::time::Duration;

use motionview::motion::Bno055Source;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          BNO055 Motion Calibration Tool                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("This tool will guide you through calibrating the motion sensor.");
    println!("A calibrated magnetometer is what makes the heading trustworthy.");
    println!();

    println!("Initializing BNO055 on /dev/i2c-1 at address 0x29...");
    let mut source = Bno055Source::new_default()?;
    println!("✓ BNO055 initialized");
    println!();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  CALIBRATION INSTRUCTIONS                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("The BNO055 requires calibration of 4 sensors:");
    println!();
    println!("1. MAGNETOMETER (Mag) - MOST IMPORTANT for the heading!");
    println!("   • Move the device in figure-8 patterns");
    println!("   • Rotate it around all axes");
    println!();
    println!("2. ACCELEROMETER (Accel)");
    println!("   • Place the device in 6 different orientations");
    println!("   • Hold each position steady for a few seconds");
    println!();
    println!("3. GYROSCOPE (Gyro)");
    println!("   • Leave the device still on a flat surface");
    println!();
    println!("4. SYSTEM (Sys)");
    println!("   • Reaches 3 once the others are calibrated");
    println!();
    println!("Watching calibration status (Ctrl+C to abort):");
    println!("Levels: System | Gyro | Accel | Mag (0-3, 3=fully calibrated)");
    println!();

    loop {
        let (sys, gyro, accel, mag) = source.calibration_status()?;
        println!("Calibration: {:2} | {:2} | {:2} | {:2}", sys, gyro, accel, mag);

        if sys == 3 && gyro == 3 && accel == 3 && mag == 3 {
            println!();
            println!("✓ Calibration complete!");
            break;
        }

        thread::sleep(Duration::from_millis(500));
    }

    source.save_calibration()?;
    println!("✓ Calibration profile saved");
    println!("  It will be loaded automatically on the next start.");

    Ok(())
}
