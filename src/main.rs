use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use motionview::camera::CameraService;
use motionview::display::Presenter;
use motionview::motion::{Bno055Source, MotionSource};
use motionview::record::{default_store_path, SessionRecord, SessionStore};
use motionview::sampler::Sampler;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Motionview: live motion readings and depth-camera status in the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// I2C bus the motion sensor is attached to
    #[arg(short, long, default_value = "/dev/i2c-1")]
    bus: String,

    /// BNO055 I2C address (0x28 or 0x29)
    #[arg(short, long, default_value = "0x29", value_parser = parse_address)]
    address: u8,

    /// Sampling frequency in Hz
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..=200))]
    freq: u32,

    /// Drop the magnetic-north orientation reference (no heading is shown)
    #[arg(long)]
    no_heading: bool,

    /// Skip the depth-camera probe
    #[arg(long)]
    no_camera: bool,

    /// Session record file (defaults to ~/.config/motionview/sessions.jsonl)
    #[arg(long)]
    session_file: Option<PathBuf>,

    /// Stop after this many seconds (runs until Ctrl+C when omitted)
    #[arg(short, long)]
    duration: Option<u64>,
}

/// Parse an I2C address given as decimal or 0x-prefixed hex
fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse::<u8>()
    };
    parsed.map_err(|_| format!("invalid I2C address: {}", s))
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Main application: sampler + presenter + camera status + session store
struct App {
    sampler: Sampler,
    presenter: Presenter,
    camera: CameraService,
    store: SessionStore,
}

impl App {
    fn new(args: &Args, camera: CameraService) -> Result<Self> {
        // The session store is the one thing that must exist; any other
        // missing piece degrades to a status line instead
        let store_path = args
            .session_file
            .clone()
            .unwrap_or_else(default_store_path);
        let mut store = SessionStore::create(&store_path)
            .context("Failed to initialize session store")?;
        println!("✓ Session store ready at {}", store_path.display());

        if let Err(e) = store.record(&SessionRecord { timestamp: epoch_seconds() }) {
            log::warn!("Failed to record session start: {:#}", e);
        }

        let source: Option<Box<dyn MotionSource>> = match Bno055Source::new(&args.bus, args.address)
        {
            Ok(source) => {
                println!("✓ Motion source initialized ({})", source.describe());
                Some(Box::new(source))
            }
            Err(e) => {
                eprintln!("! Motion hardware unavailable: {:#}", e);
                eprintln!("  Readings will stay at their defaults.");
                None
            }
        };

        let period = Duration::from_secs_f64(1.0 / args.freq as f64);
        let sampler = Sampler::new(source, period, !args.no_heading);

        if args.no_heading {
            println!("✓ Heading disabled (no orientation reference requested)");
        }

        Ok(Self {
            sampler,
            presenter: Presenter::new(),
            camera,
            store,
        })
    }

    /// Run the sampling and display loop until shutdown
    async fn run(&mut self, shutdown_flag: Arc<AtomicBool>, duration: Option<Duration>) {
        println!(
            "Sampling at {:.1} Hz, display refresh at 1 Hz (Ctrl+C to stop)\n",
            1.0 / self.sampler.period().as_secs_f64()
        );

        self.sampler.start();
        self.presenter.start();

        let started = Instant::now();

        // Burst mode catches up on missed sample ticks rather than skipping them
        let mut sample_interval = tokio::time::interval(self.sampler.period());
        sample_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
        let mut display_interval = tokio::time::interval(Duration::from_secs(1));

        while !shutdown_flag.load(Ordering::SeqCst) {
            if let Some(limit) = duration {
                if started.elapsed() >= limit {
                    break;
                }
            }

            tokio::select! {
                _ = sample_interval.tick() => {
                    self.sampler.poll();
                }
                _ = display_interval.tick() => {
                    let sample = self.sampler.latest();
                    if let Some(block) = self.presenter.tick(Local::now(), &sample, self.camera.status()) {
                        println!("{}\n", block);
                    }
                }
            }
        }

        // Release the subscriptions; nothing samples or renders past this point
        self.presenter.stop();
        self.sampler.stop();
    }

    fn shutdown(&mut self) {
        println!("Shutting down...");
        println!(
            "✓ {} display refreshes, session recorded at {}",
            self.presenter.ticks(),
            self.store.path().display()
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Motionview ===\n");

    let args = Args::parse();

    // Camera setup happens on a background task so the main context never
    // blocks on device probing
    let camera = if args.no_camera {
        CameraService::disabled("camera probe disabled")
    } else {
        CameraService::setup().await
    };
    println!("✓ Camera: {}", camera.status());

    let mut app = App::new(&args, camera)?;

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, shutting down...");
        shutdown_flag_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    app.run(shutdown_flag, args.duration.map(Duration::from_secs))
        .await;

    app.shutdown();

    Ok(())
}
