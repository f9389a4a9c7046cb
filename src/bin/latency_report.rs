use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use hdrhistogram::Histogram;
use tick_lob::{AddOrder, BookConfig, Command, Engine, Side};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "latency-report")]
#[command(about = "Measure add + match latency of the tick order book")]
struct Cli {
    /// Number of add/match rounds to time
    #[arg(long, short = 'n', default_value_t = 1_000_000)]
    iterations: u64,

    /// Tick levels per side
    #[arg(long)]
    tick_levels: Option<u32>,

    /// Orders a single level holds before dropping the oldest
    #[arg(long)]
    level_capacity: Option<usize>,

    /// JSON file with a book config; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pin the benchmark thread to the last core
    #[arg(long)]
    pin: bool,
}

impl Cli {
    fn book_config(&self) -> Result<BookConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => BookConfig::default(),
        };
        if let Some(tick_levels) = self.tick_levels {
            config.tick_levels = tick_levels;
        }
        if let Some(level_capacity) = self.level_capacity {
            config.level_capacity = level_capacity;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.book_config()?;
    info!(?config, iterations = cli.iterations, "preparing latency benchmark");

    let mut engine = Engine::with_config(config)?;
    if cli.pin {
        engine.pin_to_core();
    }
    engine.warm_up();

    let mut histogram = Histogram::<u64>::new_with_bounds(1, 1_000_000, 3)?;
    let mut total_duration = Duration::ZERO;
    let mid = config.tick_levels / 2;
    let band = (config.tick_levels / 10).max(1);

    for i in 0..cli.iterations {
        // Bids and asks overlap around the mid so roughly half the rounds trade
        let offset = (i % u64::from(band)) as u32;
        let (side, price) = if i % 2 == 0 {
            (Side::Bid, (mid + offset / 2).min(config.tick_levels - 1))
        } else {
            (Side::Ask, mid.saturating_sub(offset / 2))
        };
        let add = Command::Add(AddOrder::limit(side, price, 10 + i % 7));

        let start = Instant::now();
        std::hint::black_box(engine.process_command(add)?);
        std::hint::black_box(engine.process_command(Command::Match)?);
        let elapsed = start.elapsed();

        // Saturate outliers instead of failing the run
        histogram.saturating_record(elapsed.as_nanos() as u64);
        total_duration += elapsed;
    }

    println!("\n=== Latency Report (ns) ===");
    println!("Total Ops:  {}", cli.iterations);
    println!(
        "Throughput: {:.2} ops/sec",
        cli.iterations as f64 / total_duration.as_secs_f64()
    );
    println!("Resting:    {} orders", engine.order_count());
    println!("---------------------------");
    println!("Min:    {:6} ns", histogram.min());
    println!("P50:    {:6} ns", histogram.value_at_quantile(0.50));
    println!("P90:    {:6} ns", histogram.value_at_quantile(0.90));
    println!("P99:    {:6} ns", histogram.value_at_quantile(0.99));
    println!("P99.9:  {:6} ns", histogram.value_at_quantile(0.999));
    println!("P99.99: {:6} ns", histogram.value_at_quantile(0.9999));
    println!("Max:    {:6} ns", histogram.max());
    println!("---------------------------");

    println!("\nDistribution:");
    for v in histogram.iter_log(100, 2.0) {
        let count = v.count_since_last_iteration();
        if count > 0 {
            println!("<= {:8} ns: {:10} count", v.value_iterated_to(), count);
        }
    }

    Ok(())
}
