use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use serde::Serialize;

/// Write a deterministic sample daily_metrics.csv / fear_greed_index.csv pair
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory the two CSV files are written to
    #[arg(default_value = ".")]
    out_dir: PathBuf,

    /// Number of calendar days starting 2024-01-01
    #[arg(long, default_value_t = 120)]
    days: i64,

    /// Number of trader accounts
    #[arg(long, default_value_t = 32)]
    traders: usize,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Serialize)]
struct FearGreedRow {
    timestamp: i64,
    value: u32,
    classification: &'static str,
    date: NaiveDate,
}

#[derive(Serialize)]
struct DailyMetricRow {
    account: String,
    date: NaiveDate,
    num_trades: u32,
    avg_position: f64,
    win_rate: f64,
    total_pnl: f64,
    classification: Option<&'static str>,
}

/// Index bands as published with the fear & greed index.
fn classify(value: u32) -> &'static str {
    match value {
        0..=24 => "Extreme Fear",
        25..=45 => "Fear",
        46..=54 => "Neutral",
        55..=75 => "Greed",
        _ => "Extreme Greed",
    }
}

/// Per-trader habits, fixed for the whole run.
struct Trader {
    account: String,
    activity: f64,
    trades_per_day: f64,
    position_scale: f64,
    skill: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let out_dir = &args.out_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let mut rng = SimpleRng::new(args.seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("start date")?;

    // Sentiment index: a bounded random walk.
    let mut index = Vec::with_capacity(args.days.max(0) as usize);
    let mut level = 50.0_f64;
    for day in 0..args.days {
        level = (level + rng.gauss(0.0, 8.0)).clamp(5.0, 95.0);
        let date = start + Duration::days(day);
        let value = level.round() as u32;
        let timestamp = date
            .and_hms_opt(5, 30, 0)
            .context("timestamp")?
            .and_utc()
            .timestamp();
        index.push(FearGreedRow {
            timestamp,
            value,
            classification: classify(value),
            date,
        });
    }

    let traders: Vec<Trader> = (0..args.traders)
        .map(|i| Trader {
            account: format!("0x{:040x}", rng.next_u64() as u128 * (i as u128 + 1)),
            activity: 0.3 + 0.6 * rng.next_f64(),
            trades_per_day: 2.0 + 30.0 * rng.next_f64(),
            position_scale: 500.0 * (1.0 + 9.0 * rng.next_f64()),
            skill: rng.gauss(0.5, 0.08),
        })
        .collect();

    let mut rows = Vec::new();
    for fg in &index {
        // greed lifts everyone a little, fear drags
        let mood = (f64::from(fg.value) - 50.0) / 100.0;
        for trader in &traders {
            if rng.next_f64() > trader.activity {
                continue;
            }
            let num_trades = rng.gauss(trader.trades_per_day, 3.0).round().max(1.0) as u32;
            let avg_position = (trader.position_scale * rng.gauss(1.0, 0.2)).max(10.0);
            let p_win = (trader.skill + 0.1 * mood).clamp(0.05, 0.95);
            let wins = (0..num_trades).filter(|_| rng.next_f64() < p_win).count() as f64;
            let win_rate = wins / f64::from(num_trades);
            let edge = win_rate - 0.5 + rng.gauss(0.0, 0.05);
            let total_pnl = (edge * avg_position * f64::from(num_trades) * 0.1 * 100.0).round() / 100.0;
            // a few rows miss the sentiment join
            let classification = (rng.next_f64() > 0.02).then_some(fg.classification);

            rows.push(DailyMetricRow {
                account: trader.account.clone(),
                date: fg.date,
                num_trades,
                avg_position: (avg_position * 100.0).round() / 100.0,
                win_rate,
                total_pnl,
                classification,
            });
        }
    }

    let index_path = out_dir.join("fear_greed_index.csv");
    let mut writer = csv::Writer::from_path(&index_path)
        .with_context(|| format!("creating {}", index_path.display()))?;
    for row in &index {
        writer.serialize(row).context("writing sentiment row")?;
    }
    writer.flush()?;

    let metrics_path = out_dir.join("daily_metrics.csv");
    let mut writer = csv::Writer::from_path(&metrics_path)
        .with_context(|| format!("creating {}", metrics_path.display()))?;
    for row in &rows {
        writer.serialize(row).context("writing metrics row")?;
    }
    writer.flush()?;

    println!(
        "Wrote {} sentiment days to {} and {} trader-days for {} accounts to {}",
        index.len(),
        index_path.display(),
        rows.len(),
        args.traders,
        metrics_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_bands() {
        assert_eq!(classify(0), "Extreme Fear");
        assert_eq!(classify(45), "Fear");
        assert_eq!(classify(50), "Neutral");
        assert_eq!(classify(75), "Greed");
        assert_eq!(classify(76), "Extreme Greed");
    }

    #[test]
    fn args_default_to_working_directory() {
        let args = Args::try_parse_from(["generate_sample"]).unwrap();
        assert_eq!(args.out_dir, PathBuf::from("."));
        assert_eq!((args.days, args.traders, args.seed), (120, 32, 42));

        assert!(Args::try_parse_from(["generate_sample", "--bogus"]).is_err());
    }

    #[test]
    fn rng_is_deterministic() {
        let mut a = SimpleRng::new(7);
        let mut b = SimpleRng::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
        let x = a.next_f64();
        assert!((0.0..1.0).contains(&x));
    }
}
