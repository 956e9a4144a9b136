use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use toml::Table;

use v3d_load_monitor::{
    constants::{HISTORY_WINDOW_SIZE, LOG_INTERVAL_SECS, UPDATE_INTERVAL_MS},
    history::LoadHistory,
    sampler::UsageSampler,
    sensor::{SensorOutput, format_label},
};

/// Status line emitted in JSON mode, one object per sample (bar-style
/// consumers read these from stdout)
#[derive(serde::Serialize)]
struct StatusLine {
    percentage: u8,
    text: String,
    tooltip: String,
}

/// Structure to manage logging rate limiting (max 1 log per interval)
struct LogThrottle {
    last_log: Instant,
    min_interval: Duration,
}

impl LogThrottle {
    fn new(min_interval_secs: u64) -> Self {
        Self {
            last_log: Instant::now() - Duration::from_secs(min_interval_secs),
            min_interval: Duration::from_secs(min_interval_secs),
        }
    }

    fn should_log(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_log) >= self.min_interval {
            self.last_log = now;
            true
        } else {
            false
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config file: argv[1], else the user config directory, else defaults
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|d| d.join("v3d-load-monitor/config.toml")))
        .filter(|p| p.exists());
    let config = config_path
        .map(std::fs::read_to_string)
        .unwrap_or(Ok("".to_string()))?
        .parse::<Table>()?;

    let timing = config.get("timing").and_then(|t| t.as_table());
    // ms
    let update_interval: u64 = timing
        .and_then(|t| t.get("interval"))
        .ok_or("is missing")
        .and_then(|v| v.as_integer().ok_or("must be an integer"))
        .and_then(|v| v.is_positive().then_some(v).ok_or("must be positive"))
        .and_then(|v| {
            u64::try_from(v).map_err(|_| &*format!("cannot be greater than {}", u64::MAX).leak())
        })
        .unwrap_or_else(|s| {
            println!("timing.interval {s}, replaced with the default value of 1500 ms");
            UPDATE_INTERVAL_MS
        });
    // samples - window size for the load moving average
    let window_samples: usize = timing
        .and_then(|t| t.get("window-samples"))
        .ok_or("is missing")
        .and_then(|v| v.as_integer().ok_or("must be an integer"))
        .and_then(|v| v.is_positive().then_some(v).ok_or("must be positive"))
        .and_then(|v| {
            usize::try_from(v)
                .map_err(|_| &*format!("cannot be greater than {}", usize::MAX).leak())
        })
        .unwrap_or_else(|s| {
            println!("timing.window-samples {s}, replaced with the default of 100 samples");
            HISTORY_WINDOW_SIZE
        });
    // seconds
    let log_interval: u64 = timing
        .and_then(|t| t.get("log-interval"))
        .ok_or("is missing")
        .and_then(|v| v.as_integer().ok_or("must be an integer"))
        .and_then(|v| {
            (!v.is_negative())
                .then_some(v)
                .ok_or("must not be negative")
        })
        .and_then(|v| {
            u64::try_from(v).map_err(|_| &*format!("cannot be greater than {}", u64::MAX).leak())
        })
        .unwrap_or_else(|s| {
            println!("timing.log-interval {s}, replaced with the default of 60 seconds");
            LOG_INTERVAL_SECS
        });

    let output = config.get("output").and_then(|t| t.as_table());
    let show_percentage = output
        .and_then(|t| t.get("show-percentage"))
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let json_mode = output
        .and_then(|t| t.get("json"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let hwmon = output
        .and_then(|t| t.get("hwmon"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let sensor = output
        .and_then(|t| t.get("sensor-path"))
        .and_then(|v| v.as_str())
        .map(SensorOutput::new);

    // Candidate gpu_usage paths can be overridden, e.g. for a non-default
    // debugfs mount point
    let sources: Option<Vec<PathBuf>> = config.get("sources").and_then(|v| v.as_array()).map(|a| {
        a.iter()
            .filter_map(|v| v.as_str())
            .map(PathBuf::from)
            .collect()
    });

    let mut sampler = match sources {
        Some(paths) => UsageSampler::with_sources(paths),
        None => UsageSampler::new(),
    };
    let mut history = LoadHistory::new(window_samples);
    let mut log_throttle = LogThrottle::new(log_interval);

    // Gérer Ctrl+C proprement
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    if !json_mode {
        println!("🚀 Démarrage du moniteur de charge GPU (v3d)");
        println!("⏱️  Intervalle: {} ms", update_interval);
        println!();
    }

    while running.load(Ordering::SeqCst) {
        let load = sampler.sample();
        history.push(load);

        if json_mode {
            let status = StatusLine {
                percentage: (load * 100.0).round().clamp(0.0, 255.0) as u8,
                text: if show_percentage {
                    format_label(load)
                } else {
                    String::new()
                },
                tooltip: format!("Charge GPU moyenne: {:.1}%", history.average() * 100.0),
            };
            println!("{}", serde_json::to_string(&status)?);
        } else if log_throttle.should_log() {
            println!(
                "📊 Charge GPU: {:.1}% (moyenne sur fenêtre: {:.1}%)",
                load * 100.0,
                history.average() * 100.0
            );
        }

        if let Some(sensor) = &sensor {
            if let Err(e) = sensor.write_value(load) {
                eprintln!("⚠️  Erreur écriture sensor: {}", e);
            }
            if hwmon {
                if let Err(e) = sensor.write_hwmon_format(load) {
                    eprintln!("⚠️  Erreur écriture hwmon: {}", e);
                }
            }
        }

        thread::sleep(Duration::from_millis(update_interval));
    }

    if !json_mode {
        println!("\n🛑 Arrêt du moniteur");
    }
    Ok(())
}
