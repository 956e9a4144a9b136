use std::env;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use v3d_load_monitor::dump::parse_dump;
use v3d_load_monitor::sampler::{CANDIDATE_PATHS, UsageSampler};

fn print_usage() {
    println!("GPU Usage Probe - Mesure ponctuelle de la charge GPU (v3d)");
    println!();
    println!("Usage:");
    println!("  gpu_usage_probe [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --source <path>     Chemin du fichier gpu_usage (répétable)");
    println!("  --delay <ms>        Délai entre les deux lectures (défaut: 1500)");
    println!("  --help              Afficher cette aide");
    println!();
    println!("Exemples:");
    println!("  sudo gpu_usage_probe");
    println!("  sudo gpu_usage_probe --delay 500");
    println!();
    println!("La charge est le maximum sur les files bin/render/tfu/csd/cache de");
    println!("la fraction de temps active entre les deux lectures du dump.");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut sources: Vec<PathBuf> = Vec::new();
    let mut delay_ms = 1500u64;

    // Parser les arguments
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "--source" => {
                if i + 1 < args.len() {
                    sources.push(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("❌ Erreur: --source requiert un argument");
                    process::exit(1);
                }
            }
            "--delay" => {
                if i + 1 < args.len() {
                    match args[i + 1].parse() {
                        Ok(val) => delay_ms = val,
                        Err(_) => {
                            eprintln!("❌ Erreur: délai invalide");
                            process::exit(1);
                        }
                    }
                    i += 1;
                } else {
                    eprintln!("❌ Erreur: --delay requiert un argument");
                    process::exit(1);
                }
            }
            _ => {
                eprintln!("❌ Argument inconnu: {}", args[i]);
                eprintln!();
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if sources.is_empty() {
        sources = CANDIDATE_PATHS.iter().map(PathBuf::from).collect();
    }

    let text = sources
        .iter()
        .find_map(|p| std::fs::read_to_string(p).ok());
    if text.is_none() {
        eprintln!("❌ Aucune source gpu_usage lisible (debugfs monté? droits root?)");
        process::exit(1);
    }

    let mut sampler = UsageSampler::with_sources(sources.clone());

    // Première lecture: initialise les compteurs retenus
    sampler.sample();
    thread::sleep(Duration::from_millis(delay_ms));
    let load = sampler.sample();

    // Relire le dump pour afficher les compteurs bruts
    if let Some(text) = sources.iter().find_map(|p| std::fs::read_to_string(p).ok()) {
        let dump = parse_dump(&text);
        println!("Compteurs bruts:");
        if let Some(ts) = dump.timestamp {
            println!("  timestamp: {}", ts);
        }
        for (queue, counters) in &dump.counters {
            println!(
                "  {:6} jobs={} runtime={} active={}",
                queue.label(),
                counters.jobs,
                counters.runtime,
                counters.active
            );
        }
        println!();
    }

    println!("📊 Charge GPU: {:.1}%", load * 100.0);
}
