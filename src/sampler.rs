use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::dump::{UsageDump, parse_dump};
use crate::queue::EngineQueue;

/// Chemins candidats du pseudo-fichier gpu_usage exposé par le pilote v3d
pub const CANDIDATE_PATHS: &[&str] = &[
    "/sys/kernel/debug/dri/0/gpu_usage",
    "/sys/kernel/debug/dri/1/gpu_usage",
];

/// Échantillonneur de charge GPU basé sur les compteurs cumulés du pilote
///
/// Chaque appel à [`sample`](UsageSampler::sample) relit le dump, calcule la
/// fraction de temps passée active par chaque file depuis l'appel précédent,
/// et retourne le maximum. Les compteurs étant cumulés, seul l'état du tick
/// précédent est retenu (timestamp + dernier runtime par file).
pub struct UsageSampler {
    sources: Vec<PathBuf>,
    last_timestamp: Option<u64>,
    // clé absente = aucune observation antérieure pour cette file
    last_runtime: HashMap<EngineQueue, u64>,
}

impl UsageSampler {
    pub fn new() -> Self {
        Self::with_sources(CANDIDATE_PATHS.iter().map(PathBuf::from).collect())
    }

    /// Variante avec une liste de sources explicite (config ou tests)
    pub fn with_sources(sources: Vec<PathBuf>) -> Self {
        Self {
            sources,
            last_timestamp: None,
            last_runtime: HashMap::new(),
        }
    }

    /// Prend un échantillon: retourne la charge de la file la plus occupée
    /// depuis l'appel précédent, nominalement dans [0,1]
    ///
    /// Retourne 0.0 si aucune source n'est lisible (interface absente sur
    /// certains systèmes, condition attendue et non fatale), au tout premier
    /// appel pour une file donnée, ou si le temps écoulé est nul.
    pub fn sample(&mut self) -> f32 {
        let Some(text) = self.read_source() else {
            return 0.0;
        };
        self.apply(&parse_dump(&text))
    }

    /// Première source candidate qui s'ouvre; la lecture complète puis la
    /// fermeture sont gérées par `read_to_string`, aucun handle ne survit
    fn read_source(&self) -> Option<String> {
        self.sources
            .iter()
            .find_map(|path| fs::read_to_string(path).ok())
    }

    /// Étape arithmétique pure: déltas contre l'état retenu, réduction au max
    ///
    /// Le temps écoulé est résolu une seule fois, après lecture complète du
    /// dump, quelle que soit la position de la ligne timestamp. Le runtime
    /// retenu est mis à jour inconditionnellement, sinon le prochain delta
    /// serait faux.
    fn apply(&mut self, dump: &UsageDump) -> f32 {
        let elapsed = match (dump.timestamp, self.last_timestamp) {
            (Some(now), Some(prev)) => now.wrapping_sub(prev),
            _ => 0,
        };
        if dump.timestamp.is_some() {
            self.last_timestamp = dump.timestamp;
        }

        let mut max_load = 0.0f32;
        for (queue, counters) in &dump.counters {
            let load = match self.last_runtime.get(queue) {
                Some(&prev) if elapsed > 0 => {
                    // en f64 pour garder le signe si un compteur recule
                    // (reset du pilote en cours de session); pas de clamp
                    ((counters.runtime as f64 - prev as f64) / elapsed as f64) as f32
                }
                _ => 0.0,
            };
            self.last_runtime.insert(*queue, counters.runtime);
            max_load = max_load.max(load);
        }

        max_load
    }
}

impl Default for UsageSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_first_sample_is_zero() {
        let mut sampler = UsageSampler::with_sources(Vec::new());
        let dump = parse_dump("timestamp;1000;\nv3d_ren;0;5000;0;\n");
        assert_eq!(sampler.apply(&dump), 0.0);
        assert_eq!(sampler.last_timestamp, Some(1000));
        assert_eq!(
            sampler.last_runtime.get(&EngineQueue::Render),
            Some(&5000)
        );
    }

    #[test]
    fn test_delta_over_elapsed() {
        let mut sampler = UsageSampler::with_sources(Vec::new());
        sampler.apply(&parse_dump("timestamp;1000;\nv3d_ren;0;5000;0;\n"));
        let load = sampler.apply(&parse_dump("timestamp;2000;\nv3d_ren;0;5500;0;\n"));
        assert_eq!(load, 0.5);
    }

    #[test]
    fn test_max_over_queues() {
        let mut sampler = UsageSampler::with_sources(Vec::new());
        sampler.apply(&parse_dump(
            "timestamp;1000;\nv3d_ren;0;1000;0;\nv3d_bin;0;1000;0;\n",
        ));
        // render +200/1000 = 0.2, bin +350/1000 = 0.35
        let load = sampler.apply(&parse_dump(
            "timestamp;2000;\nv3d_ren;0;1200;0;\nv3d_bin;0;1350;0;\n",
        ));
        assert_eq!(load, 0.35);
    }

    #[test]
    fn test_zero_elapsed_updates_state() {
        let mut sampler = UsageSampler::with_sources(Vec::new());
        sampler.apply(&parse_dump("timestamp;1000;\nv3d_ren;0;5000;0;\n"));
        // même timestamp: pas de division, mais le compteur doit avancer
        let load = sampler.apply(&parse_dump("timestamp;1000;\nv3d_ren;0;5400;0;\n"));
        assert_eq!(load, 0.0);
        assert_eq!(
            sampler.last_runtime.get(&EngineQueue::Render),
            Some(&5400)
        );
        // le tick suivant calcule son delta contre 5400, pas 5000
        let load = sampler.apply(&parse_dump("timestamp;2000;\nv3d_ren;0;5500;0;\n"));
        assert_eq!(load, 0.1);
    }

    #[test]
    fn test_same_dump_twice_is_zero() {
        let mut sampler = UsageSampler::with_sources(Vec::new());
        sampler.apply(&parse_dump("timestamp;1000;\nv3d_ren;0;5000;0;\n"));
        sampler.apply(&parse_dump("timestamp;2000;\nv3d_ren;0;5500;0;\n"));
        let load = sampler.apply(&parse_dump("timestamp;2000;\nv3d_ren;0;5500;0;\n"));
        assert_eq!(load, 0.0);
    }

    #[test]
    fn test_unknown_prefixes_only() {
        let mut sampler = UsageSampler::with_sources(Vec::new());
        sampler.apply(&parse_dump("timestamp;1000;\nv3d_foo;0;5000;0;\n"));
        let load = sampler.apply(&parse_dump("timestamp;2000;\nv3d_foo;0;9000;0;\n"));
        assert_eq!(load, 0.0);
    }

    #[test]
    fn test_missing_timestamp_line() {
        let mut sampler = UsageSampler::with_sources(Vec::new());
        sampler.apply(&parse_dump("timestamp;1000;\nv3d_csd;0;100;0;\n"));
        // dump sans timestamp: elapsed nul, compteur quand même retenu
        let load = sampler.apply(&parse_dump("v3d_csd;0;300;0;\n"));
        assert_eq!(load, 0.0);
        assert_eq!(sampler.last_timestamp, Some(1000));
        let load = sampler.apply(&parse_dump("timestamp;2000;\nv3d_csd;0;400;0;\n"));
        assert_eq!(load, 0.3);
    }

    #[test]
    fn test_missing_sources_return_zero() {
        let mut sampler = UsageSampler::with_sources(vec![
            PathBuf::from("/nonexistent/dri/0/gpu_usage"),
            PathBuf::from("/nonexistent/dri/1/gpu_usage"),
        ]);
        assert_eq!(sampler.sample(), 0.0);
        assert_eq!(sampler.last_timestamp, None);
        assert!(sampler.last_runtime.is_empty());
    }

    #[test]
    fn test_sample_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpu_usage");

        let write_dump = |content: &str| {
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        };

        // premier candidat absent: le second doit être utilisé
        let mut sampler = UsageSampler::with_sources(vec![
            dir.path().join("missing"),
            path.clone(),
        ]);

        write_dump("timestamp;1000;\nv3d_ren;0;5000;0;\n");
        assert_eq!(sampler.sample(), 0.0);

        write_dump("timestamp;2000;\nv3d_ren;0;5500;0;\n");
        assert_eq!(sampler.sample(), 0.5);
    }
}
