use crate::queue::EngineQueue;

/// Compteurs d'une file tels que lus dans une ligne du dump
#[derive(Debug, Clone, Copy)]
pub struct QueueCounters {
    pub jobs: u64,
    /// Temps cumulé d'activité de la file (ticks noyau, jamais décroissant)
    pub runtime: u64,
    pub active: u64,
}

/// Instantané d'un dump gpu_usage: timestamp + compteurs par file
///
/// Le calcul des déltas se fait séparément, contre l'état retenu par le
/// sampler, une fois le dump entièrement lu. L'ordre des lignes dans le
/// fichier n'a donc pas d'importance.
#[derive(Debug, Default)]
pub struct UsageDump {
    pub timestamp: Option<u64>,
    pub counters: Vec<(EngineQueue, QueueCounters)>,
}

/// Parse le texte du pseudo-fichier gpu_usage
///
/// Deux formes de ligne sont reconnues, tout le reste est ignoré:
/// * `timestamp;<u64>;`
/// * `<file>...;<jobs>;<runtime>;<active>;`
///
/// Une ligne malformée est simplement sautée, jamais une erreur.
pub fn parse_dump(text: &str) -> UsageDump {
    let mut dump = UsageDump::default();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("timestamp;") {
            if let Some(value) = rest.split(';').next().and_then(|v| v.trim().parse().ok()) {
                dump.timestamp = Some(value);
            }
        } else if let Some(queue) = EngineQueue::from_line_prefix(line) {
            if let Some(counters) = parse_counter_fields(line) {
                dump.counters.push((queue, counters));
            }
        }
    }

    dump
}

/// Champs après le premier `;`: jobs, runtime cumulé, jobs actifs
fn parse_counter_fields(line: &str) -> Option<QueueCounters> {
    let rest = line.split_once(';')?.1;
    let mut fields = rest.split(';');
    let jobs = fields.next()?.trim().parse().ok()?;
    let runtime = fields.next()?.trim().parse().ok()?;
    let active = fields.next()?.trim().parse().ok()?;
    Some(QueueCounters {
        jobs,
        runtime,
        active,
    })
}
