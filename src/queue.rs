/// Files matérielles du GPU VideoCore suivies par le pilote v3d
///
/// L'ensemble est fermé: chaque file possède un compteur de temps cumulé
/// indépendant dans le dump debugfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineQueue {
    /// Binning (géométrie)
    Bin,
    /// Rendu
    Render,
    /// Texture formatting unit
    Tfu,
    /// Compute shader dispatch
    Csd,
    /// Cache
    Cache,
}

/// Table statique (préfixe de ligne, file), consultée une fois par ligne du dump
pub const QUEUE_PREFIXES: &[(&str, EngineQueue)] = &[
    ("v3d_bin", EngineQueue::Bin),
    ("v3d_ren", EngineQueue::Render),
    ("v3d_tfu", EngineQueue::Tfu),
    ("v3d_csd", EngineQueue::Csd),
    ("v3d_cac", EngineQueue::Cache),
];

impl EngineQueue {
    pub const ALL: [EngineQueue; 5] = [
        EngineQueue::Bin,
        EngineQueue::Render,
        EngineQueue::Tfu,
        EngineQueue::Csd,
        EngineQueue::Cache,
    ];

    /// Retrouve la file correspondant au début d'une ligne du dump
    ///
    /// Les préfixes inconnus retournent `None` (files futures ignorées).
    pub fn from_line_prefix(line: &str) -> Option<Self> {
        QUEUE_PREFIXES
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix))
            .map(|(_, queue)| *queue)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EngineQueue::Bin => "bin",
            EngineQueue::Render => "render",
            EngineQueue::Tfu => "tfu",
            EngineQueue::Csd => "csd",
            EngineQueue::Cache => "cache",
        }
    }
}
