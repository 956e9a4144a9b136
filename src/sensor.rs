use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Expose la charge GPU échantillonnée comme sonde système
///
/// Deux formats: un fichier simple contenant le pourcentage entier, et en
/// option un répertoire au format hwmon pour les outils qui le consomment.
pub struct SensorOutput {
    sensor_path: PathBuf,
}

impl SensorOutput {
    pub fn new(sensor_path: impl Into<PathBuf>) -> Self {
        Self {
            sensor_path: sensor_path.into(),
        }
    }

    /// Écrire la charge (fraction 0-1) dans le fichier sensor
    pub fn write_value(&self, load: f32) -> Result<(), String> {
        // Créer le répertoire parent si nécessaire
        if let Some(parent) = self.sensor_path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Erreur création répertoire: {}", e))?;
        }

        // Écrire de manière atomique via un fichier temporaire
        let mut temp_path = self.sensor_path.clone();
        temp_path.as_mut_os_string().push(".tmp");

        // Format: pourcentage entier pour éviter les problèmes de parsing
        // avec certains outils selon la locale
        let value_int = (load * 100.0).round() as i32;
        let content = format!("{}\n", value_int);

        let mut file = File::create(&temp_path)
            .map_err(|e| format!("Erreur création fichier temporaire: {}", e))?;
        file.write_all(content.as_bytes())
            .map_err(|e| format!("Erreur écriture: {}", e))?;
        file.flush().map_err(|e| format!("Erreur flush: {}", e))?;

        // Renommer atomiquement
        fs::rename(&temp_path, &self.sensor_path).map_err(|e| format!("Erreur rename: {}", e))?;

        Ok(())
    }

    /// Écrire également au format hwmon (optionnel)
    pub fn write_hwmon_format(&self, load: f32) -> Result<(), String> {
        // Format hwmon: valeurs entières en millièmes (100.000 = 100%)
        let hwmon_value = (load * 100.0 * 1000.0) as i32;

        let hwmon_dir = self
            .sensor_path
            .parent()
            .unwrap_or(Path::new("."))
            .join("hwmon");
        fs::create_dir_all(&hwmon_dir)
            .map_err(|e| format!("Erreur création répertoire hwmon: {}", e))?;

        fs::write(hwmon_dir.join("name"), b"gpu_load\n")
            .map_err(|e| format!("Erreur écriture name: {}", e))?;
        fs::write(hwmon_dir.join("load1_input"), format!("{}\n", hwmon_value))
            .map_err(|e| format!("Erreur écriture input: {}", e))?;
        fs::write(hwmon_dir.join("load1_label"), b"GPU Load\n")
            .map_err(|e| format!("Erreur écriture label: {}", e))?;

        Ok(())
    }
}

/// Libellé de pourcentage affiché à côté du graphe (ex: "G: 50")
pub fn format_label(load: f32) -> String {
    format!("G:{:3.0}", load * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_value_rounds_to_percent() {
        let dir = tempfile::tempdir().unwrap();
        let sensor = SensorOutput::new(dir.path().join("load"));
        sensor.write_value(0.456).unwrap();
        let content = fs::read_to_string(dir.path().join("load")).unwrap();
        assert_eq!(content, "46\n");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let sensor = SensorOutput::new(dir.path().join("nested/deeper/load"));
        sensor.write_value(1.0).unwrap();
        let content = fs::read_to_string(dir.path().join("nested/deeper/load")).unwrap();
        assert_eq!(content, "100\n");
    }

    #[test]
    fn test_hwmon_format() {
        let dir = tempfile::tempdir().unwrap();
        let sensor = SensorOutput::new(dir.path().join("load"));
        sensor.write_hwmon_format(0.5).unwrap();
        let input = fs::read_to_string(dir.path().join("hwmon/load1_input")).unwrap();
        assert_eq!(input, "50000\n");
        let name = fs::read_to_string(dir.path().join("hwmon/name")).unwrap();
        assert_eq!(name, "gpu_load\n");
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(0.5), "G: 50");
        assert_eq!(format_label(0.0), "G:  0");
        assert_eq!(format_label(1.0), "G:100");
    }
}
