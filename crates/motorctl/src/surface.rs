//! Parameter file watched for edits while a session runs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use motorlink_engine::{ControlSurface, Observed};
use tracing::{info, warn};

/// Modification stamp used to detect edits.
type Stamp = (SystemTime, u64);

/// Reads `name: value` pairs from a YAML or JSON file and re-reads them
/// whenever the file changes. Values from the file override `base`.
///
/// A file that is missing or fails to parse keeps the last good values.
/// Names that are not in `base` are reported once each.
pub struct ParameterFileSurface {
    path: PathBuf,
    base: Observed,
    file_values: Observed,
    stamp: Option<Stamp>,
    missing_warned: bool,
    unknown_warned: BTreeSet<String>,
}

impl ParameterFileSurface {
    pub fn new(path: impl Into<PathBuf>, base: Observed) -> Self {
        Self {
            path: path.into(),
            base,
            file_values: Observed::new(),
            stamp: None,
            missing_warned: false,
            unknown_warned: BTreeSet::new(),
        }
    }

    fn warn_unknown(&mut self, values: &Observed) {
        for name in values.keys() {
            if !self.base.contains_key(name) && self.unknown_warned.insert(name.clone()) {
                warn!(
                    "Parameter file {} names unknown parameter '{name}'",
                    self.path.display()
                );
            }
        }
    }

    fn current_stamp(&self) -> std::io::Result<Stamp> {
        let meta = std::fs::metadata(&self.path)?;
        Ok((meta.modified()?, meta.len()))
    }

    fn refresh(&mut self) {
        let stamp = match self.current_stamp() {
            Ok(stamp) => stamp,
            Err(e) => {
                if !self.missing_warned {
                    warn!("Parameter file {} unavailable: {e}", self.path.display());
                    self.missing_warned = true;
                }
                return;
            }
        };
        self.missing_warned = false;
        if self.stamp == Some(stamp) {
            return;
        }
        self.stamp = Some(stamp);

        match read_parameter_file(&self.path) {
            Ok(values) => {
                info!(
                    "Loaded {} parameter(s) from {}",
                    values.len(),
                    self.path.display()
                );
                self.warn_unknown(&values);
                self.file_values = values;
            }
            Err(e) => warn!(
                "Ignoring edit to {}, keeping previous values: {e}",
                self.path.display()
            ),
        }
    }
}

impl ControlSurface for ParameterFileSurface {
    fn observe(&mut self) -> Observed {
        self.refresh();
        let mut observed = self.base.clone();
        observed.extend(
            self.file_values
                .iter()
                .map(|(name, value)| (name.clone(), *value)),
        );
        observed
    }
}

/// Parse a flat mapping of parameter names to integers. JSON objects are
/// accepted as they are valid YAML.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not such a mapping.
pub fn read_parameter_file(path: &Path) -> anyhow::Result<Observed> {
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(Observed::new());
    }
    let values: BTreeMap<String, i64> = serde_yaml::from_str(&text)?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn touch(path: &Path, contents: &str, secs: u64) -> TestResult {
        std::fs::write(path, contents)?;
        let file = File::options().write(true).open(path)?;
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))?;
        Ok(())
    }

    #[test]
    fn reads_yaml_and_json() -> TestResult {
        let dir = tempfile::tempdir()?;
        let yaml = dir.path().join("p.yaml");
        let json = dir.path().join("p.json");
        std::fs::write(&yaml, "K_spring: 1\nMode: 2\n")?;
        std::fs::write(&json, r#"{"K_spring": 3}"#)?;

        let from_yaml = read_parameter_file(&yaml)?;
        assert_eq!(from_yaml.get("Mode"), Some(&2));
        let from_json = read_parameter_file(&json)?;
        assert_eq!(from_json.get("K_spring"), Some(&3));
        Ok(())
    }

    #[test]
    fn reloads_on_change_and_overrides_base() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("params.yaml");
        touch(&path, "K_spring: 1\n", 1_000)?;

        let base: Observed = [("K_spring".to_string(), 2), ("Mode".to_string(), 0)]
            .into_iter()
            .collect();
        let mut surface = ParameterFileSurface::new(&path, base);

        let first = surface.observe();
        assert_eq!(first.get("K_spring"), Some(&1));
        assert_eq!(first.get("Mode"), Some(&0));

        touch(&path, "K_spring: 3\n", 2_000)?;
        assert_eq!(surface.observe().get("K_spring"), Some(&3));
        Ok(())
    }

    #[test]
    fn bad_edit_keeps_previous_values() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("params.yaml");
        touch(&path, "K_wall: 2\n", 1_000)?;
        let base: Observed = [("K_wall".to_string(), 0)].into_iter().collect();
        let mut surface = ParameterFileSurface::new(&path, base);
        assert_eq!(surface.observe().get("K_wall"), Some(&2));

        touch(&path, "K_wall: [oops\n", 2_000)?;
        assert_eq!(surface.observe().get("K_wall"), Some(&2));

        std::fs::remove_file(&path)?;
        assert_eq!(surface.observe().get("K_wall"), Some(&2));
        Ok(())
    }

    #[test]
    fn unknown_names_are_reported_once() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("params.yaml");
        touch(&path, "K_sprng: 3\n", 1_000)?;
        let base: Observed = [("K_spring".to_string(), 2)].into_iter().collect();
        let mut surface = ParameterFileSurface::new(&path, base);

        assert_eq!(surface.observe().get("K_spring"), Some(&2));
        assert!(surface.unknown_warned.contains("K_sprng"));

        touch(&path, "K_sprng: 1\nK_spring: 1\n", 2_000)?;
        assert_eq!(surface.observe().get("K_spring"), Some(&1));
        assert_eq!(
            surface.unknown_warned.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["K_sprng"]
        );
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_base() {
        let base: Observed = [("Mode".to_string(), 1)].into_iter().collect();
        let mut surface = ParameterFileSurface::new("/nonexistent/params.yaml", base.clone());
        assert_eq!(surface.observe(), base);
    }
}
