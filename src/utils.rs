use std::path::{Path, PathBuf};

use instant::Instant;

//Time since the last frame in milliseconds.
pub struct Timestep {
    delta: f64,
    last: Instant,
}

impl Timestep {
    pub fn new() -> Timestep {
        Timestep { delta: 0.0, last: Instant::now() }
    }

    pub fn step_fwd(&mut self) -> &mut Self {
        let now = Instant::now();
        self.delta = now.duration_since(self.last).as_secs_f64() * 1000.0;
        self.last = now;
        self
    }

    pub fn millis(&self) -> f64 {
        self.delta
    }

    pub fn seconds(&self) -> f64 {
        self.delta / 1000.0
    }
}

impl Default for Timestep {
    fn default() -> Self {
        Timestep::new()
    }
}

impl From<f64> for Timestep {
    fn from(delta: f64) -> Timestep {
        Timestep { delta, last: Instant::now() }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Guid {
    id: u64,
}

impl Guid {
    pub fn new(id: u64) -> Guid {
        Guid { id }
    }

    //The zero guid never resolves to an asset.
    pub fn dead() -> Guid {
        Guid { id: 0 }
    }

    pub fn is_dead(&self) -> bool {
        self.id == 0
    }
}

pub struct GuidGenerator {
    next: u64,
}

impl GuidGenerator {
    pub fn new() -> GuidGenerator {
        GuidGenerator { next: 1 }
    }

    pub fn generate(&mut self) -> Guid {
        let guid = Guid::new(self.next);
        self.next += 1;
        guid
    }
}

impl Default for GuidGenerator {
    fn default() -> Self {
        GuidGenerator::new()
    }
}

pub struct FileUtils;

impl FileUtils {
    pub fn has_extension(path: &Path, ext: &str) -> bool {
        path.extension().map(|e| e.eq_ignore_ascii_case(ext)).unwrap_or(false)
    }

    //First file in the directory carrying the given extension, if any.
    pub fn find_ext_in_dir(path: &Path, ext: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(path).ok()?;

        for entry in entries.flatten() {
            let candidate = entry.path();
            if candidate.is_file() && FileUtils::has_extension(&candidate, ext) {
                return Some(candidate);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestep_from_millis() {
        let ts = Timestep::from(16.0);
        assert_eq!(ts.millis(), 16.0);
        assert_eq!(ts.seconds(), 0.016);
    }

    #[test]
    fn test_timestep_steps_forward() {
        let mut ts = Timestep::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        ts.step_fwd();
        assert!(ts.millis() > 0.0);
    }

    #[test]
    fn test_guids_are_unique_and_live() {
        let mut generator = GuidGenerator::new();
        let first = generator.generate();
        let second = generator.generate();

        assert_ne!(first, second);
        assert!(!first.is_dead());
        assert!(Guid::dead().is_dead());
    }

    #[test]
    fn test_find_ext_in_dir() {
        let dir = std::env::temp_dir().join("overture_utils_test");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("project.ovt");
        std::fs::write(&file, "{}").unwrap();

        let found = FileUtils::find_ext_in_dir(&dir, "ovt");
        assert_eq!(found, Some(file.clone()));
        assert!(FileUtils::has_extension(&file, "ovt"));
        assert!(!FileUtils::has_extension(&file, "json"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
