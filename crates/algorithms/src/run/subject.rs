//! Subjects and where their rasters come from

use gapstat_core::io::read_geotiff;
use gapstat_core::raster::Raster;
use gapstat_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of a habitat map, usually its file name (`mSEWEx.tif`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Species code with the four middle letters upper-cased:
    /// `mSEWEx.tif` → `mSEWEx`, `msewex_v1.tif` → `mSEWEx`.
    ///
    /// Identifiers shorter than six characters are returned unchanged.
    pub fn species_code(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() < 6 {
            return self.0.clone();
        }
        let mut code = String::with_capacity(6);
        code.push(chars[0]);
        code.extend(chars[1..5].iter().flat_map(|c| c.to_uppercase()));
        code.push(chars[5]);
        code
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Source of subject rasters
pub trait SubjectSource {
    /// Load a subject's categorical raster.
    ///
    /// # Errors
    /// `MissingInput` when the subject does not exist, `CorruptRaster` when
    /// it cannot be decoded.
    fn load(&self, subject: &SubjectId) -> Result<Raster<i32>>;
}

/// GeoTIFF habitat maps in one directory, named by subject id
#[derive(Debug, Clone)]
pub struct GeoTiffDirectory {
    dir: PathBuf,
}

impl GeoTiffDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, subject: &SubjectId) -> PathBuf {
        self.dir.join(subject.as_str())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SubjectSource for GeoTiffDirectory {
    fn load(&self, subject: &SubjectId) -> Result<Raster<i32>> {
        let path = self.path_for(subject);
        if !path.is_file() {
            return Err(Error::MissingInput { path });
        }
        read_geotiff::<i32, _>(&path).map_err(|e| e.into_corrupt(subject.as_str()))
    }
}

/// In-memory subjects, for tests and callers that build rasters themselves
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rasters: HashMap<SubjectId, Raster<i32>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: impl Into<SubjectId>, raster: Raster<i32>) {
        self.rasters.insert(subject.into(), raster);
    }

    pub fn with(mut self, subject: impl Into<SubjectId>, raster: Raster<i32>) -> Self {
        self.insert(subject, raster);
        self
    }
}

impl SubjectSource for MemorySource {
    fn load(&self, subject: &SubjectId) -> Result<Raster<i32>> {
        self.rasters
            .get(subject)
            .cloned()
            .ok_or_else(|| Error::MissingInput {
                path: PathBuf::from(subject.as_str()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapstat_core::io::write_geotiff;

    #[test]
    fn test_species_code() {
        assert_eq!(SubjectId::new("mSEWEx.tif").species_code(), "mSEWEx");
        assert_eq!(SubjectId::new("msewex_v1.tif").species_code(), "mSEWEx");
        assert_eq!(SubjectId::new("sp1").species_code(), "sp1");
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let raster = Raster::from_vec(vec![0u8, 1, 2, 3], 2, 2).unwrap();
        write_geotiff(&raster, dir.path().join("bAMROx.tif")).unwrap();

        let source = GeoTiffDirectory::new(dir.path());
        let loaded = source.load(&"bAMROx.tif".into()).unwrap();
        assert_eq!(loaded.get(1, 1).unwrap(), 3);

        assert!(matches!(
            source.load(&"gone.tif".into()),
            Err(Error::MissingInput { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_names_subject() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.tif"), b"not a tiff").unwrap();
        let source = GeoTiffDirectory::new(dir.path());
        match source.load(&"bad.tif".into()) {
            Err(Error::CorruptRaster { subject, .. }) => assert_eq!(subject, "bad.tif"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
