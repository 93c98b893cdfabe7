use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;

use crate::error::{LimberError, Result};
use crate::pain::PainLocation;

static CATALOG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/catalog");

/// Reference information about one body region.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyRegion {
    pub location: PainLocation,
    pub common_issues: Vec<String>,
    pub exercises: Vec<String>,
    pub tips: String,
}

impl BodyRegion {
    pub fn name(&self) -> &'static str {
        self.location.display_name()
    }
}

/// Canned assistant replies for one region.
#[derive(Deserialize, Clone, Debug)]
pub struct Routine {
    pub location: PainLocation,
    pub replies: Vec<String>,
}

#[derive(Deserialize)]
struct RegionFile {
    regions: Vec<BodyRegion>,
}

#[derive(Deserialize)]
struct RoutineFile {
    routines: Vec<Routine>,
}

fn read_embedded(file_name: &str) -> Result<&'static str> {
    CATALOG_DIR
        .get_file(file_name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| {
            LimberError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("embedded catalog file {file_name} is missing"),
            ))
        })
}

pub fn body_regions() -> Result<Vec<BodyRegion>> {
    let file: RegionFile = from_str(read_embedded("regions.json")?)?;
    Ok(file.regions)
}

/// Look up a single region. `General` has no entry.
pub fn body_region(location: PainLocation) -> Result<Option<BodyRegion>> {
    Ok(body_regions()?
        .into_iter()
        .find(|region| region.location == location))
}

pub fn routines() -> Result<Vec<Routine>> {
    let file: RoutineFile = from_str(read_embedded("routines.json")?)?;
    Ok(file.routines)
}
