//! Zonal overlay of many subjects against one zone raster

use super::record::{SeasonCounts, ZonalRecord, ZONAL_COLUMNS};
use crate::overlay::{combine, expand_onto, OverlayEncoding, ZoneSpec, YEAR_ROUND};
use crate::run::{format_elapsed, FailureReport, RunLog, SubjectId, SubjectSource, Workspace};
use crate::summary::{summarize, SummaryParams};
use crate::table::{
    archive, KeySchema, MasterTable, MasterUpdate, ResultTable, TableKey, STATUS_COLUMN,
};
use chrono::{Local, NaiveDateTime};
use gapstat_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

/// Grid on which a subject and the zones are overlaid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayExtent {
    /// The subject's own grid, with the zone raster clipped to it. Cells of
    /// the zone raster outside the subject are never visited.
    #[default]
    Subject,
    /// The full zone grid, with the subject placed onto it
    Zones,
}

/// Parameters for a zonal run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonalParams {
    /// Tiling of the combined-raster summary
    pub summary: SummaryParams,
    /// Subject/zone code encoding
    pub encoding: OverlayEncoding,
    /// Also report habitat outside every zone as zone 0. That habitat
    /// counts towards the season totals either way.
    pub include_outside: bool,
    pub extent: OverlayExtent,
}

/// Result of [`ZonalAccumulator::accumulate`]
#[derive(Debug, Clone)]
pub struct ZonalRun {
    pub zone_name: String,
    /// Zones reported for every subject
    pub zones: Vec<i64>,
    pub subjects: Vec<SubjectId>,
    pub records: Vec<ZonalRecord>,
    pub failures: FailureReport,
    pub started: NaiveDateTime,
}

/// Files written by [`ZonalRun::publish`]
#[derive(Debug, Clone)]
pub struct PublishedRun {
    /// Archived copy of this run's own table
    pub run_table: PathBuf,
    pub master: MasterUpdate,
}

/// Drives overlay → summary → decode for each subject against one zone
/// raster.
pub struct ZonalAccumulator<'z> {
    zones: &'z ZoneSpec,
    params: ZonalParams,
}

impl<'z> ZonalAccumulator<'z> {
    /// # Errors
    /// `InvalidParameter` when the encoding base cannot hold every habitat
    /// category or the tile size is zero.
    pub fn new(zones: &'z ZoneSpec, params: ZonalParams) -> Result<Self> {
        if params.encoding.base() <= YEAR_ROUND {
            return Err(Error::InvalidParameter {
                name: "base",
                value: params.encoding.base().to_string(),
                reason: format!("must exceed the largest habitat category {}", YEAR_ROUND),
            });
        }
        if params.summary.tile_size == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: "0".into(),
                reason: "tiles must hold at least one cell".into(),
            });
        }
        Ok(Self { zones, params })
    }

    /// Zones reported per subject
    fn reported_zones(&self) -> Vec<i64> {
        let mut zones = Vec::with_capacity(self.zones.codes().len() + 1);
        if self.params.include_outside {
            zones.push(0);
        }
        zones.extend_from_slice(self.zones.codes());
        zones
    }

    /// Process every subject in order.
    ///
    /// Per-subject failures are logged and collected in the run's failure
    /// report; they never stop the batch.
    ///
    /// # Errors
    /// `InvalidParameter` when a subject is listed twice.
    pub fn accumulate(
        &self,
        subjects: &[SubjectId],
        source: &dyn SubjectSource,
        log: &mut RunLog,
    ) -> Result<ZonalRun> {
        let mut seen = HashSet::new();
        if let Some(dup) = subjects.iter().find(|s| !seen.insert(*s)) {
            return Err(Error::InvalidParameter {
                name: "subjects",
                value: dup.to_string(),
                reason: "listed more than once".into(),
            });
        }

        let started = Local::now();
        let zones = self.reported_zones();
        log.line(format!(
            "\n\n****************  {}  **************************\n",
            started.format("%Y-%m-%d")
        ));
        log.line(format!(
            "Zone raster {} with zones {:?}",
            self.zones.name(),
            self.zones.codes()
        ));
        log.line(format!(
            "Rasters that will be processed: {:?}",
            subjects.iter().map(SubjectId::as_str).collect::<Vec<_>>()
        ));

        let mut records = Vec::new();
        let mut failures = FailureReport::new();

        for subject in subjects {
            log.line(format!("\n-------{}-------", subject));
            let start = Local::now();

            match self.process_subject(subject, source) {
                Ok(per_zone) => {
                    for (zone, counts) in &per_zone {
                        log.line(format!(
                            "\tzone {}: {}/{}/{}/{}",
                            zone, counts.non_habitat, counts.summer, counts.winter, counts.year_round
                        ));
                    }
                    let elapsed = Local::now() - start;
                    records.extend(ZonalRecord::for_subject(
                        subject,
                        &per_zone,
                        &zones,
                        start.date_naive(),
                        elapsed,
                    ));
                    log.line(format!("Processing time: {}", format_elapsed(elapsed)));
                }
                Err(e) => {
                    log.error(format!("{} -- {}", subject, e));
                    failures.record(subject, &e);
                }
            }
        }

        failures.write_to(log);
        Ok(ZonalRun {
            zone_name: self.zones.name().to_string(),
            zones,
            subjects: subjects.to_vec(),
            records,
            failures,
            started: started.naive_local(),
        })
    }

    /// Seasonal counts for one subject in zone 0 and every zone of interest
    fn process_subject(
        &self,
        subject: &SubjectId,
        source: &dyn SubjectSource,
    ) -> Result<BTreeMap<i64, SeasonCounts>> {
        let raster = source.load(subject)?;
        let encoding = &self.params.encoding;

        let combined = match self.params.extent {
            OverlayExtent::Subject if self.zones.raster().same_grid(&raster) => {
                combine(&raster, self.zones, encoding)
            }
            OverlayExtent::Subject => {
                let (rows, cols) = raster.shape();
                let clipped = self.zones.clip_to(raster.transform(), rows, cols)?;
                combine(&raster, &clipped, encoding)
            }
            OverlayExtent::Zones => {
                let expanded = expand_onto(&raster, &self.zones.raster().zeros_like::<i32>())?;
                combine(&expanded, self.zones, encoding)
            }
        }
        .map_err(|e| e.into_corrupt(subject.as_str()))?;
        drop(raster);

        let table = summarize(&combined, &self.params.summary)?;
        let cells = combined.len() as u64;
        drop(combined);

        if table.total() != cells {
            return Err(Error::DimensionCheck {
                context: subject.to_string(),
                expected: format!("{} cells", cells),
                found: format!("{} tabulated", table.total()),
            });
        }

        let mut per_zone: BTreeMap<i64, SeasonCounts> = std::iter::once(0)
            .chain(self.zones.codes().iter().copied())
            .map(|z| (z, SeasonCounts::default()))
            .collect();

        for (code, count) in table.iter() {
            let (category, zone) = encoding.decode(code);
            debug!(subject = %subject, code, category, zone, count, "decoded");
            if category > YEAR_ROUND {
                return Err(Error::CorruptRaster {
                    subject: subject.to_string(),
                    reason: format!("unexpected habitat category {}", category),
                });
            }
            let Some(counts) = per_zone.get_mut(&zone) else {
                continue;
            };
            match category {
                0 => counts.non_habitat += count,
                1 => counts.summer += count,
                2 => counts.winter += count,
                _ => counts.year_round += count,
            }
        }

        Ok(per_zone)
    }
}

impl ZonalRun {
    /// The run as a result table.
    ///
    /// Failed subjects get one row per zone holding only a `Status` cell, so
    /// merging into a master keeps their historical counts.
    pub fn to_table(&self) -> Result<ResultTable> {
        let mut table = ResultTable::new(KeySchema::SubjectZone).with_columns(ZONAL_COLUMNS);
        for subject in &self.subjects {
            for record in self.records.iter().filter(|r| &r.subject == subject) {
                record.write_into(&mut table)?;
            }
            for failure in self.failures.iter().filter(|f| &f.subject == subject) {
                let status = failure.status();
                for &zone in &self.zones {
                    table.set(
                        TableKey::zoned(subject.as_str(), zone),
                        STATUS_COLUMN,
                        status.as_str(),
                    )?;
                }
            }
        }
        Ok(table)
    }

    /// Archive this run's table, then fold it into the workspace's master
    /// table `Percent_in_<zone>_Master.csv`.
    pub fn publish(&self, workspace: &Workspace, timestamp: NaiveDateTime) -> Result<PublishedRun> {
        let table = self.to_table()?;
        let archive_dir = workspace.archive_dir();
        let run_table = archive(&table, &archive_dir, &self.zone_name, timestamp)?;

        let master = MasterTable::new(
            workspace.file(&format!("Percent_in_{}_Master.csv", self.zone_name)),
            archive_dir,
        );
        let master = master.update(&table, timestamp)?;
        Ok(PublishedRun { run_table, master })
    }
}
