//! Weighted species-richness accumulation

use super::weights::{WeightPolicy, WeightTable};
use crate::overlay::{expand_mask, season_mask, Season};
use crate::run::{format_elapsed, FailureReport, RunLog, SubjectId, SubjectSource, Workspace};
use crate::table::{MasterTable, MasterUpdate, TableKey, STATUS_COLUMN};
use chrono::Local;
use gapstat_core::io::write_geotiff;
use gapstat_core::raster::{Raster, RasterElement};
use gapstat_core::{Error, Result};
use ndarray::Zip;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Fixed-point scale of persisted weighted tallies
pub const TALLY_SCALE: f64 = 10_000.0;

/// Parameters for a richness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichnessParams {
    /// Name of the species group; names the weight table
    pub group: String,
    pub season: Season,
    pub weight: WeightPolicy,
    /// Write a checkpoint after every this many incorporated subjects
    pub checkpoint_interval: usize,
    /// Abort on the first subject failure or failed counter check
    pub strict: bool,
    /// `(row, col)` of a counter cell that every subject must cover
    pub counter_cell: Option<(usize, usize)>,
    /// Place each subject's season mask onto the base grid, counting every
    /// positive base cell (counter cell) as habitat
    pub expand_subjects: bool,
}

impl Default for RichnessParams {
    fn default() -> Self {
        Self {
            group: "richness".into(),
            season: Season::Any,
            weight: WeightPolicy::Uniform,
            checkpoint_interval: 50,
            strict: false,
            counter_cell: None,
            expand_subjects: false,
        }
    }
}

/// Result of [`RichnessAccumulator::compute`]
#[derive(Debug, Clone)]
pub struct RichnessOutcome {
    /// Persisted richness surface (integer counts, or tally × 10000)
    pub richness: Raster<i32>,
    /// Unscaled tally
    pub tally: Raster<f64>,
    pub weights: WeightTable,
    /// Subjects added to the tally, in order
    pub incorporated: Vec<SubjectId>,
    pub checkpoints: Vec<PathBuf>,
    pub richness_path: PathBuf,
    pub table: MasterUpdate,
    pub failures: FailureReport,
    /// Failed counter checks in non-strict runs
    pub integrity_warnings: Vec<String>,
}

/// Integer encoding of a tally: plain counts for uniform weights,
/// `floor(tally * 10000 + 0.5)` otherwise.
pub fn encode_tally(tally: &Raster<f64>, policy: WeightPolicy) -> Result<Raster<i32>> {
    let cells = tally
        .data()
        .iter()
        .map(|&t| {
            let scaled = if policy.is_weighted() {
                (t * TALLY_SCALE + 0.5).floor()
            } else {
                t.round()
            };
            if !(i32::MIN as f64..=i32::MAX as f64).contains(&scaled) {
                return Err(Error::Encode(format!("tally {} does not fit 32 bits", t)));
            }
            Ok(scaled as i32)
        })
        .collect::<Result<Vec<i32>>>()?;

    let (rows, cols) = tally.shape();
    Ok(Raster::from_vec(cells, rows, cols)?.with_transform(*tally.transform()))
}

/// Sums season masks of many subjects into a richness tally.
pub struct RichnessAccumulator {
    params: RichnessParams,
}

struct CounterCheck {
    cell: (usize, usize),
    expected: f64,
}

impl RichnessAccumulator {
    /// # Errors
    /// `InvalidParameter` for a zero checkpoint interval or an empty group.
    pub fn new(params: RichnessParams) -> Result<Self> {
        if params.checkpoint_interval == 0 {
            return Err(Error::InvalidParameter {
                name: "checkpoint_interval",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if params.group.trim().is_empty() {
            return Err(Error::InvalidParameter {
                name: "group",
                value: params.group.clone(),
                reason: "group name is required".into(),
            });
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &RichnessParams {
        &self.params
    }

    /// Compute richness over `subjects` on the grid of `base`.
    ///
    /// The tally starts as `base` (no-data as 0). Each subject adds its
    /// weighted value to every cell of its season mask. Checkpoints go to
    /// `Richness_intermediates/Intermediate_<k>.tif`, the final surface to
    /// `Richness.tif` and the weights to `<group>.csv`, all in `workspace`.
    ///
    /// # Errors
    /// Invalid parameters and duplicate subjects fail at run start. With
    /// `strict`, any subject failure or failed counter check ends the run.
    pub fn compute(
        &self,
        subjects: &[SubjectId],
        source: &dyn SubjectSource,
        base: &Raster<i32>,
        workspace: &Workspace,
        log: &mut RunLog,
    ) -> Result<RichnessOutcome> {
        let p = &self.params;
        let started = Local::now();

        let mut seen = HashSet::new();
        if let Some(dup) = subjects.iter().find(|s| !seen.insert(*s)) {
            return Err(Error::InvalidParameter {
                name: "subjects",
                value: dup.to_string(),
                reason: "listed more than once".into(),
            });
        }

        let nodata = base.nodata();
        let mut tally = base.map(|v| if v.is_nodata(nodata) { 0.0 } else { f64::from(v) });

        let mut counter = match p.counter_cell {
            Some((row, col)) => {
                let seed = tally.get(row, col).map_err(|_| Error::InvalidParameter {
                    name: "counter_cell",
                    value: format!("{},{}", row, col),
                    reason: "outside the base grid".into(),
                })?;
                Some(CounterCheck {
                    cell: (row, col),
                    expected: seed,
                })
            }
            None => None,
        };

        let table_path = workspace.file(&format!("{}.csv", p.group));
        log.line(format!("\n{}", "#".repeat(67)));
        log.line("The results from richness processing");
        log.line("#".repeat(67));
        log.line(started.format("%c").to_string());
        log.line(
            format!(
                "\nProcessing {} species as \"{}\".\n",
                subjects.len(),
                p.group
            )
            .to_uppercase(),
        );
        log.line(format!("Season of this calculation: {}", p.season));
        log.line(format!("Weighting method: {}", p.weight));
        log.line(format!("Table written to {}", table_path.display()));
        log.line("\nThe species that will be used for analysis:");
        log.line(format!(
            "{:?}\n",
            subjects.iter().map(SubjectId::as_str).collect::<Vec<_>>()
        ));

        let mut failures = FailureReport::new();

        // Weighted policies need every count before the first addition.
        let (to_add, weights) = if p.weight.is_weighted() {
            let mut counts = Vec::with_capacity(subjects.len());
            for subject in subjects {
                match self.habitat_mask(subject, source, base) {
                    Ok(mask) => counts.push((subject.clone(), habitat_count(&mask))),
                    Err(e) => self.skip(subject, e, &mut failures, log)?,
                }
            }
            let weights = WeightTable::build(p.weight, &counts);
            let to_add: Vec<SubjectId> = counts.into_iter().map(|(s, _)| s).collect();
            (to_add, Some(weights))
        } else {
            (subjects.to_vec(), None)
        };

        let intermediates = workspace.intermediates_dir();
        let mut checkpoints = Vec::new();
        let mut incorporated = Vec::new();
        let mut uniform_counts = Vec::new();
        let mut integrity_warnings = Vec::new();

        log.line("Summing");
        for subject in to_add {
            let start = Local::now();
            log.line(subject.as_str());

            let mask = match self.habitat_mask(&subject, source, base) {
                Ok(mask) => mask,
                Err(e) => {
                    self.skip(&subject, e, &mut failures, log)?;
                    continue;
                }
            };
            let value = match &weights {
                Some(w) => w.weighted_value(&subject).unwrap_or(0.0),
                None => {
                    uniform_counts.push((subject.clone(), habitat_count(&mask)));
                    1.0
                }
            };
            log.line(format!("\tvalue = {}", value));

            Zip::from(tally.data_mut())
                .and(mask.data())
                .for_each(|t, &m| {
                    if m == 1 {
                        *t += value;
                    }
                });
            drop(mask);

            if let Some(check) = counter.as_mut() {
                check.expected += value;
            }
            incorporated.push(subject);

            let k = incorporated.len();
            if k % p.checkpoint_interval == 0 {
                std::fs::create_dir_all(&intermediates)?;
                let path = intermediates.join(format!("Intermediate_{}.tif", k));
                write_geotiff(&encode_tally(&tally, p.weight)?, &path)?;
                log.line(format!("\tSaved to {}", path.display()));
                checkpoints.push(path);

                self.check_counter(
                    &tally,
                    counter.as_ref(),
                    &format!("checkpoint {}", k),
                    log,
                    &mut integrity_warnings,
                )?;
            }
            log.line(format!("\tRuntime: {}", format_elapsed(Local::now() - start)));
        }

        let weights = weights
            .unwrap_or_else(|| WeightTable::build(WeightPolicy::Uniform, &uniform_counts));

        self.check_counter(
            &tally,
            counter.as_ref(),
            "final richness",
            log,
            &mut integrity_warnings,
        )?;

        let richness_path = workspace.file("Richness.tif");
        log.line(format!("Saving richness raster to {}", richness_path.display()));
        let richness = encode_tally(&tally, p.weight)?;
        write_geotiff(&richness, &richness_path)?;
        log.line("Richness raster saved");

        let mut weight_table = weights.to_table()?;
        for failure in failures.iter() {
            weight_table.set(
                TableKey::subject(failure.subject.as_str()),
                STATUS_COLUMN,
                failure.status(),
            )?;
        }
        let table = MasterTable::new(table_path, workspace.archive_dir())
            .update(&weight_table, started.naive_local())?;

        failures.write_to(log);
        log.line(format!(
            "Total runtime was: {}",
            format_elapsed(Local::now() - started)
        ));

        Ok(RichnessOutcome {
            richness,
            tally,
            weights,
            incorporated,
            checkpoints,
            richness_path,
            table,
            failures,
            integrity_warnings,
        })
    }

    /// Load a subject, align it with the base grid and mask its season
    fn habitat_mask(
        &self,
        subject: &SubjectId,
        source: &dyn SubjectSource,
        base: &Raster<i32>,
    ) -> Result<Raster<u8>> {
        let raster = source.load(subject)?;
        if !self.params.expand_subjects {
            base.ensure_same_grid(&raster)?;
        }
        let mask = season_mask(&raster, self.params.season)
            .map_err(|e| e.into_corrupt(subject.as_str()))?;
        drop(raster);

        if self.params.expand_subjects {
            expand_mask(&mask, base)
        } else {
            Ok(mask)
        }
    }

    /// Record a failed subject; in strict mode the failure ends the run
    fn skip(
        &self,
        subject: &SubjectId,
        err: Error,
        failures: &mut FailureReport,
        log: &mut RunLog,
    ) -> Result<()> {
        log.error(format!("{} -- {}", subject, err));
        failures.record(subject, &err);
        if self.params.strict {
            return Err(err);
        }
        Ok(())
    }

    fn check_counter(
        &self,
        tally: &Raster<f64>,
        counter: Option<&CounterCheck>,
        context: &str,
        log: &mut RunLog,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        let Some(check) = counter else {
            return Ok(());
        };
        let (row, col) = check.cell;
        let found = tally.get(row, col)?;
        if (found - check.expected).abs() <= 1e-9 * check.expected.abs().max(1.0) {
            return Ok(());
        }

        let err = Error::DimensionCheck {
            context: format!("{} counter cell ({}, {})", context, row, col),
            expected: check.expected.to_string(),
            found: found.to_string(),
        };
        if self.params.strict {
            log.error(err.to_string());
            return Err(err);
        }
        log.warn(err.to_string());
        warnings.push(err.to_string());
        Ok(())
    }
}

fn habitat_count(mask: &Raster<u8>) -> u64 {
    mask.data().iter().filter(|&&m| m == 1).count() as u64
}
