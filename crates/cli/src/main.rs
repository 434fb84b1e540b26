//! GapStat CLI - zonal statistics and richness for GAP habitat maps

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use gapstat_algorithms::overlay::{
    reclassify_codes, season_mask, OverlayEncoding, Season, ZoneSpec,
};
use gapstat_algorithms::richness::{RichnessAccumulator, RichnessParams, WeightPolicy};
use gapstat_algorithms::run::{GeoTiffDirectory, RunLog, SubjectId, Workspace};
use gapstat_algorithms::summary::{summarize, SummaryParams};
use gapstat_algorithms::zonal::{OverlayExtent, ZonalAccumulator, ZonalParams};
use gapstat_core::io::{describe_geotiff, read_geotiff, write_geotiff};
use gapstat_core::Raster;
use gapstat_parallel::num_threads;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "gapstat")]
#[command(author, version, about = "Zonal statistics and richness for GAP habitat maps", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pixel count of every category in a raster
    Summarize {
        /// Input raster file
        input: PathBuf,
        /// Side length of the tiles summarized independently
        #[arg(short, long, default_value = "1024")]
        tile_size: usize,
    },
    /// Binary habitat mask for one season
    Mask {
        /// Input habitat map
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Season: summer, winter or any
        #[arg(short, long, default_value = "any")]
        season: String,
    },
    /// Map a list of codes to one value, everything else no-data
    Reclass {
        /// Input raster (e.g. land cover)
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Comma-separated codes to keep
        #[arg(short, long, value_delimiter = ',', required = true)]
        codes: Vec<i64>,
        /// Value written for kept codes
        #[arg(short, long, default_value = "1")]
        to: i32,
    },
    /// Share of each species' seasonal habitat inside each zone
    Zonal {
        /// Zone raster
        #[arg(short, long)]
        zones: PathBuf,
        /// Name of the zone dataset; names the master table
        #[arg(short = 'n', long)]
        zone_name: String,
        /// Only report these zone codes (comma-separated); default all
        #[arg(long, value_delimiter = ',')]
        codes: Option<Vec<i64>>,
        /// Directory holding the habitat maps
        #[arg(short = 'd', long)]
        habitat_dir: PathBuf,
        /// Directory for logs, archives and the master table
        #[arg(short, long)]
        work_dir: PathBuf,
        /// Side length of the tiles summarized independently
        #[arg(short, long, default_value = "1024")]
        tile_size: usize,
        /// Overlay on the full zone grid instead of each habitat map's extent
        #[arg(long)]
        expand: bool,
        /// Also report habitat outside every zone as zone 0
        #[arg(long)]
        include_outside: bool,
        /// Sequential processing
        #[arg(long)]
        sequential: bool,
        /// Habitat map file names
        #[arg(required = true)]
        subjects: Vec<String>,
    },
    /// Species richness, optionally weighted
    Richness {
        /// Species group name; names the output directory and weight table
        #[arg(short, long)]
        group: String,
        /// Directory holding the habitat maps
        #[arg(short = 'd', long)]
        habitat_dir: PathBuf,
        /// Parent directory of the group's output directory
        #[arg(short, long)]
        out_dir: PathBuf,
        /// Base raster defining the grid and the starting tally
        #[arg(short, long)]
        base: PathBuf,
        /// Season: summer, winter or any
        #[arg(short, long, default_value = "any")]
        season: String,
        /// Save an intermediate raster every N species
        #[arg(short, long, default_value = "50")]
        interval: usize,
        /// Weighting: none, percentile or area
        #[arg(short, long, default_value = "none")]
        weight: String,
        /// Stop at the first failed species or counter check
        #[arg(long)]
        strict: bool,
        /// Counter cell ROW,COL that every species must cover
        #[arg(long)]
        counter_cell: Option<String>,
        /// Place range-extent habitat maps onto the base grid first
        #[arg(long)]
        expand: bool,
        /// Habitat map file names
        #[arg(required = true)]
        subjects: Vec<String>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_i32(path: &Path) -> Result<Raster<i32>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<i32> = read_geotiff(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result<T: gapstat_core::RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn subject_ids(subjects: &[String]) -> Vec<SubjectId> {
    subjects.iter().map(SubjectId::new).collect()
}

fn parse_cell(s: &str) -> Result<(usize, usize)> {
    let Some((row, col)) = s.split_once(',') else {
        bail!("Counter cell must be ROW,COL, got: {}", s);
    };
    let row = row.trim().parse().context("Invalid counter cell row")?;
    let col = col.trim().parse().context("Invalid counter cell column")?;
    Ok((row, col))
}

fn report_failures(failures: &gapstat_algorithms::run::FailureReport) {
    if failures.is_empty() {
        return;
    }
    warn!("{} subject(s) failed", failures.len());
    for f in failures.iter() {
        println!("  {} [{}]: {}", f.subject, f.kind, f.message);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Summarize { input, tile_size } => {
            let info = describe_geotiff(&input).context("Failed to read raster header")?;
            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} ({} cells)",
                info.cols,
                info.rows,
                info.rows * info.cols
            );
            println!("Pixel type: {:?}", info.pixel_type);
            if let Some(nodata) = info.nodata {
                println!("NoData: {}", nodata);
            }

            let raster = read_i32(&input)?;
            let bounds = raster.bounds();
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );

            let start = Instant::now();
            let params = SummaryParams {
                tile_size,
                ..SummaryParams::default()
            };
            let counts = summarize(&raster, &params).context("Failed to summarize raster")?;

            println!("\n{:>12} {:>14}", "Value", "Count");
            for (code, count) in counts.iter() {
                println!("{:>12} {:>14}", code, count);
            }
            println!("{:>12} {:>14}", "Total", counts.total());
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Mask {
            input,
            output,
            season,
        } => {
            let season: Season = season.parse()?;
            let raster = read_i32(&input)?;
            let start = Instant::now();
            let mask = season_mask(&raster, season).context("Failed to mask habitat")?;
            let elapsed = start.elapsed();
            write_result(&mask, &output)?;
            done(&format!("{} mask", season), &output, elapsed);
        }

        Commands::Reclass {
            input,
            output,
            codes,
            to,
        } => {
            let raster = read_i32(&input)?;
            let start = Instant::now();
            let result = reclassify_codes(&raster, &codes, to).context("Failed to reclassify")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Reclassified raster", &output, elapsed);
        }

        Commands::Zonal {
            zones,
            zone_name,
            codes,
            habitat_dir,
            work_dir,
            tile_size,
            expand,
            include_outside,
            sequential,
            subjects,
        } => {
            let workspace = Workspace::create(&work_dir)
                .with_context(|| format!("Failed to create {}", work_dir.display()))?;
            let log_path = workspace.file(&format!("log{}.txt", Local::now().format("%Y-%m-%d")));
            let mut log = RunLog::open(&log_path).context("Failed to open run log")?;

            let zone_raster = read_i32(&zones)?;
            let spec = ZoneSpec::from_raster(&zone_name, &zone_raster, codes.as_deref())
                .context("Invalid zone raster")?;
            drop(zone_raster);
            info!("{} zones in {}", spec.codes().len(), zone_name);

            let params = ZonalParams {
                summary: SummaryParams {
                    tile_size,
                    parallel: !sequential,
                },
                encoding: OverlayEncoding::default(),
                include_outside,
                extent: if expand {
                    OverlayExtent::Zones
                } else {
                    OverlayExtent::Subject
                },
            };
            if !sequential {
                info!("Summarizing tiles on {} threads", num_threads());
            }
            let accumulator = ZonalAccumulator::new(&spec, params)?;
            let source = GeoTiffDirectory::new(habitat_dir);

            let start = Instant::now();
            let pb = spinner(&format!("Overlaying {} species...", subjects.len()));
            let run = accumulator.accumulate(&subject_ids(&subjects), &source, &mut log)?;
            pb.finish_and_clear();

            let published = run
                .publish(&workspace, Local::now().naive_local())
                .context("Failed to publish results")?;
            report_failures(&run.failures);

            println!(
                "{} rows ({} updated, {} appended)",
                published.master.table.len(),
                published.master.summary.updated_rows,
                published.master.summary.appended_rows
            );
            println!("Run table archived to: {}", published.run_table.display());
            done(
                "Master table",
                &workspace.file(&format!("Percent_in_{}_Master.csv", zone_name)),
                start.elapsed(),
            );
        }

        Commands::Richness {
            group,
            habitat_dir,
            out_dir,
            base,
            season,
            interval,
            weight,
            strict,
            counter_cell,
            expand,
            subjects,
        } => {
            let params = RichnessParams {
                season: season.parse()?,
                weight: weight.parse::<WeightPolicy>()?,
                checkpoint_interval: interval,
                strict,
                counter_cell: counter_cell.as_deref().map(parse_cell).transpose()?,
                expand_subjects: expand,
                group,
            };
            let accumulator = RichnessAccumulator::new(params)?;

            let root = out_dir.join(&accumulator.params().group);
            let workspace = Workspace::create(&root)
                .with_context(|| format!("Failed to create {}", root.display()))?;
            let log_path = workspace.file(&format!("Log_{}.txt", accumulator.params().group));
            let mut log = RunLog::open(&log_path).context("Failed to open run log")?;

            let base = read_i32(&base)?;
            let source = GeoTiffDirectory::new(habitat_dir);

            let start = Instant::now();
            let pb = spinner(&format!("Summing {} species...", subjects.len()));
            let outcome =
                accumulator.compute(&subject_ids(&subjects), &source, &base, &workspace, &mut log)?;
            pb.finish_and_clear();

            report_failures(&outcome.failures);
            for w in &outcome.integrity_warnings {
                warn!("{}", w);
            }
            println!(
                "{} of {} species incorporated, {} checkpoint(s)",
                outcome.incorporated.len(),
                subjects.len(),
                outcome.checkpoints.len()
            );
            done("Richness", &outcome.richness_path, start.elapsed());
        }
    }

    Ok(())
}
