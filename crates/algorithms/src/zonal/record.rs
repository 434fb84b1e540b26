//! Per (subject, zone) results

use crate::run::{format_elapsed, SubjectId};
use crate::table::{ResultTable, TableKey, STATUS_COLUMN, STATUS_OK};
use chrono::{Duration, NaiveDate};
use gapstat_core::Result;
use std::collections::BTreeMap;

/// Output columns of a zonal table, in order
pub const ZONAL_COLUMNS: [&str; 15] = [
    "strUC",
    "PercSummer",
    "PercWinter",
    "PercYearRound",
    "NonHabitatPixels",
    "SummerPixels",
    "WinterPixels",
    "AllYearPixels",
    "ZoneTotal",
    "SummerPixelTotal",
    "WinterPixelTotal",
    "AllYearPixelTotal",
    "Date",
    "RunTime",
    STATUS_COLUMN,
];

/// Raw pixel counts of the four habitat classes within one zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonCounts {
    pub non_habitat: u64,
    pub summer: u64,
    pub winter: u64,
    pub year_round: u64,
}

impl SeasonCounts {
    /// All pixels of the zone
    pub fn total(&self) -> u64 {
        self.non_habitat + self.summer + self.winter + self.year_round
    }

    /// Pixels used in summer (summer-only plus year-round)
    pub fn summer_pixels(&self) -> u64 {
        self.summer + self.year_round
    }

    /// Pixels used in winter (winter-only plus year-round)
    pub fn winter_pixels(&self) -> u64 {
        self.winter + self.year_round
    }

    pub fn all_year_pixels(&self) -> u64 {
        self.year_round
    }
}

/// `100 * part / total`, exactly 0 when the total is 0
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

/// One row of a zonal run
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalRecord {
    pub subject: SubjectId,
    pub zone: i64,
    pub counts: SeasonCounts,
    /// Seasonal pixels of the subject over the whole overlay, outside
    /// every zone included
    pub summer_total: u64,
    pub winter_total: u64,
    pub all_year_total: u64,
    pub date: NaiveDate,
    pub run_time: Duration,
}

impl ZonalRecord {
    /// Records of one subject for each zone in `reported`.
    ///
    /// Totals sum every entry of `per_zone`, so habitat in zone 0 counts
    /// towards the percentages whether or not zone 0 is reported.
    pub fn for_subject(
        subject: &SubjectId,
        per_zone: &BTreeMap<i64, SeasonCounts>,
        reported: &[i64],
        date: NaiveDate,
        run_time: Duration,
    ) -> Vec<ZonalRecord> {
        let summer_total = per_zone.values().map(SeasonCounts::summer_pixels).sum();
        let winter_total = per_zone.values().map(SeasonCounts::winter_pixels).sum();
        let all_year_total = per_zone.values().map(SeasonCounts::all_year_pixels).sum();

        reported
            .iter()
            .map(|&zone| ZonalRecord {
                subject: subject.clone(),
                zone,
                counts: per_zone.get(&zone).copied().unwrap_or_default(),
                summer_total,
                winter_total,
                all_year_total,
                date,
                run_time,
            })
            .collect()
    }

    pub fn perc_summer(&self) -> f64 {
        percent(self.counts.summer_pixels(), self.summer_total)
    }

    pub fn perc_winter(&self) -> f64 {
        percent(self.counts.winter_pixels(), self.winter_total)
    }

    pub fn perc_year_round(&self) -> f64 {
        percent(self.counts.all_year_pixels(), self.all_year_total)
    }

    pub fn key(&self) -> TableKey {
        TableKey::zoned(self.subject.as_str(), self.zone)
    }

    /// Write this record's cells into `table`
    pub fn write_into(&self, table: &mut ResultTable) -> Result<()> {
        let c = &self.counts;
        let cells: [(&str, crate::table::Value); 15] = [
            ("strUC", self.subject.species_code().into()),
            ("PercSummer", self.perc_summer().into()),
            ("PercWinter", self.perc_winter().into()),
            ("PercYearRound", self.perc_year_round().into()),
            ("NonHabitatPixels", c.non_habitat.into()),
            ("SummerPixels", c.summer_pixels().into()),
            ("WinterPixels", c.winter_pixels().into()),
            ("AllYearPixels", c.all_year_pixels().into()),
            ("ZoneTotal", c.total().into()),
            ("SummerPixelTotal", self.summer_total.into()),
            ("WinterPixelTotal", self.winter_total.into()),
            ("AllYearPixelTotal", self.all_year_total.into()),
            ("Date", self.date.format("%Y-%m-%d").to_string().into()),
            ("RunTime", format_elapsed(self.run_time).into()),
            (STATUS_COLUMN, STATUS_OK.into()),
        ];
        for (column, value) in cells {
            table.set(self.key(), column, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{KeySchema, Value};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_percentages_from_counts() {
        let mut per_zone = BTreeMap::new();
        per_zone.insert(1, SeasonCounts { non_habitat: 5, summer: 30, winter: 0, year_round: 30 });
        per_zone.insert(2, SeasonCounts { non_habitat: 0, summer: 40, winter: 10, year_round: 0 });

        let records =
            ZonalRecord::for_subject(&"sp1".into(), &per_zone, &[1, 2], date(), Duration::seconds(3));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].summer_total, 100);
        assert_eq!(records[0].perc_summer(), 60.0);
        assert_eq!(records[1].perc_summer(), 40.0);
        assert_eq!(records[0].perc_winter(), 75.0);
        assert_eq!(records[0].perc_year_round(), 100.0);
        assert_eq!(records[1].perc_year_round(), 0.0);
    }

    #[test]
    fn test_unreported_outside_counts_in_totals() {
        let mut per_zone = BTreeMap::new();
        per_zone.insert(0, SeasonCounts { non_habitat: 0, summer: 3, winter: 0, year_round: 1 });
        per_zone.insert(1, SeasonCounts { non_habitat: 2, summer: 3, winter: 0, year_round: 1 });

        let records = ZonalRecord::for_subject(&"sp".into(), &per_zone, &[1], date(), Duration::zero());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].zone, 1);
        assert_eq!(records[0].summer_total, 8);
        assert_eq!(records[0].perc_summer(), 50.0);
        assert_eq!(records[0].perc_year_round(), 50.0);
    }

    #[test]
    fn test_zero_habitat_is_zero_percent() {
        let mut per_zone = BTreeMap::new();
        per_zone.insert(1, SeasonCounts { non_habitat: 9, ..Default::default() });
        let r = &ZonalRecord::for_subject(&"sp2".into(), &per_zone, &[1], date(), Duration::zero())[0];
        assert_eq!(r.perc_summer(), 0.0);
        assert_eq!(r.perc_winter(), 0.0);
        assert_eq!(r.perc_year_round(), 0.0);
    }

    #[test]
    fn test_write_into_table() {
        let mut per_zone = BTreeMap::new();
        per_zone.insert(3, SeasonCounts { non_habitat: 1, summer: 2, winter: 3, year_round: 4 });
        let record = &ZonalRecord::for_subject(
            &"mSEWEx.tif".into(),
            &per_zone,
            &[3],
            date(),
            Duration::zero(),
        )[0];

        let mut table = ResultTable::new(KeySchema::SubjectZone).with_columns(ZONAL_COLUMNS);
        record.write_into(&mut table).unwrap();

        let key = TableKey::zoned("mSEWEx.tif", 3);
        assert_eq!(table.columns().len(), ZONAL_COLUMNS.len());
        assert_eq!(table.get(&key, "strUC"), Some(&Value::from("mSEWEx")));
        assert_eq!(table.get(&key, "SummerPixels"), Some(&Value::Int(6)));
        assert_eq!(table.get(&key, "ZoneTotal"), Some(&Value::Int(10)));
        assert_eq!(table.get(&key, "Date"), Some(&Value::from("2026-10-18")));
        assert_eq!(table.get(&key, "RunTime"), Some(&Value::from("0:00:00.000000")));
    }
}
