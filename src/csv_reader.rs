use crate::structs::{
    CsvData, ParsePolicy, Parsed, Result, Row, SkippedRow, TrafficError, TrafficTable,
    EXPECTED_COLUMNS,
};
use csv::{ByteRecord, ReaderBuilder, Trim};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

impl CsvData {
    /// Parse a CSV or TSV file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or is not valid delimited text
    pub fn from_file(path: &Path, is_tsv: bool) -> Result<Self> {
        let delimiter = if is_tsv { b'\t' } else { b',' };

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::Headers)
            .from_path(path)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect();

        // Fields are decoded per row so bad UTF-8 falls under the parse policy
        let mut rows = Vec::new();
        for result in reader.byte_records() {
            rows.push(result?);
        }

        debug!(rows = rows.len(), columns = headers.len(), "read delimited file");
        Ok(Self { headers, rows })
    }
}

/// Header positions of the expected columns
struct ColumnMap {
    holiday: usize,
    temp: usize,
    rain_1h: usize,
    snow_1h: usize,
    clouds_all: usize,
    weather_main: usize,
    weather_description: usize,
    date_time: usize,
    traffic_volume: usize,
}

impl ColumnMap {
    fn resolve(csv: &CsvData) -> Result<Self> {
        let missing: Vec<String> = EXPECTED_COLUMNS
            .iter()
            .filter(|name| csv.column_index(name).is_none())
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TrafficError::Schema { missing });
        }

        let idx = |name: &str| csv.column_index(name).unwrap_or_default();
        Ok(Self {
            holiday: idx("holiday"),
            temp: idx("temp"),
            rain_1h: idx("rain_1h"),
            snow_1h: idx("snow_1h"),
            clouds_all: idx("clouds_all"),
            weather_main: idx("weather_main"),
            weather_description: idx("weather_description"),
            date_time: idx("date_time"),
            traffic_volume: idx("traffic_volume"),
        })
    }
}

fn parse_error(row: usize, column: &str, value: &str, reason: impl Display) -> TrafficError {
    TrafficError::Parse {
        row,
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn field<'a>(record: &'a ByteRecord, index: usize, row: usize, column: &str) -> Result<&'a str> {
    let bytes = record
        .get(index)
        .ok_or_else(|| parse_error(row, column, "", "missing value"))?;
    std::str::from_utf8(bytes)
        .map_err(|e| parse_error(row, column, &String::from_utf8_lossy(bytes), e))
}

fn parse_field<T>(record: &ByteRecord, index: usize, row: usize, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = field(record, index, row, column)?;
    raw.trim()
        .parse::<T>()
        .map_err(|e| parse_error(row, column, raw, e))
}

fn parse_measure(record: &ByteRecord, index: usize, row: usize, column: &str) -> Result<f64> {
    let value: f64 = parse_field(record, index, row, column)?;
    if !value.is_finite() || value < 0.0 {
        let raw = field(record, index, row, column)?;
        return Err(parse_error(row, column, raw, "expected a non-negative number"));
    }
    Ok(value)
}

impl Row {
    fn from_record(record: &ByteRecord, cols: &ColumnMap, row: usize) -> Result<Self> {
        let temp: f64 = parse_field(record, cols.temp, row, "temp")?;
        if !temp.is_finite() {
            let raw = field(record, cols.temp, row, "temp")?;
            return Err(parse_error(row, "temp", raw, "expected a finite number"));
        }

        let clouds_all: u8 = parse_field(record, cols.clouds_all, row, "clouds_all")?;
        if clouds_all > 100 {
            let raw = field(record, cols.clouds_all, row, "clouds_all")?;
            return Err(parse_error(row, "clouds_all", raw, "percentage above 100"));
        }

        Ok(Self {
            source_row: row,
            holiday: field(record, cols.holiday, row, "holiday")?.to_string(),
            temp,
            rain_1h: parse_measure(record, cols.rain_1h, row, "rain_1h")?,
            snow_1h: parse_measure(record, cols.snow_1h, row, "snow_1h")?,
            clouds_all,
            weather_main: field(record, cols.weather_main, row, "weather_main")?.to_string(),
            weather_description: field(
                record,
                cols.weather_description,
                row,
                "weather_description",
            )?
            .to_string(),
            date_time: field(record, cols.date_time, row, "date_time")?.to_string(),
            traffic_volume: parse_field(record, cols.traffic_volume, row, "traffic_volume")?,
        })
    }
}

impl TrafficTable {
    /// Map raw CSV records onto typed rows
    ///
    /// # Errors
    /// Returns a schema error if an expected column is missing, or a parse error for the
    /// first malformed row under [`ParsePolicy::FailFast`]
    pub fn from_csv(csv: &CsvData, policy: ParsePolicy) -> Result<Parsed<Self>> {
        let cols = ColumnMap::resolve(csv)?;

        let mut rows = Vec::with_capacity(csv.row_count());
        let mut skipped: Vec<SkippedRow> = Vec::new();

        for (index, record) in csv.rows.iter().enumerate() {
            match Row::from_record(record, &cols, index) {
                Ok(row) => rows.push(row),
                Err(e) => policy.handle(e, &mut skipped)?,
            }
        }

        Ok(Parsed {
            data: Self { rows },
            skipped,
        })
    }

    /// Read and type a dataset file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, the header is incomplete, or a row is
    /// malformed under [`ParsePolicy::FailFast`]
    pub fn load(path: &Path, is_tsv: bool, policy: ParsePolicy) -> Result<Parsed<Self>> {
        if !path.exists() {
            return Err(TrafficError::Config(format!(
                "CSV file not found: {}",
                path.display()
            )));
        }

        let csv = CsvData::from_file(path, is_tsv)?;
        let parsed = Self::from_csv(&csv, policy)?;
        info!(
            path = %path.display(),
            rows = parsed.data.len(),
            skipped = parsed.skipped.len(),
            "loaded traffic table"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "holiday,temp,rain_1h,snow_1h,clouds_all,weather_main,weather_description,date_time,traffic_volume";

    fn create_test_csv(content: impl AsRef<[u8]>) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(content.as_ref()).expect("write content");
        file
    }

    #[test]
    fn test_parse_csv() {
        let content = format!(
            "{HEADER}\nNone,288.28,0.0,0.0,40,Clouds,scattered clouds,2012-10-02 09:00:00,5545\nNone,289.36,0.0,0.0,75,Clouds,broken clouds,2012-10-02 10:00:00,4516"
        );
        let file = create_test_csv(&content);

        let data = CsvData::from_file(file.path(), false).expect("parse csv");

        assert_eq!(data.headers.len(), 9);
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.column_index("traffic_volume"), Some(8));
    }

    #[test]
    fn test_load_typed_rows() {
        let content = format!(
            "{HEADER}\nColumbus Day,273.08,0.25,0.0,90,Rain,light rain,2012-10-08 00:00:00,1439"
        );
        let file = create_test_csv(&content);

        let parsed = TrafficTable::load(file.path(), false, ParsePolicy::FailFast).expect("load");
        let row = &parsed.data.rows[0];

        assert!(parsed.skipped.is_empty());
        assert_eq!(row.holiday, "Columbus Day");
        assert!((row.temp - 273.08).abs() < 1e-9);
        assert!((row.rain_1h - 0.25).abs() < 1e-9);
        assert_eq!(row.clouds_all, 90);
        assert_eq!(row.weather_description, "light rain");
        assert_eq!(row.date_time, "2012-10-08 00:00:00");
        assert_eq!(row.traffic_volume, 1439);
        assert_eq!(row.source_row, 0);
    }

    #[test]
    fn test_header_with_spaces_and_reordered_columns() {
        let content = "date_time, traffic_volume, holiday, temp, rain_1h, snow_1h, clouds_all, weather_main, weather_description\n2013-01-01 12:00:00,3000,None,260.0,0,0,20,Snow,light snow";
        let file = create_test_csv(content);

        let parsed = TrafficTable::load(file.path(), false, ParsePolicy::FailFast).expect("load");

        assert_eq!(parsed.data.rows[0].traffic_volume, 3000);
        assert_eq!(parsed.data.rows[0].weather_main, "Snow");
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let content = "holiday,temp,rain_1h,snow_1h,weather_main,weather_description,date_time\nNone,280.0,0,0,Clear,sky is clear,2013-01-01 12:00:00";
        let file = create_test_csv(content);

        let err = TrafficTable::load(file.path(), false, ParsePolicy::SkipAndReport)
            .expect_err("schema should fail");

        match err {
            TrafficError::Schema { missing } => {
                assert_eq!(missing, vec!["clouds_all", "traffic_volume"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_fail_fast_reports_row_index() {
        let content = format!(
            "{HEADER}\nNone,280.0,0,0,1,Clear,sky is clear,2013-01-01 12:00:00,100\nNone,280.0,0,0,1,Clear,sky is clear,2013-01-01 13:00:00,lots"
        );
        let file = create_test_csv(&content);

        let err = TrafficTable::load(file.path(), false, ParsePolicy::FailFast)
            .expect_err("should fail");

        match err {
            TrafficError::Parse { row, column, value, .. } => {
                assert_eq!(row, 1);
                assert_eq!(column, "traffic_volume");
                assert_eq!(value, "lots");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_and_report_keeps_good_rows() {
        let content = format!(
            "{HEADER}\nNone,280.0,-1,0,1,Rain,light rain,2013-01-01 12:00:00,100\nNone,280.0,0,0,1,Clear,sky is clear,2013-01-01 13:00:00,200\nNone,280.0,0,0,140,Clouds,overcast clouds,2013-01-01 14:00:00,300"
        );
        let file = create_test_csv(&content);

        let parsed = TrafficTable::load(file.path(), false, ParsePolicy::SkipAndReport)
            .expect("load");

        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data.rows[0].traffic_volume, 200);
        let skipped: Vec<_> = parsed.skipped.iter().map(|s| (s.row, s.column.as_str())).collect();
        assert_eq!(skipped, vec![(0, "rain_1h"), (2, "clouds_all")]);
        assert_eq!(parsed.data.rows[0].source_row, 1);
    }

    #[test]
    fn test_invalid_utf8_follows_policy() {
        let mut content = format!(
            "{HEADER}\nNone,280.0,0,0,1,Clear,sky is clear,2013-01-01 12:00:00,100\nNone,280.0,0,0,1,Rain,light "
        )
        .into_bytes();
        content.extend_from_slice(b"r\xffin,2013-01-01 13:00:00,200\n");
        let file = create_test_csv(&content);

        let parsed = TrafficTable::load(file.path(), false, ParsePolicy::SkipAndReport)
            .expect("load");

        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data.rows[0].traffic_volume, 100);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].row, 1);
        assert_eq!(parsed.skipped[0].column, "weather_description");

        let err = TrafficTable::load(file.path(), false, ParsePolicy::FailFast)
            .expect_err("should fail");
        assert!(matches!(err, TrafficError::Parse { row: 1, .. }));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = TrafficTable::load(Path::new("/nonexistent/i94.csv"), false, ParsePolicy::FailFast)
            .expect_err("should fail");
        assert!(matches!(err, TrafficError::Config(_)));
    }
}
