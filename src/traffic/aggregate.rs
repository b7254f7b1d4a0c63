//! Group-wise means over a (sub-)table

use crate::structs::{
    DerivedTable, GroupAggregate, GroupKey, GroupMean, KeyValue, NumericColumn, SeriesPoint,
};
use std::collections::BTreeMap;

impl GroupMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

impl GroupAggregate {
    /// Mean of the target column for one group, if the group has rows
    #[allow(dead_code)]
    #[must_use]
    pub fn mean(&self, key: &KeyValue) -> Option<f64> {
        self.groups.get(key).map(GroupMean::mean)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[allow(dead_code)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Points ordered by key
    #[must_use]
    pub fn series(&self) -> Vec<SeriesPoint> {
        self.groups
            .iter()
            .map(|(key, acc)| SeriesPoint {
                key: key.clone(),
                mean: acc.mean(),
                count: acc.count,
            })
            .collect()
    }

    /// Group with the highest mean
    #[must_use]
    pub fn peak(&self) -> Option<SeriesPoint> {
        self.series()
            .into_iter()
            .max_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Mean of `target` per distinct value of `key`.
///
/// Values are summed in input row order; groups without rows never appear.
#[must_use]
pub fn aggregate(table: &DerivedTable, key: GroupKey, target: NumericColumn) -> GroupAggregate {
    let mut groups: BTreeMap<KeyValue, GroupMean> = BTreeMap::new();
    for row in &table.rows {
        groups.entry(key.value(row)).or_default().push(target.value(row));
    }

    GroupAggregate {
        key,
        target,
        groups,
    }
}

/// One aggregate per target column, in a single pass over the rows
#[must_use]
pub fn aggregate_columns(
    table: &DerivedTable,
    key: GroupKey,
    targets: &[NumericColumn],
) -> Vec<GroupAggregate> {
    let mut groups: Vec<BTreeMap<KeyValue, GroupMean>> = vec![BTreeMap::new(); targets.len()];
    for row in &table.rows {
        let value = key.value(row);
        for (target, acc) in targets.iter().zip(groups.iter_mut()) {
            acc.entry(value.clone()).or_default().push(target.value(row));
        }
    }

    targets
        .iter()
        .zip(groups)
        .map(|(&target, groups)| GroupAggregate {
            key,
            target,
            groups,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::{ParsePolicy, Row, TrafficError};
    use crate::traffic::partition::select;
    use crate::traffic::time::derive;
    use crate::traffic::time::tests::{row, table};

    fn derived(rows: Vec<Row>) -> DerivedTable {
        derive(&table(rows), ParsePolicy::FailFast)
            .expect("derive")
            .data
    }

    #[test]
    fn test_mean_of_two_rows() {
        let table = derived(vec![
            row("2018-01-01 08:00:00", 4000),
            row("2018-01-08 08:00:00", 6000),
        ]);

        let agg = aggregate(&table, GroupKey::Hour, NumericColumn::TrafficVolume);

        assert_eq!(agg.len(), 1);
        assert_eq!(agg.mean(&KeyValue::Int(8)), Some(5000.0));
    }

    #[test]
    fn test_single_row_group_is_exact() {
        let mut r = row("2018-01-01 08:00:00", 0);
        r.temp = 271.123_456_789;
        let table = derived(vec![r]);

        let agg = aggregate(&table, GroupKey::Month, NumericColumn::Temp);

        assert_eq!(agg.mean(&KeyValue::Int(1)), Some(271.123_456_789));
    }

    #[test]
    fn test_categorical_keys() {
        let mut rain = row("2018-01-01 08:00:00", 3000);
        rain.weather_main = "Rain".to_string();
        let mut snow = row("2018-01-01 09:00:00", 5000);
        snow.weather_main = "Snow".to_string();
        let mut rain2 = row("2018-01-01 10:00:00", 4000);
        rain2.weather_main = "Rain".to_string();
        let table = derived(vec![rain, snow, rain2]);

        let agg = aggregate(&table, GroupKey::WeatherMain, NumericColumn::TrafficVolume);

        assert_eq!(agg.mean(&KeyValue::Text("Rain".into())), Some(3500.0));
        assert_eq!(agg.mean(&KeyValue::Text("Snow".into())), Some(5000.0));
        assert_eq!(agg.mean(&KeyValue::Text("Fog".into())), None);
        assert_eq!(agg.peak().map(|p| p.key), Some(KeyValue::Text("Snow".into())));
    }

    #[test]
    fn test_july_years_without_rows_are_absent() {
        let table = derived(vec![
            row("2015-07-05 10:00:00", 4000),
            row("2016-06-30 10:00:00", 9999),
            row("2016-08-01 10:00:00", 9999),
            row("2017-07-01 10:00:00", 5000),
            row("2017-07-02 10:00:00", 6000),
        ]);

        let only_july = select(&table, |r| r.calendar.month == 7);
        let agg = aggregate(&only_july, GroupKey::Year, NumericColumn::TrafficVolume);

        let years: Vec<KeyValue> = agg.groups.keys().cloned().collect();
        assert_eq!(years, vec![KeyValue::Int(2015), KeyValue::Int(2017)]);
        assert_eq!(agg.mean(&KeyValue::Int(2016)), None);
        assert_eq!(agg.mean(&KeyValue::Int(2017)), Some(5500.0));
    }

    #[test]
    fn test_repeated_aggregation_is_identical() {
        let mut rows = Vec::new();
        for (i, v) in [0.1, 0.2, 0.3, 1e16, -1e16].into_iter().enumerate() {
            let mut r = row(&format!("2018-02-0{} 10:00:00", i + 1), 1);
            r.temp = v;
            rows.push(r);
        }
        let table = derived(rows);

        let first = aggregate(&table, GroupKey::Hour, NumericColumn::Temp);
        let second = aggregate(&table, GroupKey::Hour, NumericColumn::Temp);

        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_columns_matches_single() {
        let table = derived(vec![
            row("2018-01-01 08:00:00", 4000),
            row("2018-01-02 09:00:00", 6000),
            row("2018-01-03 08:00:00", 1000),
        ]);

        let many = aggregate_columns(
            &table,
            GroupKey::Hour,
            &[NumericColumn::TrafficVolume, NumericColumn::DayOfWeek],
        );

        assert_eq!(many.len(), 2);
        assert_eq!(
            many[0],
            aggregate(&table, GroupKey::Hour, NumericColumn::TrafficVolume)
        );
        assert_eq!(many[1].mean(&KeyValue::Int(8)), Some(1.0));
    }

    #[test]
    fn test_source_table_untouched() {
        let table = derived(vec![row("2018-01-01 08:00:00", 4000)]);
        let before = table.clone();

        let _ = aggregate(&table, GroupKey::WeatherDescription, NumericColumn::TrafficVolume);

        assert_eq!(table, before);
    }

    #[test]
    fn test_unknown_names_are_config_errors() {
        assert!(matches!("minute".parse::<GroupKey>(), Err(TrafficError::Config(_))));
        assert!(matches!("speed".parse::<NumericColumn>(), Err(TrafficError::Config(_))));
        assert_eq!("weather_main".parse::<GroupKey>().ok(), Some(GroupKey::WeatherMain));
        assert_eq!("rain_1h".parse::<NumericColumn>().ok(), Some(NumericColumn::Rain1h));
    }
}
