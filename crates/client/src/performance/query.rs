//! Performance reporting query builder
//!
//! Accumulates measure selections, dimension groupings, filter criteria,
//! pivot configuration and paging/sort options, then serializes itself
//! into a flat key-value parameter set and issues one HTTP GET. Results
//! are memoized per builder instance; re-iterating does not re-query.

use std::collections::BTreeMap;

use adknowledge_domain::{AdknowledgeError, Dimension, FilterKey, Measure, Pivot, Result};
use chrono::NaiveDate;
use indexmap::IndexSet;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::http::HttpClient;

/// One result row: dimension/measure key to value.
pub type Record = serde_json::Map<String, Value>;

/// Query builder for the performance reporting endpoint.
///
/// Every setter validates its input against the fixed vocabularies
/// before mutating anything, so a rejected call leaves the builder in
/// its prior valid state. Setters return `&mut Self` (in a `Result`
/// where validation can fail) to support fluent `?`-chaining.
#[derive(Debug)]
pub struct Performance {
    config: Config,
    measures: IndexSet<Measure>,
    dimensions: IndexSet<Dimension>,
    filter: BTreeMap<&'static str, String>,
    options: BTreeMap<&'static str, String>,
    sort_option: Option<String>,
    pivot: Option<Pivot>,
    records: Option<Vec<Record>>,
}

impl Performance {
    /// Create an empty query against the configured endpoint.
    ///
    /// The filter is seeded with the API defaults
    /// `{product_id: "2", product_guid: "*"}`.
    pub fn new(config: Config) -> Self {
        let mut filter = BTreeMap::new();
        filter.insert(Dimension::ProductId.as_str(), "2".to_owned());
        filter.insert(Dimension::ProductGuid.as_str(), "*".to_owned());
        Self {
            config,
            measures: IndexSet::new(),
            dimensions: IndexSet::new(),
            filter,
            options: BTreeMap::new(),
            sort_option: None,
            pivot: None,
            records: None,
        }
    }

    /// Specify the measure(s) to select in the query.
    ///
    /// Merges into the current selection; repeats of the same identifier
    /// collapse.
    ///
    /// # Errors
    /// `InvalidSelection` when any identifier is outside the measure
    /// vocabulary; the selection is untouched in that case.
    pub fn select<I, S>(&mut self, selections: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_all::<Measure, _, _>(selections, |name| {
            AdknowledgeError::InvalidSelection(format!("invalid measurement selection: {name}"))
        })?;
        self.measures.extend(parsed);
        Ok(self)
    }

    /// Specify the dimension(s) to group measures by.
    ///
    /// # Errors
    /// `InvalidSelection` when any identifier is outside the dimension
    /// vocabulary; the grouping is untouched in that case.
    pub fn group_by<I, S>(&mut self, groupings: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = parse_all::<Dimension, _, _>(groupings, |name| {
            AdknowledgeError::InvalidSelection(format!("invalid dimension group: {name}"))
        })?;
        self.dimensions.extend(parsed);
        Ok(self)
    }

    /// Specify filter criteria to limit the query by.
    ///
    /// Valid keys are every dimension plus `start_date`/`end_date`;
    /// values are stringified before merging. (The upstream API calls
    /// this `where`, which is a keyword here.)
    ///
    /// # Errors
    /// `InvalidFilter` when any key is outside the filter vocabulary;
    /// the filter is untouched in that case.
    pub fn filter<I, K, V>(&mut self, criteria: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let mut accepted = Vec::new();
        for (key, value) in criteria {
            let key = FilterKey::from_wire(key.as_ref()).ok_or_else(|| {
                AdknowledgeError::InvalidFilter(format!(
                    "invalid filter criteria: {}",
                    key.as_ref()
                ))
            })?;
            accepted.push((key.as_str(), value.to_string()));
        }
        self.filter.extend(accepted);
        Ok(self)
    }

    /// Filter to a report date range, bounds inclusive.
    pub fn date_range(&mut self, start: NaiveDate, end: NaiveDate) -> &mut Self {
        self.filter.insert(FilterKey::StartDate.as_str(), start.format("%Y-%m-%d").to_string());
        self.filter.insert(FilterKey::EndDate.as_str(), end.format("%Y-%m-%d").to_string());
        self
    }

    /// Specify the number of results to return.
    pub fn limit(&mut self, limit: u32) -> &mut Self {
        self.options.insert("limit", limit.to_string());
        self
    }

    /// Specify the column index to sort by.
    pub fn sort(&mut self, sort_option: u32) -> &mut Self {
        self.sort_option = Some(sort_option.to_string());
        self
    }

    /// Whether to display the full set even if entries are 0.
    pub fn full(&mut self, full: bool) -> &mut Self {
        self.options.insert("full", booleanize(full));
        self
    }

    /// Disable caching of queries. By default the API caches for 60 seconds.
    pub fn nocache(&mut self, nocache: bool) -> &mut Self {
        self.options.insert("nocache", booleanize(nocache));
        self
    }

    /// Force filtered dimensions to be shown.
    pub fn display_all(&mut self, display_all: bool) -> &mut Self {
        self.options.insert("display_all", booleanize(display_all));
        self
    }

    /// Specify pivot options. Each call fully replaces the previous
    /// pivot configuration.
    ///
    /// # Errors
    /// `InvalidPivot` when pivoting on a dimension that has not been
    /// grouped; the prior configuration is kept in that case.
    pub fn pivot(&mut self, pivot: Pivot) -> Result<&mut Self> {
        if let Pivot::Field(dimension) = pivot {
            if !self.dimensions.contains(&dimension) {
                return Err(AdknowledgeError::InvalidPivot(format!(
                    "pivotted field must be a grouped dimension: {dimension}"
                )));
            }
        }
        self.pivot = Some(pivot);
        Ok(self)
    }

    /// The accumulated measure selection, in insertion order.
    pub fn measures(&self) -> &IndexSet<Measure> {
        &self.measures
    }

    /// The accumulated dimension groupings, in insertion order.
    pub fn dimensions(&self) -> &IndexSet<Dimension> {
        &self.dimensions
    }

    /// The wire parameter set this query serializes to.
    ///
    /// Deterministic assembly, later merges winning on key collision:
    /// token, filter, options (`display_all` renamed to `all`), pivot,
    /// then `measures`/`dimensions` comma-joined when non-empty, then
    /// `sort` when set.
    ///
    /// # Errors
    /// `MissingToken` when the configuration carries no token.
    pub fn query_params(&self) -> Result<BTreeMap<String, String>> {
        let token = self.config.require_token()?;
        let mut params = BTreeMap::new();
        params.insert("token".to_owned(), token.to_owned());
        for (key, value) in &self.filter {
            params.insert((*key).to_owned(), value.clone());
        }
        for (key, value) in &self.options {
            let wire_key = if *key == "display_all" { "all" } else { *key };
            params.insert(wire_key.to_owned(), value.clone());
        }
        if let Some(pivot) = self.pivot {
            params.insert(pivot.wire_key().to_owned(), pivot.wire_value().to_owned());
        }
        if !self.measures.is_empty() {
            params.insert("measures".to_owned(), join(self.measures.iter().map(|m| m.as_str())));
        }
        if !self.dimensions.is_empty() {
            params
                .insert("dimensions".to_owned(), join(self.dimensions.iter().map(|d| d.as_str())));
        }
        if let Some(sort) = &self.sort_option {
            params.insert("sort".to_owned(), sort.clone());
        }
        Ok(params)
    }

    /// Run the query (once) and return the result rows.
    ///
    /// The first call performs exactly one GET; the rows are memoized
    /// for the lifetime of the builder, so subsequent calls and
    /// iteration re-yield them without touching the network.
    ///
    /// # Errors
    /// - `MissingToken` before any network activity when no token is set
    /// - `RemoteApi` when the response envelope carries an error message
    /// - `Transport` on network/timeout/parse failure
    pub async fn records(&mut self) -> Result<&[Record]> {
        if self.records.is_none() {
            let rows = self.fetch().await?;
            self.records = Some(rows);
        }
        Ok(self.records.as_deref().unwrap_or_default())
    }

    /// Indexed access into the memoized result rows.
    ///
    /// Returns `None` until [`records`](Self::records) has completed
    /// successfully.
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.as_ref()?.get(index)
    }

    /// Iterate the memoized result rows, if any.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().flatten()
    }

    async fn fetch(&self) -> Result<Vec<Record>> {
        let params = self.query_params()?;
        let url = self.config.performance_url().join("performance.json").map_err(|e| {
            AdknowledgeError::InvalidArgument(format!("invalid performance endpoint: {e}"))
        })?;

        let http = HttpClient::new()?;
        let response = http.send(http.request(Method::GET, url).query(&params)).await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "unknown error".to_owned());
            return Err(AdknowledgeError::RemoteApi(format!("HTTP {status}: {text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AdknowledgeError::Transport(format!("invalid JSON response: {e}")))?;

        match body.get("data") {
            Some(data) => {
                let rows: Vec<Record> = serde_json::from_value(data.clone()).map_err(|e| {
                    AdknowledgeError::Transport(format!("malformed data envelope: {e}"))
                })?;
                debug!(rows = rows.len(), "performance query returned data");
                Ok(rows)
            }
            None => Err(AdknowledgeError::RemoteApi(error_message(&body))),
        }
    }
}

fn parse_all<T, I, S>(names: I, err: impl Fn(&str) -> AdknowledgeError) -> Result<Vec<T>>
where
    T: std::str::FromStr,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = Vec::new();
    for name in names {
        let name = name.as_ref();
        parsed.push(name.parse::<T>().map_err(|_| err(name))?);
    }
    Ok(parsed)
}

fn booleanize(value: bool) -> String {
    if value { "1" } else { "0" }.to_owned()
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(",")
}

/// Pull a human-readable message out of an error envelope.
fn error_message(body: &Value) -> String {
    if let Some(error) = body.get("error") {
        match error {
            Value::String(s) => return s.clone(),
            other => {
                for key in ["message", "str"] {
                    if let Some(Value::String(s)) = other.get(key) {
                        return s.clone();
                    }
                }
            }
        }
    }
    if let Some(Value::String(s)) = body.get("message") {
        return s.clone();
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> Performance {
        Performance::new(Config::new("T"))
    }

    #[test]
    fn select_accumulates_measures() {
        let mut q = query();
        q.select(["revenue"]).unwrap();
        q.select(["paid_clicks"]).unwrap();
        q.select(["revenue"]).unwrap(); // idempotent on repeats
        let selected: Vec<&str> = q.measures().iter().map(|m| m.as_str()).collect();
        assert_eq!(selected, ["revenue", "paid_clicks"]);
    }

    #[test]
    fn select_supports_multiple_selections() {
        let mut q = query();
        q.select(["revenue", "paid_clicks"]).unwrap();
        assert_eq!(q.measures().len(), 2);
        assert!(q.measures().contains(&Measure::Revenue));
        assert!(q.measures().contains(&Measure::PaidClicks));
    }

    #[test]
    fn select_rejects_invalid_measure_and_leaves_state() {
        let mut q = query();
        q.select(["revenue"]).unwrap();
        let err = q.select(["revenue", "wtf"]).unwrap_err();
        assert!(matches!(err, AdknowledgeError::InvalidSelection(_)));
        assert_eq!(q.measures().len(), 1, "failed call must not mutate the selection");
    }

    #[test]
    fn group_by_accumulates_dimensions() {
        let mut q = query();
        q.group_by(["report_date"]).unwrap();
        q.group_by(["revenue_type"]).unwrap();
        assert!(q.dimensions().contains(&Dimension::ReportDate));
        assert!(q.dimensions().contains(&Dimension::RevenueType));
    }

    #[test]
    fn group_by_rejects_invalid_dimension() {
        let mut q = query();
        let err = q.group_by(["wtc"]).unwrap_err();
        assert!(matches!(err, AdknowledgeError::InvalidSelection(_)));
        assert!(q.dimensions().is_empty());
    }

    #[test]
    fn filter_merges_stringified_values() {
        let mut q = query();
        q.filter([("start_date", 0)]).unwrap();
        q.filter([("domain_group", "AOL Group")]).unwrap();
        let params = q.query_params().unwrap();
        assert_eq!(params["start_date"], "0");
        assert_eq!(params["domain_group"], "AOL Group");
        // defaults survive
        assert_eq!(params["product_id"], "2");
        assert_eq!(params["product_guid"], "*");
    }

    #[test]
    fn filter_rejects_measures_as_keys() {
        let mut q = query();
        let err = q.filter([("revenue", 0)]).unwrap_err();
        assert!(matches!(err, AdknowledgeError::InvalidFilter(_)));
        let params = q.query_params().unwrap();
        assert!(!params.contains_key("revenue"));
    }

    #[test]
    fn date_range_sets_both_bounds() {
        let mut q = query();
        q.date_range(
            NaiveDate::from_ymd_opt(2013, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2013, 4, 7).unwrap(),
        );
        let params = q.query_params().unwrap();
        assert_eq!(params["start_date"], "2013-04-01");
        assert_eq!(params["end_date"], "2013-04-07");
    }

    #[test]
    fn pivot_requires_grouped_dimension() {
        let mut q = query();
        q.group_by(["country_cd"]).unwrap();
        q.pivot(Pivot::field("country_cd").unwrap()).unwrap();
        let err = q.pivot(Pivot::field("report_date").unwrap()).unwrap_err();
        assert!(matches!(err, AdknowledgeError::InvalidPivot(_)));
        // prior pivot survives the failed call
        assert_eq!(q.query_params().unwrap()["pivot"], "country_cd");
    }

    #[test]
    fn pivot_wildcard_is_always_valid() {
        let mut q = query();
        q.pivot(Pivot::field("*").unwrap()).unwrap();
        assert_eq!(q.query_params().unwrap()["pivot"], "*");
    }

    #[test]
    fn pivot_replaces_previous_configuration() {
        let mut q = query();
        q.group_by(["country_cd"]).unwrap();
        q.pivot(Pivot::field("country_cd").unwrap()).unwrap();
        q.pivot(Pivot::sum("paid_clicks").unwrap()).unwrap();
        let params = q.query_params().unwrap();
        assert_eq!(params.get("pivot"), None);
        assert_eq!(params["sum"], "paid_clicks");
    }

    #[test]
    fn query_params_assembles_the_exact_wire_set() {
        let mut q = query();
        q.filter([("start_date", 1)])
            .unwrap()
            .select(["revenue", "paid_clicks"])
            .unwrap()
            .group_by(["subid", "report_date"])
            .unwrap()
            .pivot(Pivot::field("report_date").unwrap())
            .unwrap()
            .nocache(true)
            .display_all(true)
            .full(true)
            .sort(2)
            .limit(20);

        let expected: BTreeMap<String, String> = [
            ("token", "T"),
            ("product_guid", "*"),
            ("product_id", "2"),
            ("start_date", "1"),
            ("measures", "revenue,paid_clicks"),
            ("dimensions", "subid,report_date"),
            ("pivot", "report_date"),
            ("nocache", "1"),
            ("full", "1"),
            ("all", "1"),
            ("sort", "2"),
            ("limit", "20"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        assert_eq!(q.query_params().unwrap(), expected);
    }

    #[test]
    fn query_params_omits_empty_sections() {
        let q = query();
        let params = q.query_params().unwrap();
        assert!(!params.contains_key("measures"));
        assert!(!params.contains_key("dimensions"));
        assert!(!params.contains_key("sort"));
        assert!(!params.contains_key("limit"));
    }

    #[test]
    fn query_params_requires_token() {
        let q = Performance::new(Config::without_token());
        assert_eq!(q.query_params().unwrap_err(), AdknowledgeError::MissingToken);
    }

    #[test]
    fn boolean_options_render_as_wire_flags() {
        let mut q = query();
        q.full(false).nocache(true).display_all(false);
        let params = q.query_params().unwrap();
        assert_eq!(params["full"], "0");
        assert_eq!(params["nocache"], "1");
        assert_eq!(params["all"], "0");
    }

    #[test]
    fn error_message_handles_common_envelope_shapes() {
        let body: Value = serde_json::json!({"error": "login incorrect"});
        assert_eq!(error_message(&body), "login incorrect");
        let body: Value = serde_json::json!({"error": {"message": "token mismatch"}});
        assert_eq!(error_message(&body), "token mismatch");
        let body: Value = serde_json::json!({"message": "bad request"});
        assert_eq!(error_message(&body), "bad request");
    }
}
