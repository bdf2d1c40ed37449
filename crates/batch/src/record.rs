//! Processed-crash documents: parsing into observations, and storing them in
//! the report table.
use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use counter::{clean_value, Observation, OsScope};
use rowkey::{DateBucket, RowKeyCodec};
use serde::Deserialize;
use table::{CellStore, Row};

use crate::{BatchError, DataShapeError};

/// Family and qualifier holding a processed crash document in the report
/// table.
pub const FAMILY_PROCESSED_DATA: &str = "processed_data";
pub const QUALIFIER_JSON: &str = "json";

/// Signature text counted for crashes the processor could not sign.
pub const NO_SIGNATURE: &str = "(no signature)";

/// `date_processed` format.
pub const DATE_PROCESSED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CPU_LINE: &str = "CPU|";
const MODULE_LINE: &str = "Module|";

/// Inclusive range of calendar days a job counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateBucket,
    pub end: DateBucket,
}

impl DateWindow {
    pub fn new(start: DateBucket, end: DateBucket) -> Self {
        Self { start, end }
    }

    pub fn single(day: DateBucket) -> Self {
        Self { start: day, end: day }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start.date() <= day && day <= self.end.date()
    }
}

/// The fields of a processed crash the counters need.
#[derive(Debug, Deserialize)]
struct ProcessedCrash {
    product: Option<String>,
    version: Option<String>,
    os_name: Option<String>,
    signature: Option<String>,
    reason: Option<String>,
    date_processed: Option<String>,
    #[serde(default)]
    dump: Option<String>,
    #[serde(default)]
    addons: Option<Vec<Vec<String>>>,
}

/// One crash ready to be counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashRecord {
    pub processed_at: NaiveDateTime,
    pub scope: OsScope,
    /// `signature|reason`, or [`NO_SIGNATURE`].
    pub signature: String,
    pub observation: Observation,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, DataShapeError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DataShapeError::MissingField(field)),
    }
}


pub fn parse_date_processed(raw: &str) -> Result<NaiveDateTime, DataShapeError> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_PROCESSED_FORMAT)
        .map_err(|_| DataShapeError::BadDate(raw.to_string()))
}

/// Parses a processed crash document.
///
/// # Errors
///
/// [`DataShapeError`] for invalid JSON, missing fields, unparseable dates,
/// malformed dump lines, or a crash processed outside `window`.
pub fn parse_processed_crash(json: &[u8], window: &DateWindow) -> Result<CrashRecord, DataShapeError> {
    let crash: ProcessedCrash = serde_json::from_slice(json)?;

    let raw_date = required(crash.date_processed, "date_processed")?;
    let processed_at = parse_date_processed(&raw_date)?;
    if !window.contains(processed_at.date()) {
        return Err(DataShapeError::OutsideWindow(processed_at));
    }

    let os = required(crash.os_name, "os_name")?;
    let product = required(crash.product, "product")?;
    let version = required(crash.version, "version")?;
    let signature = match crash.signature {
        Some(sig) => format!("{}|{}", sig, crash.reason.unwrap_or_default()),
        None => NO_SIGNATURE.to_string(),
    };

    let (arch, modules) = parse_dump(crash.dump.as_deref().unwrap_or(""), &os)?;

    let mut addons = BTreeMap::new();
    for addon in crash.addons.unwrap_or_default() {
        match addon.as_slice() {
            [name, version, ..] => {
                addons.insert(clean_value(name), clean_value(version));
            }
            _ => return Err(DataShapeError::Addon(addon.len())),
        }
    }

    Ok(CrashRecord {
        processed_at,
        scope: OsScope::new(DateBucket::from_date(processed_at.date()), product, version, os),
        signature,
        observation: Observation { arch, modules, addons },
    })
}

/// Pulls the arch description and module versions out of a text dump.
///
/// `CPU|x86|GenuineIntel family 6|2` gives `"x86 with 2 cores"`. `Module|`
/// lines carry the version in column 2 on Windows and column 4 elsewhere;
/// only the Windows column is reliable.
fn parse_dump(dump: &str, os: &str) -> Result<(String, BTreeMap<String, String>), DataShapeError> {
    let version_column = if os.starts_with("Win") { 2 } else { 4 };
    let mut arch = String::new();
    let mut modules = BTreeMap::new();

    for line in dump.lines() {
        if line.starts_with(CPU_LINE) {
            let parts: Vec<&str> = line.split('|').collect();
            match (parts.get(1), parts.get(3)) {
                (Some(cpu), Some(cores)) => arch = format!("{} with {} cores", clean_value(cpu), clean_value(cores)),
                _ => return Err(DataShapeError::DumpLine(line.to_string())),
            }
        } else if line.starts_with(MODULE_LINE) {
            let parts: Vec<&str> = line.split('|').collect();
            match (parts.get(1), parts.get(version_column)) {
                (Some(name), Some(version)) => {
                    modules.insert(clean_value(name), clean_value(version));
                }
                _ => return Err(DataShapeError::DumpLine(line.to_string())),
            }
        }
    }
    Ok((arch, modules))
}

/// The processed crash document of a report-table row.
pub fn processed_json(row: &Row) -> Result<&[u8], DataShapeError> {
    row.get(FAMILY_PROCESSED_DATA)
        .and_then(|cells| cells.get(QUALIFIER_JSON))
        .map(Vec::as_slice)
        .ok_or(DataShapeError::MissingDocument)
}

/// Stores a processed crash document in the report table under
/// `[salt?][dateBucket][crashId]`, using the day of `date_processed`.
/// Returns the row key.
pub fn store_processed_crash<S: CellStore>(
    store: &S,
    codec: &RowKeyCodec,
    crash_id: &str,
    json: &[u8],
) -> Result<Vec<u8>, BatchError> {
    #[derive(Deserialize)]
    struct Dated {
        date_processed: Option<String>,
    }

    if crash_id.is_empty() {
        return Err(DataShapeError::MissingField("crash_id").into());
    }
    let dated: Dated = serde_json::from_slice(json).map_err(DataShapeError::from)?;
    let raw = required(dated.date_processed, "date_processed")?;
    let day = DateBucket::from_date(parse_date_processed(&raw)?.date());

    let key = codec.report_key(&day, crash_id);
    store.put(&key, FAMILY_PROCESSED_DATA, QUALIFIER_JSON, json)?;
    tracing::debug!(crash_id, day = %day, "stored processed crash");
    Ok(key)
}
