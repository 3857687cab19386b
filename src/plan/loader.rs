// src/plan/loader.rs

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::errors::{DayplanError, Result};
use crate::plan::model::{Payload, Plan, TaskNode};
use crate::types::Day;

const DAY_HEADERS: &[&str] = &["day", "id"];
const TASK_HEADERS: &[&str] = &["vot name", "task", "role"];
const DEPS_HEADERS: &[&str] = &[
    "dependson",
    "depends_on",
    "deps",
    "dependencies (day #)",
    "dependencies",
];
const PAYLOAD_HEADERS: &[&str] = &["payload"];
const THEME_HEADERS: &[&str] = &["theme"];
const DELIVERABLE_HEADERS: &[&str] = &["primary deliverable", "deliverable"];
const METRICS_TEMPLATE_HEADERS: &[&str] = &["metrics template", "metrics_template"];

/// Role used when a row has no task label.
const FALLBACK_ROLE: &str = "generic";

/// Load a plan from a CSV file.
///
/// Fails with [`DayplanError::PlanNotFound`] if the file cannot be opened.
/// Individual bad rows are logged and skipped. Every call builds a fresh
/// [`Plan`]; nothing is merged with earlier loads.
pub fn load(path: impl AsRef<Path>) -> Result<Plan> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| {
        debug!(path = %path.display(), error = %err, "failed to open plan");
        DayplanError::PlanNotFound(path.to_path_buf())
    })?;

    let mut plan = load_from_reader(file)?;
    plan.set_source(path.to_path_buf());

    info!(
        path = %path.display(),
        nodes = plan.len(),
        "plan loaded"
    );
    Ok(plan)
}

/// Parse a plan from any CSV reader. The first record is the header row.
pub fn load_from_reader<R: Read>(reader: R) -> Result<Plan> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::resolve(&headers);
    if columns.day.is_none() {
        warn!("plan has no Day/Id column; every row will be skipped");
    }

    let mut plan = Plan::new();

    for (idx, record) in rdr.records().enumerate() {
        // Header is line 1.
        let row = idx + 2;

        let record = match record {
            Ok(r) => r,
            Err(err) => {
                let err = DayplanError::RowParse {
                    row,
                    reason: err.to_string(),
                };
                warn!(error = %err, "skipping malformed plan row");
                continue;
            }
        };

        match parse_row(&columns, &record, row) {
            Ok(Some(node)) => {
                let day = node.day;
                if plan.insert(node).is_some() {
                    warn!(day, row, "duplicate day in plan; later row replaces earlier");
                }
            }
            Ok(None) => {
                debug!(row, "skipping row with empty day");
            }
            Err(err) => {
                warn!(error = %err, "skipping plan row");
            }
        }
    }

    Ok(plan)
}

/// Extract the role from a task label like `"Codex Herald – Day 1"`.
///
/// The role is the text before the first dash separator; a label without
/// one is taken whole. Empty labels fall back to `generic`.
pub fn role_from_label(label: &str) -> String {
    let label = label.trim();

    let head = [" – ", " — ", " - "]
        .iter()
        .filter_map(|sep| label.find(sep))
        .min()
        .map(|pos| &label[..pos])
        .or_else(|| label.split(['–', '—']).next())
        .unwrap_or(label)
        .trim();

    if head.is_empty() {
        FALLBACK_ROLE.to_string()
    } else {
        head.to_string()
    }
}

/// Column indices resolved from the header row.
#[derive(Debug, Default)]
struct Columns {
    day: Option<usize>,
    task: Option<usize>,
    deps: Option<usize>,
    payload: Option<usize>,
    theme: Option<usize>,
    deliverable: Option<usize>,
    metrics_template: Option<usize>,
    extra: Vec<(usize, String)>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();

        let find = |synonyms: &[&str]| {
            synonyms
                .iter()
                .find_map(|syn| normalized.iter().position(|h| h == syn))
        };

        let mut columns = Columns {
            day: find(DAY_HEADERS),
            task: find(TASK_HEADERS),
            deps: find(DEPS_HEADERS),
            payload: find(PAYLOAD_HEADERS),
            theme: find(THEME_HEADERS),
            deliverable: find(DELIVERABLE_HEADERS),
            metrics_template: find(METRICS_TEMPLATE_HEADERS),
            extra: Vec::new(),
        };

        let known = [
            columns.day,
            columns.task,
            columns.deps,
            columns.payload,
            columns.theme,
            columns.deliverable,
            columns.metrics_template,
        ];
        for (idx, header) in headers.iter().enumerate() {
            if !known.contains(&Some(idx)) && !header.trim().is_empty() {
                columns.extra.push((idx, header.trim().to_string()));
            }
        }

        columns
    }
}

fn normalize_header(h: &str) -> String {
    h.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

fn parse_row(columns: &Columns, record: &StringRecord, row: usize) -> Result<Option<TaskNode>> {
    let day_raw = field(record, columns.day);
    if day_raw.is_empty() {
        return Ok(None);
    }

    let day: Day = match day_raw.parse::<Day>() {
        Ok(d) if d > 0 => d,
        _ => {
            return Err(DayplanError::RowParse {
                row,
                reason: format!("day '{day_raw}' is not a positive integer"),
            });
        }
    };

    let label = field(record, columns.task).to_string();
    let role = role_from_label(&label);

    let extra: BTreeMap<String, String> = columns
        .extra
        .iter()
        .filter_map(|(idx, name)| {
            let value = record.get(*idx)?.trim();
            (!value.is_empty()).then(|| (name.clone(), value.to_string()))
        })
        .collect();

    Ok(Some(TaskNode {
        day,
        label,
        role,
        theme: field(record, columns.theme).to_string(),
        deliverable: field(record, columns.deliverable).to_string(),
        metrics_template: field(record, columns.metrics_template).to_string(),
        depends_on: parse_deps(field(record, columns.deps)),
        payload: Payload::parse(field(record, columns.payload)),
        extra,
    }))
}

/// Parse a dependency list such as `"1, 2,x,,3"` into `[1, 2, 3]`.
///
/// Non-numeric and empty tokens are dropped; duplicates keep their first
/// position.
pub(crate) fn parse_deps(raw: &str) -> Vec<Day> {
    let mut deps = Vec::new();
    for token in raw.split([',', ';']) {
        match token.trim().parse::<Day>() {
            Ok(day) if day > 0 => {
                if !deps.contains(&day) {
                    deps.push(day);
                }
            }
            _ => {}
        }
    }
    deps
}
