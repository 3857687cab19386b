// src/behaviors.rs

//! Built-in role handlers.
//!
//! Each role writes a single text artifact named `day<NNN>_<suffix>.<ext>`
//! into the artifact directory and reports where it went. They are
//! deliberately simple drafts; real deployments register their own
//! handlers over these.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::exec::handler::{Handler, HandlerContext, HandlerFuture, MetricMap, MetricValue};
use crate::exec::registry::{HandlerRegistry, DEFAULT_ROLE};
use crate::plan::TaskNode;

/// Renders the artifact body for a node at a timestamp.
type Render = fn(&TaskNode, &str) -> String;

/// Optional extra numeric metric computed from the rendered body.
type Measure = fn(&str) -> f64;

/// A handler that renders one artifact file.
#[derive(Clone, Copy)]
pub struct ArtifactHandler {
    pub suffix: &'static str,
    pub ext: &'static str,
    render: Render,
    measure: Option<(&'static str, Measure)>,
}

impl ArtifactHandler {
    pub const fn new(suffix: &'static str, ext: &'static str, render: Render) -> Self {
        Self {
            suffix,
            ext,
            render,
            measure: None,
        }
    }

    pub const fn with_measure(mut self, key: &'static str, measure: Measure) -> Self {
        self.measure = Some((key, measure));
        self
    }

    async fn write(&self, node: &TaskNode, ctx: &HandlerContext) -> anyhow::Result<MetricMap> {
        tokio::fs::create_dir_all(ctx.artifact_dir()).await?;

        let path = ctx.artifact_path(node.day, self.suffix, self.ext);
        let body = (self.render)(node, &Utc::now().to_rfc3339());
        tokio::fs::write(&path, body.as_bytes()).await?;

        debug!(day = node.day, path = %path.display(), "artifact written");

        let mut metrics = MetricMap::new();
        metrics.insert("files_created".into(), MetricValue::Number(1.0));
        metrics.insert(
            "artifact_url".into(),
            MetricValue::Text(path.display().to_string()),
        );
        if let Some((key, measure)) = self.measure {
            metrics.insert(key.into(), MetricValue::Number(measure(&body)));
        }
        Ok(metrics)
    }
}

impl Handler for ArtifactHandler {
    fn run<'a>(&'a self, node: &'a TaskNode, ctx: &'a HandlerContext) -> HandlerFuture<'a> {
        Box::pin(self.write(node, ctx))
    }
}

/// Register every built-in role, including the `generic` default.
pub fn register_builtin(registry: &mut HandlerRegistry) {
    for (role, handler) in BUILTIN {
        registry.register(role, Arc::new(*handler));
    }
}

/// Roles shipped with the crate.
pub const BUILTIN: &[(&str, ArtifactHandler)] = &[
    (DEFAULT_ROLE, ArtifactHandler::new("generic", "txt", render_generic)),
    (
        "codex_herald",
        ArtifactHandler::new("codex_herald", "md", render_codex).with_measure("sections", count_headings),
    ),
    ("field_theorist", ArtifactHandler::new("field_theory", "txt", render_notes)),
    ("gatekeeper", ArtifactHandler::new("benefactor_invitation", "txt", render_notes)),
    ("glyph_envoy", ArtifactHandler::new("glyph_brief", "txt", render_notes)),
    ("governance_mason", ArtifactHandler::new("governance_outline", "txt", render_notes)),
    ("lab_warden", ArtifactHandler::new("lab_setup", "txt", render_checklist)),
    ("narrative_weaver", ArtifactHandler::new("narrative", "txt", render_notes)),
    (
        "netweaver",
        ArtifactHandler::new("codexnet", "html", render_html).with_measure("html_bytes", byte_len),
    ),
    ("node_engineer", ArtifactHandler::new("node_spec", "txt", render_notes)),
    (
        "patent_sentinel",
        ArtifactHandler::new("patent_claims", "txt", render_claims).with_measure("claims", count_claims),
    ),
    ("symbol_keeper", ArtifactHandler::new("symbol_notes", "txt", render_notes)),
    ("waterwright", ArtifactHandler::new("water_test_results", "txt", render_notes)),
];

fn render_generic(node: &TaskNode, ts: &str) -> String {
    format!(
        "[{ts}] AUTO DRAFT\n{}\nDeliverable: {}\n",
        node.label, node.deliverable
    )
}

fn render_notes(node: &TaskNode, ts: &str) -> String {
    let mut out = format!("{} notes\nDay: {}\nTimestamp: {ts}\n", node.role, node.day);
    if !node.theme.is_empty() {
        out.push_str(&format!("Theme: {}\n", node.theme));
    }
    out.push_str(&format!("Deliverable: {}\n", node.deliverable));
    out
}

fn render_codex(node: &TaskNode, ts: &str) -> String {
    format!(
        "# Codex Preface (auto snapshot)\nTimestamp: {ts}\n\n## Theme\n{}\n\n## Deliverable\n{}\n",
        node.theme, node.deliverable
    )
}

fn render_checklist(node: &TaskNode, ts: &str) -> String {
    format!(
        "Lab Warden Checklist\nDate: {ts}\n- Secure data environment\n- Configure sandbox instances\n- Deliverable: {}\n",
        node.deliverable
    )
}

fn render_html(node: &TaskNode, ts: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><title>Day {day}</title></head>\n<body>\n<h1>{role}</h1>\n<p>{deliverable}</p>\n<footer>{ts}</footer>\n</body></html>\n",
        day = node.day,
        role = node.role,
        deliverable = node.deliverable,
    )
}

fn render_claims(node: &TaskNode, ts: &str) -> String {
    format!(
        "Provisional claims draft\nTimestamp: {ts}\nClaim 1: A method for {}.\nClaim 2: The method of claim 1, scheduled by dependency order.\n",
        node.deliverable
    )
}

fn count_headings(body: &str) -> f64 {
    body.lines().filter(|l| l.starts_with("## ")).count() as f64
}

fn count_claims(body: &str) -> f64 {
    body.lines().filter(|l| l.starts_with("Claim ")).count() as f64
}

fn byte_len(body: &str) -> f64 {
    body.len() as f64
}
