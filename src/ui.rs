//! Terminal output: a spinner while the regel-api works, and a compact
//! summary of the subsumsjon afterwards.
//!
//! Uses `indicatif` for the spinner and `console` for colours.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::Problem;
use crate::regelapi::Subsumsjon;

pub struct BeregningProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl BeregningProgress {
    pub fn start(kontekst: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Beregner ({kontekst})..."));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    pub fn finish_ok(&self, subsumsjon: &Subsumsjon) {
        self.pb.finish_and_clear();
        println!("  {} Subsumsjon ready", self.green.apply_to("✓"));
        for line in summary_lines(subsumsjon) {
            println!("    {line}");
        }
        if let Some(behov_id) = &subsumsjon.behov_id {
            println!("    {}", self.dim.apply_to(format!("behov {behov_id}")));
        }
    }

    pub fn finish_err(&self, problem: &Problem) {
        self.pb.finish_and_clear();
        eprintln!(
            "  {} {} ({})",
            self.red.apply_to("✗"),
            problem.title,
            problem.status
        );
        if let Some(detail) = &problem.detail {
            eprintln!("    {}", self.dim.apply_to(detail));
        }
    }
}

fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "ja",
        Some(false) => "nei",
        None => "-",
    }
}

/// One line per result present, in regel order.
fn summary_lines(subsumsjon: &Subsumsjon) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(r) = &subsumsjon.minsteinntekt_resultat {
        lines.push(format!(
            "minsteinntekt oppfylt: {} [{}]",
            flag(r.oppfyller_minsteinntekt),
            r.subsumsjons_id
        ));
    }
    if let Some(r) = &subsumsjon.periode_resultat {
        let uker = r
            .periode_antall_uker
            .map_or_else(|| "-".to_string(), |u| u.to_string());
        lines.push(format!("periode: {uker} uker [{}]", r.subsumsjons_id));
    }
    if let Some(r) = &subsumsjon.grunnlag_resultat {
        lines.push(format!(
            "grunnlag: {} (uavkortet {}) [{}]",
            r.avkortet.as_deref().unwrap_or("-"),
            r.uavkortet.as_deref().unwrap_or("-"),
            r.subsumsjons_id
        ));
    }
    if let Some(r) = &subsumsjon.sats_resultat {
        let dagsats = r.dagsats.map_or_else(|| "-".to_string(), |d| d.to_string());
        let ukesats = r.ukesats.map_or_else(|| "-".to_string(), |u| u.to_string());
        lines.push(format!(
            "sats: {dagsats} per dag, {ukesats} per uke [{}]",
            r.subsumsjons_id
        ));
    }
    lines
}
