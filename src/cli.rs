//! Command line interface built on clap.
//!
//! [`Cli`] carries the global flags (`--config`, `--verbose`) and the
//! [`Command`] to run: a full calculation or a single status probe.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// dp-kalkulator: runs dagpenger calculations against the regel-api.
#[derive(Debug, Parser)]
#[command(name = "dp-kalkulator", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML configuration file (default: ./kalkulator.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enables debug logging unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Starts a behov, waits for it and prints the subsumsjon.
    Beregn(BeregnArgs),

    /// Recalculates for a person under the `corona` kontekst, as a trusted service.
    Reberegn(ReberegnArgs),

    /// Asks the regel-api once for the status of a behov.
    Status {
        /// Status location returned when the behov was started.
        handle: String,
    },
}

/// Who to calculate for: exactly one of `--fnr` or `--aktor-id`.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct Subject {
    /// National identity number, resolved through PDL.
    #[arg(long)]
    pub fnr: Option<String>,

    /// Aktør id, used as-is.
    #[arg(long)]
    pub aktor_id: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct BeregnArgs {
    #[command(flatten)]
    pub subject: Subject,

    /// Rule context to evaluate (for example `corona` or `veiledning`).
    #[arg(long)]
    pub kontekst: String,

    #[arg(long)]
    pub antall_barn: Option<u32>,

    /// Manually set basis amount.
    #[arg(long)]
    pub manuelt_grunnlag: Option<u32>,

    /// The person has completed military service.
    #[arg(long, default_value_t = false)]
    pub verneplikt: bool,

    /// Prints the raw subsumsjon JSON instead of a summary.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ReberegnArgs {
    /// National identity number, resolved through PDL.
    #[arg(long)]
    pub fnr: String,

    /// Key matching the configured `forskudd_api_key`.
    #[arg(long)]
    pub api_key: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl BeregnArgs {
    /// True when any case-specific fact was given on the command line.
    pub fn has_facts(&self) -> bool {
        self.antall_barn.is_some() || self.manuelt_grunnlag.is_some() || self.verneplikt
    }
}
