#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use roulement::{
    io,
    model::PreAssignments,
    scheduler::{Scheduler, SolveOutcome},
    storage::{JsonStorage, Storage},
};
use std::path::PathBuf;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de génération du planning mensuel (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON de configuration
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Afficher ou modifier la configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Afficher le calendrier du mois configuré
    Calendar,

    /// Exporter le modèle vierge à remplir
    Template {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Importer les demandes, résoudre et exporter le planning
    Generate {
        /// CSV des demandes (modèle rempli)
        #[arg(long)]
        preassign: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Surcharge de règle `clé=valeur`, répétable
        #[arg(long = "rule", value_name = "KEY=VALUE")]
        rules: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set {
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
        /// liste "nom1,nom2,..."
        #[arg(long)]
        nurses: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let storage = JsonStorage::open(&cli.config);
    let mut config = storage.load()?;

    let code = match cli.cmd {
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                ConfigAction::Set {
                    month,
                    year,
                    nurses,
                } => {
                    if let Some(m) = month {
                        config.month = m;
                    }
                    if let Some(y) = year {
                        config.year = y;
                    }
                    if let Some(list) = nurses {
                        config.nurses = list
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect();
                    }
                    config.period()?;
                    storage.save(&config)?;
                }
            }
            0
        }
        Commands::Calendar => {
            let period = config.period()?;
            let rules = config.rules();
            let weekend: Vec<String> = period
                .weekend_days()
                .iter()
                .map(|d| (d + 1).to_string())
                .collect();
            println!("period: {}-{:02}", period.year(), period.month());
            println!("days: {}", period.day_count());
            println!("working days: {}", period.working_day_count());
            println!("weekend days: {}", weekend.join(","));
            println!(
                "required hours: {}",
                rules.required_hours(period.working_day_count())
            );
            0
        }
        Commands::Template { out } => {
            let period = config.period()?;
            let roster = config.roster()?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(format!("template_{}_{}.csv", period.month(), period.year()))
            });
            io::export_template_csv(&path, &period, &roster)?;
            println!("Template written to {}", path.display());
            0
        }
        Commands::Generate {
            preassign,
            out,
            rules: overrides,
        } => {
            let period = config.period()?;
            let roster = config.roster()?;
            let mut rules = config.rules();
            for kv in &overrides {
                let Some((key, value)) = kv.split_once('=') else {
                    bail!("expected KEY=VALUE, got {kv}");
                };
                rules.set(key, value)?;
            }
            let pre = match preassign {
                Some(path) => io::import_preassignments_csv(path, &period, &roster)?,
                None => PreAssignments::new(),
            };
            let scheduler = Scheduler::new(period, roster).with_rules(rules);
            match scheduler.solve(&pre)? {
                SolveOutcome::Solved(schedule) => {
                    let path = out.unwrap_or_else(|| {
                        PathBuf::from(io::default_report_name(scheduler.period()))
                    });
                    io::export_report_csv(&path, &schedule)
                        .with_context(|| format!("writing report {}", path.display()))?;
                    println!("Schedule written to {}", path.display());
                    0
                }
                SolveOutcome::Infeasible => {
                    eprintln!("No schedule satisfies every rule");
                    // Code 2 = INFEASIBLE
                    2
                }
                SolveOutcome::SearchAborted(stats) => {
                    eprintln!(
                        "Search budget exhausted after {} conflicts ({} decisions)",
                        stats.failures, stats.nodes
                    );
                    3
                }
            }
        }
    };

    std::process::exit(code);
}
