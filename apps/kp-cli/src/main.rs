use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use kp_app::{import, project_service, AppError, AppResult, Session};
use kp_core::{parse_user_date, ScenarioId};
use kp_project::{ItemKind, TimeDimension};
use kp_timeline::ChartData;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "kp-cli")]
#[command(about = "Kita-Planer CLI - scenario planning for child care staffing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate plan file syntax and structure
    Validate {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
    },
    /// List scenarios as a tree
    Scenarios {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
    },
    /// List the effective items of a scenario
    Items {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
        /// Scenario id or name (defaults to the selected scenario)
        #[arg(short, long)]
        scenario: Option<String>,
        /// Only children or only staff
        #[arg(long)]
        kind: Option<KindArg>,
    },
    /// List upcoming dates of interest
    Dates {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
        #[arg(short, long)]
        scenario: Option<String>,
        /// Reference date, DD.MM.YYYY or YYYY-MM-DD (defaults to today)
        #[arg(long)]
        stichtag: Option<String>,
    },
    /// Aggregate demand and capacity per period
    Chart {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
        #[arg(short, long)]
        scenario: Option<String>,
        /// week, month, quarter or year (defaults to the plan setting)
        #[arg(short, long)]
        dimension: Option<TimeDimension>,
        /// Comma separated group ids; "0" selects items without a group
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
        /// Comma separated qualification keys; "0" selects unqualified staff
        #[arg(long, value_delimiter = ',')]
        quals: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Booked hours per weekday on the reference date
    Weekly {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
        #[arg(short, long)]
        scenario: Option<String>,
        #[arg(long)]
        stichtag: Option<String>,
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        quals: Vec<String>,
    },
    /// Import an export bundle as a new root scenario
    Import {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
        /// Path to the bundle (JSON or YAML)
        bundle_path: PathBuf,
        /// Write the result here instead of overwriting the plan
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete a scenario and everything based on it
    DeleteScenario {
        /// Path to the plan file (YAML or JSON)
        plan_path: PathBuf,
        /// Scenario id or name
        scenario: String,
        /// Write the result here instead of overwriting the plan
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Demand,
    Capacity,
}

impl From<KindArg> for ItemKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Demand => ItemKind::Demand,
            KindArg::Capacity => ItemKind::Capacity,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { plan_path } => cmd_validate(&plan_path),
        Commands::Scenarios { plan_path } => cmd_scenarios(&plan_path),
        Commands::Items {
            plan_path,
            scenario,
            kind,
        } => cmd_items(&plan_path, scenario.as_deref(), kind.map(ItemKind::from)),
        Commands::Dates {
            plan_path,
            scenario,
            stichtag,
        } => cmd_dates(&plan_path, scenario.as_deref(), stichtag.as_deref()),
        Commands::Chart {
            plan_path,
            scenario,
            dimension,
            groups,
            quals,
            format,
            output,
        } => cmd_chart(
            &plan_path,
            scenario.as_deref(),
            dimension,
            groups,
            quals,
            format,
            output.as_deref(),
        ),
        Commands::Weekly {
            plan_path,
            scenario,
            stichtag,
            groups,
            quals,
        } => cmd_weekly(&plan_path, scenario.as_deref(), stichtag.as_deref(), groups, quals),
        Commands::Import {
            plan_path,
            bundle_path,
            output,
        } => cmd_import(&plan_path, &bundle_path, output.as_deref()),
        Commands::DeleteScenario {
            plan_path,
            scenario,
            output,
        } => cmd_delete_scenario(&plan_path, &scenario, output.as_deref()),
    }
}

fn resolve_scenario(session: &Session, arg: Option<&str>) -> AppResult<ScenarioId> {
    match arg {
        Some(id_or_name) => project_service::find_scenario(session, id_or_name),
        None => session.selected_scenario().cloned(),
    }
}

fn reference_date(session: &mut Session, stichtag: Option<&str>) -> AppResult<NaiveDate> {
    let stichtag = stichtag
        .map(|value| parse_user_date("stichtag", value))
        .transpose()?;
    session.filters.set_stichtag(stichtag);
    Ok(session.filters.reference_date(chrono::Local::now().date_naive()))
}

/// Explicit selections win; otherwise everything the scenario offers.
fn apply_filters(
    session: &mut Session,
    scenario: &ScenarioId,
    groups: Vec<String>,
    quals: Vec<String>,
) -> AppResult<()> {
    if !groups.is_empty() {
        session.filters.set_groups(groups);
    }
    if !quals.is_empty() {
        session.filters.set_qualifications(quals);
    }
    let options = session.filter_options(scenario)?;
    session.filters.init_from_options(&options);
    Ok(())
}

fn cmd_validate(plan_path: &Path) -> AppResult<()> {
    println!("Validating plan: {}", plan_path.display());
    let session = project_service::load_session(plan_path)?;
    project_service::validate_session(&session)?;
    println!("✓ Plan is valid");
    Ok(())
}

fn cmd_scenarios(plan_path: &Path) -> AppResult<()> {
    let session = project_service::load_session(plan_path)?;
    let scenarios = project_service::list_scenarios(&session);

    if scenarios.is_empty() {
        println!("No scenarios found in plan");
    } else {
        println!("Scenarios in plan:");
        for s in scenarios {
            let marker = if s.selected { "*" } else { " " };
            println!(
                "{} {}{} - {} (Konfidenz {}, Wahrscheinlichkeit {}, Erwünschtheit {}, {} changes)",
                marker,
                "  ".repeat(s.depth),
                s.id,
                s.name,
                s.confidence,
                s.likelihood,
                s.desirability,
                s.own_deltas
            );
        }
    }
    Ok(())
}

fn cmd_items(plan_path: &Path, scenario: Option<&str>, kind: Option<ItemKind>) -> AppResult<()> {
    let mut session = project_service::load_session(plan_path)?;
    let scenario = resolve_scenario(&session, scenario)?;
    let view = session.effective_view(&scenario)?;

    if let Some(warning) = &view.warning {
        warn!(%scenario, "{}", warning);
    }
    let items: Vec<_> = view
        .items
        .values()
        .filter(|item| kind.map_or(true, |k| item.kind == k))
        .collect();
    if items.is_empty() {
        println!("No items in scenario {}", scenario);
        return Ok(());
    }
    println!("Items in scenario {}:", scenario);
    for item in items {
        let weekly: f64 = item.parseddata.booking.iter().map(|b| b.weekly_hours()).sum();
        println!(
            "  {} - {} [{}] {} .. {} ({:.1} h/week booked)",
            item.id,
            item.name,
            item.kind.label(),
            item.parseddata.startdate.as_deref().unwrap_or("?"),
            item.parseddata.enddate.as_deref().unwrap_or(""),
            weekly
        );
    }
    Ok(())
}

fn cmd_dates(plan_path: &Path, scenario: Option<&str>, stichtag: Option<&str>) -> AppResult<()> {
    let mut session = project_service::load_session(plan_path)?;
    let scenario = resolve_scenario(&session, scenario)?;
    let reference = reference_date(&mut session, stichtag)?;
    let dates = session.dates_of_interest(&scenario, reference)?;

    if dates.is_empty() {
        println!("No changes after {}", reference.format("%d.%m.%Y"));
        return Ok(());
    }
    for date in dates {
        println!("{}  {}", date.date.format("%d.%m.%Y"), date.summary_text());
        for change in &date.changes {
            println!("    {}: {}", change.type_label(), change.name);
        }
    }
    Ok(())
}

fn cmd_chart(
    plan_path: &Path,
    scenario: Option<&str>,
    dimension: Option<TimeDimension>,
    groups: Vec<String>,
    quals: Vec<String>,
    format: OutputFormat,
    output: Option<&Path>,
) -> AppResult<()> {
    let mut session = project_service::load_session(plan_path)?;
    let scenario = resolve_scenario(&session, scenario)?;
    // midterm chart only, so selections land on the midterm filter
    session.filters.set_toggles([kp_app::ChartToggle::Midterm]);
    if let Some(dimension) = dimension {
        session.filters.set_midterm_time_dimension(dimension);
    }
    apply_filters(&mut session, &scenario, groups, quals)?;

    let dimension = session.filters.midterm_time_dimension;
    let groups = session.filters.current_groups().to_vec();
    let quals = session.filters.current_qualifications().to_vec();
    let chart = session.chart(&scenario, dimension, &groups, &quals)?;

    let rendered = match format {
        OutputFormat::Table => render_table(chart),
        OutputFormat::Csv => render_csv(chart),
        OutputFormat::Json => serde_json::to_string_pretty(chart)
            .map_err(|e| AppError::Project(format!("Failed to serialize chart: {}", e)))?,
    };

    // Write to file or stdout
    if let Some(path) = output {
        std::fs::write(path, rendered)?;
        println!("✓ Wrote chart to {}", path.display());
    } else {
        print!("{}", rendered);
        if format == OutputFormat::Json {
            println!();
        }
    }
    Ok(())
}

fn render_table(chart: &ChartData) -> String {
    if chart.is_empty() {
        return "No dated items, chart is empty\n".to_string();
    }
    let mut out = format!(
        "{:<10} {:>9} {:>9} {:>7} {:>7} {:>6} {:>6}\n",
        "period", "bedarf", "kapaz.", "1:x", "fk %", "ratio", "quote"
    );
    for ((label, ratio), (bedarf, kapazitaet)) in chart
        .categories
        .iter()
        .zip(&chart.baykibig_anstellungsschluessel)
        .zip(chart.bedarf.iter().zip(&chart.kapazitaet))
    {
        let r = ratio.ratio.map_or_else(|| "-".to_string(), |r| format!("{:.2}", r));
        out.push_str(&format!(
            "{:<10} {:>9.1} {:>9.1} {:>7} {:>7.1} {:>6} {:>6}\n",
            label,
            bedarf,
            kapazitaet,
            r,
            ratio.fachkraft_quote_percent,
            if ratio.ratio_met { "ok" } else { "!" },
            if ratio.quota_met { "ok" } else { "!" },
        ));
    }
    out
}

fn render_csv(chart: &ChartData) -> String {
    let mut csv =
        String::from("period,bedarf,kapazitaet,ratio,fachkraftquote,ratio_met,quota_met\n");
    for ((label, ratio), (bedarf, kapazitaet)) in chart
        .categories
        .iter()
        .zip(&chart.baykibig_anstellungsschluessel)
        .zip(chart.bedarf.iter().zip(&chart.kapazitaet))
    {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            label,
            bedarf,
            kapazitaet,
            ratio.ratio.map(|r| r.to_string()).unwrap_or_default(),
            ratio.fachkraft_quote_percent,
            ratio.ratio_met,
            ratio.quota_met
        ));
    }
    csv
}

fn cmd_weekly(
    plan_path: &Path,
    scenario: Option<&str>,
    stichtag: Option<&str>,
    groups: Vec<String>,
    quals: Vec<String>,
) -> AppResult<()> {
    let mut session = project_service::load_session(plan_path)?;
    let scenario = resolve_scenario(&session, scenario)?;
    let reference = reference_date(&mut session, stichtag)?;
    session.filters.set_toggles([kp_app::ChartToggle::Weekly]);
    apply_filters(&mut session, &scenario, groups, quals)?;

    let groups = session.filters.current_groups().to_vec();
    let quals = session.filters.current_qualifications().to_vec();
    let profile = session.weekly_profile(&scenario, reference, &groups, &quals)?;

    println!("Week of {} ({}):", reference.format("%d.%m.%Y"), scenario);
    for day in profile {
        println!(
            "  {:<3} {:>6.1} h booked {:>6.1} h staff",
            day.day, day.demand_hours, day.capacity_hours
        );
    }
    Ok(())
}

fn cmd_import(plan_path: &Path, bundle_path: &Path, output: Option<&Path>) -> AppResult<()> {
    let mut session = if plan_path.exists() {
        project_service::load_session(plan_path)?
    } else {
        info!(path = %plan_path.display(), "plan file not found, starting a new plan");
        Session::new(
            plan_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Kita"),
        )
    };
    let bundle = import::load_bundle(bundle_path)?;
    let report = import::import_bundle(&mut session, bundle)?;

    let target = output.unwrap_or(plan_path);
    project_service::save_session(target, &session)?;

    println!(
        "✓ Imported {} items into scenario {} ({} bookings linked, {} dropped)",
        report.items, report.scenario_id, report.bookings_linked, report.bookings_dropped
    );
    if report.assignments_dropped > 0 {
        println!("  {} assignments had no matching item", report.assignments_dropped);
    }
    println!("✓ Saved plan to {}", target.display());
    Ok(())
}

fn cmd_delete_scenario(plan_path: &Path, scenario: &str, output: Option<&Path>) -> AppResult<()> {
    let mut session = project_service::load_session(plan_path)?;
    let scenario = project_service::find_scenario(&session, scenario)?;
    let outcome = session.delete_scenario(&scenario)?;

    let target = output.unwrap_or(plan_path);
    project_service::save_session(target, &session)?;

    println!("✓ Deleted {} scenario(s):", outcome.removed.len());
    for id in &outcome.removed {
        println!("  {}", id);
    }
    match &outcome.selected {
        Some(selected) => println!("Selected scenario: {}", selected),
        None => println!("No scenarios left"),
    }
    Ok(())
}
