use crate::core;
use crate::excel::{self, ExcelImporter, MergeReport};
use crate::parser;
use crate::types::{JobConfig, NamedResultSet, RegressionResult, TIDY_COLUMNS};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::PathBuf;

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return format!("{n}");
    }
    // Tiny p-values would round to 0
    if n != 0.0 && n.abs() < 1e-4 {
        return format!("{:.3e}", n);
    }
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn print_table(sheet: &str, result: &RegressionResult) {
    println!("   📊 Sheet: {}", sheet.bright_blue().bold());
    println!(
        "      {:<14}{:>14}{:>14}{:>14}{:>14}",
        TIDY_COLUMNS[0], TIDY_COLUMNS[1], TIDY_COLUMNS[2], TIDY_COLUMNS[3], TIDY_COLUMNS[4]
    );
    for row in result.rows() {
        let [estimate, std_error, statistic, p_value] = row.numbers();
        println!(
            "      {}{:>14}{:>14}{:>14}{:>14}",
            format!("{:<14}", row.term).cyan(),
            format_number(estimate),
            format_number(std_error),
            format_number(statistic),
            format_number(p_value)
        );
    }
    println!();
}

fn print_report(report: &MergeReport) {
    let action = if report.created { "Created" } else { "Updated" };
    println!(
        "{}",
        format!("✅ {} {}", action, report.path.display()).bold().green()
    );
    for name in &report.replaced {
        println!("   ♻️  Replaced:  {}", name.bright_blue());
    }
    for name in &report.added {
        println!("   ➕ Added:     {}", name.bright_blue());
    }
    for name in &report.preserved {
        println!("   🔒 Preserved: {}", name);
    }
    println!();
}

/// Execute the run command: simulate, fit, tidy, and publish every regression of a job
pub fn run(
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    seed: Option<u64>,
    verbose: bool,
) -> Result<()> {
    println!("{}", "📈 Regsheet - Publishing regressions".bold().green());

    let mut job = match &config {
        Some(path) => {
            println!("   Job:    {}", path.display());
            parser::parse_job(path)
                .with_context(|| format!("Failed to load job file {}", path.display()))?
        }
        None => {
            println!("   Job:    {}", "built-in reference job".italic());
            JobConfig::reference()
        }
    };
    if let Some(output) = output {
        job.output = output.to_string_lossy().into_owned();
    }
    if seed.is_some() {
        job.seed = seed;
    }

    println!("   Output: {}", job.output);
    match job.seed {
        Some(seed) => println!("   Seed:   {}\n", seed),
        None => println!("   Seed:   {}\n", "random".italic()),
    }

    if verbose {
        println!(
            "{}",
            format!("🧮 Fitting {} regressions...", job.regressions.len()).cyan()
        );
    }

    let results = core::run_job(&job).context("Regression run failed")?;

    if verbose {
        for (sheet, result) in results.iter() {
            print_table(sheet, result);
        }
        println!("{}", "💾 Merging into workbook...".cyan());
    }

    let output = PathBuf::from(&job.output);
    let report = excel::merge(&results, &output)
        .with_context(|| format!("Failed to publish to {}", output.display()))?;

    print_report(&report);
    Ok(())
}

/// Execute the inspect command: list sheets and print the coefficient tables in a workbook
pub fn inspect(file: PathBuf, sheet: Option<String>, json: bool) -> Result<()> {
    let importer = ExcelImporter::new(&file);

    let tables = match &sheet {
        Some(name) => {
            let result = importer
                .read_result(name)
                .with_context(|| format!("Failed to read sheet '{}'", name))?;
            let mut tables = NamedResultSet::new();
            tables.insert(name.clone(), result);
            tables
        }
        None => importer
            .read_tables()
            .with_context(|| format!("Failed to read {}", file.display()))?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    println!("{}", "🔍 Regsheet - Inspect".bold().green());
    println!("   File: {}\n", file.display());

    if sheet.is_none() {
        let names = importer.sheet_names()?;
        println!("{}", format!("📋 {} sheets:", names.len()).bold().cyan());
        for name in &names {
            if tables.get(name).is_some() {
                println!("   {} {}", "•".green(), name.bright_blue());
            } else {
                println!("   {} {} {}", "•".dimmed(), name, "(not a coefficient table)".dimmed());
            }
        }
        println!();
    }

    if tables.is_empty() {
        println!("{}", "⚠️  No coefficient tables found".yellow());
        return Ok(());
    }
    for (name, result) in tables.iter() {
        print_table(name, result);
    }
    Ok(())
}

/// Execute the init command: write the reference job as a starting point
pub fn init(file: PathBuf, force: bool) -> Result<()> {
    if file.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            file.display()
        );
    }

    parser::write_job(&file, &JobConfig::reference())
        .with_context(|| format!("Failed to write {}", file.display()))?;

    println!("{}", "✅ Job file written".bold().green());
    println!("   File: {}\n", file.display());
    println!(
        "{}",
        format!("💡 Run 'regsheet run --config {}' to publish", file.display())
            .bold()
            .yellow()
    );
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
