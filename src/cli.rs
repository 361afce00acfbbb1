//! Command execution for nfe-organizer.
//!
//! This module drives a whole run:
//! - Collecting the `.xml` files of the source directory
//! - Classifying each one and computing its destination
//! - Moving files (or only reporting, in dry-run mode)
//! - Recording history and reverting it on undo

use crate::config::{CompiledFilters, OrganizerConfig};
use crate::file_organizer::{FileOrganizer, Operation, OperationLog};
use crate::nfe::{self, UnrecognizedReason};
use crate::output::OutputFormatter;
use crate::undo::UndoManager;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of the files picked up from the source directory (case-sensitive).
pub const XML_EXTENSION: &str = ".xml";

/// Summary group for files that were left in place.
pub const UNPROCESSED_GROUP: &str = "Não processados";

/// A command to execute.
#[derive(Debug, Clone)]
pub enum OrganizeCommand {
    /// Organize the XML files of `source` under `destination`.
    Organize {
        source: PathBuf,
        destination: PathBuf,
        /// If true, report destinations without touching the filesystem.
        dry_run: bool,
    },
    /// Undo the previous organization into `destination`.
    Undo { destination: PathBuf },
}

/// What an organization run did.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Number of `.xml` files considered after filtering.
    pub candidates: usize,
    /// Number of `.xml` files skipped by configured exclusion rules.
    pub excluded: usize,
    /// Moves performed, or planned in dry-run mode.
    pub operations: Vec<Operation>,
    /// Files left in place and why.
    pub unrecognized: Vec<(PathBuf, UnrecognizedReason)>,
    /// File counts per destination group, including the unprocessed bucket.
    pub group_counts: HashMap<String, usize>,
}

/// Loads configuration and runs `command`.
///
/// # Arguments
///
/// * `command` - The command to execute
/// * `config_path` - Optional explicit configuration file
///
/// # Examples
///
/// ```no_run
/// use nfe_organizer::cli::{run_cli, OrganizeCommand};
/// use std::path::PathBuf;
///
/// let command = OrganizeCommand::Organize {
///     source: PathBuf::from("/notas/entrada"),
///     destination: PathBuf::from("/notas/organizadas"),
///     dry_run: false,
/// };
/// if let Err(e) = run_cli(command, None) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: OrganizeCommand, config_path: Option<&Path>) -> Result<(), String> {
    let config = OrganizerConfig::load(config_path)
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    run_with_config(command, &config)
}

/// Runs `command` with an already loaded configuration.
pub fn run_with_config(command: OrganizeCommand, config: &OrganizerConfig) -> Result<(), String> {
    match command {
        OrganizeCommand::Organize {
            source,
            destination,
            dry_run,
        } => organize_directory(&source, &destination, config, dry_run).map(|_| ()),
        OrganizeCommand::Undo { destination } => undo_organization(&destination),
    }
}

/// Classifies every `.xml` file in `source` and moves it under `destination`.
///
/// Files that cannot be classified stay where they are. In dry-run mode
/// nothing is created or moved; the report lists the planned moves.
///
/// # Errors
///
/// Returns an error when the source cannot be read, the filters do not
/// compile, the destination cannot be created, or a move fails. A failed
/// move stops the run; moves already made are kept and written to the
/// history so they can be undone.
pub fn organize_directory(
    source: &Path,
    destination: &Path,
    config: &OrganizerConfig,
    dry_run: bool,
) -> Result<OrganizeReport, String> {
    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", source.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", source.display()));
    }

    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;

    let (candidates, excluded) = collect_xml_files(source, &filters)?;
    let mut report = OrganizeReport {
        candidates: candidates.len(),
        excluded,
        ..OrganizeReport::default()
    };

    if excluded > 0 {
        OutputFormatter::plain(&format!(
            "Skipping {} XML file(s) matched by exclusion rules.",
            excluded
        ));
    }

    if !dry_run {
        fs::create_dir_all(destination).map_err(|e| {
            format!(
                "Error creating destination {}: {}",
                destination.display(),
                e
            )
        })?;
    }

    if candidates.is_empty() {
        OutputFormatter::warning("No XML files found in the source directory.");
        return Ok(report);
    }

    let mut operation_log = OperationLog::new(source.to_path_buf(), destination.to_path_buf());
    let pb = OutputFormatter::create_progress_bar(candidates.len() as u64);

    for file_path in &candidates {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        pb.set_message(file_name.clone());

        let classification = nfe::classify_file(file_path);
        let Some(placement) =
            FileOrganizer::placement_for(&classification, destination, &config.layout)
        else {
            if let nfe::Classification::Unrecognized(reason) = classification {
                pb.suspend(|| {
                    OutputFormatter::warning(&format!("Could not process {}: {}", file_name, reason))
                });
                report.unrecognized.push((file_path.clone(), reason));
            }
            *report
                .group_counts
                .entry(UNPROCESSED_GROUP.to_string())
                .or_insert(0) += 1;
            pb.inc(1);
            continue;
        };

        let operation = if dry_run {
            pb.suspend(|| {
                OutputFormatter::plain(&format!(
                    " - {} → would move to {}",
                    file_name,
                    placement.target_dir.display()
                ))
            });
            Operation {
                original_path: file_path.clone(),
                new_path: placement.target_dir.join(&file_name),
                group: placement.group.clone(),
            }
        } else {
            match FileOrganizer::relocate_with_record(file_path, &placement) {
                Ok(operation) => {
                    pb.suspend(|| {
                        OutputFormatter::success(&format!(
                            "{} ({}) moved to {}",
                            file_name,
                            operation.group,
                            operation.new_path.display()
                        ))
                    });
                    operation_log.add_operation(operation.clone());
                    operation
                }
                Err(e) => {
                    pb.abandon();
                    save_history(&operation_log);
                    return Err(format!("Error organizing {}: {}", file_name, e));
                }
            }
        };

        *report.group_counts.entry(operation.group.clone()).or_insert(0) += 1;
        report.operations.push(operation);
        pb.inc(1);
    }

    pb.finish_and_clear();
    OutputFormatter::summary_table(&report.group_counts, report.candidates);

    if dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    } else {
        save_history(&operation_log);
        OutputFormatter::success("Organization complete!");
        if !operation_log.operations.is_empty() {
            OutputFormatter::plain(&format!(
                "History saved. Use 'nfe-organizer --undo {}' to revert changes.",
                destination.display()
            ));
        }
    }

    Ok(report)
}

/// Writes the history unless it is empty; failures only warn.
fn save_history(log: &OperationLog) {
    if log.operations.is_empty() {
        return;
    }
    if let Err(e) = log.save() {
        OutputFormatter::warning(&format!("Could not save history: {}", e));
        OutputFormatter::warning("Undo will not be available for this run.");
    }
}

/// Lists the regular files in `source` whose name ends in `.xml`, sorted by
/// name, together with the number of files the filters excluded.
fn collect_xml_files(
    source: &Path,
    filters: &CompiledFilters,
) -> Result<(Vec<PathBuf>, usize), String> {
    let entries = fs::read_dir(source)
        .map_err(|e| format!("Error reading directory {}: {}", source.display(), e))?;

    let mut files = Vec::new();
    let mut excluded = 0;

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.ends_with(XML_EXTENSION) {
            continue;
        }
        if let Ok(file_type) = entry.file_type()
            && file_type.is_file()
        {
            if filters.should_include(&name) {
                files.push(entry.path());
            } else {
                excluded += 1;
            }
        }
    }

    files.sort();
    Ok((files, excluded))
}

/// Reverts the previous organization into `destination`.
fn undo_organization(destination: &Path) -> Result<(), String> {
    OutputFormatter::info("Undoing previous organization...");

    let report = UndoManager::undo(destination).map_err(|e| format!("Error: {}", e))?;

    OutputFormatter::success("Undo complete!");
    OutputFormatter::plain(&format!("  Restored: {}", report.restored_files));

    if !report.skipped_files.is_empty() {
        OutputFormatter::warning(&format!("Skipped: {}", report.skipped_files.len()));
        for (path, reason) in &report.skipped_files {
            OutputFormatter::plain(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::error(&format!("Failed: {}", report.failed_restores.len()));
        for (path, reason) in &report.failed_restores {
            OutputFormatter::error(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.is_complete_success() {
        OutputFormatter::warning("History file was kept. Fix the issues above and try again.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_only_lowercase_xml_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        for name in ["b.xml", "a.xml", "c.XML", "d.xml.bak", "e.txt"] {
            fs::write(base.join(name), "<x/>").expect("Failed to write file");
        }
        fs::create_dir(base.join("pasta.xml")).expect("Failed to create dir");

        let filters = OrganizerConfig::default().compile_filters().unwrap();
        let (files, excluded) = collect_xml_files(base, &filters).unwrap();

        assert_eq!(files, vec![base.join("a.xml"), base.join("b.xml")]);
        assert_eq!(excluded, 0);
    }

    #[test]
    fn test_collect_counts_excluded_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(base.join("nota.xml"), "<x/>").expect("Failed to write file");
        fs::write(base.join("modelo.xml"), "<x/>").expect("Failed to write file");

        let config = OrganizerConfig::from_toml_str(
            "[filters]\nexclude_filenames = [\"modelo.xml\"]\n",
        )
        .unwrap();
        let filters = config.compile_filters().unwrap();
        let (files, excluded) = collect_xml_files(base, &filters).unwrap();

        assert_eq!(files, vec![base.join("nota.xml")]);
        assert_eq!(excluded, 1);
    }

    #[test]
    fn test_collect_missing_source_fails() {
        let filters = OrganizerConfig::default().compile_filters().unwrap();
        assert!(collect_xml_files(Path::new("/non/existent/path"), &filters).is_err());
    }
}
