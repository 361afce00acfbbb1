/// Undo support for organization runs.
///
/// Moves every file recorded in the destination's history back to the source
/// directory it came from.
use crate::file_organizer::{Operation, OperationLog, OrganizeError, OrganizeResult, move_file};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of an undo run.
#[derive(Debug)]
pub struct UndoReport {
    /// Number of files successfully restored.
    pub restored_files: usize,
    /// Files that failed to restore, with the reason.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Files that were skipped because they are no longer where the history says.
    pub skipped_files: Vec<(PathBuf, String)>,
}

impl UndoReport {
    fn new() -> Self {
        Self {
            restored_files: 0,
            failed_restores: Vec::new(),
            skipped_files: Vec::new(),
        }
    }

    /// Returns true if every recorded move was reverted.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

enum RestoreFailure {
    Missing(PathBuf, String),
    Failed(PathBuf, String),
}

/// Reverts organization runs.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent organization into `destination_path`.
    ///
    /// Operations are reverted newest first. A file that now occupies an
    /// original path is renamed with a `.bak.<timestamp>` suffix before the
    /// restored file takes its place. The history file is removed only when
    /// every operation was reverted.
    ///
    /// # Errors
    ///
    /// Fails if the destination does not exist, has no history, or the
    /// history cannot be read.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nfe_organizer::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/notas/organizadas")) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(destination_path: &Path) -> OrganizeResult<UndoReport> {
        if !destination_path.is_dir() {
            return Err(OrganizeError::InvalidDestinationPath {
                path: destination_path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "destination directory does not exist",
                ),
            });
        }

        let log = OperationLog::load(destination_path)?.ok_or_else(|| {
            OrganizeError::InvalidHistoryFormat {
                reason: "No previous organization found to undo".to_string(),
            }
        })?;

        let mut report = UndoReport::new();
        for operation in log.operations.iter().rev() {
            match Self::restore_file(operation) {
                Ok(()) => report.restored_files += 1,
                Err(RestoreFailure::Missing(path, reason)) => {
                    report.skipped_files.push((path, reason))
                }
                Err(RestoreFailure::Failed(path, reason)) => {
                    report.failed_restores.push((path, reason))
                }
            }
        }

        if report.is_complete_success() {
            OperationLog::delete(destination_path)?;
        }

        Ok(report)
    }

    fn restore_file(operation: &Operation) -> Result<(), RestoreFailure> {
        if !operation.new_path.exists() {
            return Err(RestoreFailure::Missing(
                operation.new_path.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        if let Some(parent) = operation.original_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RestoreFailure::Failed(
                    operation.original_path.clone(),
                    format!("Could not recreate source directory: {}", e),
                )
            })?;
        }

        if operation.original_path.exists() {
            let backup_path = Self::generate_backup_path(&operation.original_path);
            fs::rename(&operation.original_path, &backup_path).map_err(|e| {
                RestoreFailure::Failed(
                    operation.original_path.clone(),
                    format!("Could not backup conflicting file: {}", e),
                )
            })?;
        }

        move_file(&operation.new_path, &operation.original_path).map_err(|e| {
            RestoreFailure::Failed(
                operation.new_path.clone(),
                format!("Failed to restore file: {}", e),
            )
        })
    }

    /// `nota.xml` becomes `nota.xml.bak.20241109-143052`.
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("nota.xml");

        original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
    }
}
