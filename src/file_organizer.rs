/// Placement and relocation of classified NF-e files.
///
/// This module computes where a classified document belongs under the
/// destination root, moves it there (creating the directory chain as needed)
/// and keeps the history of moves that makes undo possible.
use crate::config::LayoutConfig;
use crate::nfe::Classification;
use serde_json::{Value, json};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the move history kept in the destination root.
pub const HISTORY_FILE_NAME: &str = ".nfe_organizer_history.json";

/// A single file relocation.
///
/// Records the original and new paths of a file that was moved during an
/// organization run, enabling undo functionality.
#[derive(Debug, Clone)]
pub struct Operation {
    /// The original path of the file before organization.
    pub original_path: PathBuf,
    /// The new path of the file after organization.
    pub new_path: PathBuf,
    /// The destination group (events directory or operation label).
    pub group: String,
}

/// All relocations performed by one organization run.
///
/// This is persisted into the destination root to enable undo functionality.
#[derive(Debug, Clone)]
pub struct OperationLog {
    /// ISO 8601 timestamp of when the organization occurred.
    pub timestamp: String,
    /// The directory the XML files were read from.
    pub source_path: PathBuf,
    /// The destination root the files were moved under.
    pub destination_path: PathBuf,
    /// All operations performed in this organization run.
    pub operations: Vec<Operation>,
}

impl OperationLog {
    /// Creates a new, empty operation log.
    pub fn new(source_path: PathBuf, destination_path: PathBuf) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            source_path,
            destination_path,
            operations: Vec::new(),
        }
    }

    /// Adds an operation to this log.
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Returns the path to the history file for a destination root.
    pub fn history_file_path(destination_path: &Path) -> PathBuf {
        destination_path.join(HISTORY_FILE_NAME)
    }

    /// Saves this log as JSON into the destination root.
    pub fn save(&self) -> OrganizeResult<()> {
        let json = json!({
            "timestamp": self.timestamp,
            "source_path": self.source_path.to_string_lossy().to_string(),
            "destination_path": self.destination_path.to_string_lossy().to_string(),
            "operations": self.operations.iter().map(|op| {
                json!({
                    "original_path": op.original_path.to_string_lossy().to_string(),
                    "new_path": op.new_path.to_string_lossy().to_string(),
                    "group": op.group,
                })
            }).collect::<Vec<_>>(),
        });

        let json_string =
            serde_json::to_string_pretty(&json).map_err(|e| OrganizeError::HistoryWriteFailed {
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            })?;

        fs::write(Self::history_file_path(&self.destination_path), json_string)
            .map_err(|e| OrganizeError::HistoryWriteFailed { source: e })
    }

    /// Loads the most recent operation log for a destination root.
    pub fn load(destination_path: &Path) -> OrganizeResult<Option<Self>> {
        let history_path = Self::history_file_path(destination_path);

        if !history_path.exists() {
            return Ok(None);
        }

        let json_string = fs::read_to_string(&history_path)
            .map_err(|e| OrganizeError::HistoryReadFailed { source: e })?;

        let json: Value = serde_json::from_str(&json_string).map_err(|e| {
            OrganizeError::InvalidHistoryFormat {
                reason: format!("JSON parse error: {}", e),
            }
        })?;

        let timestamp = required_str(&json, "timestamp")?.to_string();
        let source_path = PathBuf::from(required_str(&json, "source_path")?);
        let recorded_destination = PathBuf::from(required_str(&json, "destination_path")?);

        let ops_array =
            json["operations"]
                .as_array()
                .ok_or_else(|| OrganizeError::InvalidHistoryFormat {
                    reason: "Missing or invalid 'operations' field".to_string(),
                })?;

        let operations = ops_array
            .iter()
            .map(|op| -> OrganizeResult<Operation> {
                Ok(Operation {
                    original_path: PathBuf::from(required_str(op, "original_path")?),
                    new_path: PathBuf::from(required_str(op, "new_path")?),
                    group: required_str(op, "group")?.to_string(),
                })
            })
            .collect::<OrganizeResult<Vec<_>>>()?;

        Ok(Some(OperationLog {
            timestamp,
            source_path,
            destination_path: recorded_destination,
            operations,
        }))
    }

    /// Deletes the history file for a destination root.
    pub fn delete(destination_path: &Path) -> OrganizeResult<()> {
        let history_path = Self::history_file_path(destination_path);
        if history_path.exists() {
            fs::remove_file(&history_path)
                .map_err(|e| OrganizeError::HistoryWriteFailed { source: e })?;
        }
        Ok(())
    }
}

fn required_str<'a>(value: &'a Value, key: &str) -> OrganizeResult<&'a str> {
    value[key]
        .as_str()
        .ok_or_else(|| OrganizeError::InvalidHistoryFormat {
            reason: format!("Missing or invalid '{}' field", key),
        })
}

/// Errors that can occur during file organization operations.
#[derive(Debug)]
pub enum OrganizeError {
    /// Failed to create a destination directory.
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to move a file to its destination.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: io::Error,
    },
    /// The source directory is invalid or doesn't exist.
    InvalidSourcePath { path: PathBuf, source: io::Error },
    /// The destination root is invalid or doesn't exist.
    InvalidDestinationPath { path: PathBuf, source: io::Error },
    /// Failed to write history file.
    HistoryWriteFailed { source: io::Error },
    /// Failed to read history file.
    HistoryReadFailed { source: io::Error },
    /// History file has invalid format.
    InvalidHistoryFormat { reason: String },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::InvalidSourcePath { path, source } => {
                write!(f, "Invalid source directory {}: {}", path.display(), source)
            }
            Self::InvalidDestinationPath { path, source } => {
                write!(
                    f,
                    "Invalid destination directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::HistoryWriteFailed { source } => {
                write!(f, "Failed to write history file: {}", source)
            }
            Self::HistoryReadFailed { source } => {
                write!(f, "Failed to read history file: {}", source)
            }
            Self::InvalidHistoryFormat { reason } => {
                write!(f, "Invalid history file format: {}", reason)
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Where a classified document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Directory that will contain the file.
    pub target_dir: PathBuf,
    /// Summary group: the events directory or the operation label.
    pub group: String,
}

/// Computes destinations for classified files and moves them there.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Computes the placement of a classified document under `destination_root`.
    ///
    /// Events go to `<root>/<events_dir>`; invoices go to
    /// `<root>/<issuer>/<year>/<month>/<day>/<operation label>`.
    /// Unrecognized documents have no placement.
    ///
    /// # Examples
    ///
    /// ```
    /// use nfe_organizer::config::LayoutConfig;
    /// use nfe_organizer::file_organizer::FileOrganizer;
    /// use nfe_organizer::nfe::Classification;
    /// use std::path::Path;
    ///
    /// let placement = FileOrganizer::placement_for(
    ///     &Classification::Event,
    ///     Path::new("/notas"),
    ///     &LayoutConfig::default(),
    /// )
    /// .unwrap();
    /// assert_eq!(placement.target_dir, Path::new("/notas/Eventos"));
    /// ```
    pub fn placement_for(
        classification: &Classification,
        destination_root: &Path,
        layout: &LayoutConfig,
    ) -> Option<Placement> {
        match classification {
            Classification::Event => Some(Placement {
                target_dir: destination_root.join(&layout.events_dir),
                group: layout.events_dir.clone(),
            }),
            Classification::Invoice(invoice) => {
                let label = layout.operation_label(invoice.operation_type);
                Some(Placement {
                    target_dir: destination_root
                        .join(&invoice.issuer_name)
                        .join(&invoice.issue_year)
                        .join(&invoice.issue_month)
                        .join(&invoice.issue_day)
                        .join(label),
                    group: label.to_string(),
                })
            }
            Classification::Unrecognized(_) => None,
        }
    }

    /// Moves `file_path` into `placement.target_dir` and records the move.
    ///
    /// Missing directories on the way are created. A file with the same name
    /// already at the destination is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryCreationFailed` or `FileMoveFailure`; the source file
    /// is left untouched in both cases.
    pub fn relocate_with_record(file_path: &Path, placement: &Placement) -> OrganizeResult<Operation> {
        let target_dir = &placement.target_dir;

        fs::create_dir_all(target_dir).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: target_dir.clone(),
            source: e,
        })?;

        let file_name = file_path
            .file_name()
            .ok_or_else(|| OrganizeError::FileMoveFailure {
                source: file_path.to_path_buf(),
                destination: target_dir.clone(),
                source_error: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "file has no name component",
                ),
            })?;

        let destination_path = target_dir.join(file_name);

        move_file(file_path, &destination_path).map_err(|e| OrganizeError::FileMoveFailure {
            source: file_path.to_path_buf(),
            destination: destination_path.clone(),
            source_error: e,
        })?;

        Ok(Operation {
            original_path: file_path.to_path_buf(),
            new_path: destination_path,
            group: placement.group.clone(),
        })
    }
}

/// Renames `from` to `to`, replacing any existing file. Falls back to
/// copy-and-delete when the two paths live on different filesystems.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfe::{InvoiceData, OperationType, UnrecognizedReason};
    use tempfile::TempDir;

    fn acme_invoice(operation_type: OperationType) -> Classification {
        Classification::Invoice(InvoiceData {
            issuer_name: "ACME".to_string(),
            issue_year: "2024".to_string(),
            issue_month: "03".to_string(),
            issue_day: "07".to_string(),
            operation_type,
        })
    }

    #[test]
    fn test_invoice_placement() {
        let placement = FileOrganizer::placement_for(
            &acme_invoice(OperationType::Outbound),
            Path::new("/dest"),
            &LayoutConfig::default(),
        )
        .expect("invoice should have a placement");

        assert_eq!(
            placement.target_dir,
            Path::new("/dest/ACME/2024/03/07/Saída")
        );
        assert_eq!(placement.group, "Saída");
    }

    #[test]
    fn test_inbound_placement_uses_configured_label() {
        let layout = LayoutConfig {
            inbound_label: "Entradas".to_string(),
            ..LayoutConfig::default()
        };
        let placement = FileOrganizer::placement_for(
            &acme_invoice(OperationType::Inbound),
            Path::new("/dest"),
            &layout,
        )
        .expect("invoice should have a placement");

        assert!(placement.target_dir.ends_with("ACME/2024/03/07/Entradas"));
    }

    #[test]
    fn test_unrecognized_has_no_placement() {
        let placement = FileOrganizer::placement_for(
            &Classification::Unrecognized(UnrecognizedReason::NotAnInvoice),
            Path::new("/dest"),
            &LayoutConfig::default(),
        );
        assert!(placement.is_none());
    }

    #[test]
    fn test_relocate_creates_nested_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("entrada");
        fs::create_dir(&source).expect("Failed to create source");
        let file_path = source.join("n1.xml");
        fs::write(&file_path, "<nfe/>").expect("Failed to write test file");

        let placement = FileOrganizer::placement_for(
            &acme_invoice(OperationType::Outbound),
            &temp_dir.path().join("saida"),
            &LayoutConfig::default(),
        )
        .expect("invoice should have a placement");

        let operation =
            FileOrganizer::relocate_with_record(&file_path, &placement).expect("Failed to move");

        assert!(!file_path.exists());
        assert!(operation.new_path.is_file());
        assert_eq!(operation.new_path, placement.target_dir.join("n1.xml"));
        assert_eq!(operation.group, "Saída");
    }

    #[test]
    fn test_relocate_overwrites_existing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file_path = temp_dir.path().join("evento.xml");
        fs::write(&file_path, "new").expect("Failed to write test file");

        let placement = Placement {
            target_dir: temp_dir.path().join("Eventos"),
            group: "Eventos".to_string(),
        };
        fs::create_dir(&placement.target_dir).expect("Failed to create target");
        fs::write(placement.target_dir.join("evento.xml"), "old").expect("Failed to write");

        FileOrganizer::relocate_with_record(&file_path, &placement).expect("Failed to move");

        let content = fs::read_to_string(placement.target_dir.join("evento.xml"))
            .expect("Failed to read moved file");
        assert_eq!(content, "new");
        assert!(!file_path.exists());
    }

    #[test]
    fn test_relocate_missing_file_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let placement = Placement {
            target_dir: temp_dir.path().join("Eventos"),
            group: "Eventos".to_string(),
        };

        let result =
            FileOrganizer::relocate_with_record(&temp_dir.path().join("ghost.xml"), &placement);
        assert!(matches!(result, Err(OrganizeError::FileMoveFailure { .. })));
    }

    #[test]
    fn test_history_save_and_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let destination = temp_dir.path().to_path_buf();

        let mut log = OperationLog::new(PathBuf::from("/origem"), destination.clone());
        log.add_operation(Operation {
            original_path: PathBuf::from("/origem/n1.xml"),
            new_path: destination.join("Eventos").join("n1.xml"),
            group: "Eventos".to_string(),
        });
        log.save().expect("Failed to save history");

        let loaded = OperationLog::load(&destination)
            .expect("Failed to load history")
            .expect("History should exist");

        assert_eq!(loaded.source_path, PathBuf::from("/origem"));
        assert_eq!(loaded.operations.len(), 1);
        assert_eq!(loaded.operations[0].group, "Eventos");

        OperationLog::delete(&destination).expect("Failed to delete history");
        assert!(OperationLog::load(&destination).unwrap().is_none());
    }

    #[test]
    fn test_history_with_missing_field_is_invalid() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(
            OperationLog::history_file_path(temp_dir.path()),
            r#"{"timestamp": "2024-03-07T10:00:00Z", "operations": []}"#,
        )
        .expect("Failed to write history");

        let result = OperationLog::load(temp_dir.path());
        assert!(matches!(
            result,
            Err(OrganizeError::InvalidHistoryFormat { .. })
        ));
    }
}
