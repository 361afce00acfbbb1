//! NF-e document classification.
//!
//! Reads a single XML file and decides whether it is an invoice (`infNFe`),
//! an NF-e lifecycle event (`procEventoNFe`, e.g. cancellations and
//! correction letters) or something this tool cannot place.
//!
//! # Examples
//!
//! ```
//! use nfe_organizer::nfe::{classify_str, Classification, OperationType};
//!
//! let xml = r#"<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe">
//!   <NFe><infNFe>
//!     <ide><tpNF>1</tpNF><dhEmi>2024-03-07T10:00:00-03:00</dhEmi></ide>
//!     <emit><xNome>ACME</xNome></emit>
//!   </infNFe></NFe>
//! </nfeProc>"#;
//!
//! match classify_str(xml) {
//!     Classification::Invoice(invoice) => {
//!         assert_eq!(invoice.issuer_name, "ACME");
//!         assert_eq!(invoice.operation_type, OperationType::Outbound);
//!     }
//!     other => panic!("unexpected classification: {:?}", other),
//! }
//! ```
use chrono::NaiveDate;
use roxmltree::{Document, Node};
use std::fmt;
use std::fs;
use std::path::Path;

/// XML namespace shared by every NF-e document.
pub const NFE_NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";

/// Root tag suffix of event envelopes (`procEventoNFe`).
const EVENT_ROOT_SUFFIX: &str = "procEventoNFe";

/// Broad kind of an NF-e document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// A regular invoice with an `infNFe` body.
    Invoice,
    /// An NF-e lifecycle event envelope.
    Event,
    /// Anything that could not be parsed or classified.
    Unrecognized,
}

/// Direction of an invoice relative to its issuer (`ide/tpNF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    /// `tpNF` = 0 (Entrada).
    Inbound,
    /// Any other `tpNF` value (Saída).
    Outbound,
}

impl OperationType {
    /// Maps a `tpNF` code to an operation type. Only `"0"` is inbound.
    ///
    /// # Examples
    ///
    /// ```
    /// use nfe_organizer::nfe::OperationType;
    ///
    /// assert_eq!(OperationType::from_code("0"), OperationType::Inbound);
    /// assert_eq!(OperationType::from_code(" 0 "), OperationType::Inbound);
    /// assert_eq!(OperationType::from_code("1"), OperationType::Outbound);
    /// ```
    pub fn from_code(code: &str) -> Self {
        if code.trim() == "0" {
            OperationType::Inbound
        } else {
            OperationType::Outbound
        }
    }

    /// Returns the default directory label for this operation type.
    pub fn default_label(&self) -> &'static str {
        match self {
            OperationType::Inbound => "Entrada",
            OperationType::Outbound => "Saída",
        }
    }
}

/// Fields extracted from an invoice body.
///
/// Only ever built when every field was found, so a value of this type is
/// always complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceData {
    /// Issuer display name (`emit/xNome`), trimmed and safe to use as one
    /// directory level.
    pub issuer_name: String,
    /// Four-digit issue year.
    pub issue_year: String,
    /// Two-digit issue month.
    pub issue_month: String,
    /// Two-digit issue day.
    pub issue_day: String,
    /// Invoice direction.
    pub operation_type: OperationType,
}

/// Why a document could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnrecognizedReason {
    /// The file could not be read or is not well-formed XML.
    ParseFailure(String),
    /// Well-formed XML without an NF-e invoice body.
    NotAnInvoice,
    /// The invoice body lacks a required field (given as `parent/child`).
    MissingField(&'static str),
}

impl fmt::Display for UnrecognizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseFailure(reason) => write!(f, "could not read XML: {}", reason),
            Self::NotAnInvoice => write!(f, "not a valid NF-e XML"),
            Self::MissingField(field) => write!(f, "missing or invalid field {}", field),
        }
    }
}

/// Classification of a single XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Invoice(InvoiceData),
    Event,
    Unrecognized(UnrecognizedReason),
}

impl Classification {
    /// Returns the broad kind of this classification.
    pub fn kind(&self) -> DocumentKind {
        match self {
            Classification::Invoice(_) => DocumentKind::Invoice,
            Classification::Event => DocumentKind::Event,
            Classification::Unrecognized(_) => DocumentKind::Unrecognized,
        }
    }
}

/// Errors raised while reading or parsing a document.
///
/// These never leave [`classify_file`]; they are folded into
/// [`UnrecognizedReason::ParseFailure`].
#[derive(Debug)]
pub enum ExtractError {
    /// The file could not be read.
    Io(std::io::Error),
    /// The content is not well-formed XML.
    Xml(roxmltree::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Xml(e) => write!(f, "malformed XML: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Xml(e) => Some(e),
        }
    }
}

/// Reads and classifies the XML file at `path`.
///
/// Never fails: read and parse errors become
/// `Classification::Unrecognized(UnrecognizedReason::ParseFailure(_))`.
pub fn classify_file(path: &Path) -> Classification {
    match read_document(path) {
        Ok(text) => classify_str(&text),
        Err(e) => Classification::Unrecognized(UnrecognizedReason::ParseFailure(e.to_string())),
    }
}

/// Classifies an in-memory XML document. Never fails.
pub fn classify_str(xml: &str) -> Classification {
    match parse_classification(xml) {
        Ok(classification) => classification,
        Err(e) => Classification::Unrecognized(UnrecognizedReason::ParseFailure(e.to_string())),
    }
}

/// Parses `xml` and classifies it, reporting malformed input as an error.
pub fn parse_classification(xml: &str) -> Result<Classification, ExtractError> {
    let doc = Document::parse(xml.trim_start_matches('\u{feff}')).map_err(ExtractError::Xml)?;
    let root = doc.root_element();

    if root.tag_name().name().ends_with(EVENT_ROOT_SUFFIX) {
        return Ok(Classification::Event);
    }

    // descendants() yields the root first; only nested bodies count
    let Some(inf_nfe) = root
        .descendants()
        .skip(1)
        .find(|node| node.has_tag_name((NFE_NAMESPACE, "infNFe")))
    else {
        return Ok(Classification::Unrecognized(
            UnrecognizedReason::NotAnInvoice,
        ));
    };

    Ok(match extract_invoice(inf_nfe) {
        Ok(invoice) => Classification::Invoice(invoice),
        Err(field) => Classification::Unrecognized(UnrecognizedReason::MissingField(field)),
    })
}

fn read_document(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path).map_err(ExtractError::Io)?;
    Ok(decode_text(bytes))
}

/// Decodes file content as UTF-8, falling back to ISO-8859-1 which older
/// NF-e emitters still produce.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Pulls every required field out of `infNFe`; on failure returns the name
/// of the first field that was missing or unusable.
fn extract_invoice(inf_nfe: Node<'_, '_>) -> Result<InvoiceData, &'static str> {
    let issuer_name = find_text(inf_nfe, "emit", "xNome")
        .map(sanitize_issuer_name)
        .filter(|name| !name.is_empty())
        .ok_or("emit/xNome")?;

    let (issue_year, issue_month, issue_day) = find_text(inf_nfe, "ide", "dhEmi")
        .and_then(split_issue_date)
        .ok_or("ide/dhEmi")?;

    let operation_type = find_text(inf_nfe, "ide", "tpNF")
        .map(OperationType::from_code)
        .ok_or("ide/tpNF")?;

    Ok(InvoiceData {
        issuer_name,
        issue_year,
        issue_month,
        issue_day,
        operation_type,
    })
}

/// Text of the first namespaced `parent/child` element below `scope`.
fn find_text<'a>(scope: Node<'a, '_>, parent: &str, child: &str) -> Option<&'a str> {
    scope
        .descendants()
        .filter(|node| node.has_tag_name((NFE_NAMESPACE, parent)))
        .flat_map(|node| node.children())
        .find(|node| node.has_tag_name((NFE_NAMESPACE, child)))
        .and_then(|node| node.text())
}

/// Splits an ISO-8601 style timestamp into year, month and day.
///
/// Only the first 10 characters (`YYYY-MM-DD`) are considered and they must
/// form a real calendar date.
fn split_issue_date(timestamp: &str) -> Option<(String, String, String)> {
    let date = timestamp.trim().get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;

    let digits: String = date.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return None;
    }

    Some((
        digits[..4].to_string(),
        digits[4..6].to_string(),
        digits[6..].to_string(),
    ))
}

/// Makes an issuer name usable as exactly one directory level.
fn sanitize_issuer_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '-',
            other => other,
        })
        .collect();

    // "." and ".." would resolve outside the issuer level
    if cleaned == "." || cleaned == ".." {
        String::new()
    } else {
        cleaned
    }
}
