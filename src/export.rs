//! Saving a document as DOCX or PDF.
//!
//! The output format follows the file extension, compared case-insensitively. PDF
//! output writes the DOCX next to the requested path first and hands it to an external
//! converter (LibreOffice by default, see [`ConverterConfig`]). Any other extension is
//! rejected before a single byte is written.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, error, info};

use crate::config::ConverterConfig;
use crate::document::ReportDocument;
use crate::docx::DocxWriter;
use crate::error::{Result, ScribeError};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Docx,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Docx, ExportFormat::Pdf];

    /// Format for `path`, judged by its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "docx" => Ok(ExportFormat::Docx),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ScribeError::UnsupportedExtension(format!(".{ext}"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Docx => "Word Document (*.docx)",
            ExportFormat::Pdf => "PDF (*.pdf)",
        }
    }

    /// `path` with its extension replaced by this format's.
    pub fn apply_to(self, path: &Path) -> PathBuf {
        path.with_extension(self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Save `doc` to `path` in the format its extension names.
///
/// # Errors
///
/// - [`ScribeError::UnsupportedExtension`] for anything but `.docx` and `.pdf`; nothing
///   is written in that case.
/// - [`ScribeError::Conversion`] when the PDF converter cannot be run, exits with a
///   failure, or leaves no PDF behind.
/// - [`ScribeError::Io`] / [`ScribeError::Archive`] when the DOCX cannot be written.
pub fn save_document(
    doc: &ReportDocument,
    path: &Path,
    converter: &ConverterConfig,
) -> Result<PathBuf> {
    let format = ExportFormat::from_path(path).inspect_err(|e| error!("{}", e))?;

    match format {
        ExportFormat::Docx => {
            DocxWriter.write_to(doc, path)?;
            Ok(path.to_path_buf())
        }
        ExportFormat::Pdf => {
            let docx_path = ExportFormat::Docx.apply_to(path);
            DocxWriter.write_to(doc, &docx_path)?;
            convert_to_pdf(&docx_path, path, converter)?;
            Ok(path.to_path_buf())
        }
    }
}

/// Substitute `{input}` and `{outdir}` in the converter arguments.
fn converter_args(converter: &ConverterConfig, input: &Path, outdir: &Path) -> Vec<String> {
    let input = input.to_string_lossy();
    let outdir = outdir.to_string_lossy();
    converter
        .args
        .iter()
        .map(|arg| arg.replace("{input}", &input).replace("{outdir}", &outdir))
        .collect()
}

fn convert_to_pdf(docx_path: &Path, pdf_path: &Path, converter: &ConverterConfig) -> Result<()> {
    let outdir = match pdf_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let args = converter_args(converter, docx_path, &outdir);
    debug!("Running converter: {} {:?}", converter.program, args);

    let output = Command::new(&converter.program)
        .args(&args)
        .output()
        .map_err(|e| {
            let err = ScribeError::Conversion(format!("failed to run {}: {e}", converter.program));
            error!("Failed to convert DOCX to PDF: {}", err);
            err
        })?;

    if !output.status.success() {
        let err = ScribeError::Conversion(format!(
            "{} exited with {}: {}",
            converter.program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
        error!("Failed to convert DOCX to PDF: {}", err);
        return Err(err);
    }

    if !pdf_path.exists() {
        let err = ScribeError::Conversion(format!(
            "{} finished but {} was not created",
            converter.program,
            pdf_path.display()
        ));
        error!("Failed to convert DOCX to PDF: {}", err);
        return Err(err);
    }

    info!("Converted DOCX to PDF: {}", pdf_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentFormatter, DocumentMetadata};
    use std::fs;

    fn doc() -> ReportDocument {
        DocumentFormatter::new(1)
            .format("# Title\nSome body", Some(DocumentMetadata::default()))
            .unwrap()
    }

    fn converter(program: &str, args: &[&str]) -> ConverterConfig {
        ConverterConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("a/b.DOCX")).unwrap(),
            ExportFormat::Docx
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("b.Pdf")).unwrap(),
            ExportFormat::Pdf
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("b.txt")),
            Err(ScribeError::UnsupportedExtension(ext)) if ext == ".txt"
        ));
        assert!(ExportFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_apply_to() {
        assert_eq!(
            ExportFormat::Pdf.apply_to(Path::new("/tmp/report.docx")),
            PathBuf::from("/tmp/report.pdf")
        );
    }

    #[test]
    fn test_save_docx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        let saved = save_document(&doc(), &path, &ConverterConfig::default()).unwrap();
        assert_eq!(saved, path);
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_unsupported_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let err = save_document(&doc(), &path, &ConverterConfig::default()).unwrap_err();
        assert!(matches!(err, ScribeError::UnsupportedExtension(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_converter_args_substitution() {
        let args = converter_args(
            &ConverterConfig::default(),
            Path::new("/x/r.docx"),
            Path::new("/x"),
        );
        assert_eq!(
            args,
            vec!["--headless", "--convert-to", "pdf", "--outdir", "/x", "/x/r.docx"]
        );
    }

    #[test]
    fn test_missing_converter_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let conv = converter("scribe-no-such-converter", &["{input}"]);
        let err = save_document(&doc(), &path, &conv).unwrap_err();
        assert!(matches!(err, ScribeError::Conversion(_)));
        // The intermediate DOCX stays behind.
        assert!(dir.path().join("report.docx").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_converter_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let err = save_document(&doc(), &path, &converter("false", &[])).unwrap_err();
        assert!(matches!(err, ScribeError::Conversion(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_pdf_via_converter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let conv = converter("sh", &["-c", "cp \"$0\" \"$1/report.pdf\"", "{input}", "{outdir}"]);
        let saved = save_document(&doc(), &path, &conv).unwrap();
        assert_eq!(saved, path);
        assert!(path.exists());
    }
}
