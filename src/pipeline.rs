//! Conversion pipeline orchestrator.
//!
//! Ties format detection, reading, validation, conversion, encoding and the
//! atomic write into a single [`convert`] call. Every fatal failure happens
//! before the output file is touched, so a failed run leaves nothing behind.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::convert::{insomnia_to_postman, postman_to_insomnia};
use crate::error::ConvertError;
use crate::formats::{self, DocumentFormat};
use crate::model::insomnia::InsomniaExport;
use crate::model::postman::{Item, PostmanCollection};
use crate::model::{RunContext, TreeStats};
use crate::urls::{parse_url, reconstruct_url};

/// Options passed through the pipeline from CLI flags.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Document to convert.
    pub input: PathBuf,
    /// Destination; defaults to the conventional name of the opposite format.
    pub output: Option<PathBuf>,
    /// Convert and render, but write nothing.
    pub dry_run: bool,
}

/// Outcome of a successful (or dry-run) conversion.
#[derive(Debug)]
pub struct ConversionResult {
    pub source_format: DocumentFormat,
    pub target_format: DocumentFormat,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// The encoded target document.
    pub rendered: String,
    /// Present unless this was a dry run.
    pub written: Option<AtomicWriteOutcome>,
    /// Folder and request counts of the target document.
    pub stats: TreeStats,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Document validation
// ---------------------------------------------------------------------------

/// Non-fatal findings about a source document.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Surfaced to the user; conversion continues.
    pub warnings: Vec<String>,
    /// Informational notes, shown in verbose/trace mode.
    pub info: Vec<String>,
}

/// Check an Insomnia export before converting it to Postman.
pub fn validate_export(export: &InsomniaExport) -> ValidationResult {
    let mut result = ValidationResult::default();

    if export.collection.is_empty() {
        result
            .warnings
            .push("Export has no folders. The collection will be empty.".to_string());
        return result;
    }

    for name in &export.wrapped_requests {
        result.warnings.push(format!(
            "Top-level request '{name}' is not in a folder; it is wrapped in a group of the same name."
        ));
    }

    for request in export.requests() {
        if parse_url(&request.url).is_raw_only() {
            result.warnings.push(format!(
                "Request '{}' has a URL that could not be decomposed ({}); only the raw URL is kept.",
                request.name, request.url
            ));
        }
        if let Some(body) = &request.body
            && !body.mime_type.is_empty()
            && !body.mime_type.contains("json")
        {
            result.info.push(format!(
                "Request '{}' has a {} body; it is labelled as JSON in Postman.",
                request.name, body.mime_type
            ));
        }
    }

    if let Some(env) = &export.environment
        && !env.data.is_empty()
    {
        result.info.push(format!(
            "Environment with {} variable(s) is not carried into the Postman collection.",
            env.data.len()
        ));
    }

    result
}

/// Check a Postman collection before converting it to Insomnia.
pub fn validate_collection(collection: &PostmanCollection) -> ValidationResult {
    let mut result = ValidationResult::default();

    if collection.item.is_empty() {
        result
            .warnings
            .push("Collection has no items. The export will be empty.".to_string());
    }

    for item in &collection.item {
        if let Item::Request { name, .. } = item {
            result.warnings.push(format!(
                "Top-level request '{name}' is not in a folder; it is wrapped in a folder of the same name."
            ));
        }
    }

    let has_endpoint = collection
        .variable
        .iter()
        .any(|v| v.key == crate::convert::reverse::ENDPOINT_VARIABLE);
    if !has_endpoint {
        result.warnings.push(
            "Collection has no 'endpoint' variable, so the environment has no base_url."
                .to_string(),
        );
    }

    for (name, request) in collection.requests() {
        if request.method.trim().is_empty() || reconstruct_url(&request.url).is_empty() {
            result.warnings.push(format!(
                "Request '{name}' has no method or URL; Insomnia will read it back as an empty folder."
            ));
        }
        if let Some(body) = &request.body
            && body.mode != "raw"
        {
            result.info.push(format!(
                "Request '{name}' uses body mode '{}'; only its raw text is converted.",
                body.mode
            ));
        }
    }

    result
}

fn log_validation(validation: &ValidationResult) {
    for warning in &validation.warnings {
        warn!(warning, "validation warning");
    }
    for note in &validation.info {
        debug!(note, "validation info");
    }
}

// ---------------------------------------------------------------------------
// Pipeline orchestrator
// ---------------------------------------------------------------------------

/// Resolve formats and paths without touching the filesystem.
///
/// Returns `(source, target, output_path)`.
pub fn plan(
    opts: &ConvertOptions,
) -> Result<(DocumentFormat, DocumentFormat, PathBuf), ConvertError> {
    let source = DocumentFormat::from_path(&opts.input)?;
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(source.opposite().default_file_name()));
    let target = DocumentFormat::from_path(&output)?;
    if target == source {
        return Err(ConvertError::SameFormat {
            input: opts.input.clone(),
            output,
            format: source.name().to_string(),
        });
    }
    Ok((source, target, output))
}

/// Run the full detect → read → validate → convert → encode → write pipeline.
pub fn convert(opts: &ConvertOptions) -> anyhow::Result<ConversionResult> {
    convert_with_context(opts, &RunContext::now())
}

/// [`convert`] with an explicit run context (fixed timestamps in tests).
pub fn convert_with_context(
    opts: &ConvertOptions,
    ctx: &RunContext,
) -> anyhow::Result<ConversionResult> {
    // 1. Resolve formats before reading anything.
    let (source, target, output_path) = plan(opts)?;
    info!(
        input = %opts.input.display(),
        output = %output_path.display(),
        source = source.slug(),
        target = target.slug(),
        "starting conversion"
    );

    // 2. Read.
    let content =
        std::fs::read_to_string(&opts.input).map_err(|e| ConvertError::DocumentReadError {
            path: opts.input.clone(),
            detail: e.to_string(),
        })?;
    debug!(bytes = content.len(), "input read");

    // 3. Decode, validate, convert, encode.
    let (rendered, stats, validation) = match source {
        DocumentFormat::Insomnia => {
            let export = formats::insomnia::decode(&content, &opts.input)?;
            let validation = validate_export(&export);
            log_validation(&validation);
            let collection = insomnia_to_postman(&export);
            (
                formats::postman::encode(&collection)?,
                collection.stats(),
                validation,
            )
        }
        DocumentFormat::Postman => {
            let collection = formats::postman::decode(&content, &opts.input)?;
            let validation = validate_collection(&collection);
            log_validation(&validation);
            let export = postman_to_insomnia(&collection, ctx);
            (
                formats::insomnia::encode(&export)?,
                export.stats(),
                validation,
            )
        }
    };
    debug!(
        folders = stats.folders,
        requests = stats.requests,
        "document converted"
    );

    // 4. Dry-run short-circuit.
    if opts.dry_run {
        info!("dry run, skipping write");
        return Ok(ConversionResult {
            source_format: source,
            target_format: target,
            input_path: opts.input.clone(),
            output_path,
            rendered,
            written: None,
            stats,
            warnings: validation.warnings,
        });
    }

    // 5. Write.
    let written = atomic_write(&output_path, rendered.as_bytes())?;

    Ok(ConversionResult {
        source_format: source,
        target_format: target,
        input_path: opts.input.clone(),
        output_path,
        rendered,
        written: Some(written),
        stats,
        warnings: validation.warnings,
    })
}

// ---------------------------------------------------------------------------
// Atomic file writing
// ---------------------------------------------------------------------------

/// Outcome of a successful atomic write operation.
#[derive(Debug, Clone)]
pub struct AtomicWriteOutcome {
    /// Final destination path.
    pub target_path: PathBuf,
    /// Temp file used during write (already renamed away).
    pub temp_path: PathBuf,
    /// Whether an existing file at the destination was replaced.
    pub replaced: bool,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomicWriteFailStage {
    TempFileCreate,
    WriteAll,
    SyncAll,
    FinalRename,
}

#[cfg(test)]
thread_local! {
    static ATOMIC_WRITE_FAIL_STAGE: std::cell::Cell<Option<AtomicWriteFailStage>> = const {
        std::cell::Cell::new(None)
    };
}

#[cfg(test)]
fn set_atomic_write_fail_stage(stage: Option<AtomicWriteFailStage>) {
    ATOMIC_WRITE_FAIL_STAGE.with(|slot| slot.set(stage));
}

#[cfg(test)]
fn maybe_inject_atomic_write_failure(stage: AtomicWriteFailStage) -> std::io::Result<()> {
    let injected = ATOMIC_WRITE_FAIL_STAGE.with(|slot| slot.get() == Some(stage));
    if injected {
        return Err(std::io::Error::other(format!(
            "injected atomic_write failure at stage {stage:?}"
        )));
    }
    Ok(())
}

/// Write `content` atomically to `target_path` using temp-then-rename.
///
/// Either the previous file (if any) remains intact, or the new content is
/// fully written and fsynced in its place. Never leaves partial writes.
pub fn atomic_write(
    target_path: &Path,
    content: &[u8],
) -> Result<AtomicWriteOutcome, ConvertError> {
    use std::io::Write;

    let parent = match target_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // 1. Create parent directories.
    std::fs::create_dir_all(parent).map_err(|e| ConvertError::DocumentWriteError {
        path: target_path.to_path_buf(),
        detail: format!("failed to create parent directories: {e}"),
    })?;

    let replaced = target_path.exists();

    // 2. Write to temp file in the same directory.
    let temp_name = format!(".i2p-tmp-{}", uuid::Uuid::new_v4().as_hyphenated());
    let temp_path = parent.join(&temp_name);

    let write_result = (|| -> Result<(), std::io::Error> {
        #[cfg(test)]
        maybe_inject_atomic_write_failure(AtomicWriteFailStage::TempFileCreate)?;
        let mut file = std::fs::File::create(&temp_path)?;
        #[cfg(test)]
        maybe_inject_atomic_write_failure(AtomicWriteFailStage::WriteAll)?;
        file.write_all(content)?;
        file.flush()?;
        #[cfg(test)]
        maybe_inject_atomic_write_failure(AtomicWriteFailStage::SyncAll)?;
        file.sync_all()?;
        Ok(())
    })();

    if let Err(e) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ConvertError::DocumentWriteError {
            path: target_path.to_path_buf(),
            detail: format!("failed to write temp file: {e}"),
        });
    }

    // 3. Atomic rename temp -> target.
    let rename_result = (|| -> Result<(), std::io::Error> {
        #[cfg(test)]
        maybe_inject_atomic_write_failure(AtomicWriteFailStage::FinalRename)?;
        std::fs::rename(&temp_path, target_path)
    })();
    if let Err(e) = rename_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ConvertError::DocumentWriteError {
            path: target_path.to_path_buf(),
            detail: format!("failed to rename temp file to target: {e}"),
        });
    }

    info!(target = %target_path.display(), replaced, "atomic write complete");

    Ok(AtomicWriteOutcome {
        target_path: target_path.to_path_buf(),
        temp_path,
        replaced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct FailStageReset;

    impl Drop for FailStageReset {
        fn drop(&mut self) {
            set_atomic_write_fail_stage(None);
        }
    }

    fn with_fail_stage(stage: AtomicWriteFailStage) -> FailStageReset {
        set_atomic_write_fail_stage(Some(stage));
        FailStageReset
    }

    fn count_temp_artifacts(dir: &Path) -> usize {
        fs::read_dir(dir)
            .expect("read temp dir")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(".i2p-tmp-"))
            .count()
    }

    const SIMPLE_EXPORT: &str = r#"
name: Simple
collection:
  - name: Users
    children:
      - name: List users
        url: https://api.example.com/users
        method: GET
"#;

    #[test]
    fn plan_defaults_output_to_opposite_format() {
        let (source, target, output) = plan(&ConvertOptions {
            input: PathBuf::from("insomnia.yaml"),
            output: None,
            dry_run: false,
        })
        .expect("plan");
        assert_eq!(source, DocumentFormat::Insomnia);
        assert_eq!(target, DocumentFormat::Postman);
        assert_eq!(output, PathBuf::from("postman_collection.json"));

        let (_, target, output) = plan(&ConvertOptions {
            input: PathBuf::from("exports/collection.json"),
            output: None,
            dry_run: false,
        })
        .expect("plan");
        assert_eq!(target, DocumentFormat::Insomnia);
        assert_eq!(output, PathBuf::from("insomnia.yaml"));
    }

    #[test]
    fn plan_rejects_same_format_and_unknown_output() {
        let err = plan(&ConvertOptions {
            input: PathBuf::from("a.yaml"),
            output: Some(PathBuf::from("b.yml")),
            dry_run: false,
        })
        .expect_err("same format");
        assert!(matches!(err, ConvertError::SameFormat { .. }));

        let err = plan(&ConvertOptions {
            input: PathBuf::from("a.yaml"),
            output: Some(PathBuf::from("b.txt")),
            dry_run: false,
        })
        .expect_err("unknown output");
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[test]
    fn convert_writes_postman_collection() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let input = tmp.path().join("insomnia.yaml");
        let output = tmp.path().join("out/postman.json");
        fs::write(&input, SIMPLE_EXPORT).expect("seed input");

        let result = convert(&ConvertOptions {
            input,
            output: Some(output.clone()),
            dry_run: false,
        })
        .expect("convert");

        assert_eq!(result.stats, TreeStats { folders: 1, requests: 1 });
        assert!(result.written.is_some());
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).expect("read output")).expect("json");
        assert_eq!(written["info"]["name"], "Simple");
        assert_eq!(written["item"][0]["item"][0]["request"]["method"], "GET");
        assert_eq!(count_temp_artifacts(output.parent().expect("parent")), 0);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let input = tmp.path().join("insomnia.yaml");
        let output = tmp.path().join("postman.json");
        fs::write(&input, SIMPLE_EXPORT).expect("seed input");

        let result = convert(&ConvertOptions {
            input,
            output: Some(output.clone()),
            dry_run: true,
        })
        .expect("convert");
        assert!(result.written.is_none());
        assert!(result.rendered.contains("\"List users\""));
        assert!(!output.exists());
    }

    #[test]
    fn parse_failure_leaves_no_output() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let input = tmp.path().join("broken.json");
        let output = tmp.path().join("insomnia.yaml");
        fs::write(&input, "{ \"info\": ").expect("seed input");

        let err = convert(&ConvertOptions {
            input,
            output: Some(output.clone()),
            dry_run: false,
        })
        .expect_err("should fail");
        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::DocumentParseError { .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn missing_input_is_read_error() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let err = convert(&ConvertOptions {
            input: tmp.path().join("absent.yaml"),
            output: Some(tmp.path().join("out.json")),
            dry_run: false,
        })
        .expect_err("should fail");
        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::DocumentReadError { .. })
        ));
    }

    #[test]
    fn validation_flags_top_level_requests_and_missing_endpoint() {
        let collection: PostmanCollection = serde_json::from_str(
            r#"{ "info": { "name": "V" }, "item": [ { "name": "Ping", "request": { "method": "GET", "url": "https://a.test" } } ] }"#,
        )
        .expect("decode");
        let validation = validate_collection(&collection);
        assert_eq!(validation.warnings.len(), 2, "{:?}", validation.warnings);
        assert!(validation.warnings[0].contains("Ping"));
        assert!(validation.warnings[1].contains("base_url"));
    }

    #[test]
    fn validation_flags_undecomposable_urls() {
        let export: InsomniaExport = serde_yaml::from_str(
            "name: V\ncollection:\n  - name: F\n    children:\n      - name: rel\n        url: /relative\n        method: GET\n",
        )
        .expect("decode");
        let validation = validate_export(&export);
        assert_eq!(validation.warnings.len(), 1);
        assert!(validation.warnings[0].contains("rel"));
    }

    #[test]
    fn top_level_insomnia_request_is_wrapped_and_flagged() {
        let export: InsomniaExport = serde_yaml::from_str(
            "name: V\ncollection:\n  - name: Loose\n    url: https://a.test/x\n    method: POST\n    body:\n      mimeType: application/json\n      text: '{}'\n",
        )
        .expect("decode");
        assert_eq!(export.wrapped_requests, ["Loose"]);
        assert_eq!(export.stats(), TreeStats { folders: 1, requests: 1 });

        let validation = validate_export(&export);
        assert!(
            validation.warnings.iter().any(|w| w.contains("Top-level request 'Loose'")),
            "{:?}",
            validation.warnings
        );

        let collection = insomnia_to_postman(&export);
        let (name, request) = collection.requests()[0];
        assert_eq!(name, "Loose");
        assert_eq!(request.method, "POST");
        assert_eq!(request.body.as_ref().map(|b| b.raw.as_str()), Some("{}"));
    }

    #[test]
    fn validation_flags_requests_without_method() {
        let collection: PostmanCollection = serde_json::from_str(
            r#"{ "info": { "name": "V" }, "variable": [ { "key": "endpoint", "value": "x" } ],
                "item": [ { "name": "F", "item": [
                    { "name": "No verb", "request": { "url": "https://a.test/x" } },
                    { "name": "Fine", "request": { "method": "GET", "url": "https://a.test/y" } }
                ] } ] }"#,
        )
        .expect("decode");
        let validation = validate_collection(&collection);
        assert_eq!(validation.warnings.len(), 1, "{:?}", validation.warnings);
        assert!(validation.warnings[0].contains("'No verb'"));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let target = tmp.path().join("collection.json");
        fs::write(&target, "old").expect("seed target");

        let outcome = atomic_write(&target, b"new").expect("write");
        assert!(outcome.replaced);
        assert!(!outcome.temp_path.exists());
        assert_eq!(fs::read_to_string(&target).expect("read"), "new");
    }

    #[test]
    fn atomic_write_failure_matrix_keeps_original_and_cleans_temp_files() {
        for stage in [
            AtomicWriteFailStage::TempFileCreate,
            AtomicWriteFailStage::WriteAll,
            AtomicWriteFailStage::SyncAll,
            AtomicWriteFailStage::FinalRename,
        ] {
            let tmp = tempfile::TempDir::new().expect("tempdir");
            let target = tmp.path().join("collection.json");
            fs::write(&target, "original").expect("seed target");

            let _reset = with_fail_stage(stage);
            let err = atomic_write(&target, b"new content").expect_err("expected failure");
            assert!(
                matches!(err, ConvertError::DocumentWriteError { .. }),
                "expected DocumentWriteError for stage {stage:?}, got {err:?}"
            );
            assert_eq!(
                fs::read_to_string(&target).expect("target should remain"),
                "original",
                "original content should survive stage {stage:?}"
            );
            assert_eq!(
                count_temp_artifacts(tmp.path()),
                0,
                "no temp artifacts should remain for stage {stage:?}"
            );
        }
    }

    #[test]
    fn atomic_write_rename_failure_removes_fsynced_temp_file() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let target = tmp.path().join("insomnia.yaml");

        let _reset = with_fail_stage(AtomicWriteFailStage::FinalRename);
        let err = atomic_write(&target, b"name: X\n").expect_err("expected failure");
        let ConvertError::DocumentWriteError { detail, .. } = &err else {
            panic!("expected DocumentWriteError, got {err:?}");
        };
        assert!(detail.contains("rename"), "unexpected detail: {detail}");
        assert!(!target.exists());
        assert_eq!(count_temp_artifacts(tmp.path()), 0);
    }
}
