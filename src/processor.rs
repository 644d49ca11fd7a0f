//! # Processor
//!
//! Finds broker reports below the input directory and rewrites each one
//! into the output directory. Files are handled one after another; a file
//! that fails is logged and counted without affecting the others, and an
//! output that already exists is never rewritten.
use crate::config::Config;
use crate::report::Renderer;
use crate::report::Segmenter;
use crate::spreadsheet::Grid;
use crate::spreadsheet::XlsxWorkbook;
use crate::writer::Workbook;
use anyhow::Context;
use anyhow::Result;
use glob::Pattern;
use log::debug;
use log::error;
use log::info;
use log::warn;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::path::PathBuf;
use walkdir::DirEntry;
use walkdir::WalkDir;

/// Outcome counters of one run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Outputs written
    pub processed: usize,
    /// Inputs whose output already existed
    pub skipped: usize,
    /// Inputs that could not be converted
    pub failed: usize,
}

/// Processes every discovered report.
pub fn run(config: &Config) -> Result<Summary> {
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Create output directory {}", config.output_dir.display()))?;

    let mut summary = Summary::default();
    for input in discover(config)? {
        let output = output_path(config, &input);
        if output.exists() {
            warn!("Skip {}: {} already exists", input.display(), output.display());
            summary.skipped += 1;
            continue;
        }
        match process_file(config, &input, &output) {
            Ok(()) => {
                info!("Fixed {} -> {}", input.display(), output.display());
                summary.processed += 1;
            }
            Err(e) => {
                error!("Failed {}: {:#}", input.display(), e);
                summary.failed += 1;
            }
        }
    }

    info!(
        "Done: {} processed, {} skipped, {} failed",
        summary.processed, summary.skipped, summary.failed
    );
    Ok(summary)
}

/// Lists the reports below the input directory in sorted order.
///
/// Files already carrying the output suffix and anything inside the
/// output directory are left out. Symlinked directories are not entered,
/// and entries that cannot be read are logged and skipped.
pub fn discover(config: &Config) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new(&config.pattern).with_context(|| format!("Invalid file pattern '{}'", config.pattern))?;
    let excluded = fs::canonicalize(&config.output_dir).ok();
    let walker = WalkDir::new(&config.input_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, excluded.as_deref()));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e).with_context(|| format!("Read directory {}", config.input_dir.display()));
            }
            Err(e) => {
                warn!("Skip {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if pattern.matches(name) && !name.ends_with(&config.output_suffix) {
            files.push(entry.into_path());
        }
    }
    debug!("Found {} report(s) under {}", files.len(), config.input_dir.display());
    Ok(files)
}

fn is_excluded_dir(entry: &DirEntry, excluded: Option<&Path>) -> bool {
    match excluded {
        Some(excluded) if entry.file_type().is_dir() => {
            fs::canonicalize(entry.path()).is_ok_and(|path| path == excluded)
        }
        _ => false,
    }
}

/// Output location of a report: base name, flattened subfolder, suffix.
///
/// `in/2023/q1/broker-report-1.xlsx` becomes
/// `fixed/broker-report-1-2023-q1-fixed.xlsx` for input directory `in`.
pub fn output_path(config: &Config, input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
    let subfolder = input
        .parent()
        .map(|parent| parent.strip_prefix(&config.input_dir).unwrap_or(parent))
        .map(|parent| {
            parent
                .components()
                .filter_map(|component| match component {
                    std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("-")
        })
        .unwrap_or_default();

    let mut name = stem;
    if !subfolder.is_empty() {
        name.push('-');
        name.push_str(&subfolder);
    }
    name.push_str(&config.output_suffix);
    config.output_dir.join(name)
}

/// Converts one report; the output is written only once the workbook is complete.
pub fn process_file(config: &Config, input: &Path, output: &Path) -> Result<()> {
    let mut source = XlsxWorkbook::open(input)?;
    let sheet = source.first_sheet()?;
    let (last_row, last_col) = sheet.used_range();
    debug!("Read sheet '{}' of {} ({}x{})", sheet.name(), input.display(), last_row, last_col);

    let segments = Segmenter::new(&sheet, config.options, &config.locale)
        .with_context(|| format!("Recognize layout of {}", input.display()))?;
    let mut workbook = Workbook::new(sheet.name());
    Renderer::new(config.options, &config.locale).render(segments, workbook.worksheet_mut())?;
    debug!("Rendered {} table(s) from {}", workbook.worksheet().tables().len(), input.display());

    let buffer = workbook.save(Cursor::new(Vec::new()))?.into_inner();
    fs::write(output, buffer).with_context(|| format!("Write {}", output.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(root: &Path) -> Config {
        Config {
            input_dir: root.to_path_buf(),
            output_dir: root.join("fixed"),
            ..Config::default()
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not a workbook").unwrap();
    }

    #[test]
    fn output_names_flatten_subfolders() {
        let config = Config {
            input_dir: PathBuf::from("in"),
            output_dir: PathBuf::from("fixed"),
            ..Config::default()
        };
        assert_eq!(
            output_path(&config, Path::new("in/broker-report-1.xlsx")),
            PathBuf::from("fixed/broker-report-1-fixed.xlsx")
        );
        assert_eq!(
            output_path(&config, Path::new("in/2023/q1/broker-report-1.xlsx")),
            PathBuf::from("fixed/broker-report-1-2023-q1-fixed.xlsx")
        );

        let config = Config::default();
        assert_eq!(
            output_path(&config, Path::new("./2023/broker-report-2.xlsx")),
            PathBuf::from("fixed/broker-report-2-2023-fixed.xlsx")
        );
    }

    #[test]
    fn discovery_filters_and_sorts() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("b/broker-report-2.xlsx"));
        touch(&root.path().join("broker-report-1.xlsx"));
        touch(&root.path().join("broker-report-1-fixed.xlsx"));
        touch(&root.path().join("other-report.xlsx"));
        touch(&root.path().join("fixed/broker-report-3.xlsx"));

        let files = discover(&config(root.path())).unwrap();
        assert_eq!(
            files,
            vec![root.path().join("b/broker-report-2.xlsx"), root.path().join("broker-report-1.xlsx")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_entered() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("broker-report-1.xlsx"));
        fs::create_dir_all(root.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(root.path(), root.path().join("sub/loop")).unwrap();

        let files = discover(&config(root.path())).unwrap();
        assert_eq!(files, vec![root.path().join("broker-report-1.xlsx")]);
    }

    #[test]
    fn missing_input_directory_is_reported() {
        let root = TempDir::new().unwrap();
        let config = Config {
            input_dir: root.path().join("absent"),
            ..config(root.path())
        };
        assert!(discover(&config).is_err());
    }

    #[test]
    fn failures_are_isolated_and_existing_outputs_skipped() {
        let root = TempDir::new().unwrap();
        let config = config(root.path());
        touch(&root.path().join("broker-report-1.xlsx"));
        touch(&root.path().join("broker-report-2.xlsx"));
        touch(&config.output_dir.join("broker-report-2-fixed.xlsx"));

        let summary = run(&config).unwrap();
        assert_eq!(summary, Summary { processed: 0, skipped: 1, failed: 1 });
        assert!(!config.output_dir.join("broker-report-1-fixed.xlsx").exists());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let root = TempDir::new().unwrap();
        let config = Config {
            pattern: "broker-[".to_owned(),
            ..config(root.path())
        };
        assert!(discover(&config).is_err());
    }
}
