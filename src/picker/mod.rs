//! Input and output path picking.
//!
//! `PickerService` is the dialog surface the orchestrator asks for paths.
//! `FsPicker` answers from command-line presets and a directory scan.

use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Request for one or more existing files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFilesOptions {
    pub multiple: bool,
    /// Accepted extensions without the dot. Empty accepts everything.
    pub extensions: Vec<String>,
}

impl OpenFilesOptions {
    pub fn multiple(extensions: &[String]) -> Self {
        Self {
            multiple: true,
            extensions: extensions.to_vec(),
        }
    }

    pub fn single(extensions: &[String]) -> Self {
        Self {
            multiple: false,
            extensions: extensions.to_vec(),
        }
    }
}

/// Result of an open-files pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Picked {
    Single(PathBuf),
    Multiple(Vec<PathBuf>),
}

impl Picked {
    pub fn into_paths(self) -> Vec<PathBuf> {
        match self {
            Picked::Single(path) => vec![path],
            Picked::Multiple(paths) => paths,
        }
    }

    pub fn into_first(self) -> Option<PathBuf> {
        self.into_paths().into_iter().next()
    }
}

/// Dialog surface for choosing paths. `None` means the user cancelled.
pub trait PickerService {
    fn open_files(&self, options: OpenFilesOptions) -> impl Future<Output = Option<Picked>>;

    fn open_directory(&self) -> impl Future<Output = Option<PathBuf>>;

    fn save_file(
        &self,
        extensions: &[String],
        default_name: &str,
    ) -> impl Future<Output = Option<PathBuf>>;
}

/// Picker backed by command-line presets and the file system.
///
/// Multi-file picks return the borrow-record workbooks, single picks the
/// reader list.
#[derive(Debug, Clone, Default)]
pub struct FsPicker {
    borrow_files: Vec<PathBuf>,
    reader_list: Option<PathBuf>,
    input_dir: Option<PathBuf>,
    output_dir: PathBuf,
}

impl FsPicker {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Default::default()
        }
    }

    pub fn with_borrow_files(mut self, files: Vec<PathBuf>) -> Self {
        self.borrow_files = files;
        self
    }

    pub fn with_reader_list(mut self, path: Option<PathBuf>) -> Self {
        self.reader_list = path;
        self
    }

    pub fn with_input_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.input_dir = dir;
        self
    }

    /// Recursively collect files under `input_dir` with an accepted extension.
    fn scan_input_dir(&self, extensions: &[String]) -> Vec<PathBuf> {
        let Some(ref dir) = self.input_dir else {
            return Vec::new();
        };

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(|path| has_extension(path, extensions))
            .filter(|path| Some(path) != self.reader_list.as_ref())
            .collect();

        files.sort();
        debug!("Found {} workbooks in {}", files.len(), dir.display());
        files
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Case-insensitive extension check. An empty filter accepts everything.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

impl PickerService for FsPicker {
    async fn open_files(&self, options: OpenFilesOptions) -> Option<Picked> {
        if !options.multiple {
            return self.reader_list.clone().map(Picked::Single);
        }

        let files: Vec<PathBuf> = if self.borrow_files.is_empty() {
            self.scan_input_dir(&options.extensions)
        } else {
            self.borrow_files
                .iter()
                .filter(|path| {
                    let keep = has_extension(path, &options.extensions);
                    if !keep {
                        warn!("Ignoring {}: not a spreadsheet", path.display());
                    }
                    keep
                })
                .cloned()
                .collect()
        };

        if files.is_empty() {
            None
        } else {
            Some(Picked::Multiple(files))
        }
    }

    async fn open_directory(&self) -> Option<PathBuf> {
        Some(self.output_dir.clone())
    }

    async fn save_file(&self, extensions: &[String], default_name: &str) -> Option<PathBuf> {
        let mut path = self.output_dir.join(default_name);
        if let Some(first) = extensions.first() {
            if !has_extension(&path, extensions) {
                let name = format!("{}.{}", default_name, first);
                path = self.output_dir.join(name);
            }
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tokio_test::block_on;

    fn spreadsheet_exts() -> Vec<String> {
        vec!["xlsx".to_string(), "xls".to_string()]
    }

    #[test]
    fn test_scan_finds_sorted_workbooks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("2024")).unwrap();
        fs::create_dir(root.join(".cache")).unwrap();
        fs::write(root.join("b.xlsx"), "").unwrap();
        fs::write(root.join("a.XLS"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("2024").join("c.xlsx"), "").unwrap();
        fs::write(root.join(".cache").join("d.xlsx"), "").unwrap();
        fs::write(root.join("readers.xlsx"), "").unwrap();

        let picker = FsPicker::new(root.join("out"))
            .with_input_dir(Some(root.to_path_buf()))
            .with_reader_list(Some(root.join("readers.xlsx")));

        let picked = block_on(picker.open_files(OpenFilesOptions::multiple(&spreadsheet_exts())));
        assert_eq!(
            picked,
            Some(Picked::Multiple(vec![
                root.join("2024").join("c.xlsx"),
                root.join("a.XLS"),
                root.join("b.xlsx"),
            ]))
        );
    }

    #[test]
    fn test_presets_take_precedence_over_scan() {
        let picker = FsPicker::new(PathBuf::from("out"))
            .with_borrow_files(vec![PathBuf::from("x.xlsx"), PathBuf::from("y.csv")])
            .with_input_dir(Some(PathBuf::from("does-not-matter")));

        let picked = block_on(picker.open_files(OpenFilesOptions::multiple(&spreadsheet_exts())));
        assert_eq!(picked, Some(Picked::Multiple(vec![PathBuf::from("x.xlsx")])));
    }

    #[test]
    fn test_nothing_to_pick_is_cancel() {
        let picker = FsPicker::new(PathBuf::from("out"));
        let exts = spreadsheet_exts();
        assert_eq!(block_on(picker.open_files(OpenFilesOptions::multiple(&exts))), None);
        assert_eq!(block_on(picker.open_files(OpenFilesOptions::single(&exts))), None);
    }

    #[test]
    fn test_single_pick_returns_reader_list() {
        let picker =
            FsPicker::new(PathBuf::from("out")).with_reader_list(Some(PathBuf::from("r.xlsx")));
        let picked = block_on(picker.open_files(OpenFilesOptions::single(&spreadsheet_exts())));
        assert_eq!(picked.and_then(Picked::into_first), Some(PathBuf::from("r.xlsx")));
    }

    #[test]
    fn test_save_file_appends_extension() {
        let picker = FsPicker::new(PathBuf::from("out"));
        let html = vec!["html".to_string()];

        assert_eq!(
            block_on(picker.save_file(&html, "Ana_report")),
            Some(PathBuf::from("out/Ana_report.html"))
        );
        assert_eq!(
            block_on(picker.save_file(&html, "Ana_report.html")),
            Some(PathBuf::from("out/Ana_report.html"))
        );
        assert_eq!(block_on(picker.open_directory()), Some(PathBuf::from("out")));
    }
}
