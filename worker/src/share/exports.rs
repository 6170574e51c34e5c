use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// The export configuration file owned by this worker.
///
/// One `<path> <options>` line per export. Lines the worker did not write are
/// left untouched.
#[derive(Debug, Clone)]
pub struct ExportsFile {
    path: PathBuf,
    options: String,
}

impl ExportsFile {
    pub fn new(path: impl Into<PathBuf>, options: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: options.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_line(&self, export: &str) -> String {
        format!("{export} {}", self.options)
    }

    /// Appends the entry for `export` unless the identical line exists.
    /// Returns whether the file changed.
    pub fn add(&self, export: &str) -> io::Result<bool> {
        let mut content = self.read()?;
        let entry = self.entry_line(export);
        if content.lines().any(|line| line == entry) {
            return Ok(false);
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&entry);
        content.push('\n');
        self.write(&content)?;
        Ok(true)
    }

    /// Drops every line whose first field is `export`.
    /// Returns whether the file changed.
    pub fn remove(&self, export: &str) -> io::Result<bool> {
        let content = self.read()?;
        let kept: String = content
            .split_inclusive('\n')
            .filter(|line| line.split_whitespace().next() != Some(export))
            .collect();
        if kept.len() == content.len() {
            return Ok(false);
        }
        self.write(&kept)?;
        Ok(true)
    }

    pub fn read(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    // replace through a temp file so readers never see a half-written file
    fn write(&self, content: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
