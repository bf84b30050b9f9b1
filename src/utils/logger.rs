//! Report file output
//!
//! Console diagnostics go through the `log` facade. Commands additionally
//! write a plain-text report of what they did to a file; [`Logger`] owns
//! that file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// Writer for the report file
pub struct Logger {
    /// File handle for report output, `None` when reporting is off
    file: Mutex<Option<File>>,
}

impl Logger {
    /// Creates a logger writing to a new report file
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the report file, truncated if it exists
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be created
    pub fn new(log_file: &str) -> io::Result<Self> {
        let file = File::create(Path::new(log_file))?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
        })
    }

    /// Creates a logger that discards everything
    pub fn disabled() -> Self {
        Logger {
            file: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.lock().map(|file| file.is_some()).unwrap_or(false)
    }

    /// Appends one line to the report
    ///
    /// # Arguments
    ///
    /// * `message` - The line to write
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "report file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Appends a titled block of indented lines
    pub fn log_section(&self, title: &str, lines: &[String]) -> io::Result<()> {
        self.log(&format!("{}:", title))?;
        for line in lines {
            self.log(&format!("  {}", line))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_report_lines() {
        let path = std::env::temp_dir().join(format!("stitchkit-logger-{}.log", std::process::id()));
        let path_text = path.to_string_lossy().into_owned();

        let logger = Logger::new(&path_text).unwrap();
        assert!(logger.is_enabled());
        logger.log("Dataset: img_t<1-3>.tif").unwrap();
        logger
            .log_section("Series 0", &["Z=1 C=1 T=3".to_string()])
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Dataset: img_t<1-3>.tif\nSeries 0:\n  Z=1 C=1 T=3\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_disabled_logger() {
        let logger = Logger::disabled();
        assert!(!logger.is_enabled());
        assert!(logger.log("ignored").is_ok());
    }
}
