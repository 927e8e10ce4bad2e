use std::path::PathBuf;

/// Runtime configuration. Deliberately dumb: a `Config` is a bag of values
/// already resolved from the command line / environment by the launcher
/// (an external collaborator); this crate never parses CLI flags itself.
#[derive(Debug, Clone)]
pub struct Config {
	pub classpath: Vec<ClasspathEntry>,
	pub path_separator: char,
	pub file_separator: char,
	pub main_class: String,
	pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ClasspathEntry {
	Directory(PathBuf),
	Archive(PathBuf),
}

impl Config {
	/// Builds a `Config` from the three recognized keys plus the explicit
	/// main-class/args pair; missing keys fall back to host-platform
	/// defaults (`:` / `/` on Unix-like hosts, `;` / `\` on Windows).
	pub fn new(main_class: impl Into<String>, args: Vec<String>) -> Self {
		Config {
			classpath: Vec::new(),
			path_separator: Self::default_path_separator(),
			file_separator: std::path::MAIN_SEPARATOR,
			main_class: main_class.into(),
			args,
		}
	}

	pub fn with_classpath(mut self, raw: &str) -> Self {
		self.classpath = raw
			.split(self.path_separator)
			.filter(|s| !s.is_empty())
			.map(ClasspathEntry::from_path)
			.collect();
		self
	}

	pub fn set(&mut self, key: &str, value: &str) {
		match key {
			"class.path" => self.classpath = value
				.split(self.path_separator)
				.filter(|s| !s.is_empty())
				.map(ClasspathEntry::from_path)
				.collect(),
			"path.separator" => {
				if let Some(c) = value.chars().next() {
					self.path_separator = c;
				}
			}
			"file.separator" => {
				if let Some(c) = value.chars().next() {
					self.file_separator = c;
				}
			}
			_ => {}
		}
	}

	#[cfg(windows)]
	fn default_path_separator() -> char {
		';'
	}

	#[cfg(not(windows))]
	fn default_path_separator() -> char {
		':'
	}
}

impl ClasspathEntry {
	fn from_path(raw: &str) -> Self {
		let path = PathBuf::from(raw);
		match path.extension().and_then(|e| e.to_str()) {
			Some("jar") | Some("zip") => ClasspathEntry::Archive(path),
			_ => ClasspathEntry::Directory(path),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classpath_splits_on_separator() {
		let cfg = Config::new("Main", vec![]).with_classpath("/a/b:/c/d.jar");
		assert_eq!(cfg.classpath.len(), 2);
		assert!(matches!(cfg.classpath[0], ClasspathEntry::Directory(_)));
		assert!(matches!(cfg.classpath[1], ClasspathEntry::Archive(_)));
	}

	#[test]
	fn set_recognizes_keys() {
		let mut cfg = Config::new("Main", vec![]);
		cfg.set("path.separator", ";");
		cfg.set("class.path", "a;b");
		assert_eq!(cfg.classpath.len(), 2);
	}
}
