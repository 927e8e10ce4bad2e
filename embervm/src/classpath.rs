//! Resolves a binary class name (`java/lang/Object`) to the bytes of its
//! class file, searching classpath entries in declaration order the same
//! way the reference launcher does (§5.a "classpath resolution" / §9).

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zip::ZipArchive;

use crate::config::ClasspathEntry;
use crate::error::Fault;

enum Source {
	Directory(PathBuf),
	/// Archives are opened once and kept around: `ZipArchive::by_name`
	/// needs `&mut self`, so each is behind its own mutex rather than the
	/// whole classpath's.
	Archive(Mutex<ZipArchive<fs::File>>),
}

pub(crate) struct Classpath {
	sources: Vec<Source>,
}

impl Classpath {
	pub(crate) fn open(entries: &[ClasspathEntry]) -> Result<Self, Fault> {
		let mut sources = Vec::with_capacity(entries.len());
		for entry in entries {
			match entry {
				ClasspathEntry::Directory(path) => sources.push(Source::Directory(path.clone())),
				ClasspathEntry::Archive(path) => {
					let file = fs::File::open(path)?;
					let archive = ZipArchive::new(file)?;
					sources.push(Source::Archive(Mutex::new(archive)));
				}
			}
		}
		Ok(Self { sources })
	}

	/// `binary_name` uses `/` separators (`java/lang/Object`), matching the
	/// class file format's own naming convention rather than the host
	/// filesystem's.
	pub(crate) fn read_class(&self, binary_name: &str) -> Result<Option<Vec<u8>>, Fault> {
		let relative = format!("{binary_name}.class");
		for source in &self.sources {
			match source {
				Source::Directory(root) => {
					let path = join_class_path(root, binary_name);
					match read_file_bytes(&path) {
						Ok(bytes) => return Ok(Some(bytes)),
						Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
						Err(err) => return Err(Fault::Io(err)),
					}
				}
				Source::Archive(archive) => {
					let mut archive = archive.lock().unwrap();
					match archive.by_name(&relative) {
						Ok(mut entry) => {
							let mut bytes = Vec::with_capacity(entry.size() as usize);
							entry.read_to_end(&mut bytes)?;
							return Ok(Some(bytes));
						}
						Err(zip::result::ZipError::FileNotFound) => continue,
						Err(err) => return Err(Fault::from(err)),
					}
				}
			}
		}
		Ok(None)
	}
}

/// Reads a directory-entry class file's bytes. With the `mmap` feature,
/// maps the file instead of copying it through a read syscall, then copies
/// out of the mapping once — still one allocation, but the kernel does the
/// page-in work lazily rather than `read(2)` eagerly filling a buffer.
#[cfg(feature = "mmap")]
fn read_file_bytes(path: &Path) -> std::io::Result<Vec<u8>> {
	let file = fs::File::open(path)?;
	let mmap = unsafe { memmap2::Mmap::map(&file)? };
	Ok(mmap.as_ref().to_vec())
}

#[cfg(not(feature = "mmap"))]
fn read_file_bytes(path: &Path) -> std::io::Result<Vec<u8>> {
	fs::read(path)
}

fn join_class_path(root: &Path, binary_name: &str) -> PathBuf {
	let mut path = root.to_path_buf();
	for segment in binary_name.split('/') {
		path.push(segment);
	}
	path.set_extension("class");
	path
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	/// A throwaway directory under the host temp dir, removed on drop.
	struct ScratchDir(PathBuf);

	impl ScratchDir {
		fn new() -> Self {
			static COUNTER: AtomicU32 = AtomicU32::new(0);
			let id = COUNTER.fetch_add(1, Ordering::Relaxed);
			let path = std::env::temp_dir().join(format!("embervm-classpath-test-{}-{id}", std::process::id()));
			fs::create_dir_all(&path).unwrap();
			Self(path)
		}
	}

	impl Drop for ScratchDir {
		fn drop(&mut self) {
			let _ = fs::remove_dir_all(&self.0);
		}
	}

	#[test]
	fn reads_class_from_directory_entry() {
		let scratch = ScratchDir::new();
		fs::create_dir_all(scratch.0.join("com/example")).unwrap();
		fs::write(scratch.0.join("com/example/Widget.class"), b"\xCA\xFE\xBA\xBE").unwrap();

		let classpath = Classpath::open(&[ClasspathEntry::Directory(scratch.0.clone())]).unwrap();
		let bytes = classpath.read_class("com/example/Widget").unwrap();
		assert_eq!(bytes.as_deref(), Some(&b"\xCA\xFE\xBA\xBE"[..]));
	}

	#[test]
	fn missing_class_returns_none_without_error() {
		let scratch = ScratchDir::new();
		let classpath = Classpath::open(&[ClasspathEntry::Directory(scratch.0.clone())]).unwrap();
		assert!(classpath.read_class("does/not/Exist").unwrap().is_none());
	}

	#[test]
	fn later_entries_are_only_consulted_after_earlier_ones_miss() {
		let first = ScratchDir::new();
		let second = ScratchDir::new();
		fs::write(second.0.join("Only.class"), b"second").unwrap();

		let classpath =
			Classpath::open(&[ClasspathEntry::Directory(first.0.clone()), ClasspathEntry::Directory(second.0.clone())]).unwrap();
		assert_eq!(classpath.read_class("Only").unwrap().as_deref(), Some(&b"second"[..]));
	}
}
