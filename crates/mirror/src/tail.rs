//! Following a file as it grows, is truncated, or is replaced.

use std::{
	io::{self, SeekFrom},
	mem::take,
	path::{Path, PathBuf},
};

use tokio::{
	fs::{metadata, File},
	io::{AsyncReadExt, AsyncSeekExt},
};
use tracing::{debug, info, trace};

/// Identifies a file independently of its path, so rotation can be noticed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FileId {
	dev: u64,
	ino: u64,
}

impl FileId {
	#[cfg(unix)]
	fn of(meta: &std::fs::Metadata) -> Option<Self> {
		use std::os::unix::fs::MetadataExt;
		Some(Self {
			dev: meta.dev(),
			ino: meta.ino(),
		})
	}

	#[cfg(not(unix))]
	fn of(_meta: &std::fs::Metadata) -> Option<Self> {
		None
	}
}

/// How much of the start of the file is kept, to tell a cut-back file from a rewritten one.
const HEAD_LEN: usize = 4096;

/// An open file and the position up to which it has been read.
///
/// When the file gets shorter than what was already read, it was truncated. If what's left is
/// a prefix of what was read (as far as the first [`HEAD_LEN`] bytes tell), reading resumes at
/// the new end, so the surviving records aren't delivered twice. Otherwise the file was emptied
/// and written anew, and is read again from its start.
#[derive(Debug)]
pub struct Tail {
	path: PathBuf,
	file: File,
	id: Option<FileId>,

	/// Only moves forward, except when the file is truncated or replaced.
	cursor: u64,

	/// Bytes read past the last newline.
	partial: Vec<u8>,

	/// The first bytes of the file, up to `HEAD_LEN` or the cursor.
	head: Vec<u8>,
}

impl Tail {
	pub async fn open(path: &Path) -> io::Result<Self> {
		let file = File::open(path).await?;
		let id = FileId::of(&file.metadata().await?);
		Ok(Self {
			path: path.to_owned(),
			file,
			id,
			cursor: 0,
			partial: Vec::new(),
			head: Vec::new(),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Read whatever was appended since the last call, and return the complete records in it.
	pub async fn read_records(&mut self) -> io::Result<Vec<String>> {
		let mut records = self.follow_replacement().await?;

		let len = self.file.metadata().await?.len();
		if len < self.cursor {
			self.truncated(len).await?;
		}

		self.read_to(len).await?;
		records.extend(self.split_records());
		Ok(records)
	}

	/// Whatever is left of an unterminated last line.
	pub fn flush(&mut self) -> Option<String> {
		if self.partial.is_empty() {
			None
		} else {
			Some(decode(&take(&mut self.partial)))
		}
	}

	/// Read from the cursor up to `len` into the partial buffer.
	async fn read_to(&mut self, len: u64) -> io::Result<()> {
		if len <= self.cursor {
			return Ok(());
		}

		self.file.seek(SeekFrom::Start(self.cursor)).await?;
		let before = self.partial.len();
		let read = (&mut self.file)
			.take(len - self.cursor)
			.read_to_end(&mut self.partial)
			.await?;
		trace!(path=?self.path, cursor=self.cursor, read, "read from mirrored file");

		if self.head.len() < HEAD_LEN {
			let fresh = &self.partial[before..];
			let wanted = (HEAD_LEN - self.head.len()).min(fresh.len());
			self.head.extend_from_slice(&fresh[..wanted]);
		}

		self.cursor += read as u64;
		Ok(())
	}

	async fn truncated(&mut self, len: u64) -> io::Result<()> {
		let keep = usize::try_from(len).map_or(HEAD_LEN, |len| len.min(HEAD_LEN));
		let mut prefix = Vec::with_capacity(keep);
		self.file.seek(SeekFrom::Start(0)).await?;
		(&mut self.file)
			.take(keep as u64)
			.read_to_end(&mut prefix)
			.await?;

		if len > 0 && self.head.get(..keep) == Some(prefix.as_slice()) {
			info!(path=?self.path, was=self.cursor, now=len, "mirrored file was cut back, resuming at its end");

			// the unterminated record starts where the partial buffer does
			let record_start = self.cursor - self.partial.len() as u64;
			if len > record_start {
				self.partial.truncate(usize::try_from(len - record_start).unwrap_or(usize::MAX));
			} else {
				self.partial.clear();
			}

			self.head.truncate(keep);
			self.cursor = len;
		} else {
			info!(path=?self.path, was=self.cursor, now=len, "mirrored file was truncated, reading it again");
			self.partial.clear();
			self.head.clear();
			self.cursor = 0;
		}

		Ok(())
	}

	/// If the path now names a different file, switch to it and read it from the start.
	///
	/// The old file is read to its end first, as writers tend to append a last few records
	/// before rotating. Returns those records and the unterminated tail of the old file.
	async fn follow_replacement(&mut self) -> io::Result<Vec<String>> {
		let Some(id) = self.id else {
			return Ok(Vec::new());
		};

		let current = FileId::of(&metadata(&self.path).await?);
		if current == Some(id) {
			return Ok(Vec::new());
		}

		debug!(path=?self.path, "mirrored file was replaced, reopening");
		let file = File::open(&self.path).await?;

		let old_len = self.file.metadata().await?.len();
		self.read_to(old_len).await?;
		let mut records = self.split_records();
		records.extend(self.flush());

		self.id = FileId::of(&file.metadata().await?);
		self.file = file;
		self.cursor = 0;
		self.head.clear();
		Ok(records)
	}

	fn split_records(&mut self) -> Vec<String> {
		let mut records = Vec::new();
		while let Some(end) = self.partial.iter().position(|b| *b == b'\n') {
			let line: Vec<u8> = self.partial.drain(..=end).collect();
			records.push(decode(&line[..end]));
		}
		records
	}
}

fn decode(line: &[u8]) -> String {
	let line = line.strip_suffix(b"\r").unwrap_or(line);
	String::from_utf8_lossy(line).into_owned()
}
