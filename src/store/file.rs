//! Simple file-backed [`TokenCache`] shared between processes on one host.
//!
//! The file store offers no [`LockProvider`](crate::store::LockProvider); token managers backed
//! by it refresh without mutual exclusion.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{StoreError, StoreFuture, TokenCache, expiry_after},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FileEntry {
	value: String,
	expires_at: OffsetDateTime,
}

/// Persists cache entries to a JSON file after each mutation and re-reads it on every lookup.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<()>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		// Parse eagerly so a corrupt file is reported at startup.
		Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Default::default() })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, FileEntry>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist(&self, contents: &HashMap<String, FileEntry>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension(format!("{}.tmp", std::process::id()));

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn prune(contents: &mut HashMap<String, FileEntry>, now: OffsetDateTime) {
		contents.retain(|_, entry| now < entry.expires_at);
	}
}
impl TokenCache for FileStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let _guard = self.inner.read();
			let now = OffsetDateTime::now_utc();
			let snapshot = Self::load_snapshot(&self.path)?;

			Ok(snapshot.get(key).filter(|entry| now < entry.expires_at).map(|entry| entry.value.clone()))
		})
	}

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let _guard = self.inner.write();
			let now = OffsetDateTime::now_utc();
			let mut snapshot = Self::load_snapshot(&self.path)?;

			Self::prune(&mut snapshot, now);

			if ttl <= Duration::ZERO {
				snapshot.remove(key);
			} else {
				snapshot
					.insert(key.to_owned(), FileEntry { value, expires_at: expiry_after(now, ttl) });
			}

			self.persist(&snapshot)
		})
	}

	fn forget<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let _guard = self.inner.write();
			let mut snapshot = Self::load_snapshot(&self.path)?;
			let existed = snapshot.remove(key).is_some();

			if existed {
				self.persist(&snapshot)?;
			}

			Ok(existed)
		})
	}
}
