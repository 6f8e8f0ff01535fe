//! # Identity Module
//!
//! Keypairs used by the client and the store that keeps the counter keypair
//! stable across runs. The counter account lives at the counter keypair's
//! address, so losing or replacing the persisted keypair means targeting a
//! different counter.

use std::fmt;
use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::errors::{ClientError, Result};

/// Length of a serialized keypair: 32 secret bytes followed by 32 public bytes
pub const KEYPAIR_LEN: usize = 64;

/// A signing identity: an address plus the capability to sign for it
pub struct Identity {
    keypair: Keypair,
}

impl Identity {
    /// Generate a fresh identity
    pub fn generate() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    /// Decode an identity from its 64-byte private form
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() != KEYPAIR_LEN {
            return Err(format!("expected {KEYPAIR_LEN} keypair bytes, found {}", bytes.len()));
        }
        Keypair::try_from(bytes)
            .map(|keypair| Self { keypair })
            .map_err(|e| e.to_string())
    }

    pub fn to_bytes(&self) -> [u8; KEYPAIR_LEN] {
        self.keypair.to_bytes()
    }

    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl From<Keypair> for Identity {
    fn from(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Result of asking a store to persist a new identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    /// The identity was written
    Created,
    /// Something was already stored; nothing was written
    AlreadyPresent,
}

/// Persistence for a single identity
pub trait IdentityStore {
    /// Load the stored identity, if there is one
    fn load(&self) -> Result<Option<Identity>>;

    /// Store `identity` unless an identity is already stored
    fn save_new(&self, identity: &Identity) -> Result<Persisted>;
}

/// Identity stored as a JSON array of keypair bytes, as the Solana CLI writes it
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<Identity>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::storage(&self.path, e)),
        };

        let bytes: Vec<u8> =
            serde_json::from_str(&contents).map_err(|e| ClientError::storage(&self.path, e))?;
        Identity::from_bytes(&bytes)
            .map(Some)
            .map_err(|reason| ClientError::storage(&self.path, reason))
    }

    /// The keypair is written and synced to a temporary file in the same
    /// directory, then linked into place only if nothing exists there yet.
    /// Readers see either no file or the complete keypair.
    fn save_new(&self, identity: &Identity) -> Result<Persisted> {
        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(|e| ClientError::storage(&self.path, e))?;
                parent
            }
            None => Path::new("."),
        };

        // NamedTempFile is created with mode 0o600 on unix.
        let mut file =
            NamedTempFile::new_in(parent).map_err(|e| ClientError::storage(&self.path, e))?;
        let json = serde_json::to_string(&identity.to_bytes().to_vec())
            .map_err(|e| ClientError::storage(&self.path, e))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| ClientError::storage(&self.path, e))?;

        match file.persist_noclobber(&self.path) {
            Ok(_) => Ok(Persisted::Created),
            Err(e) if e.error.kind() == IoErrorKind::AlreadyExists => Ok(Persisted::AlreadyPresent),
            Err(e) => Err(ClientError::storage(&self.path, e.error)),
        }
    }
}

/// In-memory store, handy when the identity must not outlive the process
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    bytes: Mutex<Option<[u8; KEYPAIR_LEN]>>,
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<Identity>> {
        let bytes = *self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        bytes
            .map(|bytes| Identity::from_bytes(&bytes))
            .transpose()
            .map_err(|reason| ClientError::storage("<memory>", reason))
    }

    fn save_new(&self, identity: &Identity) -> Result<Persisted> {
        let mut slot = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Ok(Persisted::AlreadyPresent);
        }
        *slot = Some(identity.to_bytes());
        Ok(Persisted::Created)
    }
}

/// Return the stored identity, creating and storing one on first use
///
/// A concurrent run may create the identity between our load and our save;
/// in that case the stored identity wins and is returned instead of ours.
pub fn load_or_create(store: &impl IdentityStore) -> Result<Identity> {
    if let Some(identity) = store.load()? {
        debug!(address = %identity.address(), "loaded existing identity");
        return Ok(identity);
    }

    let identity = Identity::generate();
    match store.save_new(&identity)? {
        Persisted::Created => {
            info!(address = %identity.address(), "created new identity");
            Ok(identity)
        }
        Persisted::AlreadyPresent => store.load()?.ok_or_else(|| {
            ClientError::Storage {
                path: PathBuf::from("<store>"),
                reason: "identity vanished after a concurrent create".to_string(),
            }
        }),
    }
}

/// Load or create the counter identity persisted at `path`
pub fn load_or_create_resource_identity(path: impl AsRef<Path>) -> Result<Identity> {
    load_or_create(&FileIdentityStore::new(path.as_ref()))
}

/// Load an identity that must already exist, such as the fee payer's keypair
pub fn load_identity(path: impl AsRef<Path>) -> Result<Identity> {
    let path = path.as_ref();
    FileIdentityStore::new(path)
        .load()?
        .ok_or_else(|| ClientError::storage(path, "keypair file not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn repeated_loads_return_the_same_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("counter-keypair.json");

        let first = load_or_create_resource_identity(&path).unwrap();
        let written = fs::read(&path).unwrap();
        let second = load_or_create_resource_identity(&path).unwrap();

        assert_eq!(first.to_bytes(), second.to_bytes());
        assert_eq!(fs::read(&path).unwrap(), written);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("keys").join("counter.json");

        let identity = load_or_create_resource_identity(&path).unwrap();
        assert!(path.exists());
        assert_eq!(load_identity(&path).unwrap().address(), identity.address());
    }

    #[test]
    fn stored_format_is_a_json_byte_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("id.json");
        let identity = Identity::generate();
        FileIdentityStore::new(&path).save_new(&identity).unwrap();

        let bytes: Vec<u8> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(bytes, identity.to_bytes().to_vec());
    }

    #[test]
    fn save_new_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("id.json"));
        let original = Identity::generate();

        assert_eq!(store.save_new(&original).unwrap(), Persisted::Created);
        assert_eq!(store.save_new(&Identity::generate()).unwrap(), Persisted::AlreadyPresent);
        assert_eq!(store.load().unwrap().unwrap().address(), original.address());
    }

    #[test]
    fn save_new_leaves_only_the_keypair_file() {
        let dir = TempDir::new().unwrap();
        let store = FileIdentityStore::new(dir.path().join("id.json"));

        store.save_new(&Identity::generate()).unwrap();
        store.save_new(&Identity::generate()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("id.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn keypair_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("id.json");
        FileIdentityStore::new(&path).save_new(&Identity::generate()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn concurrent_creators_agree_on_one_identity() {
        let dir = TempDir::new().unwrap();
        let path = Arc::new(dir.path().join("counter-keypair.json"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    load_or_create_resource_identity(path.as_path()).map(|id| id.address())
                })
            })
            .collect();

        let addresses: Vec<Pubkey> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();
        let stored = load_identity(path.as_path()).unwrap().address();
        assert!(addresses.iter().all(|address| *address == stored));
    }

    #[test]
    fn malformed_content_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("id.json");

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_or_create_resource_identity(&path),
            Err(ClientError::Storage { .. })
        ));

        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            load_or_create_resource_identity(&path),
            Err(ClientError::Storage { .. })
        ));
    }

    #[test]
    fn missing_payer_keypair_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        let err = load_identity(dir.path().join("id.json")).unwrap_err();
        assert!(matches!(err, ClientError::Storage { .. }));
    }

    #[test]
    fn memory_store_keeps_first_identity() {
        let store = MemoryIdentityStore::default();
        let first = load_or_create(&store).unwrap();
        let second = load_or_create(&store).unwrap();
        assert_eq!(first.to_bytes(), second.to_bytes());
    }
}
