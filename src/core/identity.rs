//! Deterministic account identities.
//!
//! Every system account id is a UUID v5 of a role key under a per-deployment
//! namespace. The namespace is generated once and kept on local disk; losing
//! or replacing it orphans every account already created under it.

use crate::core::account::{AccountId, AccountRole};
use crate::core::currency::CurrencyId;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// File name of the namespace inside the data directory.
pub const NAMESPACE_FILE: &str = "namespace";

/// Root of deterministic identifier derivation for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(Uuid);

impl Namespace {
    /// Wrap an existing UUID. The nil UUID is rejected.
    pub fn from_uuid(uuid: Uuid) -> Result<Self, NamespaceError> {
        if uuid.is_nil() {
            return Err(NamespaceError::Nil);
        }
        Ok(Self(uuid))
    }

    /// A fresh random namespace.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Derive the identifier for `key` under this namespace.
    pub fn derive(&self, key: &str) -> AccountId {
        derive(self, key)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UUID v5 of `key` under `namespace`, as a ledger account id.
///
/// # Examples
///
/// ```
/// use hyperfx_core::core::identity::{derive, Namespace};
///
/// let ns = Namespace::generate();
/// assert_eq!(derive(&ns, "branch_fees"), derive(&ns, "branch_fees"));
/// assert_ne!(derive(&ns, "branch_fees"), derive(&ns, "branch_liquidity_840"));
/// ```
pub fn derive(namespace: &Namespace, key: &str) -> AccountId {
    AccountId::from_uuid(Uuid::new_v5(&namespace.0, key.as_bytes()))
}

/// Key for a system account role.
///
/// Per-currency roles get the numeric currency code appended
/// (`branch_liquidity_840`); pass `None` for roles that exist once
/// (`branch_fees`).
pub fn role_key(role: AccountRole, currency: Option<CurrencyId>) -> String {
    match currency {
        Some(currency) => format!("{}_{}", role.name(), currency.code()),
        None => role.name().to_string(),
    }
}

#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("namespace file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("namespace file already exists at {path}, refusing to overwrite")]
    AlreadyExists { path: PathBuf },
    #[error("namespace file {path} is malformed: expected 16 bytes, found {len}")]
    Malformed { path: PathBuf, len: usize },
    #[error("namespace must not be the nil uuid")]
    Nil,
    #[error("namespace file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The on-disk home of a deployment's namespace: 16 raw bytes.
///
/// Loading and creating are separate steps; callers decide whether a
/// missing file may be replaced by a new namespace.
#[derive(Debug, Clone)]
pub struct NamespaceFile {
    path: PathBuf,
}

impl NamespaceFile {
    /// Namespace file inside `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(NAMESPACE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the persisted namespace. Fails if it does not exist.
    pub fn load(&self) -> Result<Namespace, NamespaceError> {
        let bytes = fs::read(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                NamespaceError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                NamespaceError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let raw: [u8; 16] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| NamespaceError::Malformed {
                path: self.path.clone(),
                len: bytes.len(),
            })?;
        let namespace = Namespace::from_uuid(Uuid::from_bytes(raw))?;

        info!(
            "existing namespace found: path={} namespace={}",
            self.path.display(),
            namespace
        );
        Ok(namespace)
    }

    /// Generate a new namespace and persist it. Never overwrites.
    pub fn create(&self) -> Result<Namespace, NamespaceError> {
        let namespace = Namespace::generate();
        self.store(&namespace)?;
        warn!(
            "new namespace generated and written: path={} namespace={}",
            self.path.display(),
            namespace
        );
        Ok(namespace)
    }

    /// Persist a given namespace, e.g. when restoring a deployment onto a
    /// new host. Never overwrites.
    pub fn store(&self, namespace: &Namespace) -> Result<(), NamespaceError> {
        let io_err = |source| NamespaceError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            create_private_dir(dir).map_err(io_err)?;
        }

        let mut file = open_new_private(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                NamespaceError::AlreadyExists {
                    path: self.path.clone(),
                }
            } else {
                io_err(source)
            }
        })?;

        file.write_all(namespace.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn open_new_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_new_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixed_namespace() -> Namespace {
        Namespace::from_uuid(Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap())
            .unwrap()
    }

    #[test]
    fn test_derive_matches_uuid_v5() {
        let ns = fixed_namespace();
        let expected = Uuid::new_v5(ns.as_uuid(), b"branch_liquidity_840");
        assert_eq!(derive(&ns, "branch_liquidity_840").to_uuid(), expected);
        assert_eq!(derive(&ns, "branch_liquidity_840").to_uuid().get_version_num(), 5);
    }

    #[test]
    fn test_derive_deterministic() {
        let ns = fixed_namespace();
        assert_eq!(ns.derive("branch_fees"), ns.derive("branch_fees"));
    }

    #[test]
    fn test_derive_depends_on_namespace() {
        let a = Namespace::generate();
        let b = Namespace::generate();
        assert_ne!(derive(&a, "branch_fees"), derive(&b, "branch_fees"));
    }

    #[test]
    fn test_role_key() {
        assert_eq!(
            role_key(AccountRole::BranchLiquidity, Some(CurrencyId::USD)),
            "branch_liquidity_840"
        );
        assert_eq!(
            role_key(AccountRole::BranchShorts, Some(CurrencyId::new(36))),
            "branch_shorts_36"
        );
        assert_eq!(role_key(AccountRole::BranchFees, None), "branch_fees");
    }

    #[test]
    fn test_nil_namespace_rejected() {
        assert!(matches!(Namespace::from_uuid(Uuid::nil()), Err(NamespaceError::Nil)));
    }

    #[test]
    fn test_load_missing() {
        let tmp = TempDir::new().unwrap();
        let file = NamespaceFile::in_dir(tmp.path());
        assert!(matches!(file.load(), Err(NamespaceError::NotFound { .. })));
    }

    #[test]
    fn test_create_then_load() {
        let tmp = TempDir::new().unwrap();
        let file = NamespaceFile::in_dir(tmp.path().join("hfx"));
        let created = file.create().unwrap();
        assert!(file.exists());
        assert_eq!(fs::read(file.path()).unwrap().len(), 16);
        assert_eq!(file.load().unwrap(), created);
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let file = NamespaceFile::in_dir(tmp.path());
        let first = file.create().unwrap();
        assert!(matches!(file.create(), Err(NamespaceError::AlreadyExists { .. })));
        assert_eq!(file.load().unwrap(), first);
    }

    #[test]
    fn test_load_malformed() {
        let tmp = TempDir::new().unwrap();
        let file = NamespaceFile::in_dir(tmp.path());
        fs::write(file.path(), b"not sixteen").unwrap();
        assert!(matches!(
            file.load(),
            Err(NamespaceError::Malformed { len: 11, .. })
        ));
    }

    #[test]
    fn test_load_nil_namespace() {
        let tmp = TempDir::new().unwrap();
        let file = NamespaceFile::in_dir(tmp.path());
        fs::write(file.path(), [0u8; 16]).unwrap();
        assert!(matches!(file.load(), Err(NamespaceError::Nil)));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let file = NamespaceFile::in_dir(tmp.path());
        file.create().unwrap();
        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
