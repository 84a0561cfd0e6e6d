//! A volume whose files are encrypted into a host directory.
//!
//! Each logical file becomes one host file named by the hex SHA-256 of its
//! logical path:
//!
//! ```text
//! [version: 1][nonce: 12][ciphertext + tag]
//! ```
//!
//! The plaintext is `[path len: u16][path][contents]` and the host file name
//! is the associated data, so a file renamed or copied to another name fails
//! authentication.

use core::fmt;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, ErrorKind};

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use camino::{Utf8Path, Utf8PathBuf};
use hkdf::Hkdf;
use parking_lot::Mutex;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{ensure_space, len_u64, Volume};
use crate::descriptor::MountKey;
use crate::error::{FsError, MountError};

const FILE_FORMAT_VERSION: u8 = 1;

const AES_KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
const PATH_LEN_SIZE: usize = 2;

/// version + nonce + tag.
const FILE_OVERHEAD: usize = 1 + NONCE_SIZE + TAG_SIZE;
const FILE_OVERHEAD_U64: u64 = FILE_OVERHEAD as u64;

const KEY_SALT: &[u8] = b"calimero-enclave-fs-v1";
const KEY_INFO: &[u8] = b"persistent-volume";

const TMP_EXTENSION: &str = "tmp";

#[derive(Zeroize, ZeroizeOnDrop)]
struct FileKey {
    key: [u8; AES_KEY_SIZE],
}

impl FileKey {
    fn derive(mount_key: &MountKey) -> Option<Self> {
        let hkdf = Hkdf::<Sha256>::new(Some(KEY_SALT), mount_key.as_bytes());

        let mut key = [0; AES_KEY_SIZE];
        hkdf.expand(KEY_INFO, &mut key).ok()?;

        Some(Self { key })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(&self.key.into())
    }
}

#[derive(Default)]
struct Index {
    /// Logical path to content length.
    files: BTreeMap<Utf8PathBuf, u64>,
    /// Host files that could not be decrypted at mount time, with their
    /// estimated content length. They still count against the capacity.
    unreadable: BTreeMap<String, u64>,
}

impl Index {
    fn used(&self) -> u64 {
        self.files
            .values()
            .chain(self.unreadable.values())
            .fold(0, |total, len| total.saturating_add(*len))
    }
}

pub struct PersistentVolume {
    root: Utf8PathBuf,
    capacity: u64,
    key: FileKey,
    index: Mutex<Index>,
}

impl fmt::Debug for PersistentVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentVolume")
            .field("root", &self.root)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl PersistentVolume {
    /// Opens (creating if needed) the volume stored under `root` and indexes
    /// the files already there.
    pub fn open(root: &Utf8Path, capacity: u64, key: &MountKey) -> Result<Self, MountError> {
        if key.is_empty() {
            return Err(MountError::MissingKey(root.to_owned()));
        }

        fs::create_dir_all(root).map_err(|source| MountError::Io {
            path: root.to_owned(),
            source,
        })?;

        let key = FileKey::derive(key).ok_or(MountError::KeyDerivation)?;

        let volume = Self {
            root: root.to_owned(),
            capacity,
            key,
            index: Mutex::default(),
        };

        let index = volume.scan().map_err(|source| MountError::Io {
            path: root.to_owned(),
            source,
        })?;

        info!(
            root=%root,
            files=index.files.len(),
            unreadable=index.unreadable.len(),
            "Opened persistent volume"
        );

        *volume.index.lock() = index;

        Ok(volume)
    }

    fn scan(&self) -> io::Result<Index> {
        let mut index = Index::default();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;

            if !entry.file_type()?.is_file() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            if Utf8Path::new(&name).extension() == Some(TMP_EXTENSION) {
                debug!(name=%name, "Removing interrupted write");
                fs::remove_file(entry.path())?;
                continue;
            }

            let sealed = fs::read(entry.path())?;

            match self.open_file(&name, &sealed) {
                Some((path, contents)) => {
                    let _previous = index.files.insert(path, len_u64(&contents));
                }
                None => {
                    warn!(name=%name, "Host file does not decrypt under the mount key");
                    let estimate = len_u64(&sealed).saturating_sub(FILE_OVERHEAD_U64);
                    let _previous = index.unreadable.insert(name, estimate);
                }
            }
        }

        Ok(index)
    }

    fn file_name(path: &Utf8Path) -> String {
        hex::encode(Sha256::digest(path.as_str().as_bytes()))
    }

    fn host_path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    fn seal_file(&self, name: &str, path: &Utf8Path, contents: &[u8]) -> Result<Vec<u8>, FsError> {
        let path_len = u16::try_from(path.as_str().len()).map_err(|_| FsError::InvalidPath {
            path: path.to_owned(),
            reason: "path is too long",
        })?;

        let mut plaintext = Zeroizing::new(Vec::with_capacity(
            PATH_LEN_SIZE + path.as_str().len() + contents.len(),
        ));
        plaintext.extend_from_slice(&path_len.to_le_bytes());
        plaintext.extend_from_slice(path.as_str().as_bytes());
        plaintext.extend_from_slice(contents);

        let mut nonce_bytes = [0_u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .key
            .cipher()
            .encrypt(
                nonce,
                Payload {
                    msg: &plaintext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|_| FsError::Corrupted(path.to_owned()))?;

        let mut output = Vec::with_capacity(1 + NONCE_SIZE + ciphertext.len());
        output.push(FILE_FORMAT_VERSION);
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);

        Ok(output)
    }

    /// Decrypts a host file, returning its logical path and contents.
    fn open_file(&self, name: &str, sealed: &[u8]) -> Option<(Utf8PathBuf, Vec<u8>)> {
        if sealed.len() < FILE_OVERHEAD || sealed[0] != FILE_FORMAT_VERSION {
            return None;
        }

        let nonce = Nonce::from_slice(&sealed[1..1 + NONCE_SIZE]);

        let plaintext = Zeroizing::new(
            self.key
                .cipher()
                .decrypt(
                    nonce,
                    Payload {
                        msg: &sealed[1 + NONCE_SIZE..],
                        aad: name.as_bytes(),
                    },
                )
                .ok()?,
        );

        if plaintext.len() < PATH_LEN_SIZE {
            return None;
        }

        let (len, rest) = plaintext.split_at(PATH_LEN_SIZE);
        let len = usize::from(u16::from_le_bytes([len[0], len[1]]));

        if rest.len() < len {
            return None;
        }

        let (path, contents) = rest.split_at(len);
        let path = Utf8PathBuf::from(core::str::from_utf8(path).ok()?);

        if Self::file_name(&path) != name {
            return None;
        }

        Some((path, contents.to_vec()))
    }
}

impl Volume for PersistentVolume {
    fn read(&self, path: &Utf8Path) -> Result<Vec<u8>, FsError> {
        let name = Self::file_name(path);
        let host_path = self.host_path(&name);

        let _guard = self.index.lock();

        let sealed = match fs::read(&host_path) {
            Ok(sealed) => sealed,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FsError::NotFound(path.to_owned()))
            }
            Err(source) => {
                return Err(FsError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        match self.open_file(&name, &sealed) {
            Some((stored, contents)) if stored == path => Ok(contents),
            _ => {
                warn!(path=%path, "Persistent file failed authentication");
                Err(FsError::Corrupted(path.to_owned()))
            }
        }
    }

    fn write(&self, path: &Utf8Path, data: &[u8]) -> Result<(), FsError> {
        let name = Self::file_name(path);
        let host_path = self.host_path(&name);

        let mut index = self.index.lock();

        let previous = index
            .files
            .get(path)
            .or_else(|| index.unreadable.get(&name))
            .copied()
            .unwrap_or(0);

        ensure_space(path, self.capacity, index.used(), previous, len_u64(data))?;

        let sealed = self.seal_file(&name, path, data)?;

        let tmp_path = host_path.with_extension(TMP_EXTENSION);
        let io_err = |source| FsError::Io {
            path: path.to_owned(),
            source,
        };

        fs::write(&tmp_path, &sealed).map_err(io_err)?;
        fs::rename(&tmp_path, &host_path).map_err(io_err)?;

        let _removed = index.unreadable.remove(&name);
        let _previous = index.files.insert(path.to_owned(), len_u64(data));

        debug!(path=%path, len=data.len(), "Wrote persistent file");

        Ok(())
    }

    fn remove(&self, path: &Utf8Path) -> Result<(), FsError> {
        let name = Self::file_name(path);

        let mut index = self.index.lock();

        match fs::remove_file(self.host_path(&name)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(FsError::NotFound(path.to_owned()))
            }
            Err(source) => {
                return Err(FsError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        }

        let _removed = index.files.remove(path);
        let _removed = index.unreadable.remove(&name);

        Ok(())
    }

    /// Only files that decrypted under the mount key exist, matching `list`.
    fn exists(&self, path: &Utf8Path) -> Result<bool, FsError> {
        Ok(self.index.lock().files.contains_key(path))
    }

    fn files(&self) -> Result<Vec<Utf8PathBuf>, FsError> {
        Ok(self.index.lock().files.keys().cloned().collect())
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn used(&self) -> u64 {
        self.index.lock().used()
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn root(dir: &TempDir) -> Utf8PathBuf {
        dir.path()
            .to_owned()
            .try_into()
            .expect("path conversion should succeed")
    }

    #[test]
    fn test_contents_not_stored_in_clear() {
        let dir = TempDir::new("_calimero_enclave_fs").expect("tempdir should be created");
        let root = root(&dir);

        let volume = PersistentVolume::open(&root, 1024, &MountKey::from(&b"key"[..])).unwrap();
        volume
            .write(Utf8Path::new("/data/secret.txt"), b"plainly visible")
            .unwrap();

        let entries: Vec<_> = fs::read_dir(&root).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let entry = entries.into_iter().next().unwrap().unwrap();
        let name = entry.file_name().into_string().unwrap();
        let stored = fs::read(entry.path()).unwrap();

        assert_eq!(name, PersistentVolume::file_name(Utf8Path::new("/data/secret.txt")));
        assert_eq!(stored[0], FILE_FORMAT_VERSION);
        assert!(!stored
            .windows(b"plainly".len())
            .any(|window| window == b"plainly"));
        assert!(!stored
            .windows(b"secret.txt".len())
            .any(|window| window == b"secret.txt"));
    }

    #[test]
    fn test_renamed_host_file_rejected() {
        let dir = TempDir::new("_calimero_enclave_fs").expect("tempdir should be created");
        let root = root(&dir);
        let key = MountKey::from(&b"key"[..]);

        let volume = PersistentVolume::open(&root, 1024, &key).unwrap();
        volume.write(Utf8Path::new("/data/a"), b"a").unwrap();

        let from = root.join(PersistentVolume::file_name(Utf8Path::new("/data/a")));
        let to = root.join(PersistentVolume::file_name(Utf8Path::new("/data/b")));
        fs::rename(from, to).unwrap();

        assert!(matches!(
            volume.read(Utf8Path::new("/data/b")),
            Err(FsError::Corrupted(_))
        ));
    }

    #[test]
    fn test_interrupted_write_cleaned_up() {
        let dir = TempDir::new("_calimero_enclave_fs").expect("tempdir should be created");
        let root = root(&dir);

        fs::write(root.join("deadbeef.tmp"), b"partial").unwrap();

        let volume = PersistentVolume::open(&root, 1024, &MountKey::from(&b"key"[..])).unwrap();

        assert_eq!(volume.used(), 0);
        assert!(!root.join("deadbeef.tmp").exists());
    }

    #[test]
    fn test_empty_key_rejected() {
        let dir = TempDir::new("_calimero_enclave_fs").expect("tempdir should be created");

        assert!(matches!(
            PersistentVolume::open(&root(&dir), 1024, &MountKey::default()),
            Err(MountError::MissingKey(_))
        ));
    }
}
