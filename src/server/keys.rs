//! # Listener Key Store
//!
//! A Votifier listener keeps its key pair as two text files, each holding
//! base64 DER: `public.key` (X.509) and `private.key` (PKCS#8). The pair is
//! generated on first start; the public half is what server owners paste into
//! the listing site.

use anyhow::{bail, Context, Result};
use log::info;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::crypto::{self, KeyMaterial, VOTIFIER_KEY_BITS};

const PUBLIC_KEY_FILE: &str = "public.key";
const PRIVATE_KEY_FILE: &str = "private.key";

/// The listener's key pair and where it lives on disk.
pub struct KeyStore {
    dir: PathBuf,
    private_key: RsaPrivateKey,
}

impl KeyStore {
    /// Load the key pair from `dir`, generating and writing one if neither file exists.
    ///
    /// Fails if only one of the two files is present, rather than overwriting it.
    pub fn load_or_create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let public_path = dir.join(PUBLIC_KEY_FILE);
        let private_path = dir.join(PRIVATE_KEY_FILE);

        match (public_path.exists(), private_path.exists()) {
            (true, true) => Self::load(dir, &private_path),
            (false, false) => Self::create(dir, &public_path, &private_path),
            (true, false) => bail!("{} exists without {}", public_path.display(), PRIVATE_KEY_FILE),
            (false, true) => bail!("{} exists without {}", private_path.display(), PUBLIC_KEY_FILE),
        }
    }

    fn load(dir: PathBuf, private_path: &Path) -> Result<Self> {
        let text = fs::read_to_string(private_path)
            .with_context(|| format!("failed to read {}", private_path.display()))?;
        let private_key = crypto::parse_private_key(&KeyMaterial::from(text))
            .with_context(|| format!("failed to parse {}", private_path.display()))?;

        info!("🔑 Loaded vote key pair from {}", dir.display());
        Ok(Self { dir, private_key })
    }

    fn create(dir: PathBuf, public_path: &Path, private_path: &Path) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        info!("🔑 Generating {}-bit vote key pair in {}", VOTIFIER_KEY_BITS, dir.display());
        let private_key = crypto::generate_key_pair(VOTIFIER_KEY_BITS)?;

        fs::write(public_path, crypto::encode_public_key(&private_key.to_public_key())?)
            .with_context(|| format!("failed to write {}", public_path.display()))?;
        fs::write(private_path, crypto::encode_private_key(&private_key)?)
            .with_context(|| format!("failed to write {}", private_path.display()))?;

        Ok(Self { dir, private_key })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    /// The public key in the text form server owners paste into the site.
    pub fn public_key_text(&self) -> Result<String> {
        Ok(crypto::encode_public_key(&self.public_key())?)
    }
}
