use super::ContentKey;
use crate::error::{Error, Result};
use aes::{
    Aes256,
    cipher::{BlockDecrypt, KeyInit, generic_array::GenericArray},
};
use log::{debug, trace};
use md5::{Digest, Md5};
use std::{
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

/// Distance between two records in a key store file.
pub const RECORD_STRIDE: u64 = 0x34;

const CHECK_LEN: usize = 4;
const UNUSED_LEN: i64 = 15;
const WRAPPING_KEY_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// Flat file of fixed size records, each holding a 32 byte wrapping key.
///
/// ```text
/// 0..4    check bytes
/// 4       checksum (first byte of md5(check ++ nonce))
/// 5..20   unused
/// 20..52  wrapping key
/// ```
///
/// Records are never loaded as a whole; the file is scanned record by record
/// until a checksum matches.
pub struct KeyStore<R> {
    reader: R,
}

impl KeyStore<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Opening key store {}", path.as_ref().to_string_lossy());
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read + Seek> KeyStore<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Find the wrapping key for `nonce` and unwrap `wrapped_key` with it.
    pub fn resolve(&mut self, nonce: &[u8], wrapped_key: &[u8]) -> Result<ContentKey> {
        let wrapping_key = self.find_wrapping_key(nonce)?;
        let key = unwrap_key(&wrapping_key, wrapped_key)?;
        ContentKey::try_from(key.as_slice())
    }

    /// Scan records until `md5(check ++ nonce)[0]` equals the record checksum.
    pub fn find_wrapping_key(&mut self, nonce: &[u8]) -> Result<[u8; WRAPPING_KEY_LEN]> {
        let mut offset = 0;

        loop {
            self.reader.seek(SeekFrom::Start(offset))?;

            let mut header = [0; CHECK_LEN + 1];

            match self.reader.read_exact(&mut header) {
                Ok(()) => (),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(Error::KeyNotFound);
                }
                Err(e) => return Err(e.into()),
            }

            let mut hasher = Md5::new();
            hasher.update(&header[..CHECK_LEN]);
            hasher.update(nonce);
            let digest = hasher.finalize();

            if digest[0] == header[CHECK_LEN] {
                debug!("Key store record matched at offset {:#x}", offset);
                self.reader.seek(SeekFrom::Current(UNUSED_LEN))?;
                let mut wrapping_key = [0; WRAPPING_KEY_LEN];
                self.reader.read_exact(&mut wrapping_key)?;
                return Ok(wrapping_key);
            }

            trace!("Key store record at offset {:#x} skipped", offset);
            offset += RECORD_STRIDE;
        }
    }
}

/// Raw AES-256 block decryption of every 16 byte block, no chaining and no padding.
pub(crate) fn unwrap_key(wrapping_key: &[u8], wrapped_key: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256::new_from_slice(wrapping_key).map_err(|x| Error::Cipher(x.to_string()))?;

    if wrapped_key.len() % BLOCK_LEN != 0 {
        return Err(Error::Cipher(format!(
            "wrapped key length {} is not a multiple of the block size",
            wrapped_key.len()
        )));
    }

    let mut data = wrapped_key.to_vec();

    for block in data.chunks_exact_mut(BLOCK_LEN) {
        cipher.decrypt_block(GenericArray::from_mut_slice(block));
    }

    Ok(data)
}
