//! Moving object content between local files and request bodies.
//!
//! Downloads are written to a hidden sibling of the destination and renamed
//! into place only once the whole body has arrived, so an interrupted
//! transfer never leaves a truncated destination behind.

use crate::error::{LocalError, StorageError};
use crate::transport::ByteStream;
use bytes::Bytes;
use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

fn io_error(path: &Path, source: io::Error) -> StorageError {
    StorageError::Local(LocalError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read exactly `len` bytes for one upload part.
///
/// A file that shrank since it was measured fails with `UnexpectedEof`.
pub(crate) async fn read_chunk<R>(reader: &mut R, path: &Path, len: usize) -> Result<Bytes, StorageError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; len];
    reader
        .read_exact(&mut buffer)
        .await
        .map_err(|e| io_error(path, e))?;
    Ok(buffer.into())
}

/// Hidden, uniquely named file next to `dest`.
fn temp_sibling(dest: &Path) -> Result<PathBuf, StorageError> {
    let name = dest.file_name().ok_or_else(|| {
        io_error(
            dest,
            io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
        )
    })?;

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    Ok(dest.with_file_name(format!(
        ".{}.{}.part",
        name.to_string_lossy(),
        &suffix[..8]
    )))
}

async fn drain_into(
    file: &mut tokio::fs::File,
    path: &Path,
    body: &mut ByteStream,
) -> Result<u64, StorageError> {
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(|e| io_error(path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| io_error(path, e))?;
    Ok(written)
}

/// Write `body` to `dest`, replacing it only once the body is complete.
///
/// Returns the number of bytes written. On any failure the previous content
/// of `dest`, if any, is untouched and the partial file is removed. Errors
/// from the body are returned as they are; local failures are
/// [`LocalError::Io`].
pub async fn write_atomically(dest: &Path, mut body: ByteStream) -> Result<u64, StorageError> {
    let temp = temp_sibling(dest)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)
        .await
        .map_err(|e| io_error(&temp, e))?;

    let drained = drain_into(&mut file, &temp, &mut body).await;
    drop(file);

    let result = match drained {
        Ok(written) => tokio::fs::rename(&temp, dest)
            .await
            .map(|()| written)
            .map_err(|e| io_error(dest, e)),
        Err(e) => Err(e),
    };

    if result.is_err() {
        debug!(path = %temp.display(), "discarding partial download");
        if let Err(e) = tokio::fs::remove_file(&temp).await {
            warn!(path = %temp.display(), error = %e, "failed to remove partial download");
        }
    }

    result
}
