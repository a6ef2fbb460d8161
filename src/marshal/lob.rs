use tracing::trace;

use crate::error::Db2Error;
use crate::native::NativeResultSet;

/// Bytes requested from the driver per BLOB read.
pub const BLOB_CHUNK_SIZE: usize = 4096;

/// Read a whole BLOB column in fixed-size chunks.
///
/// Returns `None` when the column holds a database null, and an empty buffer for a
/// zero-length BLOB.
///
/// # Errors
///
/// Any native failure other than the null signal is returned as `Db2Error::Native`.
pub async fn read_blob(
    rs: &mut dyn NativeResultSet,
    ordinal: usize,
) -> Result<Option<Vec<u8>>, Db2Error> {
    let mut out = Vec::new();
    let mut chunk = vec![0_u8; BLOB_CHUNK_SIZE];
    loop {
        let offset = out.len() as u64;
        let read = match rs.get_bytes(ordinal, offset, &mut chunk).await {
            Ok(read) => read,
            Err(e) if e.signals_null_lob() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        out.extend_from_slice(&chunk[..read.min(BLOB_CHUNK_SIZE)]);
        if read < BLOB_CHUNK_SIZE {
            break;
        }
    }
    trace!(ordinal, bytes = out.len(), "read BLOB column");
    Ok(Some(out))
}

/// Read a character column, treating the driver's null cast failure as `None`.
///
/// # Errors
///
/// Any other native failure is returned as `Db2Error::Native`.
pub async fn read_character(
    rs: &mut dyn NativeResultSet,
    ordinal: usize,
) -> Result<Option<String>, Db2Error> {
    match rs.get_string(ordinal).await {
        Ok(value) => Ok(value),
        Err(e) if e.signals_db_null() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
