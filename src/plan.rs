use crate::error::InvalidInput;
use crate::params::SelfEncryptionParams;
use crate::MIN_CHUNKS;

/// How a stream of a given length is laid out as chunks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    /// The whole stream is small enough to live in the data map.
    IncludeAll,
    /// Ordered chunk plaintext sizes. With `inline_tail` set the last chunk
    /// is carried in the data map instead of being stored as a blob.
    Chunks {
        sizes: Vec<usize>,
        inline_tail: bool,
    },
}

/// Decide the chunk layout for a stream of `len` bytes.
///
/// Streams up to `max_includable_data_size` are not chunked at all. Beyond
/// that up to `MIN_CHUNKS * max_chunk_size` the stream splits into exactly
/// `MIN_CHUNKS` chunks, as even as possible with only the last chunk
/// smaller. Larger streams split into full chunks of `max_chunk_size` plus
/// one trailing remainder chunk.
pub fn plan(len: u64, params: &SelfEncryptionParams) -> Result<Plan, InvalidInput> {
    if !params.is_valid() {
        return Err(InvalidInput::BadParams);
    }
    if len == 0 {
        return Err(InvalidInput::EmptyInput);
    }
    if len <= params.max_includable_data_size as u64 {
        return Ok(Plan::IncludeAll);
    }

    let max = params.max_chunk_size as u64;
    let mut sizes: Vec<usize>;
    if len <= (MIN_CHUNKS as u64) * max {
        // Even split across MIN_CHUNKS. The leading chunks take the
        // rounded-up share so that no chunk exceeds max_chunk_size and only
        // the last one is smaller.
        let base = (len / MIN_CHUNKS as u64) as usize;
        let extra = (len % MIN_CHUNKS as u64) as usize;
        sizes = vec![base; MIN_CHUNKS];
        for size in sizes.iter_mut().take(extra) {
            *size += 1;
        }
    } else {
        let full = (len / max) as usize;
        let remainder = (len % max) as usize;
        sizes = vec![params.max_chunk_size; full];
        if remainder > 0 {
            sizes.push(remainder);
        }
    }

    let last = sizes[sizes.len() - 1];
    let inline_tail =
        params.max_includable_chunk_size > 0 && last <= params.max_includable_chunk_size;
    Ok(Plan::Chunks { sizes, inline_tail })
}
