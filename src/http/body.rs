//! Response body module
//!
//! Every response uses one boxed body type: small in-memory payloads and
//! files streamed from disk in fixed-size chunks.

use futures_util::stream;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::convert::Infallible;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Body type shared by all responses
pub type ResponseBody = http_body_util::combinators::UnsyncBoxBody<Bytes, std::io::Error>;

/// Read size for streamed files
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Body holding `data` in memory
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never: Infallible| match never {})
        .boxed_unsync()
}

pub fn empty() -> ResponseBody {
    full(Bytes::new())
}

/// Body that reads `file` to the end, one chunk per frame
pub fn file_stream(file: File) -> ResponseBody {
    StreamBody::new(stream::try_unfold(file, read_chunk)).boxed_unsync()
}

async fn read_chunk(mut file: File) -> std::io::Result<Option<(Frame<Bytes>, File)>> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some((Frame::data(Bytes::from(buf)), file)))
}
