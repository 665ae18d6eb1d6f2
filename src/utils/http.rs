use reqwest::Response;

/// Leading bytes of a response body.
#[derive(Debug, Default)]
pub struct CappedBody {
    pub bytes: Vec<u8>,
    /// More bytes were available past the cap and were left unread.
    pub truncated: bool,
}

/// Pull chunks until `cap` bytes are buffered. Anything beyond the cap is
/// never read off the connection.
pub async fn read_capped(mut resp: Response, cap: usize) -> Result<CappedBody, reqwest::Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let room = cap - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok(CappedBody { bytes, truncated: true });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(CappedBody { bytes, truncated: false })
}
