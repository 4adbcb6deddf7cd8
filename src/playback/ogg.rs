// Ogg page demuxer for the transcoder's Opus output
//
// ffmpeg's `-f opus` muxer writes Ogg pages. Each page carries a segment
// table whose lacing values split the body into packets; a lacing value of
// 255 means the packet continues in the next segment (possibly on the next
// page). The first two packets of a stream are the OpusHead and OpusTags
// headers, which the voice connection does not want.

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

const CAPTURE_PATTERN: &[u8; 4] = b"OggS";
const PAGE_HEADER_LEN: usize = 27;

/// Bytes scanned for the first capture pattern before giving up
const MAX_SYNC_SEARCH: usize = 64 * 1024;

/// Largest packet we assemble. Opus packets are a few KiB at most.
const MAX_PACKET_LEN: usize = 64 * 1024;

/// Reads Opus packets out of an Ogg byte stream
pub struct OggPacketReader<R> {
    reader: R,
    /// Bytes read ahead while searching for the first page
    lookahead: BytesMut,
    synced: bool,
    ready: VecDeque<Bytes>,
    partial: BytesMut,
    pages_read: u64,
}

impl<R: AsyncRead + Unpin> OggPacketReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            lookahead: BytesMut::new(),
            synced: false,
            ready: VecDeque::new(),
            partial: BytesMut::new(),
            pages_read: 0,
        }
    }

    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }

    /// Next audio packet, or `None` once the stream is exhausted.
    ///
    /// A stream that ends part-way through a page counts as exhausted, since
    /// that is what a killed or crashed transcoder looks like.
    pub async fn next_packet(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            while let Some(packet) = self.ready.pop_front() {
                if !is_header_packet(&packet) {
                    return Ok(Some(packet));
                }
            }

            match self.read_page().await {
                Ok(true) => {}
                Ok(false) => return Ok(None),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }

    /// Skip anything before the first capture pattern.
    ///
    /// Returns false when the stream ends without producing a single byte.
    async fn find_sync(&mut self) -> io::Result<bool> {
        loop {
            if let Some(pos) = self
                .lookahead
                .windows(CAPTURE_PATTERN.len())
                .position(|window| window == CAPTURE_PATTERN)
            {
                if pos > 0 {
                    debug!("Skipped {} bytes before the first Ogg page", pos);
                }
                let _ = self.lookahead.split_to(pos);
                self.synced = true;
                return Ok(true);
            }
            if self.lookahead.len() >= MAX_SYNC_SEARCH {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("no Ogg capture pattern in the first {} bytes", MAX_SYNC_SEARCH),
                ));
            }

            let mut chunk = [0u8; 1024];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                if self.lookahead.is_empty() {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    "stream ended before the first Ogg page",
                ));
            }
            self.lookahead.extend_from_slice(&chunk[..n]);
        }
    }

    /// Fill `buf` from the lookahead, then the reader. Returns the number of
    /// bytes filled, short only at end of stream.
    async fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let buffered = buf.len().min(self.lookahead.len());
        buf[..buffered].copy_from_slice(&self.lookahead.split_to(buffered));

        let mut filled = buffered;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]).await? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    async fn fill_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.fill(buf).await? < buf.len() {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated Ogg page"));
        }
        Ok(())
    }

    /// Returns false on a clean end of stream at a page boundary
    async fn read_page(&mut self) -> io::Result<bool> {
        if !self.synced && !self.find_sync().await? {
            return Ok(false);
        }

        let mut header = [0u8; PAGE_HEADER_LEN];
        match self.fill(&mut header).await? {
            0 => return Ok(false),
            n if n < PAGE_HEADER_LEN => {
                return Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated Ogg page"))
            }
            _ => {}
        }

        if &header[0..4] != CAPTURE_PATTERN {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                "missing Ogg capture pattern",
            ));
        }
        if header[4] != 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("unsupported Ogg version {}", header[4]),
            ));
        }

        let segment_count = header[26] as usize;
        let mut lacing = vec![0u8; segment_count];
        self.fill_exact(&mut lacing).await?;

        let body_len: usize = lacing.iter().map(|&l| l as usize).sum();
        let mut body = vec![0u8; body_len];
        self.fill_exact(&mut body).await?;

        // Continued-packet flag without a pending packet: we joined mid-stream
        let continued = header[5] & 0x01 != 0;
        let mut skip_continuation = continued && self.partial.is_empty();

        let mut offset = 0;
        for &len in &lacing {
            let len = len as usize;
            if !skip_continuation {
                if self.partial.len() + len > MAX_PACKET_LEN {
                    return Err(io::Error::new(
                        ErrorKind::InvalidData,
                        format!("Ogg packet exceeds {} bytes", MAX_PACKET_LEN),
                    ));
                }
                self.partial.extend_from_slice(&body[offset..offset + len]);
            }
            offset += len;
            if len < 255 {
                if !skip_continuation && !self.partial.is_empty() {
                    self.ready.push_back(self.partial.split().freeze());
                }
                skip_continuation = false;
            }
        }

        self.pages_read += 1;
        Ok(true)
    }
}

fn is_header_packet(packet: &[u8]) -> bool {
    packet.starts_with(b"OpusHead") || packet.starts_with(b"OpusTags")
}
