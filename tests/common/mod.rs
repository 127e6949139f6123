//! Shared fixtures: an in-process HTTP server honouring `Range`, and a
//! builder for small ZIP archives.

#![allow(dead_code)]

use flate2::Compression;
use flate2::Crc;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How the test server misbehaves, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// HEAD responses carry no `Content-Length`.
    NoLength,
    /// Every request gets a 404.
    NotFound,
    /// HEAD succeeds, every GET gets a 404.
    GetNotFound,
    /// GETs ignore `Range` and return the whole object with 200.
    IgnoreRange,
    /// 206 replies carry only the first half of the span.
    ShortBody,
    /// 206 replies always start at offset 0, with a matching `Content-Range`.
    WrongRange,
    /// 206 replies omit `Content-Range`.
    NoContentRange,
}

pub struct TestServer {
    pub url: String,
    gets: Arc<AtomicUsize>,
}

impl TestServer {
    /// Number of GET requests served so far.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

/// Serve `data` at `http://127.0.0.1:<port>/archive.zip` until the test ends.
pub async fn serve(data: Vec<u8>, mode: Mode) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let data = Arc::new(data);
    let gets = Arc::new(AtomicUsize::new(0));

    let counter = gets.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let data = data.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let _ = handle(stream, &data, mode, &counter).await;
            });
        }
    });

    TestServer {
        url: format!("http://{addr}/archive.zip"),
        gets,
    }
}

async fn handle(
    mut stream: TcpStream,
    data: &[u8],
    mode: Mode,
    gets: &AtomicUsize,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let request = String::from_utf8_lossy(&request);
    let method = request.split_whitespace().next().unwrap_or_default().to_string();
    let range = request.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.eq_ignore_ascii_case("range")
            .then(|| value.trim().to_string())
    });

    if mode == Mode::NotFound {
        let head = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        stream.write_all(head.as_bytes()).await?;
        return stream.shutdown().await;
    }

    if method == "HEAD" {
        let length = match mode {
            Mode::NoLength => String::new(),
            _ => format!("Content-Length: {}\r\n", data.len()),
        };
        let head = format!(
            "HTTP/1.1 200 OK\r\nAccept-Ranges: bytes\r\n{length}Connection: close\r\n\r\n"
        );
        stream.write_all(head.as_bytes()).await?;
        return stream.shutdown().await;
    }

    gets.fetch_add(1, Ordering::SeqCst);

    if mode == Mode::GetNotFound {
        let head = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        stream.write_all(head.as_bytes()).await?;
        return stream.shutdown().await;
    }

    let span = match mode {
        Mode::IgnoreRange => None,
        _ => range.as_deref().and_then(|r| parse_range(r, data.len())),
    };
    let (status, body, extra) = match span {
        Some((start, end)) => {
            let (start, end) = match mode {
                Mode::WrongRange => (0, end - start),
                _ => (start, end),
            };
            let mut body = &data[start..=end];
            if mode == Mode::ShortBody {
                body = &body[..body.len() / 2];
            }
            let extra = match mode {
                Mode::NoContentRange => String::new(),
                _ => format!("Content-Range: bytes {start}-{end}/{}\r\n", data.len()),
            };
            ("206 Partial Content", body, extra)
        }
        None => ("200 OK", data, String::new()),
    };

    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\n{extra}Connection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.shutdown().await
}

/// Parse `bytes=A-B` into an inclusive span clamped to `len`.
fn parse_range(header: &str, len: usize) -> Option<(usize, usize)> {
    let (start, end) = header.strip_prefix("bytes=")?.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end: usize = end.parse().ok()?;
    (start < len && start <= end).then(|| (start, end.min(len - 1)))
}

/// Builds a ZIP archive in memory, one entry at a time.
#[derive(Default)]
pub struct ZipBuilder {
    body: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.add(name, 0, data, data, crc(data));
        self
    }

    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let packed = encoder.finish().unwrap();
        self.add(name, 8, data, &packed, crc(data));
        self
    }

    /// A DEFLATE entry whose directory records only `declared` bytes.
    pub fn understated(mut self, name: &str, data: &[u8], declared: usize) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let packed = encoder.finish().unwrap();
        self.add(name, 8, &data[..declared], &packed, crc(&data[..declared]));
        self
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.add(name, 0, &[], &[], 0);
        self
    }

    /// A stored entry whose recorded checksum is wrong.
    pub fn corrupt(mut self, name: &str, data: &[u8]) -> Self {
        self.add(name, 0, data, data, crc(data) ^ 0xFFFF_FFFF);
        self
    }

    fn add(&mut self, name: &str, method: u16, raw: &[u8], payload: &[u8], crc32: u32) {
        let offset = self.body.len() as u32;
        let header = |sig: &[u8], central: bool| {
            let mut out = sig.to_vec();
            if central {
                out.extend_from_slice(&20u16.to_le_bytes());
            }
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&method.to_le_bytes());
            out.extend_from_slice(&[0; 4]);
            out.extend_from_slice(&crc32.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out
        };

        self.body.extend(header(b"PK\x03\x04", false));
        self.body.extend_from_slice(name.as_bytes());
        self.body.extend_from_slice(payload);

        self.central.extend(header(b"PK\x01\x02", true));
        // comment length, disk start, internal and external attributes
        self.central.extend_from_slice(&[0; 6]);
        self.central.extend_from_slice(&0u32.to_le_bytes());
        self.central.extend_from_slice(&offset.to_le_bytes());
        self.central.extend_from_slice(name.as_bytes());
        self.count += 1;
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = self.body;
        let cd_offset = out.len() as u32;
        out.extend_from_slice(&self.central);
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&(self.central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }
}

fn crc(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

/// Minimal PNG signature followed by filler, enough for content sniffing.
pub fn png(fill: u8, len: usize) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
    out.resize(len.max(8), fill);
    out
}
