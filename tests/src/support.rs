#![cfg(test)]
//! A loopback HTTP/1.1 server that stands in for an edge endpoint.

use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

pub const TRACE_BODY: &str = "fl=1f1\nh=trace.test\nip=127.0.0.1\nts=1.0\nvisit_scheme=http\ncolo=TST\nloc=XX\n";
const CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub host: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Reply {
    /// Empty body with this status.
    Status(u16),
    /// 200 with this body.
    Body(String),
    /// 200 with `len` filler bytes.
    Stream(usize),
    /// 302 pointing at this location.
    Redirect(String),
}

type Route = dyn Fn(&Request) -> Reply + Send + Sync;

pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl TestServer {
    /// Serves every connection on its own thread until the process exits.
    pub fn start<F>(route: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let route: Arc<Route> = Arc::new(route);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let route = Arc::clone(&route);
                let log = Arc::clone(&log);
                thread::spawn(move || serve(stream, route.as_ref(), &log));
            }
        });

        Self { addr, requests }
    }

    /// Trace documents on `/cdn-cgi/trace`, downloads on `/__down`, `status` elsewhere.
    pub fn edge(download_len: usize, status: u16) -> Self {
        Self::start(move |req| {
            if req.path.starts_with("/cdn-cgi/trace") {
                Reply::Body(TRACE_BODY.to_string())
            } else if req.path.starts_with("/__down") && status < 400 {
                Reply::Stream(download_len)
            } else {
                Reply::Status(status)
            }
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve(stream: TcpStream, route: &Route, log: &Mutex<Vec<Request>>) {
    let Some(request) = read_request(&stream) else { return };
    let reply = route(&request);
    log.lock().unwrap().push(request);

    let mut stream = stream;
    let _ = match reply {
        Reply::Status(code) => write_head(&mut stream, code, 0),
        Reply::Redirect(location) => write!(
            stream,
            "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        ),
        Reply::Body(body) => {
            write_head(&mut stream, 200, body.len()).and_then(|_| stream.write_all(body.as_bytes()))
        }
        Reply::Stream(len) => write_head(&mut stream, 200, len).and_then(|_| {
            let chunk = vec![b'x'; CHUNK];
            let mut left = len;
            while left > 0 {
                let n = left.min(CHUNK);
                stream.write_all(&chunk[..n])?;
                left -= n;
            }
            Ok(())
        }),
    };
}

fn read_request(stream: &TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let path = line.split_whitespace().nth(1)?.to_string();

    let mut host = None;
    loop {
        line.clear();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let header = line.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("host") {
                host = Some(value.trim().to_string());
            }
        }
    }

    Some(Request { path, host })
}

fn write_head(stream: &mut TcpStream, code: u16, len: usize) -> std::io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {code} Test\r\nContent-Length: {len}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n"
    )
}
