//! Shared helpers for the `phytoguard` binary tests.
use std::{
    fs,
    io::{Read, Write},
    net::TcpListener,
    path::{Path, PathBuf},
    process::Output,
    thread::{self, JoinHandle},
};

use assert_cmd::{Command, cargo::cargo_bin_cmd};

/// A `phytoguard` command running inside `work_dir`, so no ambient settings file is picked up.
pub fn phytoguard(work_dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("phytoguard");
    cmd.current_dir(work_dir).env_remove("RUST_LOG");
    cmd
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Create `count` image/label pairs sharing stems under `root/images` and `root/labels`.
#[allow(dead_code)]
pub fn seed_corpus(root: &Path, count: usize) -> (PathBuf, PathBuf) {
    let images = root.join("images");
    let labels = root.join("labels");
    fs::create_dir_all(&images).unwrap();
    fs::create_dir_all(&labels).unwrap();
    for i in 0..count {
        fs::write(images.join(format!("plant_{i:03}.jpg")), [0xFF, 0xD8, i as u8]).unwrap();
        fs::write(labels.join(format!("plant_{i:03}.txt")), format!("{} 0.5 0.5 0.2 0.2", i % 38))
            .unwrap();
    }
    (images, labels)
}

/// Answer one HTTP request with `status` and a JSON `body`.
#[allow(dead_code)]
pub fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/predict", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request.ends_with(b"--\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let reply = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(reply.as_bytes());
    });
    (url, handle)
}
