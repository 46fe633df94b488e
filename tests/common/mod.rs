/*!
 * Common test utilities for the papertrans test suite
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Result, anyhow};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Routes library logs to the test output; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A small root file with a preamble, an included section and a comment
pub const SAMPLE_MAIN_TEX: &str = "\\documentclass{article}
\\usepackage{amsmath}
\\title{Sample Paper}
\\begin{document}
\\maketitle
% reviewer note
Deep networks learn representations.
\\input{sections/intro}
\\end{document}
";

/// An included fragment without a document class
pub const SAMPLE_INTRO_TEX: &str = "\\section{Introduction}
We study \\emph{translation} of papers.
The loss is $\\mathcal{L} = 0$.
";

/// Writes the sample paper into `dir`
pub fn create_sample_paper(dir: &Path) -> Result<()> {
    create_test_file(dir, "main.tex", SAMPLE_MAIN_TEX)?;
    create_test_file(dir, "sections/intro.tex", SAMPLE_INTRO_TEX)?;
    create_test_file(dir, "refs.bib", "@article{a, title={A}}\n")?;
    Ok(())
}

/// Packs the contents of `source_dir` into a gzip-compressed tar archive
pub fn create_tar_gz(source_dir: &Path, archive: &Path) -> Result<()> {
    let status = std::process::Command::new("tar")
        .arg("-czf")
        .arg(archive)
        .arg("-C")
        .arg(source_dir)
        .arg(".")
        .status()?;
    if !status.success() {
        return Err(anyhow!("tar exited with {:?}", status.code()));
    }
    Ok(())
}

/// Atom feed with one entry, as returned by the arXiv query API
pub fn atom_feed(id: &str, title: &str, summary: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: id_list={id}</title>
  <entry>
    <id>http://arxiv.org/abs/{id}v1</id>
    <title>{title}</title>
    <summary>{summary}</summary>
  </entry>
</feed>"#
    )
}

/// Atom feed the query API returns for an unknown identifier
pub fn atom_error_feed() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_9999.99999</id>
    <title>Error</title>
    <summary>incorrect id format for 9999.99999</summary>
  </entry>
</feed>"#.to_string()
}

/// Canned HTTP response
#[derive(Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Route {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: Vec::new() }
    }
}

/// Minimal HTTP/1.1 server answering fixed paths, for fetch tests
pub struct TestServer {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start serving `routes` (keyed by path without query) on a random local port
    pub async fn start(routes: HashMap<String, Route>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let routes = Arc::new(routes);

        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buffer = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buffer).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buffer[..n]),
                        }
                    }

                    let head = String::from_utf8_lossy(&request);
                    let target = head.split_whitespace().nth(1).unwrap_or("/");
                    let path = target.split('?').next().unwrap_or("/");

                    let route = routes.get(path).cloned().unwrap_or(Route::status(404));
                    let header = format!(
                        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        route.status,
                        route.body.len()
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&route.body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Ok(Self { base_url, handle })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Writes an executable that behaves like a LaTeX compiler: it records its
/// arguments in `invocations.log` and touches the PDF next to the input file
#[cfg(unix)]
pub fn create_fake_compiler(dir: &Path, exit_code: i32, produce_pdf: bool) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let touch = if produce_pdf { "touch \"${last%.tex}.pdf\"" } else { ":" };
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> invocations.log\nfor last; do :; done\n{}\nexit {}\n",
        touch, exit_code
    );

    let path = dir.join("fake-xelatex");
    fs::write(&path, script)?;
    let mut permissions = fs::metadata(&path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions)?;
    Ok(path)
}
