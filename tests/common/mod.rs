//! In-process fixture server for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use url::Url;

pub const ANEXO_I_BODY: &[u8] = b"%PDF-1.4 anexo I - lista de procedimentos";
pub const ANEXO_II_BODY: &[u8] = b"%PDF-1.4 anexo II - diretrizes de utilizacao";

/// How long `/files/slow.pdf` stalls before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(5);

const STATIC_PAGE: &str = r#"<!doctype html>
<html lang="pt-br"><body>
  <nav><a href="/">Início</a> <a href="/noticias">Notícias</a></nav>
  <h1>Atualização do Rol de Procedimentos</h1>
  <ul>
    <li><a href="/files/anexo_i.pdf">Anexo I - Lista completa de procedimentos</a></li>
    <li><a href="/files/anexo_ii.pdf">Anexo II - Diretrizes de utilização</a></li>
    <li><a href="/files/relatorio.pdf">Relatório de análise</a></li>
  </ul>
</body></html>"#;

const PARTIAL_PAGE: &str = r#"<html><body>
  <a href="/files/anexo_i.pdf">Anexo I</a>
  <a href="/files/slow.pdf">Anexo II</a>
</body></html>"#;

const SINGLE_PAGE: &str = r#"<html><body>
  <a href="/files/anexo_i.pdf">Anexo I</a>
</body></html>"#;

const EMPTY_DOCUMENT_PAGE: &str = r#"<html><body>
  <a href="/files/empty.pdf">Anexo I</a>
</body></html>"#;

const NO_LINKS_PAGE: &str = r#"<html><body>
  <p>Página em manutenção.</p>
  <a href="/files/relatorio.pdf">Relatório</a>
</body></html>"#;

fn pdf(body: &'static [u8]) -> Response {
    ([(header::CONTENT_TYPE, "application/pdf")], body).into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(SLOW_DELAY).await;
    pdf(ANEXO_II_BODY)
}

/// Only serves clients that ask for PDFs.
async fn strict(headers: HeaderMap) -> Response {
    let accepts_pdf = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/pdf"));
    if accepts_pdf {
        pdf(ANEXO_I_BODY)
    } else {
        StatusCode::NOT_ACCEPTABLE.into_response()
    }
}

fn router() -> Router {
    Router::new()
        .route("/rol", get(|| async { Html(STATIC_PAGE) }))
        .route("/partial", get(|| async { Html(PARTIAL_PAGE) }))
        .route("/single", get(|| async { Html(SINGLE_PAGE) }))
        .route("/empty-document", get(|| async { Html(EMPTY_DOCUMENT_PAGE) }))
        .route("/no-links", get(|| async { Html(NO_LINKS_PAGE) }))
        .route("/files/anexo_i.pdf", get(|| async { pdf(ANEXO_I_BODY) }))
        .route("/files/anexo_ii.pdf", get(|| async { pdf(ANEXO_II_BODY) }))
        .route("/files/empty.pdf", get(|| async { pdf(b"") }))
        .route("/files/slow.pdf", get(slow))
        .route("/files/strict.pdf", get(strict))
}

/// Fixture server on an ephemeral port. Stops when dropped.
pub struct FixtureServer {
    base: Url,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router()).await.unwrap();
        });

        Self {
            base: Url::parse(&format!("http://{}/", addr)).unwrap(),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> Url {
        self.base.join(path.trim_start_matches('/')).unwrap()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// File names in `dir`, sorted.
pub fn list_dir(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
