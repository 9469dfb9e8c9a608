#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const MANIFEST: &str = "assets/data/index.json";

/// Three sub-chapters over two chapters: 3, 2 and 2 entries.
pub fn documents() -> Vec<(&'static str, Value)> {
    vec![
        (
            MANIFEST,
            json!({
                "files": [
                    {"bab": 1, "title": "Bab 1", "subbabs": [
                        {"file": "data/b1s1.json", "title": "Seruling", "description": "Keluhan seruling"},
                        {"file": "data/b1s2.json", "title": "Raja"}
                    ]},
                    {"bab": 2, "title": "Bab 2", "subbabs": [
                        {"file": "data/b2s1.json", "title": "Cinta"}
                    ]}
                ]
            }),
        ),
        (
            "data/b1s1.json",
            json!([
                {
                    "id": 1,
                    "indo": "Dengarlah seruling bercerita",
                    "inggris": "Listen to the reed",
                    "title": "Kidung Seruling",
                    "description": "Pembuka Matsnawi"
                },
                {"id": 2, "indo": "Tentang perpisahan", "inggris": "Of separations"},
                {"id": 3, "indo": "Sejak aku dipisahkan", "inggris": "Since I was parted"}
            ]),
        ),
        (
            "data/b1s2.json",
            json!({"baits": [
                {"id": 4, "indo": "Raja jatuh cinta", "inggris": "The king fell in love"},
                {"id": 5, "indo": "Pada seorang budak", "inggris": "With a maid"}
            ]}),
        ),
        (
            "data/b2s1.json",
            json!([
                {"id": 6, "indo": "Cinta adalah obat", "inggris": "Love is the cure"},
                {"id": 7, "indo": "Bagi segala penyakit", "inggris": "For every ill"}
            ]),
        ),
    ]
}

pub fn write_corpus(root: &Path) {
    for (locator, document) in documents() {
        let path = root.join(locator);
        std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create corpus dir");
        std::fs::write(&path, serde_json::to_vec_pretty(&document).expect("encode"))
            .expect("write corpus file");
    }
}

pub struct CorpusServer {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CorpusServer {
    /// Requests seen for `locator` (without the leading slash).
    pub fn hits(&self, locator: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(locator)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for CorpusServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn spawn_corpus_server() -> CorpusServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}/", server.server_addr());
    let documents: HashMap<String, String> = documents()
        .into_iter()
        .map(|(locator, document)| (locator.to_owned(), document.to_string()))
        .collect();
    let hits = Arc::new(Mutex::new(HashMap::<String, usize>::new()));
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let server_hits = Arc::clone(&hits);
    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let locator = request.url().trim_start_matches('/').to_owned();
            *server_hits
                .lock()
                .expect("hits lock")
                .entry(locator.clone())
                .or_default() += 1;

            let response = match documents.get(&locator) {
                Some(body) => tiny_http::Response::from_string(body.clone()).with_header(
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("content-type header"),
                ),
                None => tiny_http::Response::from_string("not found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    CorpusServer {
        base_url,
        hits,
        shutdown: shutdown_tx,
        handle: Some(handle),
    }
}
