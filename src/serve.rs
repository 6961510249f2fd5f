use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::album::AlbumId;
use crate::controller::{GalleryController, LoadOutcome, ModalView};
use crate::filter::FilterCriteria;
use crate::page::render_page;
use crate::source::LoadError;

/// One viewer session shared by every request thread.
pub struct ServerState {
    controller: Mutex<GalleryController>,
    page: String,
}

impl ServerState {
    pub fn new(controller: GalleryController) -> Arc<Self> {
        let page = render_page(&controller.source().describe());
        Arc::new(Self {
            controller: Mutex::new(controller),
            page,
        })
    }

    /// Reload the feed. The controller lock is released while the source is
    /// being fetched, so other requests keep seeing the previous list.
    pub fn reload(&self) -> Result<LoadOutcome, LoadError> {
        let (ticket, source) = {
            let mut controller = self.controller.lock().unwrap();
            (controller.begin_load(), controller.source())
        };
        let fetched = source.fetch();
        self.controller.lock().unwrap().finish_load(ticket, fetched)
    }
}

fn json_header() -> Header {
    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}

/// JSON error response helper.
fn json_error(status: u16, msg: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": msg }).to_string();
    Response::from_string(body)
        .with_status_code(StatusCode(status))
        .with_header(json_header())
}

/// JSON success response helper.
fn json_ok(msg: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "ok": msg }).to_string();
    Response::from_string(body).with_header(json_header())
}

fn json_view<T: Serialize>(view: &T) -> Response<std::io::Cursor<Vec<u8>>> {
    match serde_json::to_string(view) {
        Ok(body) => Response::from_string(body).with_header(json_header()),
        Err(e) => json_error(500, &e.to_string()),
    }
}

/// Album-view response, or 409 when no album is open.
fn modal_response(view: Option<ModalView>) -> Response<std::io::Cursor<Vec<u8>>> {
    match view {
        Some(view) => json_view(&view),
        None => json_error(409, "Aucun album ouvert"),
    }
}

/// Read request body as string.
fn read_body(req: &mut Request) -> Result<String> {
    let mut body = String::new();
    req.as_reader()
        .read_to_string(&mut body)
        .context("Failed to read request body")?;
    Ok(body)
}

/// Parse query string into key-value pairs.
pub fn parse_query(url: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(qs) = url.split('?').nth(1) {
        for pair in qs.split('&') {
            let mut kv = pair.splitn(2, '=');
            if let (Some(k), Some(v)) = (kv.next(), kv.next()) {
                params.insert(urldecode(k), urldecode(v));
            }
        }
    }
    params
}

/// Minimal URL decode (%XX and +).
pub fn urldecode(s: &str) -> String {
    let mut result = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(val) = u8::from_str_radix(
                &String::from_utf8_lossy(&bytes[i + 1..i + 3]),
                16,
            ) {
                result.push(val);
                i += 3;
                continue;
            }
        }
        if bytes[i] == b'+' {
            result.push(b' ');
        } else {
            result.push(bytes[i]);
        }
        i += 1;
    }
    String::from_utf8_lossy(&result).to_string()
}

/// Handle a single HTTP request.
pub fn handle_request(mut req: Request, state: &ServerState) {
    let url = req.url().to_string();
    let method = req.method().clone();
    let path = url.split('?').next().unwrap_or(&url);

    let resp = match (&method, path) {
        (&Method::Get, "/") => Response::from_string(state.page.as_str()).with_header(
            Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]).unwrap(),
        ),

        (&Method::Get, "/api/albums") => {
            json_view(&state.controller.lock().unwrap().gallery_view())
        }

        (&Method::Get, "/api/filters") => {
            json_view(state.controller.lock().unwrap().criteria())
        }

        (&Method::Post, "/api/filters") => match read_body(&mut req) {
            Ok(body) => match serde_json::from_str::<FilterCriteria>(&body) {
                Ok(criteria) => {
                    json_view(&state.controller.lock().unwrap().apply_filters(criteria))
                }
                Err(e) => json_error(400, &e.to_string()),
            },
            Err(e) => json_error(400, &e.to_string()),
        },

        (&Method::Post, "/api/filters/reset") => {
            json_view(&state.controller.lock().unwrap().reset_filters())
        }

        // Failed reloads leave the current list in place
        (&Method::Post, "/api/reload") => match state.reload() {
            Ok(_) => json_view(&state.controller.lock().unwrap().gallery_view()),
            Err(e) => json_error(502, &e.to_string()),
        },

        (&Method::Get, "/api/modal") => {
            json_view(&state.controller.lock().unwrap().modal_view())
        }

        (&Method::Post, "/api/open") => match parse_query(&url).get("id") {
            Some(id) => match state
                .controller
                .lock()
                .unwrap()
                .open_album(&AlbumId::from(id.as_str()))
            {
                Some(view) => json_view(&view),
                None => json_error(404, "Album introuvable"),
            },
            None => json_error(400, "Paramètre id requis"),
        },

        (&Method::Post, "/api/folder") => match parse_query(&url).get("key") {
            Some(key) => {
                let mut controller = state.controller.lock().unwrap();
                match controller.modal_view() {
                    None => json_error(409, "Aucun album ouvert"),
                    Some(view) if !view.folders.iter().any(|f| &f.key == key) => {
                        json_error(404, "Dossier introuvable")
                    }
                    Some(_) => modal_response(controller.select_folder(key)),
                }
            }
            None => json_error(400, "Paramètre key requis"),
        },

        (&Method::Post, "/api/next") => modal_response(state.controller.lock().unwrap().next()),

        (&Method::Post, "/api/prev") => modal_response(state.controller.lock().unwrap().prev()),

        (&Method::Post, "/api/close") => {
            state.controller.lock().unwrap().close();
            json_ok("Album fermé")
        }

        (&Method::Get, _) => json_error(404, "Ressource introuvable"),

        _ => json_error(405, "Méthode non supportée"),
    };

    let _ = req.respond(resp);
}

/// Start the HTTP server.
pub fn run_serve(controller: GalleryController, port: u16) -> Result<()> {
    let state = ServerState::new(controller);
    let source = state.controller.lock().unwrap().source().describe();

    // A failed first load is reported; the page can retry with "Recharger"
    match state.reload() {
        Ok(LoadOutcome::Applied(count)) => println!(
            "  {} {} albums chargés depuis {}",
            style("✔").green().bold(),
            style(count).green().bold(),
            style(&source).white().bold()
        ),
        Ok(LoadOutcome::Stale) => {}
        Err(e) => println!(
            "  {} Chargement impossible : {e}",
            style("!").yellow().bold()
        ),
    }

    let addr = format!("0.0.0.0:{port}");
    let server = Arc::new(
        Server::http(&addr)
            .map_err(|e| anyhow::anyhow!("Impossible de démarrer le serveur: {e}"))?,
    );

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || server_for_signal.unblock())
        .context("Impossible d'installer le gestionnaire Ctrl+C")?;

    println!(
        "  {} Visionneuse disponible sur {}",
        style("✔").green().bold(),
        style(format!("http://localhost:{port}")).cyan().bold()
    );
    println!("  {} pour arrêter", style("Ctrl+C").yellow().bold());

    for req in server.incoming_requests() {
        let state = Arc::clone(&state);
        std::thread::spawn(move || {
            handle_request(req, &state);
        });
    }

    println!("  {} Serveur arrêté", style("✔").green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::Album;
    use crate::date_format::{DateFormatter, ViewerZone};
    use crate::source::{AlbumSource, FileSource};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc;

    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn tmpdir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "album_viewer_serve_test_{}_{id}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const FEED: &str = r#"[
        {"ID": 1, "fecha": "2024-01-01T09:00", "descripcion": {"ropa": "Chaqueta roja"},
         "ruta_cuerpo": "P/1/cuerpo", "ruta_cara": "P/1/cara",
         "imagenes": ["P/1/cuerpo/a.jpg", "P/1/cuerpo/b.jpg", "P/1/cara/a.jpg"]},
        {"ID": 2, "fecha": null, "descripcion": {}},
        {"ID": 3, "fecha": "2024-01-02T18:30"}
    ]"#;

    fn write_feed(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("albums.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn spawn_test_server(feed: &Path) -> (u16, Arc<ServerState>) {
        let controller = GalleryController::new(
            Arc::new(FileSource::new(feed)),
            DateFormatter::new(ViewerZone::utc()),
        );
        let state = ServerState::new(controller);
        state.reload().unwrap();
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let state_clone = Arc::clone(&state);
        std::thread::spawn(move || {
            for req in server.incoming_requests() {
                handle_request(req, &state_clone);
            }
        });
        (port, state)
    }

    /// Minimal HTTP/1.0 client: returns status code and body.
    fn request(port: u16, method: &str, path: &str, body: &str) -> (u16, String) {
        use std::io::{Read, Write};
        use std::net::TcpStream;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(
            stream,
            "{method} {path} HTTP/1.0\r\nHost: 127.0.0.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).unwrap();
        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((&raw, ""));
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        (status, body.trim().to_string())
    }

    fn json(body: &str) -> serde_json::Value {
        serde_json::from_str(body).unwrap()
    }

    // --- parse_query ---

    #[test]
    fn parse_query_extracts_params() {
        let params = parse_query("/api/folder?key=cara&foo=bar");
        assert_eq!(params.get("key").unwrap(), "cara");
        assert_eq!(params.get("foo").unwrap(), "bar");
    }

    #[test]
    fn parse_query_empty_when_no_query() {
        assert!(parse_query("/api/open").is_empty());
    }

    // --- urldecode ---

    #[test]
    fn urldecode_decodes_percent_and_plus() {
        assert_eq!(urldecode("hello+world"), "hello world");
        assert_eq!(urldecode("hello%20world"), "hello world");
        assert_eq!(urldecode("a%2Fb"), "a/b");
        assert_eq!(urldecode("100%"), "100%");
    }

    // --- Page and gallery ---

    #[test]
    fn serve_page_returns_html() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, body) = request(port, "GET", "/", "");
        assert_eq!(status, 200);
        assert!(body.contains("<!DOCTYPE html>"));
        assert!(body.contains("albums.json"));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn api_albums_lists_cards() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, body) = request(port, "GET", "/api/albums", "");
        assert_eq!(status, 200);
        let view = json(&body);
        assert_eq!(view["count"], 3);
        assert_eq!(view["count_label"], "3 album(s)");
        assert_eq!(view["albums"][0]["label"], "Personne 1");
        assert_eq!(view["albums"][0]["date"], "01/01/2024 09:00");
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn api_filters_then_reset() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, body) = request(
            port,
            "POST",
            "/api/filters",
            r#"{"date":"2024-01-01","include_without_description":false}"#,
        );
        assert_eq!(status, 200);
        let view = json(&body);
        assert_eq!(view["count"], 1);
        assert_eq!(view["filtered"], true);

        let (_, body) = request(port, "POST", "/api/filters/reset", "");
        assert_eq!(json(&body)["count"], 3);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn api_filters_echoes_current_criteria() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (_, body) = request(port, "GET", "/api/filters", "");
        assert_eq!(json(&body)["include_without_description"], true);

        request(port, "POST", "/api/filters", r#"{"keyword":"roja"}"#);
        let (status, body) = request(port, "GET", "/api/filters", "");
        assert_eq!(status, 200);
        let criteria = json(&body);
        assert_eq!(criteria["keyword"], "roja");
        assert_eq!(criteria["date"], "");
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn api_filters_rejects_bad_body() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, body) = request(port, "POST", "/api/filters", "not json");
        assert_eq!(status, 400);
        assert!(body.contains("error"));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    // --- Album view ---

    #[test]
    fn api_album_navigation_flow() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, body) = request(port, "POST", "/api/open?id=1", "");
        assert_eq!(status, 200);
        let view = json(&body);
        assert_eq!(view["title"], "Personne 1");
        assert_eq!(view["show_navigation"], false);
        assert_eq!(view["folders"][1]["label"], "cara");
        assert_eq!(view["description"][0]["label"], "Ropa");

        let (status, body) = request(port, "POST", "/api/folder?key=cuerpo", "");
        assert_eq!(status, 200);
        let view = json(&body);
        assert_eq!(view["image"], "P/1/cuerpo/a.jpg");
        assert_eq!(view["show_navigation"], true);

        let (_, body) = request(port, "POST", "/api/prev", "");
        assert_eq!(json(&body)["image"], "P/1/cuerpo/b.jpg");
        let (_, body) = request(port, "POST", "/api/next", "");
        assert_eq!(json(&body)["image"], "P/1/cuerpo/a.jpg");

        let (status, _) = request(port, "POST", "/api/close", "");
        assert_eq!(status, 200);
        let (_, body) = request(port, "GET", "/api/modal", "");
        assert_eq!(body, "null");
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn api_open_unknown_album_is_404() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, _) = request(port, "POST", "/api/open?id=42", "");
        assert_eq!(status, 404);
        let (status, _) = request(port, "POST", "/api/open", "");
        assert_eq!(status, 400);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn api_navigation_without_album_is_409() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, _) = request(port, "POST", "/api/next", "");
        assert_eq!(status, 409);
        let (status, _) = request(port, "POST", "/api/folder?key=cara", "");
        assert_eq!(status, 409);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn api_unknown_folder_is_404() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        request(port, "POST", "/api/open?id=1", "");
        let (status, _) = request(port, "POST", "/api/folder?key=manos", "");
        assert_eq!(status, 404);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_routes() {
        let tmp = tmpdir();
        let (port, _) = spawn_test_server(&write_feed(&tmp, FEED));

        let (status, _) = request(port, "GET", "/nope", "");
        assert_eq!(status, 404);
        let (status, _) = request(port, "PUT", "/api/albums", "");
        assert_eq!(status, 405);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    // --- Reload ---

    #[test]
    fn failed_reload_keeps_albums() {
        let tmp = tmpdir();
        let feed = write_feed(&tmp, FEED);
        let (port, _) = spawn_test_server(&feed);

        std::fs::write(&feed, r#"{"not": "a list"}"#).unwrap();
        let (status, body) = request(port, "POST", "/api/reload", "");
        assert_eq!(status, 502);
        assert!(body.contains("error"));

        let (_, body) = request(port, "GET", "/api/albums", "");
        assert_eq!(json(&body)["count"], 3);

        std::fs::write(&feed, r#"[{"ID": 9}]"#).unwrap();
        let (status, body) = request(port, "POST", "/api/reload", "");
        assert_eq!(status, 200);
        assert_eq!(json(&body)["count"], 1);
        let _ = std::fs::remove_dir_all(&tmp);
    }

    /// Blocks inside `fetch` until released.
    struct GatedSource {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl AlbumSource for GatedSource {
        fn fetch(&self) -> Result<Vec<Album>, LoadError> {
            let _ = self.started.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
            crate::source::parse_albums(FEED)
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }
    }

    #[test]
    fn reload_does_not_hold_lock_while_fetching() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let controller = GalleryController::new(
            Arc::new(GatedSource {
                started: Mutex::new(started_tx),
                release: Mutex::new(release_rx),
            }),
            DateFormatter::new(ViewerZone::utc()),
        );
        let state = ServerState::new(controller);

        let reloading = Arc::clone(&state);
        let handle = std::thread::spawn(move || reloading.reload());
        started_rx.recv().unwrap();

        // The previous (empty) list stays readable during the fetch
        assert_eq!(
            state.controller.try_lock().unwrap().gallery_view().count,
            0
        );

        release_tx.send(()).unwrap();
        let outcome = handle.join().unwrap().unwrap();
        assert_eq!(outcome, LoadOutcome::Applied(3));
        assert_eq!(state.controller.lock().unwrap().gallery_view().count, 3);
    }
}
