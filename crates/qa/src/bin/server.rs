//! HTTP front end: tokenization endpoints plus answer extraction from
//! client-supplied scores.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use qa::{answer_from_logits, AnswerOptions, QaConfig, QaError, QaLogits};
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tokenize::Tokenizer;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "qa-server")]
#[command(about = "Serve the WordPiece tokenizer over HTTP")]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Vocabulary file (overrides the config)
    #[arg(long)]
    vocab: Option<PathBuf>,
    /// Port (overrides the config)
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Deserialize)]
struct EncodeRequest {
    text: String,
    #[serde(default)]
    framed: bool,
}

#[derive(Serialize)]
struct EncodeResponse {
    ids: Vec<u32>,
    tokens: Vec<String>,
}

#[derive(Deserialize)]
struct DecodeRequest {
    ids: Vec<u32>,
}

#[derive(Serialize)]
struct DecodeResponse {
    text: String,
}

#[derive(Deserialize)]
struct PairRequest {
    question: String,
    context: String,
    #[serde(default)]
    max_len: Option<usize>,
}

#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
    context: String,
    logits: QaLogits,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct Shared {
    tokenizer: Tokenizer,
    options: AnswerOptions,
}

fn main() -> Result<()> {
    qa::init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => QaConfig::load(path)?,
        None => QaConfig::default(),
    };
    if let Some(vocab) = args.vocab {
        config.vocab_path = vocab;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let tokenizer = config
        .tokenizer()
        .with_context(|| format!("loading vocabulary {}", config.vocab_path.display()))?;
    let shared = Arc::new(Shared { tokenizer, options: config.answer });

    let addr = config.server.addr();
    let server = Server::http(&addr).map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
    info!("server running on http://{addr}");

    for request in server.incoming_requests() {
        let shared = Arc::clone(&shared);
        // one thread per request; the tokenizer is read-only and needs no lock
        thread::spawn(move || handle(&shared, request));
    }
    Ok(())
}

fn handle(shared: &Shared, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();
    debug!(%method, %url, "request");

    let (status, body) = if method == Method::Get && url == "/health" {
        (200, "{\"status\":\"ok\"}".to_string())
    } else if method == Method::Post {
        let mut content = String::new();
        match request.as_reader().read_to_string(&mut content) {
            Ok(_) => route(shared, &url, &content),
            Err(e) => error(400, format!("unreadable body: {e}")),
        }
    } else {
        error(404, "not found".to_string())
    };

    if status >= 400 {
        warn!(%method, %url, status, "request failed");
    }
    if let Err(e) = request.respond(json_response(status, body)) {
        warn!("failed to respond: {e}");
    }
}

fn route(shared: &Shared, url: &str, body: &str) -> (u16, String) {
    let tokenizer = &shared.tokenizer;
    match url {
        "/encode" => with_json(body, |req: EncodeRequest| {
            let ids = if req.framed {
                tokenizer.encode_framed(&req.text)
            } else {
                tokenizer.encode(&req.text)
            };
            let tokens = ids
                .iter()
                .filter_map(|&id| tokenizer.vocabulary().token_for(id).ok().map(str::to_string))
                .collect();
            reply(&EncodeResponse { ids, tokens })
        }),
        "/decode" => with_json(body, |req: DecodeRequest| match tokenizer.decode(&req.ids) {
            Ok(text) => reply(&DecodeResponse { text }),
            Err(e) => error(422, e.to_string()),
        }),
        "/pair" => with_json(body, |req: PairRequest| {
            let pair = match req.max_len {
                Some(n) => tokenizer.encode_pair_truncated(&req.question, &req.context, n),
                None => tokenizer.encode_pair(&req.question, &req.context),
            };
            reply(&pair)
        }),
        "/answer" => with_json(body, |req: AnswerRequest| {
            let pair = tokenizer.encode_pair_truncated(&req.question, &req.context, shared.options.max_seq_len);
            if req.logits.start.len() != pair.len() {
                return error(
                    422,
                    format!("logits cover {} positions, input has {}", req.logits.start.len(), pair.len()),
                );
            }
            match answer_from_logits(tokenizer, &pair, &req.logits, &shared.options) {
                Ok(answer) => reply(&answer),
                Err(e @ QaError::Span(_)) => error(422, e.to_string()),
                Err(e) => error(500, e.to_string()),
            }
        }),
        _ => error(404, "not found".to_string()),
    }
}

fn with_json<T, F>(body: &str, f: F) -> (u16, String)
where
    T: for<'de> Deserialize<'de>,
    F: FnOnce(T) -> (u16, String),
{
    match serde_json::from_str::<T>(body) {
        Ok(req) => f(req),
        Err(e) => error(400, format!("bad request: {e}")),
    }
}

fn reply<T: Serialize>(value: &T) -> (u16, String) {
    match serde_json::to_string(value) {
        Ok(body) => (200, body),
        Err(e) => error(500, e.to_string()),
    }
}

fn error(status: u16, message: String) -> (u16, String) {
    let body = serde_json::to_string(&ErrorResponse { error: message })
        .unwrap_or_else(|_| "{\"error\":\"internal\"}".to_string());
    (status, body)
}

fn json_response(status: u16, body: String) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body).with_status_code(StatusCode(status));
    let headers: [(&[u8], &[u8]); 2] = [
        (b"Content-Type", b"application/json"),
        (b"Access-Control-Allow-Origin", b"*"),
    ];
    for (name, value) in headers {
        if let Ok(header) = Header::from_bytes(name, value) {
            response.add_header(header);
        }
    }
    response
}
