//! # HTTP Trigger Surface
//!
//! A thin JSON interface for submitting print requests over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! boleta serve --listen 0.0.0.0:8080
//! ```
//!
//! Then:
//!
//! ```bash
//! curl -X POST http://localhost:8080/print \
//!   -H 'Content-Type: application/json' \
//!   -d '{"id":"123","cus":"Jane","tot":"45.00",
//!        "items":[{"name":"Bread","qty":"2","amt":"10.00"}]}'
//! ```
//!
//! The print attempt runs on a blocking worker off the request path; the
//! response carries the terminal status plus the full ordered status
//! trail of the attempt.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::sync::mpsc;

use crate::device::PrinterDescriptor;
use crate::dispatch::{Dispatcher, PrintStatus};
use crate::document::PrintRequest;
use crate::error::BoletaError;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
}

/// Start the HTTP server.
pub async fn serve(dispatcher: Arc<Dispatcher>, config: ServerConfig) -> Result<(), BoletaError> {
    let app = Router::new()
        .route("/print", post(print_handler))
        .route("/printer", post(select_printer_handler))
        .route("/printers", get(printers_handler))
        .with_state(dispatcher);

    println!("boleta print service starting...");
    println!("Listening on: {}", config.listen_addr);
    println!();
    println!("POST /print      submit a print request (JSON)");
    println!("POST /printer    set the saved printer (JSON)");
    println!("GET  /printers   list current candidates");
    println!();

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            BoletaError::Connection(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| BoletaError::Connection(format!("Server error: {}", e)))?;

    Ok(())
}

/// Response for POST /print.
#[derive(Debug, Serialize)]
struct PrintResponse {
    /// Terminal status of the attempt.
    r#final: PrintStatus,
    /// Every status the attempt went through, in order.
    trail: Vec<PrintStatus>,
}

async fn print_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(request): Json<PrintRequest>,
) -> (StatusCode, Json<PrintResponse>) {
    // The whole attempt is blocking I/O; keep it off the async runtime.
    let result = tokio::task::spawn_blocking(move || {
        let (tx, rx) = mpsc::channel();
        let r#final = dispatcher.run(&request, &tx);
        drop(tx);
        let trail: Vec<PrintStatus> = rx.iter().collect();
        PrintResponse { r#final, trail }
    })
    .await;

    match result {
        Ok(response) => {
            let code = match response.r#final {
                PrintStatus::Succeeded(_) => StatusCode::OK,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (code, Json(response))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(PrintResponse {
                r#final: PrintStatus::Failed(format!("Task error: {}", e)),
                trail: Vec::new(),
            }),
        ),
    }
}

/// Request body for POST /printer.
#[derive(Debug, Deserialize)]
struct SelectRequest {
    #[serde(alias = "mac")]
    identifier: String,
}

/// Manually pick the saved printer from the paired Bluetooth devices.
async fn select_printer_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(request): Json<SelectRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let result =
        tokio::task::spawn_blocking(move || dispatcher.select_printer(&request.identifier)).await;

    match result {
        Ok(Ok(printer)) => (StatusCode::OK, Json(json!({ "saved": printer }))),
        Ok(Err(e)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Task error: {}", e) })),
        ),
    }
}

/// Response for GET /printers.
#[derive(Debug, Serialize)]
struct PrintersResponse {
    usb: Vec<PrinterDescriptor>,
    bluetooth: Vec<PrinterDescriptor>,
}

async fn printers_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
) -> Json<PrintersResponse> {
    let (usb, bluetooth) = tokio::task::spawn_blocking(move || dispatcher.candidates())
        .await
        .unwrap_or_default();
    Json(PrintersResponse { usb, bluetooth })
}
