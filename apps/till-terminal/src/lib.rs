//! # Till Terminal Library
//!
//! Checkout terminal for Till POS: reads one JSON command per line from
//! stdin and writes one JSON reply per line to stdout. Logs go to stderr.
//!
//! ## Module Organization
//! ```text
//! till_terminal/
//! ├── lib.rs          ◄─── You are here (startup & stdio loop)
//! ├── state.rs        ◄─── AppState (session, receipt formatter)
//! ├── protocol.rs     ◄─── Request/Reply line format
//! ├── commands/
//! │   ├── mod.rs      ◄─── Dispatch
//! │   ├── cart.rs     ◄─── Cart manipulation commands
//! │   └── checkout.rs ◄─── Customer, payment and receipt commands
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Ordering
//! ```text
//! stdin ──► reader ──(queue)──► worker ──► session ──► writer ──► stdout
//!             │                                          ▲
//!             └── cancel: interrupt remote work now ─────┘
//! ```
//! Commands run one at a time in the order they were read. A `cancel` line
//! also interrupts an outstanding change calculation or submission as soon
//! as it is read, so it never waits behind a slow service; its reply still
//! comes in queue order.

pub mod commands;
pub mod error;
pub mod protocol;
pub mod state;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use till_checkout::CheckoutConfig;

use protocol::{Command, Reply, Request};
use state::AppState;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TILL_CONFIG";

/// Runs the terminal until stdin closes.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Terminal Startup                                  │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │     • Default: INFO, debug for till crates; override with RUST_LOG      │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • $TILL_CONFIG, else the platform config dir (till.toml)            │
/// │     • TILL_* environment overrides                                      │
/// │                                                                         │
/// │  3. Build AppState ───────────────────────────────────────────────────► │
/// │     • Change/sales clients, or local fallbacks when unconfigured        │
/// │                                                                         │
/// │  4. Serve stdin → stdout ─────────────────────────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    info!("Starting Till POS terminal");

    let config_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let config = CheckoutConfig::load_or_default(config_path);
    let state = Arc::new(AppState::from_config(&config)?);

    info!(store = %config.store.name, "Ready for commands");

    let input = BufReader::new(tokio::io::stdin());
    serve(input, tokio::io::stdout(), state).await?;

    info!("Input closed, shutting down");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages everywhere
/// - `RUST_LOG=till_checkout=trace` - Trace the checkout crate only
/// - Default: INFO, DEBUG for till crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,till_core=debug,till_checkout=debug,till_terminal=debug")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Reads request lines from `input` until EOF and writes replies to
/// `output`. Returns `output` once every queued command has replied.
pub async fn serve<R, W>(input: R, mut output: W, state: Arc<AppState>) -> io::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();
    let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<Request>();

    let writer = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            let mut line = serde_json::to_vec(&reply).map_err(io::Error::other)?;
            line.push(b'\n');
            output.write_all(&line).await?;
            output.flush().await?;
        }
        Ok::<W, io::Error>(output)
    });

    let worker = {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(request) = queue_rx.recv().await {
                let reply = handle(&state, request).await;
                if tx.send(reply).is_err() {
                    warn!("Reply dropped, output closed");
                }
            }
        })
    };

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = Request::parse(&line);
        if matches!(request.command, Ok(Command::Cancel))
            && state.session.cancel_in_flight().await.is_some()
        {
            debug!("Interrupted outstanding request");
        }

        if queue_tx.send(request).is_err() {
            warn!("Command queue closed");
            break;
        }
    }

    drop(queue_tx);
    worker.await.map_err(io::Error::other)?;
    writer.await.map_err(io::Error::other)?
}

async fn handle(state: &AppState, request: Request) -> Reply {
    let command = match request.command {
        Ok(command) => command,
        Err(err) => {
            warn!(error = %err, "Rejected request");
            return Reply::failure(request.id, err);
        }
    };

    let name = command.name();
    let result = commands::dispatch(state, command).await;
    if let Err(err) = &result {
        debug!(command = name, error = %err, "Command failed");
    }
    Reply::from_result(request.id, result)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use till_checkout::{
        ChangeCalculator, CheckoutSession, LocalSaleSubmitter, PaymentProcessor, RemoteError,
        UnconfiguredChangeCalculator,
    };
    use till_core::{Money, ReceiptFormatter, StoreProfile};
    use tokio::sync::Notify;

    fn offline_state() -> Arc<AppState> {
        let session = CheckoutSession::with_defaults(
            PaymentProcessor::new(Arc::new(UnconfiguredChangeCalculator)),
            Arc::new(LocalSaleSubmitter),
        );
        Arc::new(AppState::new(
            session,
            ReceiptFormatter::new(StoreProfile::default()),
            42,
        ))
    }

    /// Feeds `lines` in one batch and returns the replies keyed by position
    /// of their numeric id.
    async fn send(state: &Arc<AppState>, lines: &[Value]) -> Vec<Value> {
        let input: String = lines.iter().map(|l| format!("{}\n", l)).collect();
        let output = serve(input.as_bytes(), Vec::new(), Arc::clone(state))
            .await
            .unwrap();

        let mut replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        replies.sort_by_key(|r| r["id"].as_i64().unwrap_or(i64::MAX));
        replies
    }

    /// Sends one command and returns its reply.
    async fn call(state: &Arc<AppState>, command: Value) -> Value {
        send(state, &[command]).await.remove(0)
    }

    #[tokio::test]
    async fn test_cash_sale_end_to_end() {
        let state = offline_state();

        let reply = call(
            &state,
            json!({"id": 1, "command": "add_item", "itemId": "1", "name": "Soap", "unitPrice": 10000, "quantity": 2}),
        )
        .await;
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["data"]["totals"]["total"], 20000);

        call(&state, json!({"id": 2, "command": "begin_checkout"})).await;
        let reply = call(&state, json!({"id": 3, "command": "submit_customer", "name": "Ana"})).await;
        assert_eq!(reply["data"]["phase"], "payment_selection");

        call(&state, json!({"id": 4, "command": "select_method", "method": "cash"})).await;
        let reply = call(&state, json!({"id": 5, "command": "enter_cash", "amountReceived": 50000})).await;
        assert_eq!(reply["data"]["phase"], "change_computed");
        assert_eq!(reply["data"]["change"], 30000);

        let reply = call(&state, json!({"id": 6, "command": "complete_payment"})).await;
        assert_eq!(reply["ok"], true, "{}", reply);
        assert!(reply["data"]["receiptText"].as_str().unwrap().contains("Soap"));
        assert_eq!(reply["data"]["receipt"]["change"], 30000);

        let reply = call(&state, json!({"id": 7, "command": "get_cart"})).await;
        assert_eq!(reply["data"]["phase"], "completed");
        assert_eq!(reply["data"]["items"], json!([]));

        let reply = call(&state, json!({"id": 8, "command": "get_receipt"})).await;
        assert_eq!(reply["ok"], true);
        assert!(reply["data"]["text"].as_str().unwrap().contains("Ana"));

        let reply = call(&state, json!({"id": 9, "command": "start_next"})).await;
        assert_eq!(reply["data"]["phase"], "idle");
    }

    #[tokio::test]
    async fn test_errors_carry_codes() {
        let state = offline_state();

        let reply = call(&state, json!({"id": 1, "command": "begin_checkout"})).await;
        assert_eq!(reply["ok"], false);
        assert_eq!(reply["error"]["code"], "CART_ERROR");

        let reply = call(&state, json!({"id": 2, "command": "enter_cash", "amountReceived": 100})).await;
        assert_eq!(reply["error"]["code"], "INVALID_TRANSITION");

        let reply = call(&state, json!({"id": 3, "command": "remove_item", "itemId": "nope"})).await;
        assert_eq!(reply["error"]["code"], "NOT_FOUND");

        let reply = call(&state, json!({"id": 4, "command": "get_receipt"})).await;
        assert_eq!(reply["error"]["code"], "NOT_FOUND");

        call(
            &state,
            json!({"id": 5, "command": "add_item", "itemId": "1", "name": "Soap", "unitPrice": 10000}),
        )
        .await;
        call(&state, json!({"id": 6, "command": "begin_checkout"})).await;

        let reply = call(
            &state,
            json!({"id": 7, "command": "add_item", "itemId": "2", "name": "Gum", "unitPrice": 50}),
        )
        .await;
        assert_eq!(reply["error"]["code"], "CART_LOCKED");

        call(&state, json!({"id": 8, "command": "skip_customer"})).await;
        let reply = call(&state, json!({"id": 9, "command": "select_method", "method": "cheque"})).await;
        assert_eq!(reply["error"]["code"], "VALIDATION_ERROR");

        let reply = call(&state, json!({"id": 10, "command": "complete_payment"})).await;
        assert_eq!(reply["error"]["code"], "VALIDATION_ERROR");

        call(&state, json!({"id": 11, "command": "select_method", "method": "cash"})).await;
        let reply = call(&state, json!({"id": 12, "command": "enter_cash", "amountReceived": 5000})).await;
        assert_eq!(reply["error"]["code"], "INSUFFICIENT_PAYMENT");
    }

    #[tokio::test]
    async fn test_bad_lines_get_replies() {
        let state = offline_state();
        let replies = send(
            &state,
            &[
                json!({"id": 1, "command": "get_cart"}),
                json!({"id": 2, "command": "refund"}),
                json!({"id": 3}),
            ],
        )
        .await;

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["ok"], true);
        assert_eq!(replies[1]["error"]["code"], "INVALID_REQUEST");
        assert_eq!(replies[2]["error"]["code"], "INVALID_REQUEST");

        let input = "{not json\n\n";
        let output = serve(input.as_bytes(), Vec::new(), state).await.unwrap();
        let output = String::from_utf8(output).unwrap();
        let reply: Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(reply["ok"], false);
        assert!(reply.get("id").is_none());
    }

    /// Change service that never answers.
    struct StalledCalculator {
        started: Arc<Notify>,
    }

    #[async_trait]
    impl ChangeCalculator for StalledCalculator {
        async fn calculate_change(
            &self,
            _total: Money,
            _amount_received: Money,
        ) -> Result<Money, RemoteError> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancel_while_change_pending() {
        let started = Arc::new(Notify::new());
        let session = CheckoutSession::with_defaults(
            PaymentProcessor::new(Arc::new(StalledCalculator {
                started: Arc::clone(&started),
            })),
            Arc::new(LocalSaleSubmitter),
        );
        let state = Arc::new(AppState::new(session, ReceiptFormatter::default(), 42));

        for command in [
            json!({"id": 1, "command": "add_item", "itemId": "1", "name": "Soap", "unitPrice": 10000}),
            json!({"id": 2, "command": "begin_checkout"}),
            json!({"id": 3, "command": "skip_customer"}),
            json!({"id": 4, "command": "select_method", "method": "cash"}),
        ] {
            assert_eq!(call(&state, command).await["ok"], true);
        }

        let (mut client, server) = tokio::io::duplex(4096);
        let serving = tokio::spawn(serve(BufReader::new(server), Vec::new(), Arc::clone(&state)));

        client
            .write_all(b"{\"id\":5,\"command\":\"enter_cash\",\"amountReceived\":20000}\n")
            .await
            .unwrap();
        started.notified().await;

        client
            .write_all(b"{\"id\":6,\"command\":\"cancel\"}\n")
            .await
            .unwrap();
        drop(client);

        let output = serving.await.unwrap().unwrap();
        let mut replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        replies.sort_by_key(|r| r["id"].as_i64().unwrap());

        assert_eq!(replies[0]["error"]["code"], "CANCELLED");
        assert_eq!(replies[1]["data"]["phase"], "idle");

        let reply = call(&state, json!({"id": 7, "command": "get_cart"})).await;
        assert_eq!(reply["data"]["inFlight"], false);
        assert_eq!(reply["data"]["items"][0]["id"], "1");
    }

    #[tokio::test]
    async fn test_pipelined_commands_run_in_order() {
        let state = offline_state();
        let replies = send(
            &state,
            &[
                json!({"id": 1, "command": "add_item", "itemId": "A", "name": "Apples", "unitPrice": 300}),
                json!({"id": 2, "command": "add_item", "itemId": "B", "name": "Bread", "unitPrice": 450}),
                json!({"id": 3, "command": "update_quantity", "itemId": "A", "quantity": 4}),
                json!({"id": 4, "command": "begin_checkout"}),
                json!({"id": 5, "command": "get_cart"}),
            ],
        )
        .await;

        assert_eq!(replies.len(), 5);
        for reply in &replies {
            assert_eq!(reply["ok"], true, "{}", reply);
        }

        let cart = &replies[4]["data"];
        assert_eq!(cart["items"][0]["id"], "A");
        assert_eq!(cart["items"][0]["quantity"], 4);
        assert_eq!(cart["items"][1]["id"], "B");
        assert_eq!(cart["totals"]["subtotal"], 1650);
        assert_eq!(cart["phase"], "customer_info_prompt");
    }

    #[tokio::test]
    async fn test_oversized_price_leaves_session_usable() {
        let state = offline_state();

        let reply = call(
            &state,
            json!({"id": 1, "command": "add_item", "itemId": "1", "name": "Gold", "unitPrice": i64::MAX / 2, "quantity": 3}),
        )
        .await;
        assert_eq!(reply["error"]["code"], "VALIDATION_ERROR");

        let reply = call(&state, json!({"id": 2, "command": "get_cart"})).await;
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["data"]["items"], json!([]));

        let reply = call(
            &state,
            json!({"id": 3, "command": "add_item", "itemId": "2", "name": "Gum", "unitPrice": 50}),
        )
        .await;
        assert_eq!(reply["data"]["totals"]["total"], 50);
    }
}
