//! # Till Terminal Entry Point
//!
//! ```text
//! front end ──stdin (JSON lines)──► till-terminal ──stdout (JSON lines)──► front end
//!                                        │
//!                                        └──stderr──► logs
//! ```
//!
//! The actual setup is in lib.rs.

#[tokio::main]
async fn main() {
    if let Err(e) = till_terminal::run().await {
        eprintln!("till-terminal: {}", e);
        std::process::exit(1);
    }
}
