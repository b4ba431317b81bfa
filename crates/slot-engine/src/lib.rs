//! # slot-engine — Slot spin resolution
//!
//! Turns one stop value per reel into a visible symbol window, evaluates it
//! against paylines and the paytable, and settles the spin.
//!
//! ## Architecture
//!
//! ```text
//! GameService (Spin: playerId, gameCode, betAmount)
//!     │
//!     ├── ConfigStore ──→ Arc<GameConfig>  (validated, immutable)
//!     └── SpinCoordinator
//!           ├── RandomSource   (one round trip, bounded by timeout)
//!           ├── resolve()      stops → SymbolMatrix
//!           └── evaluate()     SymbolMatrix → WinLines, total win
//!                 │
//!                 v
//!           SpinResult (+ audit token)
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod evaluator;
pub mod resolver;
pub mod rng;
pub mod service;

pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use evaluator::*;
pub use resolver::*;
pub use rng::*;
pub use service::*;
