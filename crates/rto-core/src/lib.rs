//! # rto-core
//!
//! Online learning engine for retransmission-timeout (RTO) selection.
//!
//! Each candidate RTO value in `[0, rtt_range)` is an arm of a multi-armed
//! bandit. A windowed Thompson-sampling learner picks a timeout per packet,
//! learns from delayed feedback, and demotes timeouts early when they expire
//! before any feedback arrives.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | `arm_bank` | Beta `(alpha, beta)` pair per candidate RTO |
//! | `selector` | Thompson sampling over the arm bank |
//! | `frame` | Credit frames built from feedback or expiry |
//! | `window` | Ring of recent frames bounding accumulated credit |
//! | `pending` | Countdown per in-flight packet |
//! | `learner` | `send_packet` / `update` facade |
//! | `policy` | Closed set of interchangeable policies |
//! | `invariants` | Bounds and window accounting checks |
//!
//! ## Usage
//!
//! ```rust
//! use rto_core::{DeterministicRng, Feedback, LearnerConfig, WindowedThompsonPolicy};
//!
//! let config = LearnerConfig::default().with_window_size(100);
//! let mut learner = WindowedThompsonPolicy::new(config, DeterministicRng::new(42)).unwrap();
//!
//! let rto = learner.send_packet(1);
//! let report = learner.update(&[Feedback::new(rto, 200, 201, 1)]).unwrap();
//! assert_eq!(report.acked, vec![1]);
//! ```
//!
//! ## Reproducibility
//!
//! All randomness flows through an explicitly owned `DeterministicRng`.
//! The same seed and the same event stream always produce the same choices.

pub mod arm_bank;
pub mod config;
pub mod error;
pub mod feedback;
pub mod frame;
pub mod invariants;
pub mod learner;
pub mod pending;
pub mod policy;
pub mod random;
pub mod selector;
pub mod window;

pub use arm_bank::{ArmBank, BetaParams};
pub use config::{DecayingConfig, LearnerConfig};
pub use error::{ConfigError, RtoError};
pub use feedback::{Feedback, PacketId};
pub use frame::{sigmoid, CreditFrame, FrameSpan};
pub use invariants::InvariantResult;
pub use learner::{UpdateReport, WindowedThompsonPolicy};
pub use pending::{PendingEntry, PendingPackets};
pub use policy::{DecayingThompsonPolicy, Policy, RandomPolicy, RtoPolicy};
pub use random::DeterministicRng;
pub use selector::{sample_beta, select_by, thompson_select};
pub use window::{FrameOrigin, SlidingWindow};
