//! FlightPath Core - Kinematic Path-Follower Kernel
//!
//! Drives bodies (aircraft, missiles) along closed-form trajectories and
//! resolves, every frame, where they are and which way they face:
//! 1. **Trajectory**: `t ∈ [0,1] → position`, clamped at the boundary
//! 2. **Orientation**: tangent + world up → right-handed body frame, then a
//!    fixed per-model basis correction
//! 3. **Trail**: capped, decimated polyline of past tail positions
//! 4. **Clock**: one normalized simulation clock shared by a whole scene
//!
//! Rendering, windowing and GUI widgets are left to the caller; the kernel
//! only exposes poses, trail points and control operations.

pub mod body;
pub mod clock;
pub mod config;
pub mod engagement;
pub mod error;
pub mod orientation;
pub mod replay;
pub mod scene;
pub mod trail;
pub mod trajectory;

// Re-export key types for convenience
pub use body::{BodyId, MovingBody, Pose, PoseSink, TransformHandle};
pub use clock::{ClockConfig, ClockState, EndPolicy, SimulationClock};
pub use config::SceneConfig;
pub use engagement::{ProximityEvent, ProximityMonitor};
pub use error::FlightPathError;
pub use orientation::{AxisConvention, BankingPolicy, CompositionOrder, FrameSolver, ModelBasis};
pub use replay::{LoadReport, SampledTrajectory, TrajectoryTable};
pub use scene::{FlightScene, FrameReport};
pub use trail::Trail;
pub use trajectory::{EasedArc, LinearPath, Trajectory, WavePath};
