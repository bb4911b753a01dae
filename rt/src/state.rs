//! Realtime state machine module root (C10).

pub mod machine;
