//! Process lifecycle: structured logging init and graceful-shutdown signal
//! handling. No daemonization, PID file, or config-reload signal is needed —
//! this gateway runs as a single foreground process per the CLI surface.

pub mod logging;
pub mod signal;
