use colored::Colorize;
use std::{
    io::{self, IsTerminal, Write},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

/// Segment progress line on stderr, shared by all segment tasks.
#[derive(Clone)]
pub struct Progress {
    inner: Option<Arc<Inner>>,
}

struct Inner {
    gid: String,
    total_segments: usize,
    segments: AtomicUsize,
    bytes: AtomicUsize,
    started: Instant,
    lock: Mutex<()>,
}

impl Progress {
    pub fn new(gid: &str, total_segments: usize) -> Self {
        if !io::stderr().is_terminal() {
            return Self::hidden();
        }

        let mut handle = io::stderr().lock();
        let _ = write!(handle, "\x1B[?25l");
        let _ = handle.flush();

        Self {
            inner: Some(Arc::new(Inner {
                gid: gid.to_owned(),
                total_segments,
                segments: AtomicUsize::new(0),
                bytes: AtomicUsize::new(0),
                started: Instant::now(),
                lock: Mutex::new(()),
            })),
        }
    }

    pub fn hidden() -> Self {
        Self { inner: None }
    }

    pub fn update(&self, chunk_bytes: usize) {
        let Some(inner) = &self.inner else {
            return;
        };

        let segments = inner.segments.fetch_add(1, Ordering::SeqCst) + 1;
        let bytes = inner.bytes.fetch_add(chunk_bytes, Ordering::SeqCst) + chunk_bytes;
        let elapsed_secs = inner.started.elapsed().as_secs_f64();

        let speed = if elapsed_secs > 0.0 {
            bytes as f64 / elapsed_secs
        } else {
            0.0
        };

        let percent = if inner.total_segments > 0 {
            segments * 100 / inner.total_segments
        } else {
            100
        };

        let remaining = inner.total_segments.saturating_sub(segments);
        let eta_seconds = if segments > 0 {
            (elapsed_secs / segments as f64 * remaining as f64) as usize
        } else {
            0
        };

        let _guard = inner.lock.lock();
        let mut handle = io::stderr().lock();
        let _ = write!(
            handle,
            "\r\x1B[2K{}#{} {}{} SG:{} DL:{} ETA:{}{}",
            "[".magenta(),
            inner.gid,
            ByteSize(bytes),
            format!("({}%)", percent).cyan(),
            format!("{}/{}", segments, inner.total_segments).cyan(),
            format!("{}/s", ByteSize(speed as usize)).green(),
            Eta(eta_seconds).to_string().yellow(),
            "]".magenta(),
        );
        let _ = handle.flush();
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mut handle = io::stderr().lock();
        let _ = writeln!(handle, "\x1B[?25h");
        let _ = handle.flush();
    }
}

struct ByteSize(usize);

impl std::fmt::Display for ByteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const KIB: f64 = 1024.0;
        const MIB: f64 = KIB * 1024.0;
        const GIB: f64 = MIB * 1024.0;

        let bytes = self.0 as f64;

        if bytes >= GIB {
            write!(f, "{:.1}GiB", bytes / GIB)
        } else if bytes >= MIB {
            write!(f, "{:.1}MiB", bytes / MIB)
        } else if bytes >= KIB {
            write!(f, "{:.1}KiB", bytes / KIB)
        } else {
            write!(f, "{}B", self.0)
        }
    }
}

struct Eta(usize);

impl std::fmt::Display for Eta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;

        if hours > 0 {
            write!(f, "{}h{}m{}s", hours, minutes, seconds)
        } else if minutes > 0 {
            write!(f, "{}m{}s", minutes, seconds)
        } else {
            write!(f, "{}s", seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_sizes_and_eta() {
        assert_eq!(ByteSize(512).to_string(), "512B");
        assert_eq!(ByteSize(1536).to_string(), "1.5KiB");
        assert_eq!(ByteSize(3 * 1024 * 1024).to_string(), "3.0MiB");
        assert_eq!(Eta(59).to_string(), "59s");
        assert_eq!(Eta(61).to_string(), "1m1s");
        assert_eq!(Eta(3723).to_string(), "1h2m3s");
    }

    #[test]
    fn hidden_progress_ignores_updates() {
        let progress = Progress::hidden();
        progress.clone().update(10);
    }
}
