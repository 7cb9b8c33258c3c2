//! Camera session lifecycle.
//!
//! At most one session is open at any time, and `close` releases the
//! device completely so the external recorder can open it. In dry-run
//! mode the handoff close/reopen pair becomes a no-op and the existing
//! session is reused, which keeps an already-stable exposure state.

use std::time::Duration;

use camwatch_common::error::{CamwatchError, CamwatchResult};
use image::GrayImage;

use crate::source::{FrameSource, SourceOpener};

/// Configuration for the session lifecycle.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Wait after opening before frames are trusted. Auto-exposure and
    /// auto-gain need time to stabilize after the device opens.
    pub settle_delay: Duration,

    /// Dry-run: keep the session open across handoffs.
    pub skip_recording: bool,
}

/// Owns the open/close lifecycle of the camera frame source.
pub struct SessionManager {
    config: SessionConfig,
    opener: Box<dyn SourceOpener>,
    source: Option<Box<dyn FrameSource>>,
    opens: u32,
}

impl SessionManager {
    pub fn new(config: SessionConfig, opener: Box<dyn SourceOpener>) -> Self {
        Self {
            config,
            opener,
            source: None,
            opens: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Number of sessions opened since construction.
    pub fn sessions_opened(&self) -> u32 {
        self.opens
    }

    /// Acquire a new session and let the sensor settle.
    pub async fn open(&mut self) -> CamwatchResult<()> {
        if self.source.is_some() {
            // Session already open (dry-run reuse).
            return Ok(());
        }
        let source = self.opener.open()?;
        tracing::info!(source = %source.name(), "Camera session opened");
        self.source = Some(source);
        self.opens += 1;
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        Ok(())
    }

    /// Close the session and release the device completely.
    pub fn close(&mut self) -> CamwatchResult<()> {
        if let Some(mut source) = self.source.take() {
            source.close()?;
            tracing::info!("Camera session closed");
        }
        Ok(())
    }

    /// Release the device ahead of a recorder handoff.
    ///
    /// No-op in dry-run mode: the existing session is reused.
    pub fn release_for_capture(&mut self) -> CamwatchResult<()> {
        if self.config.skip_recording {
            return Ok(());
        }
        self.close()
    }

    /// Reacquire the device after a recorder handoff.
    pub async fn reopen_after_capture(&mut self) -> CamwatchResult<()> {
        if self.config.skip_recording {
            return Ok(());
        }
        self.open().await
    }

    /// Read the next frame from the open session.
    pub fn read_frame(&mut self) -> CamwatchResult<Option<GrayImage>> {
        match self.source.as_mut() {
            Some(source) => source.read(),
            None => Err(CamwatchError::capture("No open camera session")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct NullSource {
        closes: Arc<AtomicU32>,
    }

    impl FrameSource for NullSource {
        fn read(&mut self) -> CamwatchResult<Option<GrayImage>> {
            Ok(None)
        }

        fn close(&mut self) -> CamwatchResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    struct NullOpener {
        opens: Arc<AtomicU32>,
        closes: Arc<AtomicU32>,
    }

    impl SourceOpener for NullOpener {
        fn open(&mut self) -> CamwatchResult<Box<dyn FrameSource>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullSource {
                closes: self.closes.clone(),
            }))
        }
    }

    fn manager(skip_recording: bool) -> (SessionManager, Arc<AtomicU32>, Arc<AtomicU32>) {
        let opens = Arc::new(AtomicU32::new(0));
        let closes = Arc::new(AtomicU32::new(0));
        let opener = NullOpener {
            opens: opens.clone(),
            closes: closes.clone(),
        };
        let config = SessionConfig {
            settle_delay: Duration::from_secs(2),
            skip_recording,
        };
        (
            SessionManager::new(config, Box::new(opener)),
            opens,
            closes,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn handoff_cycles_the_session() {
        let (mut sessions, opens, closes) = manager(false);

        sessions.open().await.unwrap();
        assert!(sessions.is_open());

        sessions.release_for_capture().unwrap();
        assert!(!sessions.is_open());
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        sessions.reopen_after_capture().await.unwrap();
        assert!(sessions.is_open());
        assert_eq!(opens.load(Ordering::SeqCst), 2);
        assert_eq!(sessions.sessions_opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_reuses_the_session_across_handoffs() {
        let (mut sessions, opens, closes) = manager(true);

        sessions.open().await.unwrap();
        sessions.release_for_capture().unwrap();
        assert!(sessions.is_open());
        sessions.reopen_after_capture().await.unwrap();

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 0);

        // the final shutdown close is still honored
        sessions.close().unwrap();
        assert!(!sessions.is_open());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_idempotent() {
        let (mut sessions, _, closes) = manager(false);
        sessions.open().await.unwrap();
        sessions.close().unwrap();
        sessions.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reading_without_a_session_is_an_error() {
        let (mut sessions, _, _) = manager(false);
        assert!(sessions.read_frame().is_err());
    }
}
