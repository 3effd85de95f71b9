// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use super::Activity;

/// Collects the formatted operator events of the current thread.
///
/// `let _guard = tracing::subscriber::set_default(capture.subscriber());`
#[derive(Debug, Clone, Default)]
pub(crate) struct LogCapture {
    lines: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.lines.lock().unwrap()).into_owned()
    }

    /// Number of captured events recording `activity`.
    pub fn count(&self, activity: Activity) -> usize {
        let field = format!("cache.activity=\"{}\"", activity.as_str());
        self.output().lines().filter(|line| line.contains(&field)).count()
    }

    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "missing '{expected}' in:\n{output}");
    }

    pub fn assert_absent(&self, unexpected: &str) {
        let output = self.output();
        assert!(!output.contains(unexpected), "unexpected '{unexpected}' in:\n{output}");
    }

    pub fn subscriber(&self) -> impl tracing::Subscriber {
        use tracing_subscriber::layer::SubscriberExt;
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_target(false);
        tracing_subscriber::registry().with(layer)
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureSink;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureSink(Arc::clone(&self.lines))
    }
}

pub(crate) struct CaptureSink(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
